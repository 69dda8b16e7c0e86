//! Instance registry: the primary string, the drive rows and their
//! auxiliary strings, and the shared parameter set.

use std::collections::BTreeMap;
use std::fmt;

use super::boundary::{BoundaryDriver, BoundarySample, ControlMode, DriveSet, RightBoundary};
use super::expr::BoundaryExpression;
use super::field::WaveFieldState;
use super::integrator::WaveIntegrator;
use super::params::{ParameterInputs, PhysicalParameterSet};
use crate::error::{Result, SimulationError};

/// Opaque handle of a drive row, allocated by the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RowId(u64);

impl RowId {
    /// Wrap a raw handle value.
    pub fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw handle value.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "row-{}", self.0)
    }
}

/// Identity of a simulated string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum InstanceId {
    /// The always-present main string.
    Primary,
    /// The comparison string of a drive row.
    Auxiliary(RowId),
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InstanceId::Primary => write!(f, "primary"),
            InstanceId::Auxiliary(row) => write!(f, "{}", row),
        }
    }
}

/// One simulated string: its field, its drive and whether it steps.
#[derive(Debug, Clone)]
pub struct SimulationInstance {
    id: InstanceId,
    field: WaveFieldState,
    driver: BoundaryDriver,
    active: bool,
}

impl SimulationInstance {
    /// Instance identity.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// Field state, read-only.
    pub fn field(&self) -> &WaveFieldState {
        &self.field
    }

    /// Left-boundary policy.
    pub fn driver(&self) -> BoundaryDriver {
        self.driver
    }

    /// True if the instance advances on each physical step.
    pub fn is_active(&self) -> bool {
        self.active
    }

    /// Current displacement.
    pub fn current(&self) -> &[f64] {
        self.field.current()
    }

    /// Local simulated time.
    pub fn time_elapsed(&self) -> f64 {
        self.field.time_elapsed()
    }
}

#[derive(Debug, Clone, Default)]
struct DriveRow {
    applied: Option<BoundaryExpression>,
    instance: Option<SimulationInstance>,
}

/// Outcome of one physical step across all active instances.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepReport {
    /// Instances advanced.
    pub instances_stepped: usize,
    /// Drive terms that failed and contributed zero.
    pub expression_failures: usize,
}

/// Simulation context shared by every instance.
///
/// Owns the parameter set, the primary instance and the drive rows. The
/// parameter set is only ever replaced as a whole by
/// [`reset_all`](Self::reset_all), which also bumps the generation counter
/// and reinitializes every field, so no field outlives its parameters.
#[derive(Debug, Clone)]
pub struct SimulationRegistry {
    params: PhysicalParameterSet,
    generation: u64,
    global_time: f64,
    primary: SimulationInstance,
    rows: BTreeMap<RowId, DriveRow>,
    next_row: u64,
    control_mode: ControlMode,
    manual_value: f64,
    right_boundary: RightBoundary,
}

impl Default for SimulationRegistry {
    fn default() -> Self {
        Self::new(PhysicalParameterSet::default())
    }
}

impl SimulationRegistry {
    /// Create a registry with an at-rest primary instance.
    pub fn new(params: PhysicalParameterSet) -> Self {
        let primary = SimulationInstance {
            id: InstanceId::Primary,
            field: WaveIntegrator::reset(&params, 0.0),
            driver: BoundaryDriver::Superposition,
            active: true,
        };
        Self {
            params,
            generation: 0,
            global_time: 0.0,
            primary,
            rows: BTreeMap::new(),
            next_row: 1,
            control_mode: ControlMode::Function,
            manual_value: 0.0,
            right_boundary: RightBoundary::Fixed,
        }
    }

    /// Derive parameters from `inputs` and create a registry.
    pub fn from_inputs(inputs: ParameterInputs) -> Result<Self> {
        Ok(Self::new(inputs.derive()?))
    }

    /// The shared parameter set.
    pub fn params(&self) -> &PhysicalParameterSet {
        &self.params
    }

    /// Number of successful parameter resets so far.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Simulated time since the last reset.
    pub fn global_time(&self) -> f64 {
        self.global_time
    }

    // ------------------------------------------------------------------
    // Drive rows
    // ------------------------------------------------------------------

    /// Register a new drive row with no expression, not simulated.
    pub fn add_row(&mut self) -> RowId {
        let id = RowId(self.next_row);
        self.next_row += 1;
        self.rows.insert(id, DriveRow::default());
        tracing::debug!(row = %id, "Drive row added");
        id
    }

    /// Remove a row, its applied expression and its instance.
    ///
    /// Returns false if the row did not exist.
    pub fn remove_row(&mut self, id: RowId) -> bool {
        let removed = self.rows.remove(&id).is_some();
        if removed {
            tracing::debug!(row = %id, "Drive row removed");
        }
        removed
    }

    /// Row handles in ascending order.
    pub fn row_ids(&self) -> impl Iterator<Item = RowId> + '_ {
        self.rows.keys().copied()
    }

    /// Number of drive rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    fn row_mut(&mut self, id: RowId) -> Result<&mut DriveRow> {
        self.rows.get_mut(&id).ok_or(SimulationError::UnknownRow(id))
    }

    /// Compile `text` and make it the row's applied expression.
    ///
    /// On a parse error the previously applied expression stays in place.
    pub fn apply_expression(&mut self, id: RowId, text: &str) -> Result<()> {
        self.row_mut(id)?;
        let expr = BoundaryExpression::parse(text).map_err(|e| {
            tracing::warn!(row = %id, text, error = %e, "Rejected boundary expression");
            e
        })?;
        self.apply_compiled(id, expr)
    }

    /// Make an already compiled expression the row's applied expression.
    pub fn apply_compiled(&mut self, id: RowId, expr: BoundaryExpression) -> Result<()> {
        let row = self.row_mut(id)?;
        tracing::debug!(row = %id, expression = %expr, "Boundary expression applied");
        row.applied = Some(expr);
        Ok(())
    }

    /// Drop the row's applied expression.
    pub fn clear_expression(&mut self, id: RowId) -> Result<()> {
        self.row_mut(id)?.applied = None;
        Ok(())
    }

    /// The row's applied expression.
    pub fn applied_expression(&self, id: RowId) -> Option<&BoundaryExpression> {
        self.rows.get(&id).and_then(|row| row.applied.as_ref())
    }

    /// Toggle the row's "simulate" flag.
    ///
    /// Enabling an already simulated row keeps its state. Disabling
    /// discards it; re-enabling later starts from rest.
    pub fn set_simulated(&mut self, id: RowId, enabled: bool) -> Result<()> {
        let simulated = self.row_mut(id)?.instance.is_some();
        match (enabled, simulated) {
            (true, false) => self.create_or_reset_auxiliary(id),
            (false, true) => {
                self.remove_auxiliary(id);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// True if the row currently has an auxiliary instance.
    pub fn is_simulated(&self, id: RowId) -> bool {
        self.rows
            .get(&id)
            .is_some_and(|row| row.instance.is_some())
    }

    // ------------------------------------------------------------------
    // Instance lifecycle
    // ------------------------------------------------------------------

    /// Allocate or reinitialize the row's auxiliary instance from rest.
    ///
    /// The new field starts at the registry's global time so an instance
    /// enabled mid-run stays in step with the others.
    pub fn create_or_reset_auxiliary(&mut self, id: RowId) -> Result<()> {
        let mut field = WaveIntegrator::reset(&self.params, self.global_time);
        field.generation = self.generation;
        let row = self.row_mut(id)?;
        row.instance = Some(SimulationInstance {
            id: InstanceId::Auxiliary(id),
            field,
            driver: BoundaryDriver::Single(id),
            active: true,
        });
        tracing::debug!(row = %id, time = self.global_time, "Auxiliary instance initialized");
        Ok(())
    }

    /// Drop the row's auxiliary instance. Absent rows and instances are ignored.
    pub fn remove_auxiliary(&mut self, id: RowId) {
        if let Some(row) = self.rows.get_mut(&id) {
            if row.instance.take().is_some() {
                tracing::debug!(row = %id, "Auxiliary instance removed");
            }
        }
    }

    /// Replace the parameter set and restart every instance from rest.
    ///
    /// Invalid inputs leave the registry untouched. The set of simulated
    /// rows is preserved; all fields restart at `t = 0`.
    pub fn reset_all(&mut self, inputs: ParameterInputs) -> Result<()> {
        let params = inputs.derive().map_err(|e| {
            tracing::warn!(error = %e, "Parameter reset rejected, keeping previous configuration");
            e
        })?;

        self.params = params;
        self.generation += 1;
        self.global_time = 0.0;

        let generation = self.generation;
        let fresh = || {
            let mut field = WaveIntegrator::reset(&params, 0.0);
            field.generation = generation;
            field
        };

        self.primary.field = fresh();
        let mut auxiliaries = 0;
        for row in self.rows.values_mut() {
            if let Some(instance) = row.instance.as_mut() {
                instance.field = fresh();
                auxiliaries += 1;
            }
        }

        tracing::info!(
            generation,
            nodes = params.node_count(),
            wave_speed = params.wave_speed(),
            dt = params.time_step(),
            auxiliaries,
            "Simulation reset"
        );
        Ok(())
    }

    /// Restart every instance with the current parameters.
    pub fn restart(&mut self) -> Result<()> {
        self.reset_all(*self.params.inputs())
    }

    // ------------------------------------------------------------------
    // Controls
    // ------------------------------------------------------------------

    /// How the primary instance is driven.
    pub fn control_mode(&self) -> ControlMode {
        self.control_mode
    }

    /// Switch between the manual handle and the superposed drive.
    pub fn set_control_mode(&mut self, mode: ControlMode) {
        self.control_mode = mode;
        self.sync_primary_driver();
    }

    /// Held left-boundary value used in manual mode.
    pub fn manual_value(&self) -> f64 {
        self.manual_value
    }

    /// Update the held left-boundary value.
    pub fn set_manual_value(&mut self, value: f64) {
        self.manual_value = value;
        self.sync_primary_driver();
    }

    fn sync_primary_driver(&mut self) {
        self.primary.driver = match self.control_mode {
            ControlMode::Manual => BoundaryDriver::Manual(self.manual_value),
            ControlMode::Function => BoundaryDriver::Superposition,
        };
    }

    /// Right-end policy shared by all instances.
    pub fn right_boundary(&self) -> RightBoundary {
        self.right_boundary
    }

    /// Change the right-end policy; takes effect on the next step.
    pub fn set_right_boundary(&mut self, right: RightBoundary) {
        self.right_boundary = right;
    }

    /// Include or exclude the primary instance from stepping.
    ///
    /// A disabled primary keeps its last field. Enabling it again restarts
    /// it from rest at the global time, so it rejoins the shared clock.
    pub fn set_primary_enabled(&mut self, enabled: bool) {
        if enabled && !self.primary.active {
            let mut field = WaveIntegrator::reset(&self.params, self.global_time);
            field.generation = self.generation;
            self.primary.field = field;
            tracing::debug!(time = self.global_time, "Primary instance re-enabled");
        }
        self.primary.active = enabled;
    }

    // ------------------------------------------------------------------
    // Read access
    // ------------------------------------------------------------------

    /// The primary instance.
    pub fn primary(&self) -> &SimulationInstance {
        &self.primary
    }

    /// The row's auxiliary instance, if simulated.
    pub fn auxiliary(&self, id: RowId) -> Option<&SimulationInstance> {
        self.rows.get(&id).and_then(|row| row.instance.as_ref())
    }

    /// Active instances in stepping order: primary first, then rows ascending.
    pub fn instances(&self) -> impl Iterator<Item = &SimulationInstance> + '_ {
        std::iter::once(&self.primary)
            .filter(|p| p.active)
            .chain(self.rows.values().filter_map(|row| row.instance.as_ref()))
    }

    /// Snapshot of every applied expression, regardless of the simulate flag.
    pub fn drive_snapshot(&self) -> DriveSet {
        DriveSet::new(
            self.rows
                .iter()
                .filter_map(|(id, row)| row.applied.clone().map(|expr| (*id, expr))),
        )
    }

    /// The primary instance's left-boundary value at `time`.
    pub fn primary_boundary_value(&self, time: f64) -> BoundarySample {
        self.primary.driver.evaluate(time, &self.drive_snapshot())
    }

    // ------------------------------------------------------------------
    // Stepping
    // ------------------------------------------------------------------

    /// Advance every active instance by one physical step.
    ///
    /// The applied expressions are snapshotted once up front and the right
    /// boundary is read fresh. Instances step in a fixed order.
    pub fn step_all(&mut self) -> Result<StepReport> {
        let drives = self.drive_snapshot();
        let right = self.right_boundary;
        let params = self.params;
        let mut report = StepReport::default();

        if self.primary.active {
            report.expression_failures +=
                Self::step_instance(&mut self.primary, &params, &drives, right)?;
            report.instances_stepped += 1;
        }
        for row in self.rows.values_mut() {
            if let Some(instance) = row.instance.as_mut().filter(|i| i.active) {
                report.expression_failures +=
                    Self::step_instance(instance, &params, &drives, right)?;
                report.instances_stepped += 1;
            }
        }

        self.global_time += params.time_step();
        Ok(report)
    }

    fn step_instance(
        instance: &mut SimulationInstance,
        params: &PhysicalParameterSet,
        drives: &DriveSet,
        right: RightBoundary,
    ) -> Result<usize> {
        let next_time = instance.field.time_elapsed() + params.time_step();
        let sample = instance.driver.evaluate(next_time, drives);
        for failure in &sample.failures {
            tracing::warn!(
                instance = %instance.id,
                row = %failure.row,
                error = %failure.error,
                "Boundary term failed to evaluate, contributing zero"
            );
        }
        WaveIntegrator::step(&mut instance.field, params, sample.value, right)?;
        Ok(sample.failures.len())
    }
}
