//! Physical parameters of the string and the derived discretization.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};

/// Raw physical inputs as supplied by the controls or a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterInputs {
    /// String length in meters.
    #[serde(default = "default_length")]
    pub length: f64,
    /// Tension in newtons.
    #[serde(default = "default_tension")]
    pub tension: f64,
    /// Linear mass density in kg/m.
    #[serde(default = "default_mass_density")]
    pub mass_density: f64,
    /// Viscous damping coefficient in 1/s.
    #[serde(default)]
    pub damping: f64,
    /// Number of nodes including both ends.
    #[serde(default = "default_node_count")]
    pub node_count: usize,
    /// Courant number `c * dt / dx`.
    #[serde(default = "default_courant")]
    pub courant: f64,
}

fn default_length() -> f64 {
    1.0
}

fn default_tension() -> f64 {
    1.0
}

fn default_mass_density() -> f64 {
    1.0
}

fn default_node_count() -> usize {
    101
}

fn default_courant() -> f64 {
    0.5
}

impl Default for ParameterInputs {
    fn default() -> Self {
        Self {
            length: default_length(),
            tension: default_tension(),
            mass_density: default_mass_density(),
            damping: 0.0,
            node_count: default_node_count(),
            courant: default_courant(),
        }
    }
}

impl ParameterInputs {
    /// Set the string length.
    pub fn with_length(mut self, length: f64) -> Self {
        self.length = length;
        self
    }

    /// Set the tension.
    pub fn with_tension(mut self, tension: f64) -> Self {
        self.tension = tension;
        self
    }

    /// Set the linear mass density.
    pub fn with_mass_density(mut self, mass_density: f64) -> Self {
        self.mass_density = mass_density;
        self
    }

    /// Set the damping coefficient.
    pub fn with_damping(mut self, damping: f64) -> Self {
        self.damping = damping;
        self
    }

    /// Set the node count.
    pub fn with_node_count(mut self, node_count: usize) -> Self {
        self.node_count = node_count;
        self
    }

    /// Set the Courant number.
    pub fn with_courant(mut self, courant: f64) -> Self {
        self.courant = courant;
        self
    }

    /// Validate the inputs and compute the derived discretization.
    pub fn derive(&self) -> Result<PhysicalParameterSet> {
        PhysicalParameterSet::derive(*self)
    }
}

/// A validated parameter set with its derived wave speed and steps.
///
/// Only [`PhysicalParameterSet::derive`] builds one, so the derived values
/// can never disagree with the inputs they came from.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PhysicalParameterSet {
    inputs: ParameterInputs,
    wave_speed: f64,
    spatial_step: f64,
    time_step: f64,
}

impl Default for PhysicalParameterSet {
    fn default() -> Self {
        Self::from_validated(ParameterInputs::default())
    }
}

impl PhysicalParameterSet {
    /// Derive `c = sqrt(T/mu)`, `dx = L/(N-1)` and `dt = r*dx/c`.
    ///
    /// Out-of-range inputs are rejected rather than clamped. A Courant
    /// number above 1 is accepted; the scheme is then unstable.
    pub fn derive(inputs: ParameterInputs) -> Result<Self> {
        if inputs.node_count < 3 {
            return Err(SimulationError::InvalidNodeCount(inputs.node_count));
        }
        check_positive("length", inputs.length)?;
        check_positive("tension", inputs.tension)?;
        check_positive("mass_density", inputs.mass_density)?;
        check_positive("courant", inputs.courant)?;
        if !inputs.damping.is_finite() || inputs.damping < 0.0 {
            return Err(SimulationError::invalid_parameter(
                "damping",
                inputs.damping,
                "must be finite and non-negative",
            ));
        }

        if inputs.courant > 1.0 {
            tracing::warn!(
                courant = inputs.courant,
                "Courant number exceeds 1, integration will be unstable"
            );
        }

        Ok(Self::from_validated(inputs))
    }

    fn from_validated(inputs: ParameterInputs) -> Self {
        let wave_speed = (inputs.tension / inputs.mass_density).sqrt();
        let spatial_step = inputs.length / (inputs.node_count - 1) as f64;
        Self {
            inputs,
            wave_speed,
            spatial_step,
            time_step: inputs.courant * spatial_step / wave_speed,
        }
    }

    /// The inputs this set was derived from.
    pub fn inputs(&self) -> &ParameterInputs {
        &self.inputs
    }

    /// String length in meters.
    pub fn length(&self) -> f64 {
        self.inputs.length
    }

    /// Damping coefficient.
    pub fn damping(&self) -> f64 {
        self.inputs.damping
    }

    /// Number of nodes.
    pub fn node_count(&self) -> usize {
        self.inputs.node_count
    }

    /// Courant number `r`.
    pub fn courant(&self) -> f64 {
        self.inputs.courant
    }

    /// Wave speed `c` in m/s.
    pub fn wave_speed(&self) -> f64 {
        self.wave_speed
    }

    /// Spatial step `dx` in meters.
    pub fn spatial_step(&self) -> f64 {
        self.spatial_step
    }

    /// Physical time step `dt` in seconds.
    pub fn time_step(&self) -> f64 {
        self.time_step
    }

    /// `r^2`, the stencil weight of the discrete Laplacian.
    #[inline]
    pub fn courant_squared(&self) -> f64 {
        self.inputs.courant * self.inputs.courant
    }

    /// `1 + gamma * dt / 2`.
    #[inline]
    pub fn damping_factor(&self) -> f64 {
        1.0 + self.inputs.damping * self.time_step / 2.0
    }

    /// Coefficient `(c dt - dx) / (c dt + dx)` of the first-order Mur update.
    #[inline]
    pub fn mur_coefficient(&self) -> f64 {
        let c_dt = self.wave_speed * self.time_step;
        (c_dt - self.spatial_step) / (c_dt + self.spatial_step)
    }

    /// Check if the parameters satisfy the CFL condition `r <= 1`.
    pub fn is_stable(&self) -> bool {
        self.inputs.courant <= 1.0
    }

    /// Position of node `index` along the string.
    pub fn node_position(&self, index: usize) -> f64 {
        index as f64 * self.spatial_step
    }

    /// Whole physical steps needed to cover `duration` seconds.
    pub fn steps_for(&self, duration: f64) -> u64 {
        (duration / self.time_step).round().max(0.0) as u64
    }
}

fn check_positive(name: &'static str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(SimulationError::invalid_parameter(
            name,
            value,
            "must be finite and positive",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reference_scenario() {
        let params = ParameterInputs::default().derive().unwrap();
        assert!((params.wave_speed() - 1.0).abs() < 1e-12);
        assert!((params.spatial_step() - 0.01).abs() < 1e-12);
        assert!((params.time_step() - 0.005).abs() < 1e-12);
        assert_eq!(params.steps_for(1.0), 200);
    }

    #[test]
    fn test_wave_speed_from_tension_and_density() {
        let params = ParameterInputs::default()
            .with_tension(9.0)
            .with_mass_density(0.25)
            .derive()
            .unwrap();
        assert!((params.wave_speed() - 6.0).abs() < 1e-12);
        let r = params.wave_speed() * params.time_step() / params.spatial_step();
        assert!((r - 0.5).abs() < 1e-12, "dt must reproduce the Courant number");
    }

    #[test]
    fn test_rejects_too_few_nodes() {
        let err = ParameterInputs::default().with_node_count(2).derive().unwrap_err();
        assert!(matches!(err, SimulationError::InvalidNodeCount(2)));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_rejects_non_positive_tension_and_density() {
        for inputs in [
            ParameterInputs::default().with_tension(0.0),
            ParameterInputs::default().with_tension(-1.0),
            ParameterInputs::default().with_mass_density(0.0),
            ParameterInputs::default().with_length(0.0),
            ParameterInputs::default().with_damping(-0.1),
            ParameterInputs::default().with_courant(f64::NAN),
        ] {
            assert!(
                inputs.derive().is_err(),
                "inputs {:?} should be rejected",
                inputs
            );
        }
    }

    #[test]
    fn test_unstable_courant_is_accepted() {
        let params = ParameterInputs::default().with_courant(1.2).derive().unwrap();
        assert!(!params.is_stable());
    }

    #[test]
    fn test_mur_coefficient() {
        let params = ParameterInputs::default().derive().unwrap();
        // r = 0.5: (0.5 - 1) / (0.5 + 1)
        assert!((params.mur_coefficient() + 1.0 / 3.0).abs() < 1e-12);

        let params = ParameterInputs::default().with_courant(1.0).derive().unwrap();
        assert!(params.mur_coefficient().abs() < 1e-12);
    }

    #[test]
    fn test_damping_factor() {
        let params = ParameterInputs::default().with_damping(2.0).derive().unwrap();
        assert!((params.damping_factor() - 1.005).abs() < 1e-12);
    }
}
