//! Configuration loading for the string simulation.
//!
//! Configuration comes from a TOML file (or string) layered with
//! `WAVESTRING__*` environment variables, using the `config` crate.
//!
//! # Example
//!
//! ```ignore
//! use wavestring::config::SimulationConfig;
//!
//! let config = SimulationConfig::load("demos/two_drives.toml")?;
//! let (mut registry, mut scheduler) = config.build()?;
//! ```

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use crate::error::{Result, SimulationError};
use crate::simulation::{
    BoundaryExpression, ControlMode, ParameterInputs, PlaybackScheduler, RightBoundary,
    SimulationRegistry,
};

const ENV_PREFIX: &str = "WAVESTRING";

/// Complete simulation configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Physical medium shared by every string.
    #[serde(default)]
    pub medium: ParameterInputs,

    /// Playback speed and pause state.
    #[serde(default)]
    pub playback: PlaybackConfig,

    /// Boundary treatment.
    #[serde(default)]
    pub boundary: BoundaryConfig,

    /// Drive rows, in order.
    #[serde(default)]
    pub drives: Vec<DriveConfig>,
}

/// Playback configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Playback interval; larger is slower.
    #[serde(default = "default_interval")]
    pub interval: f64,

    /// Interval that corresponds to real time.
    #[serde(default = "default_interval")]
    pub reference_interval: f64,

    /// Start paused.
    #[serde(default)]
    pub paused: bool,

    /// Optional cap on physical steps per frame.
    #[serde(default)]
    pub max_steps_per_frame: Option<u64>,
}

fn default_interval() -> f64 {
    1.0
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            interval: default_interval(),
            reference_interval: default_interval(),
            paused: false,
            max_steps_per_frame: None,
        }
    }
}

/// Boundary configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoundaryConfig {
    /// Right-end treatment.
    #[serde(default)]
    pub right: RightBoundary,

    /// How the primary string's left end is driven.
    #[serde(default)]
    pub control: ControlMode,

    /// Held left-end value in manual mode.
    #[serde(default)]
    pub manual_value: f64,
}

/// One drive row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DriveConfig {
    /// Boundary expression in `t`.
    pub expression: String,

    /// Give the row its own comparison string.
    #[serde(default)]
    pub simulate: bool,
}

impl SimulationConfig {
    /// Load configuration from a file, with environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Load configuration from a file, falling back to defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Falling back to default configuration");
            Self::default()
        })
    }

    /// Parse configuration from TOML text, with environment overrides.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let builder = Config::builder()
            .add_source(File::from_str(content, FileFormat::Toml))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Check every value without building anything.
    pub fn validate(&self) -> Result<()> {
        self.medium.derive()?;

        for (name, value) in [
            ("playback.interval", self.playback.interval),
            ("playback.reference_interval", self.playback.reference_interval),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(SimulationError::invalid_config(format!(
                    "{} must be finite and positive, got {}",
                    name, value
                )));
            }
        }

        if self.playback.max_steps_per_frame == Some(0) {
            return Err(SimulationError::invalid_config(
                "playback.max_steps_per_frame must be at least 1",
            ));
        }

        if !self.boundary.manual_value.is_finite() {
            return Err(SimulationError::invalid_config(
                "boundary.manual_value must be finite",
            ));
        }

        for (index, drive) in self.drives.iter().enumerate() {
            BoundaryExpression::parse(&drive.expression).map_err(|e| {
                SimulationError::invalid_config(format!("drives[{}]: {}", index, e))
            })?;
        }

        Ok(())
    }

    /// Build a registry with every drive row applied, plus its scheduler.
    pub fn build(&self) -> Result<(SimulationRegistry, PlaybackScheduler)> {
        self.validate()?;

        let mut registry = SimulationRegistry::from_inputs(self.medium)?;
        registry.set_right_boundary(self.boundary.right);
        registry.set_manual_value(self.boundary.manual_value);
        registry.set_control_mode(self.boundary.control);

        for drive in &self.drives {
            let row = registry.add_row();
            registry.apply_expression(row, &drive.expression)?;
            registry.set_simulated(row, drive.simulate)?;
        }

        let mut scheduler = PlaybackScheduler::with_intervals(
            self.playback.interval,
            self.playback.reference_interval,
        )?
        .with_max_steps_per_frame(self.playback.max_steps_per_frame);
        scheduler.set_paused(self.playback.paused);

        tracing::info!(
            nodes = registry.params().node_count(),
            dt = registry.params().time_step(),
            rows = registry.row_count(),
            right = %registry.right_boundary(),
            "Simulation configured"
        );
        Ok((registry, scheduler))
    }
}
