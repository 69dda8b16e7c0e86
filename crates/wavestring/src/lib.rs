//! # WaveString
//!
//! Real-time simulation of a damped, driven string.
//!
//! A single physical medium is shared by a *primary* string and any number of
//! *auxiliary* comparison strings. Each string is integrated with an explicit
//! leapfrog finite-difference scheme for
//!
//! ```text
//! u_tt + gamma * u_t = c^2 * u_xx,    c = sqrt(T / mu)
//! ```
//!
//! with the left end driven by user-supplied time expressions and the right
//! end fixed, free or absorbing.
//!
//! ## Architecture
//!
//! ```text
//! ParameterInputs -> PhysicalParameterSet -> WaveIntegrator -> WaveFieldState
//!                                                  ^
//!   drive rows -> BoundaryExpression -> DriveSet -> BoundaryDriver
//!
//! PlaybackScheduler --(fixed dt)--> SimulationRegistry::step_all --> FrameObserver
//! ```
//!
//! The primary string is driven by the sum of every applied expression; each
//! auxiliary string is driven by its own row's expression alone, so the
//! primary shows the superposition of the auxiliaries.
//!
//! ## Example
//!
//! ```
//! use std::time::Duration;
//! use wavestring::prelude::*;
//!
//! let mut registry = SimulationRegistry::from_inputs(ParameterInputs::default())?;
//! let row = registry.add_row();
//! registry.apply_expression(row, "0.1 * sin(2 * pi * t)")?;
//! registry.set_simulated(row, true)?;
//!
//! let mut scheduler = PlaybackScheduler::new();
//! let report = scheduler.advance(Duration::from_millis(16), &mut registry)?;
//! assert_eq!(report.steps, 3);
//! # Ok::<(), wavestring::error::SimulationError>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod error;
pub mod export;
pub mod simulation;

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::config::{BoundaryConfig, DriveConfig, PlaybackConfig, SimulationConfig};
    pub use crate::error::{ExpressionError, Result, SimulationError};
    pub use crate::export::write_profile;
    pub use crate::simulation::{
        BoundaryDriver, BoundaryExpression, BoundarySample, ControlMode, DriveSet,
        ExpressionFailure, FrameObserver, FrameReport, InstanceId, ParameterInputs,
        PhysicalParameterSet, PlaybackScheduler, RightBoundary, RowId, SimulationInstance,
        SimulationRegistry, StepReport, WaveFieldState, WaveIntegrator,
    };
}

pub use error::{Result, SimulationError};
pub use simulation::{PhysicalParameterSet, PlaybackScheduler, SimulationRegistry};
