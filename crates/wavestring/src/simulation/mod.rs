//! Simulation core for the driven 1D string.

mod boundary;
mod expr;
mod field;
mod integrator;
mod params;
mod registry;
mod scheduler;

pub use boundary::{
    BoundaryDriver, BoundarySample, ControlMode, DriveSet, ExpressionFailure, RightBoundary,
};
pub use expr::BoundaryExpression;
pub use field::WaveFieldState;
pub use integrator::WaveIntegrator;
pub use params::{ParameterInputs, PhysicalParameterSet};
pub use registry::{InstanceId, RowId, SimulationInstance, SimulationRegistry, StepReport};
pub use scheduler::{FrameObserver, FrameReport, PlaybackScheduler};
