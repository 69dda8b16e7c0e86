//! Error types for the string simulation.

use thiserror::Error;

use crate::simulation::RowId;

/// Result type for simulation operations.
pub type Result<T> = std::result::Result<T, SimulationError>;

/// Errors raised by parameter derivation, registry operations and configuration.
#[derive(Error, Debug)]
pub enum SimulationError {
    /// A physical input is outside its valid range.
    #[error("Invalid parameter `{name}` = {value}: {reason}")]
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Offending value.
        value: f64,
        /// Why the value was rejected.
        reason: &'static str,
    },

    /// Fewer than three nodes leaves no interior to integrate.
    #[error("Invalid node count {0}: at least 3 nodes are required")]
    InvalidNodeCount(usize),

    /// The row handle does not belong to this registry.
    #[error("Unknown drive row: {0}")]
    UnknownRow(RowId),

    /// A field buffer does not match the node count of the parameter set.
    #[error("Field size mismatch: expected {expected} nodes, got {actual}")]
    FieldSizeMismatch {
        /// Node count of the parameter set.
        expected: usize,
        /// Length of the offending buffer.
        actual: usize,
    },

    /// A boundary expression could not be compiled.
    #[error("Boundary expression error: {0}")]
    Expression(#[from] ExpressionError),

    /// Configuration loading failed.
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    /// Configuration values are inconsistent.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Writing output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Writing CSV output failed.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

impl SimulationError {
    /// Create an invalid parameter error.
    pub fn invalid_parameter(name: &'static str, value: f64, reason: &'static str) -> Self {
        Self::InvalidParameter {
            name,
            value,
            reason,
        }
    }

    /// Create an invalid configuration error.
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// True for errors that originate from the physical inputs.
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::InvalidParameter { .. } | Self::InvalidNodeCount(_)
        )
    }
}

/// Errors raised while compiling or evaluating a boundary expression.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    /// The expression text is empty.
    #[error("Expression is empty")]
    Empty,

    /// The text is not a valid expression.
    #[error("Syntax error at line {line}, column {column}: {message}")]
    Syntax {
        /// Parser message.
        message: String,
        /// One-based line, 0 when unknown.
        line: usize,
        /// One-based column, 0 when unknown.
        column: usize,
    },

    /// Parentheses or operators nested beyond the engine limit.
    #[error("Expression nested deeper than {limit} levels")]
    TooDeep {
        /// Maximum nesting depth.
        limit: usize,
    },

    /// A variable other than `t`, `pi` or `e`.
    #[error("Unknown identifier `{0}`")]
    UnknownIdentifier(String),

    /// No function with this name and argument types.
    #[error("Unknown function {0}")]
    UnknownFunction(String),

    /// The expression yields something other than a number.
    #[error("Expression yields {0}, not a number")]
    NotANumber(String),

    /// Evaluation aborted, e.g. on integer overflow or the operation limit.
    #[error("Evaluation failed: {0}")]
    Evaluation(String),

    /// Evaluation produced NaN or an infinity.
    #[error("Expression evaluated to {value} at t = {time}")]
    NonFinite {
        /// Evaluation time.
        time: f64,
        /// The non-finite result.
        value: f64,
    },
}
