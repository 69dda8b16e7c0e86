//! Boundary conditions: the driven left end and the right-end policy.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::expr::BoundaryExpression;
use super::registry::RowId;
use crate::error::ExpressionError;

/// Treatment of the right end of the string, shared by all instances.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RightBoundary {
    /// Clamped end, `u = 0`.
    #[default]
    Fixed,
    /// Zero-slope end, `du/dx = 0`.
    Free,
    /// First-order Mur outgoing-wave condition.
    Absorbing,
}

impl std::fmt::Display for RightBoundary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RightBoundary::Fixed => write!(f, "fixed"),
            RightBoundary::Free => write!(f, "free"),
            RightBoundary::Absorbing => write!(f, "absorbing"),
        }
    }
}

/// How the primary instance's left end is driven.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ControlMode {
    /// A held value set by dragging the handle.
    Manual,
    /// The superposition of every applied drive expression.
    #[default]
    Function,
}

/// Snapshot of the applied expressions, taken once per physical step.
///
/// Expressions applied after the snapshot take effect on the next step.
#[derive(Debug, Clone, Default)]
pub struct DriveSet {
    expressions: BTreeMap<RowId, BoundaryExpression>,
}

impl DriveSet {
    /// Build a snapshot from `(row, expression)` pairs.
    pub fn new(expressions: impl IntoIterator<Item = (RowId, BoundaryExpression)>) -> Self {
        Self {
            expressions: expressions.into_iter().collect(),
        }
    }

    /// Expression applied to `row`, if any.
    pub fn get(&self, row: RowId) -> Option<&BoundaryExpression> {
        self.expressions.get(&row)
    }

    /// Number of applied expressions.
    pub fn len(&self) -> usize {
        self.expressions.len()
    }

    /// True if nothing is applied.
    pub fn is_empty(&self) -> bool {
        self.expressions.is_empty()
    }

    /// Applied expressions in ascending row order.
    pub fn iter(&self) -> impl Iterator<Item = (RowId, &BoundaryExpression)> {
        self.expressions.iter().map(|(id, expr)| (*id, expr))
    }
}

/// A drive term that failed to evaluate and contributed zero.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpressionFailure {
    /// Row owning the failing expression.
    pub row: RowId,
    /// Why evaluation failed.
    pub error: ExpressionError,
}

/// Left-boundary value plus any terms that were dropped.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundarySample {
    /// Displacement to impose on node 0.
    pub value: f64,
    /// Terms that failed and were counted as zero.
    pub failures: Vec<ExpressionFailure>,
}

impl BoundarySample {
    fn constant(value: f64) -> Self {
        Self {
            value,
            failures: Vec::new(),
        }
    }
}

/// Evaluation policy for an instance's left boundary.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundaryDriver {
    /// Held scalar, independent of time.
    Manual(f64),
    /// Sum of every applied expression. Used by the primary instance.
    Superposition,
    /// The applied expression of a single row. Used by auxiliary instances.
    Single(RowId),
}

impl BoundaryDriver {
    /// Evaluate the left-boundary displacement at `time`.
    ///
    /// Failing terms contribute zero and are returned in the sample; they
    /// never abort the evaluation.
    pub fn evaluate(&self, time: f64, drives: &DriveSet) -> BoundarySample {
        match *self {
            BoundaryDriver::Manual(value) => BoundarySample::constant(value),
            BoundaryDriver::Superposition => {
                let mut sample = BoundarySample::default();
                for (row, expr) in drives.iter() {
                    match expr.evaluate(time) {
                        Ok(v) => sample.value += v,
                        Err(error) => sample.failures.push(ExpressionFailure { row, error }),
                    }
                }
                sample
            }
            BoundaryDriver::Single(row) => match drives.get(row) {
                None => BoundarySample::constant(0.0),
                Some(expr) => match expr.evaluate(time) {
                    Ok(v) => BoundarySample::constant(v),
                    Err(error) => BoundarySample {
                        value: 0.0,
                        failures: vec![ExpressionFailure { row, error }],
                    },
                },
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn drives(items: &[(u64, &str)]) -> DriveSet {
        DriveSet::new(
            items
                .iter()
                .map(|(id, text)| (RowId::from_raw(*id), BoundaryExpression::parse(text).unwrap())),
        )
    }

    #[test]
    fn test_manual_ignores_time_and_drives() {
        let set = drives(&[(1, "100")]);
        let driver = BoundaryDriver::Manual(0.25);
        assert_eq!(driver.evaluate(0.0, &set).value, 0.25);
        assert_eq!(driver.evaluate(42.0, &set).value, 0.25);
    }

    #[test]
    fn test_superposition_sums_all_terms() {
        let set = drives(&[(1, "sin(t)"), (2, "2*t"), (3, "0.5")]);
        for &t in &[0.0, 0.3, 1.7, 12.5] {
            let sample = BoundaryDriver::Superposition.evaluate(t, &set);
            let expected = t.sin() + 2.0 * t + 0.5;
            assert!(
                (sample.value - expected).abs() < 1e-12,
                "t = {}: {} != {}",
                t,
                sample.value,
                expected
            );
            assert!(sample.failures.is_empty());
        }
    }

    #[test]
    fn test_failing_term_contributes_zero() {
        let set = drives(&[(1, "1 / t"), (2, "3")]);
        let sample = BoundaryDriver::Superposition.evaluate(0.0, &set);
        assert_eq!(sample.value, 3.0);
        assert_eq!(sample.failures.len(), 1);
        assert_eq!(sample.failures[0].row, RowId::from_raw(1));

        let sample = BoundaryDriver::Single(RowId::from_raw(1)).evaluate(0.0, &set);
        assert_eq!(sample.value, 0.0);
        assert_eq!(sample.failures.len(), 1);
    }

    #[test]
    fn test_single_uses_only_its_row() {
        let set = drives(&[(1, "t"), (2, "10")]);
        let sample = BoundaryDriver::Single(RowId::from_raw(2)).evaluate(3.0, &set);
        assert_eq!(sample.value, 10.0);

        let sample = BoundaryDriver::Single(RowId::from_raw(9)).evaluate(3.0, &set);
        assert_eq!(sample.value, 0.0);
        assert!(sample.failures.is_empty());
    }

    #[test]
    fn test_empty_superposition_is_zero() {
        let sample = BoundaryDriver::Superposition.evaluate(1.0, &DriveSet::default());
        assert_eq!(sample, BoundarySample::default());
    }
}
