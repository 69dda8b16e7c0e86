//! Explicit leapfrog integrator for the damped string.
//!
//! Solves `u_tt + gamma * u_t = c^2 * u_xx` on `N` nodes.
//!
//! Interior update:
//!
//! ```text
//! u[n+1] = (2 u[n] - (1 + gamma dt/2) u[n-1] + r^2 (u[i+1] - 2 u[i] + u[i-1])) / (1 + gamma dt/2)
//! ```
//!
//! Node 0 takes the boundary drive evaluated at the *next* instant; node
//! `N-1` follows the selected [`RightBoundary`].

use super::boundary::RightBoundary;
use super::field::WaveFieldState;
use super::params::PhysicalParameterSet;
use crate::error::{Result, SimulationError};

/// Stateless stepping rules shared by every instance.
#[derive(Debug, Clone, Copy, Default)]
pub struct WaveIntegrator;

impl WaveIntegrator {
    /// A field at rest at time `time_elapsed`.
    ///
    /// All generations start at zero, then the interior receives one
    /// Taylor half-step, which seeds the three-level scheme for a
    /// zero-velocity start.
    pub fn reset(params: &PhysicalParameterSet, time_elapsed: f64) -> WaveFieldState {
        let mut field = WaveFieldState::zeroed(params.node_count(), time_elapsed, 0);
        Self::seed_half_step(&mut field, params);
        field
    }

    /// A field released from `profile` with zero initial velocity.
    pub fn reset_with_profile(
        params: &PhysicalParameterSet,
        time_elapsed: f64,
        profile: &[f64],
    ) -> Result<WaveFieldState> {
        if profile.len() != params.node_count() {
            return Err(SimulationError::FieldSizeMismatch {
                expected: params.node_count(),
                actual: profile.len(),
            });
        }
        let mut field = WaveFieldState::zeroed(params.node_count(), time_elapsed, 0);
        field.previous.copy_from_slice(profile);
        Self::seed_half_step(&mut field, params);
        Ok(field)
    }

    fn seed_half_step(field: &mut WaveFieldState, params: &PhysicalParameterSet) {
        let half_r2 = 0.5 * params.courant_squared();
        let n = field.previous.len();
        let prev = &field.previous;
        let cur = &mut field.current;

        cur[0] = prev[0];
        cur[n - 1] = prev[n - 1];
        for i in 1..n - 1 {
            cur[i] = prev[i] + half_r2 * (prev[i + 1] - 2.0 * prev[i] + prev[i - 1]);
        }
    }

    /// Advance `field` by exactly one physical step.
    ///
    /// `left_value` is the drive at `time_elapsed + dt`. No clamping is
    /// applied; a Courant number above 1 diverges.
    pub fn step(
        field: &mut WaveFieldState,
        params: &PhysicalParameterSet,
        left_value: f64,
        right: RightBoundary,
    ) -> Result<()> {
        let n = params.node_count();
        if field.node_count() != n {
            return Err(SimulationError::FieldSizeMismatch {
                expected: n,
                actual: field.node_count(),
            });
        }

        let r2 = params.courant_squared();
        let damping = params.damping_factor();

        {
            let prev = &field.previous;
            let cur = &field.current;
            let next = &mut field.next;

            for i in 1..n - 1 {
                let laplacian = cur[i + 1] - 2.0 * cur[i] + cur[i - 1];
                next[i] = (2.0 * cur[i] - damping * prev[i] + r2 * laplacian) / damping;
            }

            next[0] = left_value;

            next[n - 1] = match right {
                RightBoundary::Fixed => 0.0,
                RightBoundary::Free => next[n - 2],
                RightBoundary::Absorbing => {
                    let alpha = params.mur_coefficient();
                    cur[n - 2] + alpha * (next[n - 2] - cur[n - 1])
                }
            };
        }

        field.rotate();
        field.time_elapsed += params.time_step();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::params::ParameterInputs;

    fn params(nodes: usize) -> PhysicalParameterSet {
        ParameterInputs::default()
            .with_node_count(nodes)
            .derive()
            .unwrap()
    }

    #[test]
    fn test_reset_is_at_rest() {
        let p = params(101);
        let field = WaveIntegrator::reset(&p, 0.0);
        assert_eq!(field.node_count(), 101);
        assert!(field.current().iter().all(|&u| u == 0.0));
        assert!(field.previous().iter().all(|&u| u == 0.0));
        assert_eq!(field.time_elapsed(), 0.0);
    }

    #[test]
    fn test_reset_half_step_formula() {
        let p = params(7);
        let profile = [0.0, 0.5, 1.0, 0.25, -0.5, 0.75, 0.0];
        let field = WaveIntegrator::reset_with_profile(&p, 0.0, &profile).unwrap();
        let half_r2 = 0.5 * 0.25;
        for i in 1..6 {
            let expected =
                profile[i] + half_r2 * (profile[i + 1] - 2.0 * profile[i] + profile[i - 1]);
            assert_eq!(field.current()[i], expected, "node {}", i);
        }
        assert_eq!(field.current()[0], 0.0);
        assert_eq!(field.current()[6], 0.0);
        assert_eq!(field.previous(), &profile);
    }

    #[test]
    fn test_reset_with_wrong_profile_length() {
        let p = params(7);
        let err = WaveIntegrator::reset_with_profile(&p, 0.0, &[0.0; 6]).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::FieldSizeMismatch { expected: 7, actual: 6 }
        ));
    }

    #[test]
    fn test_single_step_update_rule() {
        let p = params(5);
        let mut field = WaveIntegrator::reset(&p, 0.0);
        field.previous = vec![0.0, 0.1, 0.2, 0.1, 0.0];
        field.current = vec![0.0, 0.2, 0.4, 0.3, 0.0];

        WaveIntegrator::step(&mut field, &p, 0.7, RightBoundary::Fixed).unwrap();

        let r2 = 0.25;
        let expected_2 = 2.0 * 0.4 - 0.2 + r2 * (0.3 - 0.8 + 0.2);
        assert!((field.current()[2] - expected_2).abs() < 1e-15);
        assert_eq!(field.current()[0], 0.7);
        assert_eq!(field.current()[4], 0.0);
        assert_eq!(field.previous(), &[0.0, 0.2, 0.4, 0.3, 0.0]);
        assert!((field.time_elapsed() - p.time_step()).abs() < 1e-15);
    }

    #[test]
    fn test_damped_update_rule() {
        let p = ParameterInputs::default()
            .with_node_count(5)
            .with_damping(4.0)
            .derive()
            .unwrap();
        let mut field = WaveIntegrator::reset(&p, 0.0);
        field.previous = vec![0.0, 0.1, 0.2, 0.1, 0.0];
        field.current = vec![0.0, 0.2, 0.4, 0.3, 0.0];

        WaveIntegrator::step(&mut field, &p, 0.0, RightBoundary::Fixed).unwrap();

        let d = 1.0 + 4.0 * p.time_step() / 2.0;
        let expected_1 = (2.0 * 0.2 - d * 0.1 + 0.25 * (0.4 - 0.4 + 0.0)) / d;
        assert!((field.current()[1] - expected_1).abs() < 1e-15);
    }

    #[test]
    fn test_free_right_boundary_copies_neighbor() {
        let p = params(5);
        let mut field = WaveIntegrator::reset(&p, 0.0);
        field.current = vec![0.0, 0.0, 0.2, 0.5, 0.5];
        field.previous = field.current.clone();

        WaveIntegrator::step(&mut field, &p, 0.0, RightBoundary::Free).unwrap();
        assert_eq!(field.current()[4], field.current()[3]);
    }

    #[test]
    fn test_absorbing_right_boundary() {
        let p = params(5);
        let mut field = WaveIntegrator::reset(&p, 0.0);
        field.current = vec![0.0, 0.0, 0.2, 0.5, 0.3];
        field.previous = vec![0.0, 0.0, 0.1, 0.4, 0.2];

        let cur = field.current.clone();
        WaveIntegrator::step(&mut field, &p, 0.0, RightBoundary::Absorbing).unwrap();

        let alpha = p.mur_coefficient();
        let expected = cur[3] + alpha * (field.current()[3] - cur[4]);
        assert!((field.current()[4] - expected).abs() < 1e-15);
    }

    #[test]
    fn test_step_rejects_stale_field() {
        let small = params(5);
        let large = params(9);
        let mut field = WaveIntegrator::reset(&small, 0.0);
        let err = WaveIntegrator::step(&mut field, &large, 0.0, RightBoundary::Fixed).unwrap_err();
        assert!(matches!(
            err,
            SimulationError::FieldSizeMismatch { expected: 9, actual: 5 }
        ));
        assert_eq!(field.time_elapsed(), 0.0);
    }

    #[test]
    fn test_rest_stays_at_rest() {
        let p = params(21);
        let mut field = WaveIntegrator::reset(&p, 0.0);
        for _ in 0..100 {
            WaveIntegrator::step(&mut field, &p, 0.0, RightBoundary::Absorbing).unwrap();
        }
        assert_eq!(field.max_displacement(), 0.0);
        assert!((field.time_elapsed() - 100.0 * p.time_step()).abs() < 1e-12);
    }

    #[test]
    fn test_unstable_courant_diverges() {
        let p = ParameterInputs::default()
            .with_node_count(41)
            .with_courant(1.5)
            .derive()
            .unwrap();
        let mut field = WaveIntegrator::reset(&p, 0.0);
        for k in 0..60 {
            let left = if k < 5 { 1.0 } else { 0.0 };
            WaveIntegrator::step(&mut field, &p, left, RightBoundary::Fixed).unwrap();
        }
        assert!(
            field.max_displacement() > 1e3,
            "r > 1 should blow up, max = {}",
            field.max_displacement()
        );
    }
}
