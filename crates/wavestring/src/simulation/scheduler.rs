//! Fixed-step playback over a variable frame rate.
//!
//! Wall-clock frame time accumulates; every time the accumulator covers one
//! effective step (`dt * speed_factor`) the registry advances one physical
//! step. Rendering happens once per frame, paused or not.

use std::time::Duration;

use super::registry::SimulationRegistry;
use crate::error::{Result, SimulationError};

/// Summary of one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FrameReport {
    /// Physical steps performed.
    pub steps: u64,
    /// Step slots consumed without stepping, while paused or over the cap.
    pub skipped: u64,
    /// Drive terms that failed during this frame.
    pub expression_failures: usize,
    /// Registry time after the frame.
    pub simulated_time: f64,
}

/// Receives one render pass per frame.
pub trait FrameObserver {
    /// Called after the frame's steps, with read-only access to every instance.
    fn on_frame(&mut self, registry: &SimulationRegistry, report: &FrameReport);
}

impl<F> FrameObserver for F
where
    F: FnMut(&SimulationRegistry, &FrameReport),
{
    fn on_frame(&mut self, registry: &SimulationRegistry, report: &FrameReport) {
        self(registry, report)
    }
}

/// Accumulator-based playback controller.
#[derive(Debug, Clone)]
pub struct PlaybackScheduler {
    /// Unconsumed wall-clock time in seconds.
    accumulator: f64,
    /// Whether stepping is suspended.
    paused: bool,
    /// User-chosen playback interval.
    interval: f64,
    /// Interval at which playback runs in real time.
    reference_interval: f64,
    /// Upper bound on steps per frame; excess backlog is dropped.
    max_steps_per_frame: Option<u64>,
}

impl Default for PlaybackScheduler {
    fn default() -> Self {
        Self {
            accumulator: 0.0,
            paused: false,
            interval: 1.0,
            reference_interval: 1.0,
            max_steps_per_frame: None,
        }
    }
}

fn check_interval(name: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() && value > 0.0 {
        Ok(value)
    } else {
        Err(SimulationError::invalid_parameter(
            name,
            value,
            "must be finite and positive",
        ))
    }
}

impl PlaybackScheduler {
    /// Real-time playback, not paused.
    pub fn new() -> Self {
        Self::default()
    }

    /// Playback at `interval / reference_interval` times the real-time step.
    pub fn with_intervals(interval: f64, reference_interval: f64) -> Result<Self> {
        Ok(Self {
            interval: check_interval("interval", interval)?,
            reference_interval: check_interval("reference_interval", reference_interval)?,
            ..Self::default()
        })
    }

    /// Cap the number of physical steps per frame.
    pub fn with_max_steps_per_frame(mut self, cap: Option<u64>) -> Self {
        self.max_steps_per_frame = cap;
        self
    }

    /// Ratio of the playback interval to the reference interval.
    ///
    /// Larger values mean more wall-clock time per physical step.
    pub fn speed_factor(&self) -> f64 {
        self.interval / self.reference_interval
    }

    /// Playback interval.
    pub fn interval(&self) -> f64 {
        self.interval
    }

    /// Change the playback interval.
    pub fn set_interval(&mut self, interval: f64) -> Result<()> {
        self.interval = check_interval("interval", interval)?;
        Ok(())
    }

    /// True if stepping is suspended.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Suspend or resume stepping.
    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    /// Flip the pause flag and return the new state.
    pub fn toggle_pause(&mut self) -> bool {
        self.paused = !self.paused;
        self.paused
    }

    /// Unconsumed wall-clock time in seconds.
    pub fn accumulator(&self) -> f64 {
        self.accumulator
    }

    /// Discard any unconsumed time.
    pub fn reset_accumulator(&mut self) {
        self.accumulator = 0.0;
    }

    /// Advance by one frame of `frame_duration` wall-clock time.
    pub fn advance(
        &mut self,
        frame_duration: Duration,
        registry: &mut SimulationRegistry,
    ) -> Result<FrameReport> {
        let effective_step = registry.params().time_step() * self.speed_factor();
        let mut report = FrameReport::default();
        self.accumulator += frame_duration.as_secs_f64();

        while self.accumulator >= effective_step {
            if let Some(cap) = self.max_steps_per_frame {
                if report.steps + report.skipped >= cap {
                    let dropped = (self.accumulator / effective_step).floor();
                    self.accumulator -= dropped * effective_step;
                    report.skipped += dropped as u64;
                    tracing::warn!(
                        dropped = dropped as u64,
                        cap,
                        "Frame step budget exhausted, dropping backlog"
                    );
                    break;
                }
            }

            if self.paused {
                report.skipped += 1;
            } else {
                let step = registry.step_all()?;
                report.steps += 1;
                report.expression_failures += step.expression_failures;
            }
            self.accumulator -= effective_step;
        }

        report.simulated_time = registry.global_time();
        Ok(report)
    }

    /// Advance by one frame and issue exactly one render pass.
    pub fn advance_with<O: FrameObserver + ?Sized>(
        &mut self,
        frame_duration: Duration,
        registry: &mut SimulationRegistry,
        observer: &mut O,
    ) -> Result<FrameReport> {
        let report = self.advance(frame_duration, registry)?;
        observer.on_frame(registry, &report);
        Ok(report)
    }

    /// Perform one physical step regardless of pause state.
    pub fn step_once(&mut self, registry: &mut SimulationRegistry) -> Result<FrameReport> {
        let step = registry.step_all()?;
        Ok(FrameReport {
            steps: 1,
            skipped: 0,
            expression_failures: step.expression_failures,
            simulated_time: registry.global_time(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulation::params::ParameterInputs;

    /// dt = 0.125 exactly, so accumulator arithmetic is exact.
    fn registry() -> SimulationRegistry {
        SimulationRegistry::from_inputs(ParameterInputs::default().with_node_count(5)).unwrap()
    }

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn test_steps_follow_accumulated_time() {
        let mut reg = registry();
        let mut sched = PlaybackScheduler::new();
        assert_eq!(reg.params().time_step(), 0.125);

        let report = sched.advance(secs(0.3), &mut reg).unwrap();
        assert_eq!(report.steps, 2);
        assert!((sched.accumulator() - 0.05).abs() < 1e-12);

        let report = sched.advance(secs(0.1), &mut reg).unwrap();
        assert_eq!(report.steps, 1);
        assert_eq!(report.simulated_time, 0.375);
    }

    #[test]
    fn test_short_frames_accumulate() {
        let mut reg = registry();
        let mut sched = PlaybackScheduler::new();
        let mut total = 0;
        for _ in 0..8 {
            total += sched.advance(secs(0.0625), &mut reg).unwrap().steps;
        }
        assert_eq!(total, 4);
        assert_eq!(reg.global_time(), 0.5);
    }

    #[test]
    fn test_speed_factor_scales_step_rate() {
        let mut reg = registry();
        let mut sched = PlaybackScheduler::with_intervals(2.0, 1.0).unwrap();
        assert_eq!(sched.speed_factor(), 2.0);
        let report = sched.advance(secs(1.0), &mut reg).unwrap();
        assert_eq!(report.steps, 4);

        sched.set_interval(0.5).unwrap();
        let report = sched.advance(secs(1.0), &mut reg).unwrap();
        assert_eq!(report.steps, 16);
    }

    #[test]
    fn test_paused_consumes_time_without_stepping() {
        let mut reg = registry();
        let mut sched = PlaybackScheduler::new();
        sched.set_paused(true);

        let report = sched.advance(secs(0.5), &mut reg).unwrap();
        assert_eq!(report.steps, 0);
        assert_eq!(report.skipped, 4);
        assert_eq!(sched.accumulator(), 0.0);
        assert_eq!(reg.global_time(), 0.0);

        assert!(!sched.toggle_pause());
        let report = sched.advance(secs(0.125), &mut reg).unwrap();
        assert_eq!(report.steps, 1);
    }

    #[test]
    fn test_render_once_per_frame() {
        let mut reg = registry();
        let mut sched = PlaybackScheduler::new();
        let mut renders = Vec::new();
        let mut observer = |r: &SimulationRegistry, report: &FrameReport| {
            renders.push((r.global_time(), report.steps));
        };

        sched.advance_with(secs(0.5), &mut reg, &mut observer).unwrap();
        sched.advance_with(secs(0.01), &mut reg, &mut observer).unwrap();
        sched.set_paused(true);
        sched.advance_with(secs(0.5), &mut reg, &mut observer).unwrap();

        assert_eq!(renders, vec![(0.5, 4), (0.5, 0), (0.5, 0)]);
    }

    #[test]
    fn test_step_once_ignores_pause() {
        let mut reg = registry();
        let mut sched = PlaybackScheduler::new();
        sched.set_paused(true);
        let report = sched.step_once(&mut reg).unwrap();
        assert_eq!(report.steps, 1);
        assert_eq!(reg.global_time(), 0.125);
        assert_eq!(sched.accumulator(), 0.0);
    }

    #[test]
    fn test_step_cap_drops_backlog() {
        let mut reg = registry();
        let mut sched = PlaybackScheduler::new().with_max_steps_per_frame(Some(3));
        let report = sched.advance(secs(1.0), &mut reg).unwrap();
        assert_eq!(report.steps, 3);
        assert_eq!(report.skipped, 5);
        assert_eq!(sched.accumulator(), 0.0);
        assert_eq!(reg.global_time(), 0.375);
    }

    #[test]
    fn test_invalid_intervals_rejected() {
        assert!(PlaybackScheduler::with_intervals(0.0, 1.0).is_err());
        assert!(PlaybackScheduler::with_intervals(1.0, f64::NAN).is_err());
        let mut sched = PlaybackScheduler::new();
        assert!(sched.set_interval(-1.0).is_err());
        assert_eq!(sched.interval(), 1.0);
    }

    #[test]
    fn test_reset_accumulator() {
        let mut reg = registry();
        let mut sched = PlaybackScheduler::new();
        sched.advance(secs(0.1), &mut reg).unwrap();
        assert!(sched.accumulator() > 0.0);
        sched.reset_accumulator();
        assert_eq!(sched.accumulator(), 0.0);
    }
}
