//! Displacement buffers of one simulated string.

/// Three generations of nodal displacement plus the local clock.
///
/// All three buffers always hold exactly `node_count` values. `next` is
/// scratch space during a step; rotation swaps buffers instead of copying.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveFieldState {
    pub(crate) previous: Vec<f64>,
    pub(crate) current: Vec<f64>,
    pub(crate) next: Vec<f64>,
    pub(crate) time_elapsed: f64,
    pub(crate) generation: u64,
}

impl WaveFieldState {
    /// Zeroed buffers of `node_count` nodes at time `time_elapsed`.
    pub(crate) fn zeroed(node_count: usize, time_elapsed: f64, generation: u64) -> Self {
        Self {
            previous: vec![0.0; node_count],
            current: vec![0.0; node_count],
            next: vec![0.0; node_count],
            time_elapsed,
            generation,
        }
    }

    /// Current displacement, one value per node.
    #[inline]
    pub fn current(&self) -> &[f64] {
        &self.current
    }

    /// Displacement one step earlier.
    #[inline]
    pub fn previous(&self) -> &[f64] {
        &self.previous
    }

    /// Simulated time of `current`.
    #[inline]
    pub fn time_elapsed(&self) -> f64 {
        self.time_elapsed
    }

    /// Parameter generation this field was sized for.
    #[inline]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Number of nodes.
    #[inline]
    pub fn node_count(&self) -> usize {
        self.current.len()
    }

    /// Displacement at `index`.
    pub fn displacement(&self, index: usize) -> Option<f64> {
        self.current.get(index).copied()
    }

    /// Largest absolute displacement.
    pub fn max_displacement(&self) -> f64 {
        self.current.iter().map(|u| u.abs()).fold(0.0, f64::max)
    }

    /// Sum of squared displacements.
    pub fn total_energy(&self) -> f64 {
        self.current.iter().map(|u| u * u).sum()
    }

    /// `current <- next`, `previous <- current`.
    #[inline]
    pub(crate) fn rotate(&mut self) {
        std::mem::swap(&mut self.previous, &mut self.current);
        std::mem::swap(&mut self.current, &mut self.next);
    }
}
