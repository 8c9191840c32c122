//! Progress reporting for long-running stages.

/// Receives the completed fraction of a long-running stage.
///
/// Fractions are in `[0, 1]` and non-decreasing within one stage. Stages
/// always finish with a report of `1.0`.
pub trait Progress {
    /// Reports the completed fraction.
    fn update(&mut self, fraction: f64);
}

/// Discards progress reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl Progress for NoProgress {
    #[inline]
    fn update(&mut self, _fraction: f64) {}
}

impl<F: FnMut(f64)> Progress for F {
    #[inline]
    fn update(&mut self, fraction: f64) {
        self(fraction);
    }
}
