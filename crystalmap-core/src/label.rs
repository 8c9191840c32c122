//! Crystal lookup table produced by tessellation.
#![allow(clippy::cast_precision_loss, clippy::must_use_candidate)]

use crate::grid::FloatGrid;

/// Label of pixels that belong to no interior crystal.
pub const OUTSIDE_DETECTOR: i32 = 67_108_864;

/// Dense per-pixel crystal labels.
///
/// Every pixel starts at [`OUTSIDE_DETECTOR`] and unclaimed. A tessellation
/// run produces a fresh grid; grids are never patched incrementally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelGrid {
    width: usize,
    height: usize,
    labels: Vec<i32>,
    claimed: Vec<bool>,
}

impl LabelGrid {
    /// Creates an unclaimed grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            labels: vec![OUTSIDE_DETECTOR; width * height],
            claimed: vec![false; width * height],
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Label at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> i32 {
        self.labels[y * self.width + x]
    }

    /// Claims `(x, y)` for `label`.
    #[inline]
    pub fn claim(&mut self, x: usize, y: usize, label: i32) {
        let idx = y * self.width + x;
        self.labels[idx] = label;
        self.claimed[idx] = true;
    }

    /// Returns true if some seed claimed `(x, y)`.
    #[inline]
    pub fn is_claimed(&self, x: usize, y: usize) -> bool {
        self.claimed[y * self.width + x]
    }

    /// Row-major labels.
    pub fn as_slice(&self) -> &[i32] {
        &self.labels
    }

    /// Number of pixels carrying `label`.
    pub fn count(&self, label: i32) -> usize {
        self.labels.iter().filter(|&&l| l == label).count()
    }

    /// Number of pixels no seed claimed.
    pub fn unclaimed_count(&self) -> usize {
        self.claimed.iter().filter(|&&c| !c).count()
    }

    /// Labels as float samples for image export. Exact for every crystal id
    /// below 2^24 and for [`OUTSIDE_DETECTOR`].
    pub fn to_float_grid(&self) -> FloatGrid {
        let mut grid = FloatGrid::new(self.width, self.height);
        for (dst, &label) in grid.as_mut_slice().iter_mut().zip(&self.labels) {
            *dst = label as f32;
        }
        grid
    }
}
