//! Intensity grids and the image buffer contract.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_sign_loss,
    clippy::must_use_candidate
)]

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Accessor contract for a 2-D intensity image.
///
/// Algorithms only read and write pixels through this trait, so any viewer
/// or storage layout can back a calibration run.
pub trait ImageBuffer {
    /// Width in pixels.
    fn width(&self) -> usize;

    /// Height in pixels.
    fn height(&self) -> usize;

    /// Value at `(x, y)`. Callers keep coordinates in bounds.
    fn value(&self, x: usize, y: usize) -> f32;

    /// Overwrites the value at `(x, y)`.
    fn set_value(&mut self, x: usize, y: usize, value: f32);

    /// Largest value in the image (0 for an empty image).
    fn max_value(&self) -> f32 {
        let mut max = f32::MIN;
        let mut seen = false;
        for y in 0..self.height() {
            for x in 0..self.width() {
                max = max.max(self.value(x, y));
                seen = true;
            }
        }
        if seen {
            max
        } else {
            0.0
        }
    }

    /// Returns true if `(x, y)` lies inside the image.
    #[inline]
    fn contains(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.width() && (y as usize) < self.height()
    }
}

/// Dense row-major grid of `f32` samples.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FloatGrid {
    width: usize,
    height: usize,
    data: Vec<f32>,
}

impl FloatGrid {
    /// Creates a zero-filled grid.
    pub fn new(width: usize, height: usize) -> Self {
        Self::filled(width, height, 0.0)
    }

    /// Creates a grid with every sample set to `value`.
    pub fn filled(width: usize, height: usize, value: f32) -> Self {
        Self {
            width,
            height,
            data: vec![value; width * height],
        }
    }

    /// Wraps row-major samples (top row first).
    ///
    /// # Errors
    /// Returns [`Error::DimensionMismatch`] if `data.len() != width * height`.
    pub fn from_vec(width: usize, height: usize, data: Vec<f32>) -> Result<Self> {
        if data.len() != width * height {
            return Err(Error::DimensionMismatch {
                expected: (width, height),
                found: (data.len(), 1),
            });
        }
        Ok(Self {
            width,
            height,
            data,
        })
    }

    /// Copies any image buffer into a dense grid.
    pub fn from_image<B: ImageBuffer + ?Sized>(image: &B) -> Self {
        let mut grid = Self::new(image.width(), image.height());
        for y in 0..image.height() {
            for x in 0..image.width() {
                grid.data[y * grid.width + x] = image.value(x, y);
            }
        }
        grid
    }

    /// Row-major samples.
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Mutable row-major samples.
    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut self.data
    }

    /// Smallest sample (0 for an empty grid).
    pub fn min_value(&self) -> f32 {
        self.data.iter().copied().reduce(f32::min).unwrap_or(0.0)
    }

    /// Consumes the grid, returning its samples.
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    #[inline]
    fn index(&self, x: usize, y: usize) -> usize {
        debug_assert!(x < self.width && y < self.height);
        y * self.width + x
    }
}

impl ImageBuffer for FloatGrid {
    #[inline]
    fn width(&self) -> usize {
        self.width
    }

    #[inline]
    fn height(&self) -> usize {
        self.height
    }

    #[inline]
    fn value(&self, x: usize, y: usize) -> f32 {
        self.data[self.index(x, y)]
    }

    #[inline]
    fn set_value(&mut self, x: usize, y: usize, value: f32) {
        let idx = self.index(x, y);
        self.data[idx] = value;
    }

    fn max_value(&self) -> f32 {
        self.data.iter().copied().reduce(f32::max).unwrap_or(0.0)
    }
}

/// Rectangular region of interest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Roi {
    pub x: usize,
    pub y: usize,
    pub width: usize,
    pub height: usize,
}

impl Roi {
    /// Creates a region.
    pub fn new(x: usize, y: usize, width: usize, height: usize) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    /// Region covering a whole `width x height` grid.
    pub fn full(width: usize, height: usize) -> Self {
        Self::new(0, 0, width, height)
    }

    /// Intersection with a `width x height` grid.
    pub fn clamp_to(&self, width: usize, height: usize) -> Self {
        let x = self.x.min(width);
        let y = self.y.min(height);
        Self {
            x,
            y,
            width: self.width.min(width - x),
            height: self.height.min(height - y),
        }
    }

    /// Returns true if `(x, y)` lies inside the region.
    pub fn contains(&self, x: usize, y: usize) -> bool {
        x >= self.x && y >= self.y && x < self.x + self.width && y < self.y + self.height
    }
}

/// Per-pixel record of the kernel size last applied by the radial filter.
///
/// Zero means the pixel was never filtered. Peak detection sizes its search
/// disc from this map so localized re-filtering at a new scale carries over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RadiusMap {
    width: usize,
    height: usize,
    radii: Vec<u32>,
    largest: u32,
}

impl RadiusMap {
    /// Creates an all-zero map.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            width,
            height,
            radii: vec![0; width * height],
            largest: 0,
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

    /// Kernel size recorded at `(x, y)`.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> u32 {
        self.radii[y * self.width + x]
    }

    /// Records `radius` at `(x, y)`.
    #[inline]
    pub fn set(&mut self, x: usize, y: usize, radius: u32) {
        self.radii[y * self.width + x] = radius;
        self.largest = self.largest.max(radius);
    }

    /// Records `radius` on every pixel of `roi`.
    pub fn fill(&mut self, roi: Roi, radius: u32) {
        let roi = roi.clamp_to(self.width, self.height);
        for y in roi.y..roi.y + roi.height {
            let row = y * self.width;
            self.radii[row + roi.x..row + roi.x + roi.width].fill(radius);
        }
        if roi.width > 0 && roi.height > 0 {
            self.largest = self.largest.max(radius);
        }
    }

    /// Notes that a pass with `radius` ran, even if it covered no pixels.
    pub fn note_pass(&mut self, radius: u32) {
        self.largest = self.largest.max(radius);
    }

    /// Largest kernel size ever applied (0 if filtering never ran).
    pub fn largest(&self) -> u32 {
        self.largest
    }

    /// Returns true if any pixel was filtered.
    pub fn any_filtered(&self) -> bool {
        self.radii.iter().any(|&r| r != 0)
    }

    /// Clears the per-pixel records. [`largest`](Self::largest) keeps the
    /// largest size ever applied.
    pub fn reset(&mut self) {
        self.radii.fill(0);
    }
}
