//! Radial sinc filter that flattens the flood-image background.
//!
//! The kernel is a rotated `sin(x)/x` lobe whose weights are shifted down by
//! the mean weight (plus `threshold_pct` percent), so a uniform region
//! convolves to roughly zero while compact peaks of about one kernel width
//! stand out. Negative responses are clamped to zero.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

use crystalmap_core::{
    Error, FilterConfig, FloatGrid, ImageBuffer, Progress, RadiusMap, Result, Roi,
};
use rayon::prelude::*;
use std::f64::consts::PI;

/// Columns convolved between progress reports.
const COLUMNS_PER_REPORT: usize = 16;

/// Square sinc kernel with the background offset already subtracted.
#[derive(Debug, Clone, PartialEq)]
pub struct SincKernel {
    half_width: usize,
    weights: Vec<f64>,
}

impl SincKernel {
    /// Builds the kernel for a `peak_size` wide filter.
    ///
    /// The raw weight at offset `(i, j)` is `sinc(pi * d / l)` with
    /// `d = sqrt(i^2 + j^2)` and `l = (peak_size - 1) / 2`, and 1 at the
    /// center. Every weight is then lowered by
    /// `mean * (threshold_pct / 100 + 1)`.
    pub fn new(config: &FilterConfig) -> Result<Self> {
        config.validate()?;
        let l = config.half_width();
        let side = 2 * l + 1;
        let scale = l as f64;

        let mut weights = Vec::with_capacity(side * side);
        let mut sum = 0.0;
        for i in 0..side {
            let di = i as f64 - scale;
            for j in 0..side {
                let dj = j as f64 - scale;
                let d = (di * di + dj * dj).sqrt();
                let w = if d == 0.0 {
                    1.0
                } else {
                    let arg = PI * d / scale;
                    arg.sin() / arg
                };
                weights.push(w);
                sum += w;
            }
        }

        let mean = sum / (side * side) as f64;
        let normal = mean * (config.threshold_pct / 100.0 + 1.0);
        for w in &mut weights {
            *w -= normal;
        }

        Ok(Self {
            half_width: l,
            weights,
        })
    }

    /// Half-width `l`; the kernel is `2l + 1` pixels on a side.
    pub fn half_width(&self) -> usize {
        self.half_width
    }

    /// Side length `2l + 1`.
    pub fn side(&self) -> usize {
        2 * self.half_width + 1
    }

    /// Weight at kernel cell `(i, j)`, where `i` runs along x.
    #[inline]
    pub fn weight(&self, i: usize, j: usize) -> f64 {
        self.weights[i * self.side() + j]
    }

    /// Sum of all adjusted weights.
    pub fn sum(&self) -> f64 {
        self.weights.iter().sum()
    }

    /// Kernel response centered on `(x, y)`. The footprint must lie in `image`.
    fn respond<B: ImageBuffer + ?Sized>(&self, image: &B, x: usize, y: usize) -> f32 {
        let l = self.half_width;
        let side = self.side();
        let mut acc = 0.0f64;
        for i in 0..side {
            let sx = x + i - l;
            let row = &self.weights[i * side..(i + 1) * side];
            for (j, &w) in row.iter().enumerate() {
                acc += f64::from(image.value(sx, y + j - l)) * w;
            }
        }
        acc.max(0.0) as f32
    }
}

/// Radial filter stage.
#[derive(Debug, Clone, Default)]
pub struct RadialFilter {
    config: FilterConfig,
}

impl RadialFilter {
    /// Create with custom configuration.
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &FilterConfig {
        &self.config
    }

    /// Filters `raw` over `roi` (whole image if `None`) into a new grid.
    ///
    /// Pixels that are not convolved keep their raw value.
    pub fn apply<B>(
        &self,
        raw: &B,
        roi: Option<Roi>,
        radii: &mut RadiusMap,
        progress: &mut dyn Progress,
    ) -> Result<FloatGrid>
    where
        B: ImageBuffer + Sync + ?Sized,
    {
        let mut out = FloatGrid::from_image(raw);
        self.apply_into(raw, &mut out, roi, radii, progress)?;
        Ok(out)
    }

    /// Filters `raw` over `roi`, writing into `target`.
    ///
    /// Only pixels whose whole kernel footprint lies inside `roi` are
    /// overwritten; everything else in `target` is left as it was. Each
    /// convolved pixel records the kernel size in `radii`. Returns the number
    /// of pixels convolved.
    pub fn apply_into<B, T>(
        &self,
        raw: &B,
        target: &mut T,
        roi: Option<Roi>,
        radii: &mut RadiusMap,
        progress: &mut dyn Progress,
    ) -> Result<usize>
    where
        B: ImageBuffer + Sync + ?Sized,
        T: ImageBuffer + ?Sized,
    {
        let (width, height) = (raw.width(), raw.height());
        for found in [
            (target.width(), target.height()),
            (radii.width(), radii.height()),
        ] {
            if found != (width, height) {
                return Err(Error::DimensionMismatch {
                    expected: (width, height),
                    found,
                });
            }
        }

        let kernel = SincKernel::new(&self.config)?;
        let l = kernel.half_width();
        let roi = roi.unwrap_or(Roi::full(width, height)).clamp_to(width, height);
        radii.note_pass(self.config.peak_size);

        let x_range = roi.x + l..(roi.x + roi.width).saturating_sub(l);
        let y_range = roi.y + l..(roi.y + roi.height).saturating_sub(l);
        if x_range.is_empty() || y_range.is_empty() {
            progress.update(1.0);
            return Ok(0);
        }

        log::debug!(
            "radial filter: size={} threshold={}% roi={:?} mean-adjusted sum={:.4}",
            self.config.peak_size,
            self.config.threshold_pct,
            roi,
            kernel.sum()
        );

        let columns: Vec<usize> = x_range.collect();
        let total = columns.len();
        let mut done = 0usize;
        for chunk in columns.chunks(COLUMNS_PER_REPORT) {
            let respond_column = |&x: &usize| -> Vec<f32> {
                y_range
                    .clone()
                    .map(|y| kernel.respond(raw, x, y))
                    .collect()
            };
            let values: Vec<Vec<f32>> = if self.config.parallel {
                chunk.par_iter().map(respond_column).collect()
            } else {
                chunk.iter().map(respond_column).collect()
            };

            for (&x, column) in chunk.iter().zip(&values) {
                for (y, &v) in y_range.clone().zip(column) {
                    target.set_value(x, y, v);
                    radii.set(x, y, self.config.peak_size);
                }
            }

            done += chunk.len();
            progress.update(done as f64 / total as f64);
        }

        Ok(total * y_range.len())
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;
    use approx::assert_abs_diff_eq;
    use crystalmap_core::NoProgress;

    #[test]
    fn test_kernel_shape() {
        let kernel = SincKernel::new(&FilterConfig::default().with_peak_size(13)).unwrap();
        assert_eq!(kernel.half_width(), 6);
        assert_eq!(kernel.side(), 13);
        // Center is the largest weight and the kernel is radially symmetric.
        let center = kernel.weight(6, 6);
        assert!(center > kernel.weight(6, 7));
        assert_abs_diff_eq!(kernel.weight(0, 6), kernel.weight(6, 0), epsilon = 1e-12);
        assert_abs_diff_eq!(kernel.weight(2, 3), kernel.weight(10, 9), epsilon = 1e-12);
    }

    #[test]
    fn test_zero_threshold_sums_to_zero() {
        let kernel = SincKernel::new(&FilterConfig::default().with_peak_size(9)).unwrap();
        assert_abs_diff_eq!(kernel.sum(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn test_threshold_lowers_sum() {
        let kernel = SincKernel::new(
            &FilterConfig::default()
                .with_peak_size(9)
                .with_threshold_pct(10.0),
        )
        .unwrap();
        assert!(kernel.sum() < 0.0);
    }

    #[test]
    fn test_rejects_tiny_kernel() {
        assert!(SincKernel::new(&FilterConfig::default().with_peak_size(1)).is_err());
    }

    #[test]
    fn test_pixels_outside_roi_copied() {
        let mut raw = FloatGrid::filled(30, 30, 5.0);
        raw.set_value(0, 0, 42.0);
        let mut radii = RadiusMap::new(30, 30);
        let filter = RadialFilter::new(FilterConfig::default().with_peak_size(5));
        let out = filter
            .apply(&raw, Some(Roi::new(10, 10, 10, 10)), &mut radii, &mut NoProgress)
            .unwrap();

        assert_eq!(out.value(0, 0), 42.0);
        assert_eq!(out.value(29, 29), 5.0);
        assert_eq!(radii.get(0, 0), 0);
        // l = 2: convolved block is x,y in 12..18
        assert_eq!(radii.get(12, 12), 5);
        assert_eq!(radii.get(17, 17), 5);
        assert_eq!(radii.get(18, 12), 0);
        assert_eq!(radii.largest(), 5);
    }

    #[test]
    fn test_parallel_matches_sequential() {
        let mut raw = FloatGrid::new(40, 40);
        for y in 0..40 {
            for x in 0..40 {
                raw.set_value(x, y, ((x * 7 + y * 13) % 17) as f32);
            }
        }
        let seq = RadialFilter::new(FilterConfig::default().with_peak_size(7));
        let par = RadialFilter::new(FilterConfig::default().with_peak_size(7).with_parallel(true));

        let mut radii_a = RadiusMap::new(40, 40);
        let mut radii_b = RadiusMap::new(40, 40);
        let a = seq.apply(&raw, None, &mut radii_a, &mut NoProgress).unwrap();
        let b = par.apply(&raw, None, &mut radii_b, &mut NoProgress).unwrap();
        assert_eq!(a, b);
        assert_eq!(radii_a, radii_b);
    }

    #[test]
    fn test_progress_reaches_one() {
        let raw = FloatGrid::filled(50, 20, 1.0);
        let mut radii = RadiusMap::new(50, 20);
        let mut last = 0.0;
        let mut reports = 0;
        RadialFilter::default()
            .apply(&raw, None, &mut radii, &mut |f: f64| {
                assert!(f >= last);
                last = f;
                reports += 1;
            })
            .unwrap();
        assert!(reports >= 2);
        assert_abs_diff_eq!(last, 1.0);
    }

    #[test]
    fn test_dimension_mismatch() {
        let raw = FloatGrid::new(10, 10);
        let mut target = FloatGrid::new(9, 10);
        let mut radii = RadiusMap::new(10, 10);
        let result = RadialFilter::default().apply_into(
            &raw,
            &mut target,
            None,
            &mut radii,
            &mut NoProgress,
        );
        assert!(matches!(result, Err(Error::DimensionMismatch { .. })));
    }
}
