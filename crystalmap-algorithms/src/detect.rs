//! Local-maximum peak detection on a filtered flood image.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

use crystalmap_core::{DetectionConfig, Error, ImageBuffer, PeakStore, RadiusMap, Result};

/// Half-extent in y of a disc of radius `size` at column offset `dx`.
#[inline]
pub(crate) fn disc_half_height(size: i64, dx: i64) -> i64 {
    (((size * size - dx * dx) as f64).sqrt() + 0.5).floor() as i64
}

/// Peak detection stage.
#[derive(Debug, Clone, Default)]
pub struct PeakDetector {
    config: DetectionConfig,
}

impl PeakDetector {
    /// Create with custom configuration.
    pub fn new(config: DetectionConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }

    /// Scans `image` for strict local maxima and appends them to `store`.
    ///
    /// Only pixels with a recorded filter size are examined; the search disc
    /// has radius `size / 2`. A neighbor with an equal or higher value
    /// disqualifies the center. Survivors must also reach
    /// `global_max * peak_cutoff`. Pixels within the largest filter size of
    /// the border are skipped. Peaks are appended x-major, y-minor and left
    /// unassigned. Returns the number of peaks added.
    pub fn detect<B: ImageBuffer + ?Sized>(
        &self,
        image: &B,
        radii: &RadiusMap,
        global_max: f32,
        store: &mut PeakStore,
    ) -> Result<usize> {
        self.config.validate()?;
        let (width, height) = (image.width(), image.height());
        if (radii.width(), radii.height()) != (width, height) {
            return Err(Error::DimensionMismatch {
                expected: (width, height),
                found: (radii.width(), radii.height()),
            });
        }

        let margin = radii.largest() as usize;
        let cutoff = f64::from(global_max) * self.config.peak_cutoff;
        let before = store.len();

        for x in margin..width.saturating_sub(margin) {
            for y in margin..height.saturating_sub(margin) {
                let size = i64::from(radii.get(x, y) / 2);
                if size == 0 {
                    continue;
                }
                let center = image.value(x, y);
                if f64::from(center) >= cutoff && is_strict_maximum(image, x, y, size, center) {
                    store.add(x as i32, y as i32);
                }
            }
        }

        let added = store.len() - before;
        log::info!(
            "found {added} peaks (cutoff {:.3} of max {global_max})",
            self.config.peak_cutoff
        );
        Ok(added)
    }
}

fn is_strict_maximum<B: ImageBuffer + ?Sized>(
    image: &B,
    x: usize,
    y: usize,
    size: i64,
    center: f32,
) -> bool {
    let (cx, cy) = (x as i64, y as i64);
    for dx in -size..=size {
        let half = disc_half_height(size, dx);
        for dy in -half..=half {
            if dx == 0 && dy == 0 {
                continue;
            }
            let (nx, ny) = (cx + dx, cy + dy);
            if !image.contains(nx, ny) {
                continue;
            }
            if image.value(nx as usize, ny as usize) >= center {
                return false;
            }
        }
    }
    true
}
