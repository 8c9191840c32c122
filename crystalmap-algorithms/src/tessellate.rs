//! Bounded nearest-seed labeling of the image plane.
//!
//! Every enumerated peak claims the pixels of a disc around itself, taking
//! over a pixel only when it is strictly closer than the seed that owns it.
//! Synthetic seeds labeled [`OUTSIDE_DETECTOR`] are planted around the peak
//! array first so the exterior gets claimed too. Pixels out of reach of every
//! seed keep the default label; this is not an exact Voronoi diagram.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::must_use_candidate
)]

use crate::detect::disc_half_height;
use crystalmap_core::{
    ImageBuffer, LabelGrid, PeakBounds, PeakStore, Progress, OUTSIDE_DETECTOR,
};

/// Seeds processed between progress reports.
const SEEDS_PER_REPORT: usize = 50;

/// Pixels where the crystal label changes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryMask {
    width: usize,
    height: usize,
    mask: Vec<bool>,
}

impl BoundaryMask {
    /// Marks every interior pixel whose right, left, lower or upper
    /// neighbor carries a different label. The outermost ring is never marked.
    pub fn from_labels(labels: &LabelGrid) -> Self {
        let (width, height) = (labels.width(), labels.height());
        let mut mask = vec![false; width * height];
        for y in 1..height.saturating_sub(1) {
            for x in 1..width.saturating_sub(1) {
                let here = labels.get(x, y);
                mask[y * width + x] = here != labels.get(x + 1, y)
                    || here != labels.get(x - 1, y)
                    || here != labels.get(x, y + 1)
                    || here != labels.get(x, y - 1);
            }
        }
        Self {
            width,
            height,
            mask,
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

    /// Returns true if `(x, y)` lies on a boundary.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> bool {
        self.mask[y * self.width + x]
    }

    /// Number of boundary pixels.
    pub fn count(&self) -> usize {
        self.mask.iter().filter(|&&b| b).count()
    }

    /// Writes `value` onto every boundary pixel of `image`.
    pub fn paint<B: ImageBuffer + ?Sized>(&self, image: &mut B, value: f32) {
        let width = self.width.min(image.width());
        let height = self.height.min(image.height());
        for y in 0..height {
            for x in 0..width {
                if self.get(x, y) {
                    image.set_value(x, y, value);
                }
            }
        }
    }
}

/// Output of one tessellation run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tessellation {
    /// Crystal id per pixel.
    pub labels: LabelGrid,
    /// Pixels where the label changes.
    pub boundaries: BoundaryMask,
}

/// Region tessellation stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegionTessellator {
    peak_size: u32,
    range: u32,
}

impl RegionTessellator {
    /// Creates a tessellator for the current filter state.
    ///
    /// Seeds reach twice the largest kernel size ever applied, or twice
    /// `peak_size` if nothing was filtered. Border seeds are spaced
    /// `peak_size` apart.
    pub fn new(peak_size: u32, largest_applied: u32) -> Self {
        let base = if largest_applied == 0 {
            peak_size
        } else {
            largest_applied
        };
        Self {
            peak_size,
            range: base.saturating_mul(2),
        }
    }

    /// Disc radius claimed by each crystal seed.
    pub fn search_range(&self) -> u32 {
        self.range
    }

    /// Labels a `width x height` plane from the enumerated peaks in `store`.
    ///
    /// The result is rebuilt from scratch on every call, so an unchanged
    /// store always yields the same grid.
    pub fn tessellate(
        &self,
        store: &PeakStore,
        width: usize,
        height: usize,
        progress: &mut dyn Progress,
    ) -> Tessellation {
        let mut claims = Claims::new(width, height);

        if let Some(bounds) = PeakBounds::of(store.iter().filter(|p| p.is_mapped())) {
            self.seed_border(&mut claims, &bounds);
        }

        let total = store.len();
        let range = self.range as i32;
        let mut skipped = 0usize;
        for (k, peak) in store.iter().enumerate() {
            if k % SEEDS_PER_REPORT == 0 {
                progress.update(k as f64 / total as f64);
            }
            if !peak.is_mapped() {
                skipped += 1;
                continue;
            }
            claims.claim_region(peak.x, peak.y, peak.crystal, range);
        }
        progress.update(1.0);

        if skipped > 0 {
            log::warn!("{skipped} unenumerated peaks were left out of the crystal map");
        }
        let labels = claims.labels;
        log::info!(
            "tessellated {}x{} plane from {} seeds; {} pixels unclaimed",
            width,
            height,
            total - skipped,
            labels.unclaimed_count()
        );

        let boundaries = BoundaryMask::from_labels(&labels);
        Tessellation { labels, boundaries }
    }

    /// Plants seeds one `peak_size` outside and one inside each side of
    /// `bounds`.
    fn seed_border(&self, claims: &mut Claims, bounds: &PeakBounds) {
        let step = self.peak_size as i32;
        if step <= 0 {
            return;
        }
        let reach = claims.labels.width() as i32;

        let mut x = bounds.x_min - step;
        while x < bounds.x_max + step {
            for y in [
                bounds.y_min - step,
                bounds.y_min + step,
                bounds.y_max + step,
                bounds.y_max - step,
            ] {
                claims.claim_region(x, y, OUTSIDE_DETECTOR, reach);
            }
            x += step;
        }

        let mut y = bounds.y_min;
        while y < bounds.y_max {
            for x in [
                bounds.x_min - step,
                bounds.x_min + step,
                bounds.x_max + step,
                bounds.x_max - step,
            ] {
                claims.claim_region(x, y, OUTSIDE_DETECTOR, reach);
            }
            y += step;
        }
    }
}

/// Labels under construction plus the seed owning each pixel.
struct Claims {
    labels: LabelGrid,
    owners: Vec<Option<(i32, i32)>>,
}

impl Claims {
    fn new(width: usize, height: usize) -> Self {
        Self {
            labels: LabelGrid::new(width, height),
            owners: vec![None; width * height],
        }
    }

    /// Claims the disc of radius `range` around `(x, y)` for `label`.
    ///
    /// Near the plane edges the radius shrinks to the distance to the
    /// nearest edge; a seed on or past an edge claims nothing.
    fn claim_region(&mut self, x: i32, y: i32, label: i32, range: i32) {
        let width = self.labels.width() as i32;
        let height = self.labels.height() as i32;
        let mut range = range;
        if range > x || range > y {
            range = x.min(y);
        }
        if x > width - range || y > height - range {
            range = (width - x).min(height - y);
        }
        if range <= 0 {
            return;
        }

        let seed = (i64::from(x), i64::from(y));
        for i in x - range..x + range {
            let half = disc_half_height(i64::from(range), i64::from(x - i)) as i32;
            for j in y - half..y + half {
                if i < 0 || j < 0 || i >= width || j >= height {
                    continue;
                }
                let idx = j as usize * self.labels.width() + i as usize;
                let pixel = (i64::from(i), i64::from(j));
                let closer = match self.owners[idx] {
                    None => true,
                    Some((ox, oy)) => {
                        distance_squared(pixel, seed)
                            < distance_squared(pixel, (i64::from(ox), i64::from(oy)))
                    }
                };
                if closer {
                    self.owners[idx] = Some((x, y));
                    self.labels.claim(i as usize, j as usize, label);
                }
            }
        }
    }
}

#[inline]
fn distance_squared(a: (i64, i64), b: (i64, i64)) -> i64 {
    let (dx, dy) = (a.0 - b.0, a.1 - b.1);
    dx * dx + dy * dy
}
