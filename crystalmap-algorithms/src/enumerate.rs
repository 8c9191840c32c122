//! Row-major crystal numbering of an unordered peak set.
//!
//! The enumerator walks the crystal array one row at a time. The first peak
//! of a row is the unmapped peak with the smallest
//! `a * theta + dist / x_min`, measured from `(0, y)` where `y` is the height
//! of the previous row's first peak. Every further peak in the row is the
//! unmapped peak to the right of the last one, not more than one column pitch
//! below it, with the smallest `b * theta + dist / ave_dist_x`.
//!
//! Membership of the mapped and unmapped sets is tracked by store index, so
//! peaks sharing a position stay distinct. Candidates are visited in
//! ascending index order and only a strictly better score replaces the
//! current choice, so ties go to the earlier peak.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::cast_precision_loss,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

use crystalmap_core::{
    EnumerationConfig, EnumerationError, PeakBounds, PeakStore, Result, UNASSIGNED,
};
use std::collections::BTreeSet;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Geometry captured from the peak set when a full enumeration starts.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ArrayGeometry {
    /// Bounding box of all peaks.
    pub bounds: PeakBounds,
    /// Mean column pitch `(x_max - x_min) / columns`.
    pub ave_dist_x: f64,
    /// Mean row pitch `(y_max - y_min) / rows`.
    pub ave_dist_y: f64,
}

/// Stateful crystal numbering.
#[derive(Debug, Clone, Default)]
pub struct CrystalEnumerator {
    config: EnumerationConfig,
    unmapped: BTreeSet<usize>,
    mapped: BTreeSet<usize>,
    geometry: Option<ArrayGeometry>,
    /// `row_height[r]` is the y used to seed row `r`; entry 0 is 0.
    row_height: Vec<f64>,
}

impl CrystalEnumerator {
    /// Create with custom configuration.
    pub fn new(config: EnumerationConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Current configuration.
    pub fn config(&self) -> &EnumerationConfig {
        &self.config
    }

    /// Forgets all enumeration state.
    pub fn reset(&mut self) {
        self.unmapped.clear();
        self.mapped.clear();
        self.geometry = None;
        self.row_height.clear();
    }

    /// Geometry of the last full enumeration.
    pub fn geometry(&self) -> Option<&ArrayGeometry> {
        self.geometry.as_ref()
    }

    /// Seed heights per row, `rows + 1` entries once characterized.
    pub fn row_heights(&self) -> &[f64] {
        &self.row_height
    }

    /// Store indices assigned so far, in index order.
    pub fn mapped(&self) -> impl Iterator<Item = usize> + '_ {
        self.mapped.iter().copied()
    }

    /// Store indices still waiting for a crystal, in index order.
    pub fn unmapped(&self) -> impl Iterator<Item = usize> + '_ {
        self.unmapped.iter().copied()
    }

    /// Numbers every peak in `store` from scratch.
    ///
    /// Fails with [`EnumerationError::PeakCountMismatch`] before touching
    /// anything if the store does not hold exactly `columns * rows` peaks.
    /// On [`EnumerationError::SelectionExhausted`] the crystals assigned
    /// before the failure are kept so the walk can be resumed with
    /// [`correct`](Self::correct).
    pub fn enumerate(&mut self, store: &mut PeakStore) -> Result<()> {
        self.config.validate()?;
        let expected = self.config.total();
        let found = store.len();
        let bounds = match PeakBounds::of(store.iter()) {
            Some(bounds) if found == expected => bounds,
            _ => return Err(EnumerationError::PeakCountMismatch { expected, found }.into()),
        };

        let geometry = self.measure(bounds);
        log::debug!(
            "enumerating {}x{} crystals: bounds {:?}, pitch ({:.2}, {:.2})",
            self.config.columns,
            self.config.rows,
            bounds,
            geometry.ave_dist_x,
            geometry.ave_dist_y
        );

        self.geometry = Some(geometry);
        self.row_height = vec![0.0; self.config.rows + 1];
        self.mapped.clear();
        self.unmapped = (0..found).collect();
        for peak in store.as_mut_slice() {
            peak.crystal = UNASSIGNED;
        }

        self.walk(store, 0, None)
    }

    /// Rebuilds the characterization from a store numbered earlier, such as
    /// a reloaded peak list, so [`correct`](Self::correct) can resume from it.
    ///
    /// Bounds and pitch are measured over every peak, as a full enumeration
    /// does. Each row's seed height is the y of its first crystal. Peaks
    /// without a crystal id in `0..columns * rows` count as unmapped. The
    /// store itself is not modified.
    pub fn characterize(&mut self, store: &PeakStore) -> Result<()> {
        self.config.validate()?;
        let expected = self.config.total();
        let found = store.len();
        let bounds = match PeakBounds::of(store.iter()) {
            Some(bounds) if found == expected => bounds,
            _ => return Err(EnumerationError::PeakCountMismatch { expected, found }.into()),
        };

        let columns = self.config.columns;
        let mut row_height = vec![0.0; self.config.rows + 1];
        let mut mapped = BTreeSet::new();
        let mut unmapped = BTreeSet::new();
        for (idx, peak) in store.iter().enumerate() {
            match usize::try_from(peak.crystal) {
                Ok(crystal) if crystal < expected => {
                    if crystal % columns == 0 {
                        row_height[crystal / columns + 1] = f64::from(peak.y);
                    }
                    mapped.insert(idx);
                }
                _ => {
                    unmapped.insert(idx);
                }
            }
        }

        self.geometry = Some(self.measure(bounds));
        self.row_height = row_height;
        self.mapped = mapped;
        self.unmapped = unmapped;
        log::debug!(
            "characterized {} of {} numbered peaks",
            self.mapped.len(),
            found
        );
        Ok(())
    }

    /// Reassigns `bad` to crystal `new_id` and renumbers everything after it.
    ///
    /// Peaks already numbered below `new_id` are trusted and kept. Every other
    /// peak is cleared and numbered again by resuming the walk at
    /// `new_id + 1` from `bad`.
    pub fn correct(&mut self, store: &mut PeakStore, bad: usize, new_id: usize) -> Result<()> {
        if self.geometry.is_none() {
            return Err(EnumerationError::NotCharacterized.into());
        }
        if bad >= store.len() {
            return Err(EnumerationError::InvalidPeak(bad).into());
        }
        let total = self.config.total();
        if new_id >= total {
            return Err(EnumerationError::InvalidCrystalId {
                id: new_id as i64,
                total,
            }
            .into());
        }

        self.mapped.clear();
        self.unmapped.clear();
        let trusted = 0..new_id as i32;
        for (idx, peak) in store.as_mut_slice().iter_mut().enumerate() {
            if idx != bad && trusted.contains(&peak.crystal) {
                self.mapped.insert(idx);
            } else {
                peak.crystal = UNASSIGNED;
                self.unmapped.insert(idx);
            }
        }

        self.assign(store, bad, new_id);
        if new_id % self.config.columns == 0 {
            let row = new_id / self.config.columns;
            self.row_height[row + 1] = f64::from(store.as_slice()[bad].y);
        }
        log::debug!("corrected peak {bad} to crystal {new_id}; resuming walk");

        self.walk(store, new_id + 1, Some(bad))
    }

    fn walk(&mut self, store: &mut PeakStore, start: usize, mut last: Option<usize>) -> Result<()> {
        let columns = self.config.columns;
        for crystal in start..self.config.total() {
            let row = crystal / columns;
            let chosen = if crystal % columns == 0 {
                let idx = self.find_row_start(store, self.row_height[row]);
                if let Some(idx) = idx {
                    self.row_height[row + 1] = f64::from(store.as_slice()[idx].y);
                }
                idx
            } else {
                last.and_then(|prev| self.find_next_in_row(store, prev))
            };

            let Some(idx) = chosen else {
                log::warn!("no peak qualifies for crystal {crystal}; stopping");
                return Err(EnumerationError::SelectionExhausted { crystal }.into());
            };
            self.assign(store, idx, crystal);
            last = Some(idx);
        }
        Ok(())
    }

    fn measure(&self, bounds: PeakBounds) -> ArrayGeometry {
        ArrayGeometry {
            bounds,
            ave_dist_x: f64::from(bounds.x_max - bounds.x_min) / self.config.columns as f64,
            ave_dist_y: f64::from(bounds.y_max - bounds.y_min) / self.config.rows as f64,
        }
    }

    fn assign(&mut self, store: &mut PeakStore, idx: usize, crystal: usize) {
        let columns = self.config.columns;
        let peak = &mut store.as_mut_slice()[idx];
        peak.crystal = crystal as i32;
        peak.row = (crystal / columns) as i32;
        peak.column = (crystal % columns) as i32;
        self.unmapped.remove(&idx);
        self.mapped.insert(idx);
    }

    fn find_row_start(&self, store: &PeakStore, last_y: f64) -> Option<usize> {
        let geometry = self.geometry.as_ref()?;
        let x_scale = f64::from(geometry.bounds.x_min).max(1.0);
        let weight = self.config.row_start_angle_weight;
        let peaks = store.as_slice();

        let mut best = None;
        let mut min = f64::INFINITY;
        for &idx in &self.unmapped {
            let dx = f64::from(peaks[idx].x);
            let dy = f64::from(peaks[idx].y) - last_y;
            let score = weight * dy.atan2(dx) + dx.hypot(dy) / x_scale;
            if score < min {
                min = score;
                best = Some(idx);
            }
        }
        best
    }

    fn find_next_in_row(&self, store: &PeakStore, prev: usize) -> Option<usize> {
        let geometry = self.geometry.as_ref()?;
        let pitch = geometry.ave_dist_x;
        let window = pitch * self.config.row_window_factor;
        let weight = self.config.row_walk_angle_weight;
        let peaks = store.as_slice();
        let (last_x, last_y) = (f64::from(peaks[prev].x), f64::from(peaks[prev].y));

        let mut best = None;
        let mut min = f64::INFINITY;
        for &idx in &self.unmapped {
            let dx = f64::from(peaks[idx].x) - last_x;
            let dy = f64::from(peaks[idx].y) - last_y;
            if dx <= 0.0 || dy >= window {
                continue;
            }
            let score = weight * dy.atan2(dx) + dx.hypot(dy) / pitch;
            if score < min {
                min = score;
                best = Some(idx);
            }
        }
        best
    }
}
