//! Peaks and the ordered peak store.
#![allow(clippy::cast_precision_loss, clippy::must_use_candidate)]

use std::fmt::Write as _;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Crystal number of a peak that has not been enumerated.
pub const UNASSIGNED: i32 = -1;

/// A candidate crystal position.
///
/// Peaks are addressed by their index in a [`PeakStore`], never by value:
/// two peaks may share coordinates and still be distinct.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Peak {
    pub x: i32,
    pub y: i32,
    /// Row-major crystal id, or [`UNASSIGNED`].
    pub crystal: i32,
    pub row: i32,
    pub column: i32,
}

impl Peak {
    /// Creates an unassigned peak.
    pub fn new(x: i32, y: i32) -> Self {
        Self::with_crystal(x, y, UNASSIGNED)
    }

    /// Creates a peak with a known crystal id.
    pub fn with_crystal(x: i32, y: i32, crystal: i32) -> Self {
        Self {
            x,
            y,
            crystal,
            row: 0,
            column: 0,
        }
    }

    /// Returns true once a crystal id has been assigned.
    #[inline]
    pub fn is_mapped(&self) -> bool {
        self.crystal >= 0
    }

    /// Squared distance to `(x, y)`.
    #[inline]
    pub fn distance_squared(&self, x: i32, y: i32) -> i64 {
        let dx = i64::from(self.x) - i64::from(x);
        let dy = i64::from(self.y) - i64::from(y);
        dx * dx + dy * dy
    }

    /// Euclidean distance to `(x, y)`.
    #[inline]
    pub fn distance(&self, x: i32, y: i32) -> f64 {
        (self.distance_squared(x, y) as f64).sqrt()
    }
}

/// Axis-aligned bounding box of a set of peaks (inclusive).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct PeakBounds {
    pub x_min: i32,
    pub x_max: i32,
    pub y_min: i32,
    pub y_max: i32,
}

impl PeakBounds {
    /// Bounds of `peaks`, or `None` if there are none.
    pub fn of<'a, I>(peaks: I) -> Option<Self>
    where
        I: IntoIterator<Item = &'a Peak>,
    {
        peaks.into_iter().fold(None, |acc, p| {
            Some(match acc {
                None => Self {
                    x_min: p.x,
                    x_max: p.x,
                    y_min: p.y,
                    y_max: p.y,
                },
                Some(b) => Self {
                    x_min: b.x_min.min(p.x),
                    x_max: b.x_max.max(p.x),
                    y_min: b.y_min.min(p.y),
                    y_max: b.y_max.max(p.y),
                },
            })
        })
    }

    /// Returns true if `(x, y)` lies inside the box.
    pub fn contains(&self, x: i32, y: i32) -> bool {
        (self.x_min..=self.x_max).contains(&x) && (self.y_min..=self.y_max).contains(&y)
    }
}

/// Ordered collection of peaks with a single selection cursor.
///
/// Insertion order is the only order. The cursor is `None` exactly when
/// nothing is selected and always addresses a live peak otherwise.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PeakStore {
    peaks: Vec<Peak>,
    current: Option<usize>,
}

impl PeakStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store from peaks, selecting the last one.
    pub fn from_peaks(peaks: Vec<Peak>) -> Self {
        let current = peaks.len().checked_sub(1);
        Self { peaks, current }
    }

    /// Number of peaks.
    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    /// Returns true if the store holds no peaks.
    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    /// Index of the selected peak.
    pub fn current(&self) -> Option<usize> {
        self.current
    }

    /// The selected peak.
    pub fn current_peak(&self) -> Option<&Peak> {
        self.current.map(|idx| &self.peaks[idx])
    }

    /// Selects the peak at `index`; out-of-range indices are ignored.
    pub fn select(&mut self, index: usize) -> bool {
        if index < self.peaks.len() {
            self.current = Some(index);
            true
        } else {
            false
        }
    }

    /// Peak at `index`.
    pub fn get(&self, index: usize) -> Option<&Peak> {
        self.peaks.get(index)
    }

    /// Mutable peak at `index`.
    pub fn get_mut(&mut self, index: usize) -> Option<&mut Peak> {
        self.peaks.get_mut(index)
    }

    /// Peaks in insertion order.
    pub fn as_slice(&self) -> &[Peak] {
        &self.peaks
    }

    /// Mutable peaks in insertion order. Membership cannot change through this.
    pub fn as_mut_slice(&mut self) -> &mut [Peak] {
        &mut self.peaks
    }

    /// Iterates over peaks in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Peak> {
        self.peaks.iter()
    }

    /// Appends an unassigned peak and selects it.
    pub fn add(&mut self, x: i32, y: i32) -> usize {
        self.push(Peak::new(x, y))
    }

    /// Appends `peak` and selects it.
    pub fn push(&mut self, peak: Peak) -> usize {
        self.peaks.push(peak);
        let idx = self.peaks.len() - 1;
        self.current = Some(idx);
        idx
    }

    /// Removes the selected peak; the selection falls to the last peak.
    pub fn remove_current(&mut self) -> Option<Peak> {
        let removed = self.current.map(|idx| self.peaks.remove(idx));
        self.current = self.peaks.len().checked_sub(1);
        removed
    }

    /// Removes every peak.
    pub fn clear(&mut self) {
        self.peaks.clear();
        self.current = None;
    }

    /// Replaces the whole content.
    pub fn replace(&mut self, peaks: Vec<Peak>) {
        *self = Self::from_peaks(peaks);
    }

    /// Selects the peak nearest to `(x, y)` and returns its index.
    ///
    /// The search starts from the current selection (or the first peak), so
    /// a candidate must be strictly closer to take over.
    pub fn select_nearest(&mut self, x: i32, y: i32) -> Option<usize> {
        let start = self
            .current
            .or_else(|| (!self.peaks.is_empty()).then_some(0))?;
        let mut best = start;
        let mut best_dist = self.peaks[start].distance_squared(x, y);
        for (idx, peak) in self.peaks.iter().enumerate() {
            let dist = peak.distance_squared(x, y);
            if dist < best_dist {
                best_dist = dist;
                best = idx;
            }
        }
        self.current = Some(best);
        Some(best)
    }

    /// Moves the selected peak to `(x, y)`, clamped into a `width x height` grid.
    pub fn move_current(&mut self, x: i32, y: i32, width: usize, height: usize) -> bool {
        let Some(idx) = self.current else {
            return false;
        };
        let max_x = i32::try_from(width).unwrap_or(i32::MAX).saturating_sub(1).max(0);
        let max_y = i32::try_from(height).unwrap_or(i32::MAX).saturating_sub(1).max(0);
        let peak = &mut self.peaks[idx];
        peak.x = x.clamp(0, max_x);
        peak.y = y.clamp(0, max_y);
        true
    }

    /// Advances the selection, wrapping to the first peak.
    pub fn select_next(&mut self) -> Option<usize> {
        if self.peaks.is_empty() {
            return None;
        }
        let next = match self.current {
            Some(idx) if idx + 1 < self.peaks.len() => idx + 1,
            _ => 0,
        };
        self.current = Some(next);
        Some(next)
    }

    /// Number of peaks with a crystal id.
    pub fn mapped_count(&self) -> usize {
        self.peaks.iter().filter(|p| p.is_mapped()).count()
    }

    /// Fixed-width listing of every peak: index, position and crystal id.
    pub fn table(&self) -> String {
        let mut out = format!("{:>6} {:>7} {:>7} {:>7}\n", "point", "x", "y", "xtalID");
        for (idx, peak) in self.peaks.iter().enumerate() {
            let _ = writeln!(
                out,
                "{:>6} {:>7} {:>7} {:>7}",
                idx, peak.x, peak.y, peak.crystal
            );
        }
        out
    }
}

impl<'a> IntoIterator for &'a PeakStore {
    type Item = &'a Peak;
    type IntoIter = std::slice::Iter<'a, Peak>;

    fn into_iter(self) -> Self::IntoIter {
        self.peaks.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store_of(points: &[(i32, i32)]) -> PeakStore {
        let mut store = PeakStore::new();
        for &(x, y) in points {
            store.add(x, y);
        }
        store
    }

    #[test]
    fn test_empty_store_has_no_selection() {
        let mut store = PeakStore::new();
        assert_eq!(store.current(), None);
        assert_eq!(store.remove_current(), None);
        assert_eq!(store.select_nearest(3, 3), None);
        assert_eq!(store.select_next(), None);
    }

    #[test]
    fn test_add_selects_new_peak() {
        let mut store = store_of(&[(1, 1), (5, 5)]);
        assert_eq!(store.current(), Some(1));
        assert_eq!(store.add(9, 9), 2);
        assert_eq!(store.current(), Some(2));
        assert_eq!(store.get(2).map(|p| p.crystal), Some(UNASSIGNED));
    }

    #[test]
    fn test_duplicate_positions_stay_distinct() {
        let store = store_of(&[(4, 4), (4, 4)]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn test_remove_current_moves_selection_to_last() {
        let mut store = store_of(&[(1, 1), (2, 2), (3, 3)]);
        store.select(0);
        let removed = store.remove_current().unwrap();
        assert_eq!((removed.x, removed.y), (1, 1));
        assert_eq!(store.len(), 2);
        assert_eq!(store.current(), Some(1));

        store.remove_current();
        store.remove_current();
        assert!(store.is_empty());
        assert_eq!(store.current(), None);
    }

    #[test]
    fn test_select_nearest_requires_strictly_closer() {
        let mut store = store_of(&[(0, 0), (10, 0), (20, 0)]);
        store.select(2);
        // (5, 0) is equidistant from peaks 0 and 1; neither beats the current
        // selection until strictly closer, and peak 0 is found first.
        assert_eq!(store.select_nearest(5, 0), Some(0));
        assert_eq!(store.select_nearest(19, 1), Some(2));
    }

    #[test]
    fn test_move_current_clamps() {
        let mut store = store_of(&[(5, 5)]);
        assert!(store.move_current(-3, 40, 20, 10));
        let peak = store.current_peak().unwrap();
        assert_eq!((peak.x, peak.y), (0, 9));
    }

    #[test]
    fn test_next_wraps() {
        let mut store = store_of(&[(0, 0), (1, 1)]);
        assert_eq!(store.select_next(), Some(0));
        assert_eq!(store.select_next(), Some(1));
        assert_eq!(store.select_next(), Some(0));
    }

    #[test]
    fn test_bounds() {
        let store = store_of(&[(5, 9), (2, 14), (8, 3)]);
        let bounds = PeakBounds::of(&store).unwrap();
        assert_eq!(
            bounds,
            PeakBounds {
                x_min: 2,
                x_max: 8,
                y_min: 3,
                y_max: 14
            }
        );
        assert!(bounds.contains(2, 14));
        assert!(!bounds.contains(9, 5));
        assert_eq!(PeakBounds::of(&PeakStore::new()), None);
    }

    #[test]
    fn test_table_lists_every_peak() {
        let mut store = store_of(&[(12, 34)]);
        store.get_mut(0).unwrap().crystal = 7;
        let table = store.table();
        let lines: Vec<&str> = table.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].contains("xtalID"));
        assert_eq!(
            lines[1].split_whitespace().collect::<Vec<_>>(),
            vec!["0", "12", "34", "7"]
        );
    }
}
