//! One calibration run over a single flood image.
//!
//! The session owns every piece of state the stages share: the raw image,
//! the working (filtered) image, the per-pixel kernel sizes, the peak store,
//! the enumerator's characterization and the latest crystal map. Stages run
//! one at a time through `&mut self`.
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

use crate::detect::PeakDetector;
use crate::enumerate::CrystalEnumerator;
use crate::filter::RadialFilter;
use crate::local_peak::locate_local_peak;
use crate::tessellate::{RegionTessellator, Tessellation};
use crystalmap_core::{
    CalibrationConfig, EnumerationError, Error, FloatGrid, ImageBuffer, LabelGrid, Peak, PeakStore,
    Progress, RadiusMap, Result, Roi,
};

/// Calibration state for one flood image.
#[derive(Debug, Clone)]
pub struct CalibrationSession {
    config: CalibrationConfig,
    raw: FloatGrid,
    image: FloatGrid,
    radii: RadiusMap,
    store: PeakStore,
    enumerator: CrystalEnumerator,
    tessellation: Option<Tessellation>,
    boundary_image: Option<FloatGrid>,
    highest_peak: f32,
}

impl CalibrationSession {
    /// Opens a session on `raw` with validated parameters.
    pub fn new(raw: FloatGrid, config: CalibrationConfig) -> Result<Self> {
        config.validate()?;
        let radii = RadiusMap::new(raw.width(), raw.height());
        let enumerator = CrystalEnumerator::new(config.enumeration.clone());
        log::debug!(
            "session opened on {}x{} image, intensity {}..{}",
            raw.width(),
            raw.height(),
            raw.min_value(),
            raw.max_value()
        );
        Ok(Self {
            highest_peak: raw.max_value(),
            image: raw.clone(),
            raw,
            radii,
            store: PeakStore::new(),
            enumerator,
            tessellation: None,
            boundary_image: None,
            config,
        })
    }

    /// Current parameters.
    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// Image width in pixels.
    pub fn width(&self) -> usize {
        self.raw.width()
    }

    /// Image height in pixels.
    pub fn height(&self) -> usize {
        self.raw.height()
    }

    /// The unfiltered flood image.
    pub fn raw(&self) -> &FloatGrid {
        &self.raw
    }

    /// The working image; filtered wherever the filter has run.
    pub fn image(&self) -> &FloatGrid {
        &self.image
    }

    /// Kernel size recorded per pixel.
    pub fn radii(&self) -> &RadiusMap {
        &self.radii
    }

    /// Peaks in insertion order.
    pub fn store(&self) -> &PeakStore {
        &self.store
    }

    /// Direct access for interactive editing.
    pub fn store_mut(&mut self) -> &mut PeakStore {
        &mut self.store
    }

    /// Enumeration state.
    pub fn enumerator(&self) -> &CrystalEnumerator {
        &self.enumerator
    }

    /// Highest intensity seen in the raw or any filtered image.
    pub fn highest_peak(&self) -> f32 {
        self.highest_peak
    }

    /// Changes the kernel size and threshold used by later filter passes.
    pub fn set_filter_params(&mut self, peak_size: u32, threshold_pct: f64) -> Result<()> {
        let filter = self
            .config
            .filter
            .clone()
            .with_peak_size(peak_size)
            .with_threshold_pct(threshold_pct);
        filter.validate()?;
        self.config.filter = filter;
        Ok(())
    }

    /// Changes the detection cutoff used by later searches.
    pub fn set_peak_cutoff(&mut self, peak_cutoff: f64) -> Result<()> {
        let detection = self.config.detection.clone().with_peak_cutoff(peak_cutoff);
        detection.validate()?;
        self.config.detection = detection;
        Ok(())
    }

    /// Filters the raw image over `roi` into the working image.
    ///
    /// Repeated passes with different sizes or regions accumulate; each
    /// pixel keeps the size of the last pass that covered it.
    pub fn apply_filter(&mut self, roi: Option<Roi>, progress: &mut dyn Progress) -> Result<usize> {
        let filter = RadialFilter::new(self.config.filter.clone());
        let count = filter.apply_into(&self.raw, &mut self.image, roi, &mut self.radii, progress)?;
        self.highest_peak = self.highest_peak.max(self.image.max_value());
        log::info!(
            "filtered {count} pixels at size {}",
            self.config.filter.peak_size
        );
        Ok(count)
    }

    /// Discards all filtering and restores the raw image.
    pub fn reset_filter(&mut self) {
        self.image = self.raw.clone();
        self.radii.reset();
    }

    /// Appends every peak found in the working image to the store.
    pub fn find_peaks(&mut self) -> Result<usize> {
        let detector = PeakDetector::new(self.config.detection.clone());
        let global_max = self.image.max_value();
        detector.detect(&self.image, &self.radii, global_max, &mut self.store)
    }

    /// Numbers the peaks as a `columns x rows` crystal array.
    ///
    /// The new shape replaces the previous enumeration only once the walk has
    /// started. A peak-count mismatch leaves the store, the shape and the
    /// previous characterization as they were.
    pub fn enumerate(&mut self, columns: usize, rows: usize) -> Result<()> {
        let config = self.config.enumeration.clone().with_shape(columns, rows);
        let mut enumerator = CrystalEnumerator::new(config.clone());
        let result = enumerator.enumerate(&mut self.store);
        let started = match &result {
            Ok(()) => {
                log::info!("enumerated {} crystals", self.store.len());
                true
            }
            Err(Error::Enumeration(EnumerationError::SelectionExhausted { .. })) => {
                log::warn!(
                    "enumeration stopped with {} of {} peaks numbered",
                    self.store.mapped_count(),
                    self.store.len()
                );
                true
            }
            Err(e) => {
                log::warn!("enumeration rejected: {e}");
                false
            }
        };
        if !started {
            return result;
        }
        self.config.enumeration = config;
        self.enumerator = enumerator;
        result
    }

    /// Forces peak `index` to crystal `new_id` and renumbers from there.
    pub fn correct_peak(&mut self, index: usize, new_id: usize) -> Result<()> {
        self.enumerator.correct(&mut self.store, index, new_id)
    }

    /// Builds the crystal map from the enumerated peaks.
    ///
    /// The boundary overlay is painted onto a fresh copy of the raw image at
    /// [`highest_peak`](Self::highest_peak).
    pub fn tessellate(&mut self, progress: &mut dyn Progress) -> &Tessellation {
        let tessellator =
            RegionTessellator::new(self.config.filter.peak_size, self.radii.largest());
        let result = tessellator.tessellate(&self.store, self.width(), self.height(), progress);

        let mut overlay = self.raw.clone();
        result.boundaries.paint(&mut overlay, self.highest_peak);
        self.boundary_image = Some(overlay);
        self.tessellation.insert(result)
    }

    /// Latest tessellation result.
    pub fn tessellation(&self) -> Option<&Tessellation> {
        self.tessellation.as_ref()
    }

    /// Latest crystal lookup table.
    pub fn crystal_map(&self) -> Option<&LabelGrid> {
        self.tessellation.as_ref().map(|t| &t.labels)
    }

    /// Raw image with crystal boundaries painted in.
    pub fn boundary_image(&self) -> Option<&FloatGrid> {
        self.boundary_image.as_ref()
    }

    /// Adds a peak at `(x, y)` and selects it.
    pub fn add_peak(&mut self, x: i32, y: i32) -> Result<usize> {
        self.check_bounds(x, y)?;
        Ok(self.store.add(x, y))
    }

    /// Adds a peak at the brightest raw pixel near `(x, y)`.
    pub fn add_local_peak(&mut self, x: i32, y: i32) -> Result<usize> {
        self.check_bounds(x, y)?;
        let (px, py) = locate_local_peak(&self.raw, x, y, self.config.filter.peak_size)
            .unwrap_or((x, y));
        Ok(self.store.add(px, py))
    }

    /// Selects the peak nearest to `(x, y)`.
    pub fn select_nearest(&mut self, x: i32, y: i32) -> Option<usize> {
        self.store.select_nearest(x, y)
    }

    /// Removes the selected peak.
    pub fn remove_current(&mut self) -> Option<Peak> {
        self.store.remove_current()
    }

    /// Moves the selected peak, clamped into the image.
    pub fn move_current(&mut self, x: i32, y: i32) -> bool {
        let (width, height) = (self.width(), self.height());
        self.store.move_current(x, y, width, height)
    }

    /// Removes every peak and forgets the enumeration.
    pub fn clear_peaks(&mut self) {
        self.store.clear();
        self.enumerator.reset();
    }

    /// Replaces the peak list, e.g. after loading one from disk.
    ///
    /// When the array shape is known and the list fits it, the numbering it
    /// carries is characterized so it can be corrected directly.
    pub fn replace_peaks(&mut self, peaks: Vec<Peak>) {
        self.store.replace(peaks);
        if self.store.mapped_count() == 0 || self.config.enumeration.total() == 0 {
            self.enumerator.reset();
            return;
        }
        if let Err(e) = self.enumerator.characterize(&self.store) {
            log::debug!("loaded peaks not characterized: {e}");
            self.enumerator.reset();
        }
    }

    fn check_bounds(&self, x: i32, y: i32) -> Result<()> {
        if self.raw.contains(i64::from(x), i64::from(y)) {
            Ok(())
        } else {
            Err(Error::OutOfBounds {
                x: i64::from(x),
                y: i64::from(y),
                width: self.width(),
                height: self.height(),
            })
        }
    }
}
