//! Calibration parameters.

use crate::{Error, Result};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Radial filter parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FilterConfig {
    /// Kernel size in pixels; the kernel half-width is `(peak_size - 1) / 2`.
    pub peak_size: u32,
    /// Extra background suppression in percent of the mean kernel weight.
    pub threshold_pct: f64,
    /// Convolve columns on the rayon pool. Output is identical either way.
    pub parallel: bool,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            peak_size: 13,
            threshold_pct: 0.0,
            parallel: false,
        }
    }
}

impl FilterConfig {
    /// Kernel half-width `l`.
    #[must_use]
    pub fn half_width(&self) -> usize {
        (self.peak_size.saturating_sub(1) / 2) as usize
    }

    /// Sets the kernel size.
    #[must_use]
    pub fn with_peak_size(mut self, peak_size: u32) -> Self {
        self.peak_size = peak_size;
        self
    }

    /// Sets the threshold percentage.
    #[must_use]
    pub fn with_threshold_pct(mut self, threshold_pct: f64) -> Self {
        self.threshold_pct = threshold_pct;
        self
    }

    /// Sets parallel convolution.
    #[must_use]
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Checks the parameters.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for kernels narrower than 3 pixels or
    /// negative thresholds.
    pub fn validate(&self) -> Result<()> {
        if self.peak_size < 3 {
            return Err(Error::ConfigError(format!(
                "peak size must be at least 3, got {}",
                self.peak_size
            )));
        }
        if !self.threshold_pct.is_finite() || self.threshold_pct < 0.0 {
            return Err(Error::ConfigError(format!(
                "threshold must be a non-negative percentage, got {}",
                self.threshold_pct
            )));
        }
        Ok(())
    }
}

/// Peak detection parameters.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DetectionConfig {
    /// Minimum peak height as a fraction of the global maximum.
    pub peak_cutoff: f64,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self { peak_cutoff: 0.0 }
    }
}

impl DetectionConfig {
    /// Sets the cutoff fraction.
    #[must_use]
    pub fn with_peak_cutoff(mut self, peak_cutoff: f64) -> Self {
        self.peak_cutoff = peak_cutoff;
        self
    }

    /// Checks the parameters.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] if the cutoff lies outside `[0, 1]`.
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.peak_cutoff) {
            return Err(Error::ConfigError(format!(
                "peak cutoff must lie in [0, 1], got {}",
                self.peak_cutoff
            )));
        }
        Ok(())
    }
}

/// Crystal enumeration parameters.
///
/// The scoring weights were tuned by hand on flood images and have no
/// derivation; they are exposed so they can be recalibrated per detector.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct EnumerationConfig {
    /// Crystals per row.
    pub columns: usize,
    /// Crystal rows.
    pub rows: usize,
    /// Angle weight when choosing the first peak of a row (`theta + dist / x_min`).
    pub row_start_angle_weight: f64,
    /// Angle weight along a row (`1.2 * theta + dist / ave_dist_x`).
    pub row_walk_angle_weight: f64,
    /// Allowed downward step along a row, in units of the mean column pitch.
    pub row_window_factor: f64,
}

impl Default for EnumerationConfig {
    fn default() -> Self {
        Self {
            columns: 0,
            rows: 0,
            row_start_angle_weight: 1.0,
            row_walk_angle_weight: 1.2,
            row_window_factor: 1.0,
        }
    }
}

impl EnumerationConfig {
    /// Creates a configuration for a `columns x rows` crystal array.
    #[must_use]
    pub fn new(columns: usize, rows: usize) -> Self {
        Self {
            columns,
            rows,
            ..Self::default()
        }
    }

    /// Total crystal count.
    #[must_use]
    pub fn total(&self) -> usize {
        self.columns * self.rows
    }

    /// Sets the array shape.
    #[must_use]
    pub fn with_shape(mut self, columns: usize, rows: usize) -> Self {
        self.columns = columns;
        self.rows = rows;
        self
    }

    /// Sets the row-start angle weight.
    #[must_use]
    pub fn with_row_start_angle_weight(mut self, weight: f64) -> Self {
        self.row_start_angle_weight = weight;
        self
    }

    /// Sets the row-walk angle weight.
    #[must_use]
    pub fn with_row_walk_angle_weight(mut self, weight: f64) -> Self {
        self.row_walk_angle_weight = weight;
        self
    }

    /// Sets the row window factor.
    #[must_use]
    pub fn with_row_window_factor(mut self, factor: f64) -> Self {
        self.row_window_factor = factor;
        self
    }

    /// Checks the parameters.
    ///
    /// # Errors
    /// Returns [`Error::ConfigError`] for an empty array or non-positive weights.
    pub fn validate(&self) -> Result<()> {
        if self.columns == 0 || self.rows == 0 {
            return Err(Error::ConfigError(format!(
                "crystal array must be non-empty, got {}x{}",
                self.columns, self.rows
            )));
        }
        for (name, value) in [
            ("row_start_angle_weight", self.row_start_angle_weight),
            ("row_walk_angle_weight", self.row_walk_angle_weight),
            ("row_window_factor", self.row_window_factor),
        ] {
            if !value.is_finite() || value <= 0.0 {
                return Err(Error::ConfigError(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        Ok(())
    }
}

/// All parameters of one calibration run.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct CalibrationConfig {
    pub filter: FilterConfig,
    pub detection: DetectionConfig,
    pub enumeration: EnumerationConfig,
}

impl CalibrationConfig {
    /// Creates a configuration with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the filter parameters.
    #[must_use]
    pub fn with_filter(mut self, filter: FilterConfig) -> Self {
        self.filter = filter;
        self
    }

    /// Sets the detection parameters.
    #[must_use]
    pub fn with_detection(mut self, detection: DetectionConfig) -> Self {
        self.detection = detection;
        self
    }

    /// Sets the enumeration parameters.
    #[must_use]
    pub fn with_enumeration(mut self, enumeration: EnumerationConfig) -> Self {
        self.enumeration = enumeration;
        self
    }

    /// Checks filter and detection parameters. The crystal array shape is
    /// checked when enumeration runs, since it is often supplied late.
    ///
    /// # Errors
    /// Returns the first [`Error::ConfigError`] found.
    pub fn validate(&self) -> Result<()> {
        self.filter.validate()?;
        self.detection.validate()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CalibrationConfig::new();
        assert_eq!(config.filter.peak_size, 13);
        assert_eq!(config.filter.half_width(), 6);
        assert!(config.filter.threshold_pct.abs() < f64::EPSILON);
        assert!(config.detection.peak_cutoff.abs() < f64::EPSILON);
        assert!((config.enumeration.row_walk_angle_weight - 1.2).abs() < f64::EPSILON);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builders() {
        let config = CalibrationConfig::new()
            .with_filter(FilterConfig::default().with_peak_size(9).with_threshold_pct(5.0))
            .with_detection(DetectionConfig::default().with_peak_cutoff(0.2))
            .with_enumeration(EnumerationConfig::new(8, 8).with_row_walk_angle_weight(1.5));

        assert_eq!(config.filter.peak_size, 9);
        assert!((config.detection.peak_cutoff - 0.2).abs() < f64::EPSILON);
        assert_eq!(config.enumeration.total(), 64);
        assert!(config.enumeration.validate().is_ok());
    }

    #[test]
    fn test_validation_failures() {
        assert!(FilterConfig::default().with_peak_size(2).validate().is_err());
        assert!(FilterConfig::default()
            .with_threshold_pct(-1.0)
            .validate()
            .is_err());
        assert!(DetectionConfig::default()
            .with_peak_cutoff(1.5)
            .validate()
            .is_err());
        assert!(EnumerationConfig::default().validate().is_err());
        assert!(EnumerationConfig::new(4, 3)
            .with_row_window_factor(0.0)
            .validate()
            .is_err());
    }
}
