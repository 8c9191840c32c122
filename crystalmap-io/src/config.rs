//! JSON calibration configuration.
//!
//! ```json
//! {
//!   "filter": { "peak_size": 13, "threshold_pct": 0.0, "parallel": false },
//!   "detection": { "peak_cutoff": 0.1 },
//!   "enumeration": { "columns": 12, "rows": 12, "row_walk_angle_weight": 1.2 }
//! }
//! ```
//!
//! Every section and every field is optional; missing values take the
//! library defaults.
#![allow(clippy::missing_errors_doc)]

use crate::Result;
use crystalmap_core::{CalibrationConfig, DetectionConfig, EnumerationConfig, FilterConfig};
use serde::Deserialize;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;

// Intermediate structs so partial files fill in from the library defaults
#[derive(Deserialize, Default)]
#[serde(default)]
struct JsonConfig {
    filter: JsonFilter,
    detection: JsonDetection,
    enumeration: JsonEnumeration,
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonFilter {
    peak_size: u32,
    threshold_pct: f64,
    parallel: bool,
}

impl Default for JsonFilter {
    fn default() -> Self {
        let d = FilterConfig::default();
        Self {
            peak_size: d.peak_size,
            threshold_pct: d.threshold_pct,
            parallel: d.parallel,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonDetection {
    peak_cutoff: f64,
}

impl Default for JsonDetection {
    fn default() -> Self {
        Self {
            peak_cutoff: DetectionConfig::default().peak_cutoff,
        }
    }
}

#[derive(Deserialize)]
#[serde(default)]
struct JsonEnumeration {
    columns: usize,
    rows: usize,
    row_start_angle_weight: f64,
    row_walk_angle_weight: f64,
    row_window_factor: f64,
}

impl Default for JsonEnumeration {
    fn default() -> Self {
        let d = EnumerationConfig::default();
        Self {
            columns: d.columns,
            rows: d.rows,
            row_start_angle_weight: d.row_start_angle_weight,
            row_walk_angle_weight: d.row_walk_angle_weight,
            row_window_factor: d.row_window_factor,
        }
    }
}

impl JsonConfig {
    fn into_config(self) -> CalibrationConfig {
        let JsonConfig {
            filter,
            detection,
            enumeration,
        } = self;
        CalibrationConfig::new()
            .with_filter(
                FilterConfig::default()
                    .with_peak_size(filter.peak_size)
                    .with_threshold_pct(filter.threshold_pct)
                    .with_parallel(filter.parallel),
            )
            .with_detection(DetectionConfig::default().with_peak_cutoff(detection.peak_cutoff))
            .with_enumeration(
                EnumerationConfig::new(enumeration.columns, enumeration.rows)
                    .with_row_start_angle_weight(enumeration.row_start_angle_weight)
                    .with_row_walk_angle_weight(enumeration.row_walk_angle_weight)
                    .with_row_window_factor(enumeration.row_window_factor),
            )
    }
}

/// Parses and validates a configuration from a JSON string.
///
/// The enumeration section is only validated when it names an array shape.
pub fn config_from_json(json: &str) -> Result<CalibrationConfig> {
    let parsed: JsonConfig = serde_json::from_str(json)?;
    finish(parsed.into_config())
}

/// Loads and validates a configuration file.
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<CalibrationConfig> {
    let file = File::open(path)?;
    let parsed: JsonConfig = serde_json::from_reader(BufReader::new(file))?;
    finish(parsed.into_config())
}

/// Serializes a configuration as pretty JSON in the layout [`config_from_json`] reads.
pub fn config_to_json(config: &CalibrationConfig) -> Result<String> {
    Ok(serde_json::to_string_pretty(config)?)
}

fn finish(config: CalibrationConfig) -> Result<CalibrationConfig> {
    config.validate()?;
    if config.enumeration.total() > 0 {
        config.enumeration.validate()?;
    }
    Ok(config)
}
