//! crystalmap-core: Core types for flood-image crystal mapping.
//!
//! This crate provides the image buffer contract, intensity grids, peaks
//! and the peak store, crystal label grids, calibration parameters and the
//! shared error taxonomy.
//!

pub mod config;
pub mod error;
pub mod grid;
pub mod label;
pub mod peak;
pub mod progress;

pub use config::{CalibrationConfig, DetectionConfig, EnumerationConfig, FilterConfig};
pub use error::{EnumerationError, Error, Result};
pub use grid::{FloatGrid, ImageBuffer, RadiusMap, Roi};
pub use label::{LabelGrid, OUTSIDE_DETECTOR};
pub use peak::{Peak, PeakBounds, PeakStore, UNASSIGNED};
pub use progress::{NoProgress, Progress};
