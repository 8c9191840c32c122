//! crystalmap-io: File formats for crystal map calibration.
//!
//! This crate reads and writes the plain-text peak lists used to persist a
//! calibration session, the grid exchange format used for flood images and
//! crystal lookup tables, and JSON calibration configuration files.
//!

pub mod config;
mod error;
pub mod grid;
pub mod peaks;

pub use config::{config_from_json, config_to_json, load_config};
pub use error::{Error, Result};
pub use grid::{load_grid, read_grid, save_grid, write_grid, GRID_TAG};
pub use peaks::{load_peaks, read_peaks, save_peaks, write_peaks, PEAK_LIST_HEADER};
