//! crystalmap-algorithms: Calibration stages for flood-image crystal maps.
//!
//! This crate provides the processing chain:
//! - **Radial filter** - sinc kernel background suppression
//! - **Peak detection** - strict local maxima over filtered pixels
//! - **Enumeration** - greedy row-major crystal numbering with correction
//! - **Tessellation** - bounded nearest-seed crystal lookup table
//!
//! [`CalibrationSession`] threads the shared state through every stage.
#![warn(missing_docs)]

mod detect;
mod enumerate;
mod filter;
mod local_peak;
mod session;
mod tessellate;

pub use detect::PeakDetector;
pub use enumerate::{ArrayGeometry, CrystalEnumerator};
pub use filter::{RadialFilter, SincKernel};
pub use local_peak::locate_local_peak;
pub use session::CalibrationSession;
pub use tessellate::{BoundaryMask, RegionTessellator, Tessellation};
