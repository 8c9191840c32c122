//! Plain-text peak lists.
//!
//! ```text
//! point     x     y slice color
//!     0   112    87     0
//!     1   131    88     1
//! ```
//!
//! The first line is a header and is skipped on load. Each further line
//! holds the peak index, x, y and the crystal id. Fields are separated by
//! spaces or tabs; whichever the first data line uses applies to the whole
//! file.
#![allow(clippy::missing_errors_doc)]

use crate::{Error, Result};
use crystalmap_core::{Peak, PeakStore};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Header written at the top of every peak list.
pub const PEAK_LIST_HEADER: &str = "point     x     y slice color";

/// Writes every peak in `store` as a peak list.
pub fn write_peaks<W: Write>(mut writer: W, store: &PeakStore) -> Result<()> {
    writeln!(writer, "{PEAK_LIST_HEADER}")?;
    for (idx, peak) in store.iter().enumerate() {
        writeln!(
            writer,
            "{idx:>5} {:>5} {:>5} {:>5}",
            peak.x, peak.y, peak.crystal
        )?;
    }
    writer.flush()?;
    Ok(())
}

/// Parses a peak list.
///
/// Blank lines are ignored. The stored index column is ignored too; peaks
/// come back in file order.
pub fn read_peaks<R: BufRead>(reader: R) -> Result<Vec<Peak>> {
    let mut lines = reader.lines();
    if lines.next().transpose()?.is_none() {
        return Ok(Vec::new());
    }

    let mut separator = None;
    let mut peaks = Vec::new();
    for (offset, line) in lines.enumerate() {
        let line = line?;
        let number = offset + 2;
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        let sep = *separator.get_or_insert(if trimmed.contains('\t') { '\t' } else { ' ' });
        if !trimmed.contains(sep) {
            return Err(Error::MissingSeparator { line: number });
        }
        let fields: Vec<&str> = trimmed
            .split(sep)
            .map(str::trim)
            .filter(|f| !f.is_empty())
            .collect();
        if fields.len() < 4 {
            return Err(Error::MissingField { line: number });
        }

        let parse = |token: &str| {
            token.parse::<i32>().map_err(|_| Error::InvalidNumber {
                line: number,
                token: token.to_string(),
            })
        };
        peaks.push(Peak::with_crystal(
            parse(fields[1])?,
            parse(fields[2])?,
            parse(fields[3])?,
        ));
    }
    Ok(peaks)
}

/// Writes `store` to a peak list file.
pub fn save_peaks<P: AsRef<Path>>(path: P, store: &PeakStore) -> Result<()> {
    let file = File::create(path)?;
    write_peaks(BufWriter::new(file), store)
}

/// Reads a peak list file.
pub fn load_peaks<P: AsRef<Path>>(path: P) -> Result<Vec<Peak>> {
    let file = File::open(path)?;
    read_peaks(BufReader::new(file))
}
