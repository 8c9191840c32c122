//! Grid exchange ("Kmax") text format.
//!
//! ```text
//! CHO 2
//! <width> <height>
//! v0 v1 v2 ... (row-major, top row first)
//! ```
//!
//! Samples are written rounded to the nearest integer, ten per line.
#![allow(clippy::cast_possible_truncation, clippy::missing_errors_doc)]

use crate::{Error, Result};
use crystalmap_core::{FloatGrid, ImageBuffer};
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;

/// Tag on the first line of a grid exchange file.
pub const GRID_TAG: &str = "CHO 2";

/// Samples per output line.
const VALUES_PER_LINE: usize = 10;

/// Upper bound on samples reserved up front from an unverified header.
const MAX_PREALLOCATED_SAMPLES: usize = 1 << 22;

/// Rounds half up, matching the exchange format's integer samples.
#[inline]
fn round_sample(value: f32) -> i64 {
    (f64::from(value) + 0.5).floor() as i64
}

/// Writes `image` in the grid exchange format.
pub fn write_grid<W, B>(mut writer: W, image: &B) -> Result<()>
where
    W: Write,
    B: ImageBuffer + ?Sized,
{
    writeln!(writer, "{GRID_TAG}")?;
    writeln!(writer, "{} {}", image.width(), image.height())?;
    let mut written = 0usize;
    for y in 0..image.height() {
        for x in 0..image.width() {
            write!(writer, "{} ", round_sample(image.value(x, y)))?;
            written += 1;
            if written % VALUES_PER_LINE == 0 {
                writeln!(writer)?;
            }
        }
    }
    if written % VALUES_PER_LINE != 0 {
        writeln!(writer)?;
    }
    writer.flush()?;
    Ok(())
}

/// Parses a grid exchange file.
///
/// The tag line is not checked beyond being present. Samples may be split
/// across lines freely, separated by any whitespace.
pub fn read_grid<R: BufRead>(reader: R) -> Result<FloatGrid> {
    let mut lines = reader.lines();
    if lines.next().transpose()?.is_none() {
        return Err(Error::MissingHeader);
    }
    let dims = lines.next().transpose()?.ok_or(Error::MissingHeader)?;
    let mut tokens = dims.split_whitespace();
    let mut dimension = || -> Result<usize> {
        let token = tokens.next().ok_or(Error::MissingHeader)?;
        token.parse().map_err(|_| Error::InvalidNumber {
            line: 2,
            token: token.to_string(),
        })
    };
    let width = dimension()?;
    let height = dimension()?;

    let expected = width
        .checked_mul(height)
        .filter(|&n| n <= isize::MAX.unsigned_abs() / std::mem::size_of::<f32>())
        .ok_or(Error::Dimensions { width, height })?;
    let mut data = Vec::with_capacity(expected.min(MAX_PREALLOCATED_SAMPLES));
    for (offset, line) in lines.enumerate() {
        let line = line?;
        for token in line.split_whitespace() {
            let value = token.parse::<f32>().map_err(|_| Error::InvalidNumber {
                line: offset + 3,
                token: token.to_string(),
            })?;
            if data.len() == expected {
                return Err(Error::SampleCount {
                    expected,
                    found: expected + 1,
                });
            }
            data.push(value);
        }
    }
    if data.len() != expected {
        return Err(Error::SampleCount {
            expected,
            found: data.len(),
        });
    }
    Ok(FloatGrid::from_vec(width, height, data)?)
}

/// Writes `image` to a grid exchange file.
pub fn save_grid<P, B>(path: P, image: &B) -> Result<()>
where
    P: AsRef<Path>,
    B: ImageBuffer + ?Sized,
{
    let file = File::create(path)?;
    write_grid(BufWriter::new(file), image)
}

/// Reads a grid exchange file.
pub fn load_grid<P: AsRef<Path>>(path: P) -> Result<FloatGrid> {
    let file = File::open(path)?;
    read_grid(BufReader::new(file))
}

#[cfg(test)]
mod tests {
    #![allow(clippy::float_cmp)]
    use super::*;

    #[test]
    fn test_round_sample() {
        assert_eq!(round_sample(2.5), 3);
        assert_eq!(round_sample(2.49), 2);
        assert_eq!(round_sample(-2.5), -2);
        assert_eq!(round_sample(67_108_864.0), 67_108_864);
    }

    #[test]
    fn test_write_wraps_every_ten_values() {
        let mut grid = FloatGrid::new(4, 3);
        grid.set_value(0, 0, 1.6);
        grid.set_value(3, 2, 7.0);

        let mut out = Vec::new();
        write_grid(&mut out, &grid).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "CHO 2");
        assert_eq!(lines[1], "4 3");
        // Wrapping runs across rows, not per row.
        assert_eq!(lines[2], "2 0 0 0 0 0 0 0 0 0 ");
        assert_eq!(lines[3], "0 7 ");
        assert_eq!(lines.len(), 4);
    }

    #[test]
    fn test_read_any_whitespace() {
        let text = "CHO\t2\n3\t2\n1 2\n3\t4 5\n6\n";
        let grid = read_grid(text.as_bytes()).unwrap();
        assert_eq!((grid.width(), grid.height()), (3, 2));
        assert_eq!(grid.value(0, 1), 4.0);
        assert_eq!(grid.value(2, 1), 6.0);
    }

    #[test]
    fn test_read_errors() {
        assert!(matches!(read_grid("".as_bytes()), Err(Error::MissingHeader)));
        assert!(matches!(
            read_grid("CHO 2\n".as_bytes()),
            Err(Error::MissingHeader)
        ));
        assert!(matches!(
            read_grid("CHO 2\n3\n".as_bytes()),
            Err(Error::MissingHeader)
        ));
        assert!(matches!(
            read_grid("CHO 2\n2 2\n1 2 3\n".as_bytes()),
            Err(Error::SampleCount {
                expected: 4,
                found: 3
            })
        ));
        assert!(matches!(
            read_grid("CHO 2\n2 1\n1 x\n".as_bytes()),
            Err(Error::InvalidNumber { line: 3, .. })
        ));
    }

    #[test]
    fn test_read_rejects_unaddressable_dimensions() {
        let text = "CHO 2\n4294967296 4294967296\n1\n";
        assert!(matches!(
            read_grid(text.as_bytes()),
            Err(Error::Dimensions {
                width: 4_294_967_296,
                height: 4_294_967_296
            })
        ));
        assert!(matches!(
            read_grid("CHO 2\n200000 200000\n1 2\n".as_bytes()),
            Err(Error::SampleCount {
                expected: 40_000_000_000,
                found: 2
            })
        ));
        assert!(matches!(
            read_grid("CHO 2\n2 1\n1 2 3\n".as_bytes()),
            Err(Error::SampleCount {
                expected: 2,
                found: 3
            })
        ));
    }
}
