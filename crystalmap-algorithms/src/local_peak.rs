//! Snap a manually placed peak onto the brightest nearby pixel.
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::float_cmp
)]

use crate::detect::disc_half_height;
use crystalmap_core::ImageBuffer;

/// Finds the brightest pixel within a disc of radius `peak_size / 2` around
/// `(x, y)`.
///
/// Pixels are visited x-major. When a pixel ties the running maximum, the
/// position moves halfway towards it (integer halving), so a flat plateau
/// resolves near its middle. Returns `None` if the disc misses the image.
#[must_use]
pub fn locate_local_peak<B: ImageBuffer + ?Sized>(
    image: &B,
    x: i32,
    y: i32,
    peak_size: u32,
) -> Option<(i32, i32)> {
    let half = i64::from(peak_size / 2);
    let (cx, cy) = (i64::from(x), i64::from(y));
    let mut best: Option<((i64, i64), f32)> = None;

    for i in cx - half..=cx + half {
        let reach = disc_half_height(half, i - cx);
        for j in cy - reach..=cy + reach {
            if !image.contains(i, j) {
                continue;
            }
            let value = image.value(i as usize, j as usize);
            best = match best {
                None => Some(((i, j), value)),
                Some((_, max)) if value > max => Some(((i, j), value)),
                Some(((px, py), max)) if value == max => Some((((px + i) / 2, (py + j) / 2), max)),
                keep => keep,
            };
        }
    }

    best.map(|((px, py), _)| (px as i32, py as i32))
}
