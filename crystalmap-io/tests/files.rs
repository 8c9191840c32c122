#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_possible_wrap,
    clippy::float_cmp
)]
use approx::assert_abs_diff_eq;
use crystalmap_core::{FloatGrid, ImageBuffer, LabelGrid, Peak, PeakStore, OUTSIDE_DETECTOR};
use crystalmap_io::{load_config, load_grid, load_peaks, save_grid, save_peaks, Error};
use std::io::Write;
use tempfile::{tempdir, NamedTempFile};

#[test]
fn test_peak_list_file_round_trip() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("peaks.txt");

    let mut store = PeakStore::new();
    store.push(Peak::with_crystal(12, 40, 0));
    store.push(Peak::with_crystal(25, 41, 1));
    store.add(300, 7);
    save_peaks(&path, &store).unwrap();

    let loaded = load_peaks(&path).unwrap();
    let restored = PeakStore::from_peaks(loaded);
    let positions: Vec<(i32, i32, i32)> = restored.iter().map(|p| (p.x, p.y, p.crystal)).collect();
    assert_eq!(positions, vec![(12, 40, 0), (25, 41, 1), (300, 7, -1)]);
}

#[test]
fn test_bad_peak_file_leaves_store_alone() {
    let mut file = NamedTempFile::new().unwrap();
    writeln!(file, "point     x     y slice color").unwrap();
    writeln!(file, "    0    10    10     0").unwrap();
    writeln!(file, "    1    abc    10     1").unwrap();

    let mut store = PeakStore::new();
    store.add(1, 2);
    let before = store.clone();

    match load_peaks(file.path()) {
        Ok(peaks) => store.replace(peaks),
        Err(Error::InvalidNumber { line, token }) => {
            assert_eq!(line, 3);
            assert_eq!(token, "abc");
        }
        Err(other) => panic!("unexpected error: {other}"),
    }
    assert_eq!(store, before);
}

#[test]
fn test_crystal_map_export() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("map.txt");

    let mut labels = LabelGrid::new(5, 4);
    for y in 0..4 {
        for x in 0..3 {
            labels.claim(x, y, (y * 3 + x) as i32);
        }
    }
    save_grid(&path, &labels.to_float_grid()).unwrap();

    let text = std::fs::read_to_string(&path).unwrap();
    assert!(text.starts_with("CHO 2\n5 4\n"));
    assert!(text.lines().skip(2).all(|l| l.split_whitespace().count() <= 10));

    let grid = load_grid(&path).unwrap();
    assert_eq!((grid.width(), grid.height()), (5, 4));
    assert_eq!(grid.value(2, 3), 11.0);
    assert_eq!(grid.value(4, 0) as i32, OUTSIDE_DETECTOR);
}

#[test]
fn test_flood_image_values_are_rounded() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("flood.txt");
    let grid = FloatGrid::from_vec(3, 1, vec![0.4, 10.5, 99.7]).unwrap();
    save_grid(&path, &grid).unwrap();

    let loaded = load_grid(&path).unwrap();
    assert_abs_diff_eq!(loaded.value(0, 0), 0.0);
    assert_abs_diff_eq!(loaded.value(1, 0), 11.0);
    assert_abs_diff_eq!(loaded.value(2, 0), 100.0);
}

#[test]
fn test_load_config_file() {
    let mut file = NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"filter": {{"peak_size": 7}}, "enumeration": {{"columns": 3, "rows": 2}}}}"#
    )
    .unwrap();
    let config = load_config(file.path()).unwrap();
    assert_eq!(config.filter.peak_size, 7);
    assert_eq!(config.enumeration.total(), 6);

    assert!(matches!(
        load_config("/nonexistent/crystalmap.json"),
        Err(Error::Io(_))
    ));
}
