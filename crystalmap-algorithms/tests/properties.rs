#![allow(clippy::cast_possible_wrap, clippy::float_cmp)]
use approx::assert_abs_diff_eq;
use crystalmap_algorithms::{
    CrystalEnumerator, PeakDetector, RadialFilter, RegionTessellator, SincKernel,
};
use crystalmap_core::{
    DetectionConfig, EnumerationConfig, EnumerationError, Error, FilterConfig, FloatGrid,
    ImageBuffer, NoProgress, PeakStore, RadiusMap, Roi, UNASSIGNED,
};

/// 4x3 array at x = 10..40, y = 10..30, inserted column by column.
fn perfect_grid() -> PeakStore {
    let mut store = PeakStore::new();
    for x in [40, 20, 10, 30] {
        for y in [30, 10, 20] {
            store.add(x, y);
        }
    }
    store
}

fn crystal_at(store: &PeakStore, x: i32, y: i32) -> i32 {
    store
        .iter()
        .find(|p| (p.x, p.y) == (x, y))
        .map_or(i32::MIN, |p| p.crystal)
}

#[test]
fn test_filter_flatness() {
    for threshold in [0.0, 5.0, 20.0] {
        let config = FilterConfig::default()
            .with_peak_size(9)
            .with_threshold_pct(threshold);
        let kernel = SincKernel::new(&config).unwrap();
        let c = 50.0f32;
        let expected = (f64::from(c) * kernel.sum()).max(0.0);

        let raw = FloatGrid::filled(40, 40, c);
        let mut radii = RadiusMap::new(40, 40);
        let roi = Roi::new(5, 5, 30, 30);
        let out = RadialFilter::new(config)
            .apply(&raw, Some(roi), &mut radii, &mut NoProgress)
            .unwrap();

        // l = 4: fully covered pixels are 9..31 on both axes
        for y in 9..31 {
            for x in 9..31 {
                assert_abs_diff_eq!(f64::from(out.value(x, y)), expected, epsilon = 1e-3);
            }
        }
        assert_eq!(out.value(2, 2), c);
    }
}

#[test]
fn test_zero_threshold_flattens_background() {
    let config = FilterConfig::default().with_peak_size(13);
    let kernel = SincKernel::new(&config).unwrap();
    assert_abs_diff_eq!(kernel.sum(), 0.0, epsilon = 1e-9);
}

#[test]
fn test_single_peak_detection() {
    let mut image = FloatGrid::new(101, 101);
    image.set_value(50, 50, 100.0);
    let mut radii = RadiusMap::new(101, 101);
    radii.fill(Roi::full(101, 101), 13);

    let mut store = PeakStore::new();
    let added = PeakDetector::new(DetectionConfig::default())
        .detect(&image, &radii, image.max_value(), &mut store)
        .unwrap();

    assert_eq!(added, 1);
    let peak = store.as_slice()[0];
    assert_eq!((peak.x, peak.y), (50, 50));
    assert_eq!(peak.crystal, UNASSIGNED);
}

#[test]
fn test_enumeration_on_perfect_grid() {
    let mut store = perfect_grid();
    let mut enumerator = CrystalEnumerator::new(EnumerationConfig::new(4, 3));
    enumerator.enumerate(&mut store).unwrap();

    let mut ordered: Vec<_> = store.iter().copied().collect();
    ordered.sort_by_key(|p| p.crystal);
    let positions: Vec<(i32, i32)> = ordered.iter().map(|p| (p.x, p.y)).collect();
    let mut expected = Vec::new();
    for y in [10, 20, 30] {
        for x in [10, 20, 30, 40] {
            expected.push((x, y));
        }
    }
    assert_eq!(positions, expected);
    let ids: Vec<i32> = ordered.iter().map(|p| p.crystal).collect();
    assert_eq!(ids, (0..12).collect::<Vec<_>>());
}

#[test]
fn test_mismatch_leaves_store_unmodified() {
    let mut store = perfect_grid();
    let mut enumerator = CrystalEnumerator::new(EnumerationConfig::new(4, 3));
    enumerator.enumerate(&mut store).unwrap();

    store.select(5);
    store.remove_current();
    let before = store.clone();

    let err = enumerator.enumerate(&mut store).unwrap_err();
    assert!(matches!(
        err,
        Error::Enumeration(EnumerationError::PeakCountMismatch {
            expected: 12,
            found: 11
        })
    ));
    assert_eq!(err.to_string(), "too few peaks: expected 12, found 11");
    assert_eq!(store, before);
}

#[test]
fn test_correction_locality() {
    let mut store = perfect_grid();
    let mut enumerator = CrystalEnumerator::new(EnumerationConfig::new(4, 3));
    enumerator.enumerate(&mut store).unwrap();
    let before = store.clone();

    let bad = store
        .iter()
        .position(|p| (p.x, p.y) == (30, 20))
        .unwrap();
    assert_eq!(store.as_slice()[bad].crystal, 6);

    let err = enumerator.correct(&mut store, bad, 5).unwrap_err();
    assert!(matches!(
        err,
        Error::Enumeration(EnumerationError::SelectionExhausted { crystal: 7 })
    ));

    // Everything below the corrected id is untouched.
    for (now, then) in store.iter().zip(before.iter()) {
        if (0..5).contains(&then.crystal) {
            assert_eq!(now.crystal, then.crystal);
        }
    }
    assert_eq!(crystal_at(&store, 30, 20), 5);
    assert_eq!(crystal_at(&store, 40, 20), 6);
    // The peak that used to hold 5 lost its number.
    assert_eq!(crystal_at(&store, 20, 20), UNASSIGNED);
    assert_eq!(crystal_at(&store, 10, 30), UNASSIGNED);
}

#[test]
fn test_correction_repairs_misnumbered_row_start() {
    // Row 1 starts with a peak pushed down to (12, 26); the greedy row start
    // prefers (20, 20) and the row runs out at crystal 7.
    let mut store = PeakStore::new();
    for (x, y) in [
        (10, 10),
        (20, 10),
        (30, 10),
        (40, 10),
        (12, 26),
        (20, 20),
        (30, 20),
        (40, 20),
        (10, 30),
        (20, 30),
        (30, 30),
        (40, 30),
    ] {
        store.add(x, y);
    }
    let mut enumerator = CrystalEnumerator::new(EnumerationConfig::new(4, 3));
    let err = enumerator.enumerate(&mut store).unwrap_err();
    assert!(matches!(
        err,
        Error::Enumeration(EnumerationError::SelectionExhausted { crystal: 7 })
    ));
    assert_eq!(crystal_at(&store, 20, 20), 4);
    assert_eq!(crystal_at(&store, 12, 26), UNASSIGNED);
    let first_row: Vec<i32> = store.iter().take(4).map(|p| p.crystal).collect();

    let bad = store
        .iter()
        .position(|p| (p.x, p.y) == (12, 26))
        .unwrap();
    enumerator.correct(&mut store, bad, 4).unwrap();

    let now: Vec<i32> = store.iter().take(4).map(|p| p.crystal).collect();
    assert_eq!(now, first_row);
    let expected = [
        ((12, 26), 4),
        ((20, 20), 5),
        ((30, 20), 6),
        ((40, 20), 7),
        ((10, 30), 8),
        ((20, 30), 9),
        ((30, 30), 10),
        ((40, 30), 11),
    ];
    for ((x, y), crystal) in expected {
        assert_eq!(crystal_at(&store, x, y), crystal, "peak ({x}, {y})");
    }
    assert_eq!(store.mapped_count(), 12);
}

#[test]
fn test_correction_with_same_id_is_stable() {
    let mut store = perfect_grid();
    let mut enumerator = CrystalEnumerator::new(EnumerationConfig::new(4, 3));
    enumerator.enumerate(&mut store).unwrap();
    let before = store.clone();

    let bad = store
        .iter()
        .position(|p| (p.x, p.y) == (30, 20))
        .unwrap();
    enumerator.correct(&mut store, bad, 6).unwrap();
    assert_eq!(store, before);
}

#[test]
fn test_tessellation_idempotence() {
    let mut store = perfect_grid();
    CrystalEnumerator::new(EnumerationConfig::new(4, 3))
        .enumerate(&mut store)
        .unwrap();

    let tessellator = RegionTessellator::new(7, 0);
    let first = tessellator.tessellate(&store, 60, 50, &mut NoProgress);
    let second = tessellator.tessellate(&store, 60, 50, &mut NoProgress);
    assert_eq!(first.labels.as_slice(), second.labels.as_slice());
    assert_eq!(first, second);
}

#[test]
fn test_border_coverage() {
    let mut store = PeakStore::new();
    for y in [40, 50, 60] {
        for x in [40, 50, 60, 70] {
            store.add(x, y);
        }
    }
    CrystalEnumerator::new(EnumerationConfig::new(4, 3))
        .enumerate(&mut store)
        .unwrap();

    let tessellator = RegionTessellator::new(13, 0);
    assert_eq!(tessellator.search_range(), 26);
    let result = tessellator.tessellate(&store, 120, 100, &mut NoProgress);

    for y in 40..=60 {
        for x in 40..=70 {
            assert!(result.labels.is_claimed(x, y), "({x}, {y}) unclaimed");
            let label = result.labels.get(x, y);
            assert!((0..12).contains(&label) || label == crystalmap_core::OUTSIDE_DETECTOR);
        }
    }
    // Synthetic seeds claim the surroundings of the array.
    assert!(result.labels.is_claimed(40, 20));
    assert_eq!(result.labels.get(40, 20), crystalmap_core::OUTSIDE_DETECTOR);
    assert!(result.boundaries.count() > 0);
}
