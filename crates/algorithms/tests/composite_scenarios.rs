//! End-to-end compositing scenarios on small synthetic Landsat 8 series.

use approx::assert_relative_eq;
use cloudless_algorithms::imagery::{
    build_composite, quality_mosaic, select_winners, with_index, BandMapping, BandRole,
    CompositeBuilder, CompositeParams, SpectralIndex,
};
use cloudless_core::{Band, Error, GeoTransform, ImageSequence, Raster};
use cloudless_parallel::ProcessingMode;

const ROWS: usize = 8;
const COLS: usize = 9;

/// Deterministic pseudo-reflectance in [0.02, 0.62)
fn reflectance(seed: usize, row: usize, col: usize) -> f64 {
    let h = (seed * 7919 + row * 104_729 + col * 1_299_709) % 600;
    0.02 + h as f64 / 1000.0
}

fn scene(seed: usize) -> Raster {
    let bands = BandRole::ALL
        .iter()
        .enumerate()
        .map(|(k, role)| {
            let values = (0..ROWS * COLS)
                .map(|i| reflectance(seed * 11 + k, i / COLS, i % COLS))
                .collect();
            Band::from_vec(role.landsat8(), values, ROWS, COLS).unwrap()
        })
        .collect();
    Raster::from_bands(bands)
        .unwrap()
        .with_transform(GeoTransform::new(500_000.0, 7_800_000.0, 30.0, -30.0))
}

/// Cloud score that is cloudy on a diagonal stripe depending on `seed`
fn cloud_score(seed: usize) -> Band {
    let values = (0..ROWS * COLS)
        .map(|i| {
            let (row, col) = (i / COLS, i % COLS);
            if (row + col + seed) % 4 == 0 { 80.0 } else { 10.0 }
        })
        .collect();
    Band::from_vec("cloud", values, ROWS, COLS).unwrap()
}

fn series(n: usize) -> (ImageSequence, Vec<Band>) {
    let images = (0..n).map(scene).collect();
    let scores = (0..n).map(cloud_score).collect();
    (ImageSequence::new(images).unwrap(), scores)
}

#[test]
fn composite_takes_greenest_clear_pixel() {
    let (seq, scores) = series(5);
    let out = CompositeBuilder::default().build(&seq, &scores).unwrap();

    for row in 0..ROWS {
        for col in 0..COLS {
            let mut best: Option<(f64, usize)> = None;
            for (i, img) in seq.iter().enumerate() {
                if scores[i].sample(row, col).unwrap() > 20.0 {
                    continue;
                }
                let nir = img.value("B5", row, col).unwrap().unwrap();
                let red = img.value("B4", row, col).unwrap().unwrap();
                let ndvi = (nir - red) / (nir + red);
                if best.map_or(true, |(v, _)| ndvi > v) {
                    best = Some((ndvi, i));
                }
            }

            match best {
                Some((ndvi, i)) => {
                    let got = out.value("NDVI", row, col).unwrap().unwrap();
                    assert_relative_eq!(got, ndvi, epsilon = 1e-12);
                    for role in BandRole::ALL {
                        let name = role.landsat8();
                        assert_eq!(
                            out.value(name, row, col).unwrap(),
                            seq.images()[i].value(name, row, col).unwrap(),
                            "band {name} at ({row}, {col})"
                        );
                    }
                }
                None => assert!(!out.is_valid(row, col)),
            }
        }
    }
}

#[test]
fn two_images_one_cloudy_pixel() {
    let make = |red: f64, nir: f64| {
        Raster::from_bands(vec![Band::filled("B4", 2, 1, red), Band::filled("B5", 2, 1, nir)])
            .unwrap()
    };
    let seq = ImageSequence::new(vec![make(0.1, 0.5), make(0.5, 0.6)]).unwrap();
    let scores = vec![
        Band::filled("cloud", 2, 1, 0.0),
        Band::from_vec("cloud", vec![50.0, 5.0], 2, 1).unwrap(),
    ];
    let params = CompositeParams {
        derived: vec![],
        bands: BandMapping::empty()
            .with(BandRole::Red, "B4")
            .with(BandRole::Nir, "B5"),
        ..CompositeParams::default()
    };

    let out = build_composite(&seq, &scores, &params).unwrap();
    for row in 0..2 {
        assert_relative_eq!(out.value("NDVI", row, 0).unwrap().unwrap(), 0.6667, epsilon = 1e-4);
        assert_eq!(out.value("B4", row, 0).unwrap(), Some(0.1));
    }
}

#[test]
fn sequential_and_parallel_agree() {
    let (seq, scores) = series(7);
    let run = |mode| {
        let params = CompositeParams {
            mode,
            ..CompositeParams::default()
        };
        build_composite(&seq, &scores, &params).unwrap()
    };

    let sequential = run(ProcessingMode::Sequential);
    let parallel = run(ProcessingMode::Parallel);
    let pooled = run(ProcessingMode::ParallelWith(3));

    assert_eq!(sequential.bands(), parallel.bands());
    assert_eq!(sequential.mask(), parallel.mask());
    assert_eq!(sequential.bands(), pooled.bands());
}

#[test]
fn reversing_sequence_without_ties_keeps_result() {
    let images: Vec<Raster> = (0..4)
        .map(|i| with_index(&scene(i), SpectralIndex::Ndvi, &BandMapping::landsat8()).unwrap())
        .collect();
    let mut reversed = images.clone();
    reversed.reverse();

    let mosaic = |images: Vec<Raster>| {
        let seq = ImageSequence::new(images).unwrap();
        quality_mosaic(&seq, "NDVI", ProcessingMode::Parallel).unwrap()
    };
    let forward = mosaic(images);
    let backward = mosaic(reversed);

    assert_eq!(forward.bands(), backward.bands());
}

#[test]
fn identical_images_tie_to_first() {
    let image = with_index(&scene(3), SpectralIndex::Ndvi, &BandMapping::landsat8()).unwrap();
    let seq = ImageSequence::new(vec![image.clone(), image.clone(), image]).unwrap();

    let winners = select_winners(&seq, "NDVI", ProcessingMode::Parallel).unwrap();
    assert!(winners.iter().all(|w| *w == Some(0)));
}

#[test]
fn fully_cloudy_series_is_all_nodata() {
    let (seq, _) = series(3);
    let scores = vec![Band::filled("cloud", ROWS, COLS, 21.0); 3];
    let out = CompositeBuilder::default().build(&seq, &scores).unwrap();

    assert_eq!(out.mask().count_valid(), 0);
    assert!(out.bands().iter().all(|b| b.view().iter().all(Option::is_none)));
}

#[test]
fn composite_keeps_first_image_geotransform() {
    let (seq, scores) = series(2);
    let out = CompositeBuilder::default().build(&seq, &scores).unwrap();
    assert_eq!(out.transform(), seq.first().transform());
    assert_eq!(out.cell_size(), 30.0);
}

#[test]
fn structural_errors_are_reported_before_output() {
    let (seq, mut scores) = series(2);
    scores.pop();
    assert!(matches!(
        CompositeBuilder::default().build(&seq, &scores),
        Err(Error::CloudScoreCount { images: 2, scores: 1 })
    ));

    let small = Raster::from_bands(vec![Band::filled("B4", 2, 2, 0.1)]).unwrap();
    assert!(matches!(
        ImageSequence::new(vec![scene(0), small]),
        Err(Error::ShapeMismatch { image: Some(1), .. })
    ));
}
