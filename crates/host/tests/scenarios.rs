//! End-to-end scenarios: catalog plugins driven through a host session.

mod common;

use common::*;
use ndarray::{Array3, array};
use rasterfn_colormap::ColorScheme;
use rasterfn_core::prelude::*;
use rasterfn_host::{Bindings, Session};

// ── NDVI ──────────────────────────────────────────────────────────────

fn red_nir() -> std::sync::Arc<dyn rasterfn_host::RasterSource> {
    let red = [100.0, 120.0, 200.0];
    let nir = [200.0, 180.0, 300.0];
    let values = Array3::from_shape_fn((2, 3, 3), |(b, r, _)| if b == 0 { red[r] } else { nir[r] });
    raster(grid(2, PixelType::U16, 3, 3), values)
}

#[test]
fn ndvi_scaled_to_grayscale() {
    init_tracing();
    let bindings = Bindings::new()
        .raster("raster", red_nir())
        .scalar("red", 1.0)
        .scalar("ir", 2.0)
        .scalar("method", "Grayscale");
    let session = Session::open(plugin("ndvi"), bindings, &options()).unwrap();
    let info = session.output_info();
    assert_eq!(info.band_count, 1);
    assert_eq!(info.pixel_type, PixelType::U8);

    let tile = session.update_pixels((0, 0), 3, 3);
    assert!(tile.failure.is_none());
    assert_eq!(tile.pixels.pixel_type(), PixelType::U8);
    // round(100 * ndvi + 100); the last row is (300 - 200) / 500 = 0.2
    let expected = array![[[133.0, 133.0, 133.0], [120.0, 120.0, 120.0], [120.0, 120.0, 120.0]]];
    assert_eq!(tile.pixels.to_f64(), expected);
    assert_eq!(tile.mask.sum(), 9);
}

#[test]
fn ndvi_colormap_renders_through_attached_colormap() {
    let bindings = Bindings::new().raster("raster", red_nir()).scalar("method", "colormap");
    let session = Session::open(plugin("ndvi"), bindings, &options()).unwrap();
    let rendered = session.render(2);
    assert!(rendered.info.colormap.is_some());
    let rgba = rendered.to_rgba(ColorScheme::Grayscale);
    assert_eq!(rgba.len(), 3 * 3 * 4);
    assert!(rgba.chunks(4).all(|px| px[3] == 255));
}

#[test]
fn ndvi_band_out_of_range_is_incompatible() {
    let bindings = Bindings::new().raster("raster", red_nir()).scalar("ir", 5.0);
    let err = Session::open(plugin("ndvi"), bindings, &options()).unwrap_err();
    assert!(matches!(err, Error::Compatibility(_)));
    assert!(err.is_fatal());
}

// ── Aggregate ─────────────────────────────────────────────────────────

fn three_inputs(
    middle_mask: Option<Array3<u8>>,
) -> Vec<std::sync::Arc<dyn rasterfn_host::RasterSource>> {
    let info = grid(1, PixelType::F32, 2, 2);
    let scaled = |k: f64| array![[[1.0, 2.0], [3.0, 4.0]]] * k;
    let middle = match middle_mask {
        Some(mask) => masked(info.clone(), scaled(10.0), mask),
        None => raster(info.clone(), scaled(10.0)),
    };
    vec![raster(info.clone(), scaled(1.0)), middle, raster(info, scaled(100.0))]
}

#[test]
fn aggregate_median() {
    init_tracing();
    let bindings = Bindings::new()
        .rasters("rasters", three_inputs(None))
        .scalar("method", "Median");
    let session = Session::open(plugin("aggregate"), bindings, &options()).unwrap();
    assert_eq!(session.output_info().pixel_type, PixelType::F32);

    let tile = session.update_pixels((0, 0), 2, 2);
    assert!(tile.failure.is_none());
    assert_eq!(tile.pixels.pixel_type(), PixelType::F32);
    assert_eq!(tile.pixels.to_f64(), array![[[10.0, 20.0], [30.0, 40.0]]]);
    assert_eq!(tile.mask, array![[[1, 1], [1, 1]]]);
}

#[test]
fn aggregate_with_one_masked_input() {
    let bindings = Bindings::new()
        .rasters("rasters", three_inputs(Some(array![[[0, 1], [1, 0]]])))
        .scalar("method", "Median");
    let session = Session::open(plugin("aggregate"), bindings, &options()).unwrap();
    let tile = session.update_pixels((0, 0), 2, 2);
    assert_eq!(tile.mask, array![[[0, 1], [1, 0]]]);
    let px = tile.pixels.to_f64();
    assert_eq!(px[[0, 0, 1]], 20.0);
    assert_eq!(px[[0, 1, 0]], 30.0);
}

// ── Padded windows ────────────────────────────────────────────────────

#[test]
fn hillshade_padded_window() {
    init_tracing();
    let (rows, cols) = (8, 8);
    let dem = Array3::from_shape_fn((1, rows, cols), |(_, r, c)| (r * 3 + c * 2) as f64);
    let mut input_mask = Array3::<u8>::ones((1, rows, cols));
    input_mask[[0, 2, 3]] = 0;
    input_mask[[0, 6, 6]] = 0;
    let source = masked(grid(1, PixelType::F32, rows, cols), dem, input_mask.clone());

    let bindings = Bindings::new().raster("raster", source);
    let session = Session::open(plugin("hillshade"), bindings, &options()).unwrap();
    assert_eq!(session.configuration().padding, 1);
    assert!(session.configuration().input_mask);

    // The kernel rejects any input that is not 6x6 for a 4x4 tile
    let tile = session.update_pixels((2, 2), 4, 4);
    assert!(tile.failure.is_none(), "{:?}", tile.failure);
    assert_eq!(tile.pixels.shape(), (1, 4, 4));
    assert_eq!(tile.mask.dim(), (1, 4, 4));

    for r in 0..4 {
        for c in 0..4 {
            let (ir, ic) = (r + 2, c + 2);
            let all_valid = (ir - 1..=ir + 1)
                .all(|y| (ic - 1..=ic + 1).all(|x| input_mask[[0, y, x]] == 1));
            assert_eq!(tile.mask[[0, r, c]], u8::from(all_valid), "pixel ({r}, {c})");
        }
    }
}

#[test]
fn halo_outside_the_raster_is_invalid() {
    let dem = Array3::from_elem((1, 4, 4), 50.0);
    let source = raster(grid(1, PixelType::F32, 4, 4), dem);
    let bindings = Bindings::new().raster("raster", source);
    let session = Session::open(plugin("hillshade"), bindings, &options()).unwrap();
    let rendered = session.render(4);
    // Only the inner 2x2 has a complete 3x3 neighbourhood
    assert_eq!(rendered.mask.sum(), 4);
    assert_eq!(rendered.mask[[0, 1, 1]], 1);
    assert!(rendered.failed_tiles.is_empty());
}

// ── Unit conversion with a date dependency ────────────────────────────

#[test]
fn per_second_to_per_month_uses_acquisition_date() {
    init_tracing();
    let metadata = KeyMetadata::new().with(names::ACQUISITION_DATE, "2019-04-15T00:00:00");
    let values = Array3::from_elem((1, 2, 2), 5.0);
    let source = with_metadata(grid(1, PixelType::F32, 2, 2), values, metadata);
    let session = Session::open(
        plugin("per_second_to_per_month"),
        Bindings::new().raster("raster", source),
        &options(),
    )
    .unwrap();

    let tile = session.update_pixels((0, 0), 2, 2);
    assert!(tile.failure.is_none());
    // 30 days * 86400 s * 5.0
    assert!(tile.pixels.to_f64().iter().all(|&v| v == 12_960_000.0));

    let dataset = session.key_metadata(&[names::DATA_TYPE], -1).unwrap();
    assert_eq!(dataset.get(names::DATA_TYPE).and_then(|v| v.as_str()), Some("Scientific"));
}

#[test]
fn per_second_to_per_month_without_date_fails() {
    let source = raster(grid(1, PixelType::F32, 2, 2), Array3::from_elem((1, 2, 2), 5.0));
    let err = Session::open(
        plugin("per_second_to_per_month"),
        Bindings::new().raster("raster", source),
        &options(),
    )
    .unwrap_err();
    assert!(matches!(err, Error::Metadata(_)));
}

// ── Endmember count ───────────────────────────────────────────────────

#[test]
fn unmixing_endmember_rows_must_match_bands() {
    init_tracing();
    let source = raster(grid(5, PixelType::F32, 2, 2), Array3::from_elem((5, 2, 2), 0.3));
    let six_rows = "[[0.1, 0.9], [0.2, 0.8], [0.3, 0.7], [0.4, 0.6], [0.5, 0.5], [0.6, 0.4]]";
    let bindings = Bindings::new().raster("raster", source).scalar("endmembers", six_rows);
    let err = Session::open(plugin("linear_spectral_unmixing"), bindings, &options()).unwrap_err();
    match err {
        Error::Compatibility(message) => {
            assert!(message.contains("6 rows"), "{message}");
            assert!(message.contains("5 bands"), "{message}");
        }
        other => panic!("expected a compatibility error, got {other:?}"),
    }
}

// ── No-data sentinel channel ──────────────────────────────────────────

#[test]
fn masked_input_reaches_a_sentinel_kernel_as_no_data() {
    init_tracing();
    let info = grid(1, PixelType::F32, 2, 2).with_no_data(-9999.0);
    let a = masked(info, array![[[5.0, 6.0], [7.0, 8.0]]], array![[[0, 1], [1, 1]]]);
    let b = raster(grid(1, PixelType::F32, 2, 2), Array3::ones((1, 2, 2)));
    let bindings = Bindings::new().raster("a", a).raster("b", b).scalar("operation", "Plus");
    let session = Session::open(plugin("arithmetic"), bindings, &options()).unwrap();
    assert!(!session.configuration().input_mask);
    assert_eq!(session.output_info().no_data_for(0), Some(-9999.0));

    let tile = session.update_pixels((0, 0), 2, 2);
    assert!(tile.failure.is_none(), "{:?}", tile.failure);
    assert_eq!(tile.mask, array![[[0, 1], [1, 1]]]);
    assert_eq!(tile.pixels.to_f64(), array![[[-9999.0, 7.0], [8.0, 9.0]]]);
}

#[test]
fn masked_input_without_a_sentinel_is_incompatible() {
    let a = masked(
        grid(1, PixelType::F32, 2, 2),
        Array3::ones((1, 2, 2)),
        array![[[0, 1], [1, 1]]],
    );
    let b = raster(grid(1, PixelType::F32, 2, 2), Array3::ones((1, 2, 2)));
    let bindings = Bindings::new().raster("a", a).raster("b", b);
    let err = Session::open(plugin("arithmetic"), bindings, &options()).unwrap_err();
    assert!(matches!(err, Error::Compatibility(_)), "{err:?}");
}

// ── Key metadata ──────────────────────────────────────────────────────

#[test]
fn key_metadata_override_and_reset() {
    let metadata = KeyMetadata::new()
        .with(names::DATA_TYPE, "Processed")
        .with(names::UNIT, "m")
        .with(names::SENSOR_NAME, "Landsat 8");
    let values = Array3::from_elem((2, 2, 2), 7.0);
    let source = with_metadata(grid(2, PixelType::U16, 2, 2), values, metadata);
    let bindings = Bindings::new()
        .raster("raster", source)
        .scalar("variable", "elevation")
        .scalar("unit", "")
        .scalar("bandnames", "Red, NIR");
    let session = Session::open(plugin("key_metadata"), bindings, &options()).unwrap();

    let dataset = session.key_metadata(&[], -1).unwrap();
    assert_eq!(dataset.get(names::VARIABLE).and_then(|v| v.as_str()), Some("elevation"));
    assert_eq!(dataset.get(names::DATA_TYPE).and_then(|v| v.as_str()), Some("Processed"));
    assert_eq!(dataset.get(names::SENSOR_NAME).and_then(|v| v.as_str()), Some("Landsat 8"));
    assert!(!dataset.contains(names::UNIT));

    let band = session.key_metadata(&[names::BAND_NAME], 1).unwrap();
    assert_eq!(band.get(names::BAND_NAME).and_then(|v| v.as_str()), Some("NIR"));

    // pixels pass through unchanged
    let tile = session.update_pixels((0, 0), 2, 2);
    assert_eq!(tile.pixels.pixel_type(), PixelType::U16);
    assert!(tile.pixels.to_f64().iter().all(|&v| v == 7.0));
}

// ── Binding failures ──────────────────────────────────────────────────

#[test]
fn binding_failures_abort_the_session() {
    let source = || raster(grid(1, PixelType::F32, 2, 2), Array3::zeros((1, 2, 2)));

    let unknown = Bindings::new().raster("raster", source()).scalar("gamma", 2.0);
    let err = Session::open(plugin("hillshade"), unknown, &options()).unwrap_err();
    assert!(matches!(err, Error::Binding { ref name, .. } if name == "gamma"));

    let off_domain = Bindings::new().raster("raster", source()).scalar("statistic", "Mode");
    assert!(matches!(
        Session::open(plugin("focal_statistics"), off_domain, &options()),
        Err(Error::Binding { .. })
    ));

    let unbound = Bindings::new();
    assert!(matches!(
        Session::open(plugin("hillshade"), unbound, &options()),
        Err(Error::Binding { .. })
    ));

    // grayscale declares three bands
    let bindings = Bindings::new().raster("raster", source());
    let err = Session::open(plugin("grayscale"), bindings, &options()).unwrap_err();
    assert!(matches!(err, Error::Binding { .. }));
    assert!(err.is_fatal());
}
