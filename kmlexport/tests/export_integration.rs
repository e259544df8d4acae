//! Integration tests for whole export runs.
//!
//! These tests write real sources into temporary directories and run the
//! full pipeline:
//! - GeoJSON layers → plain KML document
//! - world-file georeferenced rasters → KMZ archive with overlay images
//! - job files → export request → artifact
//!
//! Run with: `cargo test --test export_integration`

use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use zip::ZipArchive;

use kmlexport::bindings::KmlProperty;
use kmlexport::export::{DOCUMENT_NAME, RASTER_DIR};
use kmlexport::layer::RasterLayer;
use kmlexport::render::{ImageSize, RenderError};
use kmlexport::source::{DataSourceError, Extent};
use kmlexport::{
    ConfigError, ExportArtifact, ExportConfig, ExportError, ExportJob, ExportRequest, Exporter,
    LayerRef, ProgressSink, PropertyBindings,
};

// ============================================================================
// Helper Functions
// ============================================================================

const EARTH_RADIUS: f64 = 6_378_137.0;

const PLACES: &str = r#"{
  "type": "FeatureCollection",
  "features": [
    {"type": "Feature", "properties": {"id": "A", "kind": "well"},
     "geometry": {"type": "Point", "coordinates": [1.0, 2.0]}},
    {"type": "Feature", "properties": {"id": "B", "kind": "field"},
     "geometry": {"type": "Polygon",
                  "coordinates": [[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]]}}
  ]
}"#;

fn write_places(dir: &Path) -> PathBuf {
    let path = dir.join("places.geojson");
    std::fs::write(&path, PLACES).unwrap();
    path
}

/// Write a PNG with a world file and a `.prj` naming `srs`.
///
/// `origin` is the top-left corner of the top-left pixel.
fn write_raster(
    dir: &Path,
    name: &str,
    size: (u32, u32),
    origin: (f64, f64),
    pixel: f64,
    srs: &str,
) -> PathBuf {
    let path = dir.join(format!("{}.png", name));
    RgbaImage::from_pixel(size.0, size.1, Rgba([10, 20, 30, 255]))
        .save(&path)
        .unwrap();
    let world = format!(
        "{}\n0\n0\n{}\n{}\n{}\n",
        pixel,
        -pixel,
        origin.0 + pixel / 2.0,
        origin.1 - pixel / 2.0
    );
    std::fs::write(dir.join(format!("{}.pgw", name)), world).unwrap();
    std::fs::write(dir.join(format!("{}.prj", name)), srs).unwrap();
    path
}

/// Renderer returning half-transparent red at the requested size.
fn translucent_red(
    _: &RasterLayer,
    _: &Extent,
    size: ImageSize,
) -> Result<RgbaImage, RenderError> {
    Ok(RgbaImage::from_pixel(size.width, size.height, Rgba([255, 0, 0, 128])))
}

fn exporter() -> Exporter {
    Exporter::default().with_renderer(Box::new(translucent_red))
}

fn read_entry(archive: &Path, name: &str) -> Vec<u8> {
    let mut archive = ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut entry = archive.by_name(name).unwrap();
    let mut bytes = Vec::new();
    entry.read_to_end(&mut bytes).unwrap();
    bytes
}

fn entry_names(archive: &Path) -> Vec<String> {
    let archive = ZipArchive::new(File::open(archive).unwrap()).unwrap();
    let mut names: Vec<String> = archive.file_names().map(str::to_string).collect();
    names.sort();
    names
}

/// Text of the first `<tag>` element in `xml`.
fn element_text<'a>(xml: &'a str, tag: &str) -> &'a str {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open).unwrap() + open.len();
    let end = start + xml[start..].find(&close).unwrap();
    &xml[start..end]
}

fn degrees(xml: &str, tag: &str) -> f64 {
    element_text(xml, tag).parse().unwrap()
}

#[derive(Clone, Default)]
struct Recorder {
    percents: Arc<Mutex<Vec<u8>>>,
    failures: Arc<Mutex<Vec<String>>>,
}

impl ProgressSink for Recorder {
    fn report(&self, percent: u8) {
        self.percents.lock().unwrap().push(percent);
    }

    fn fail(&self, message: &str) {
        self.failures.lock().unwrap().push(message.to_string());
    }
}

// ============================================================================
// Integration Tests
// ============================================================================

/// One vector layer with a field-bound name gives a plain document with one
/// folder and one placemark per feature.
#[test]
fn test_vector_layer_to_document() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_places(dir.path());
    let out = dir.path().join("places.kml");
    let request = ExportRequest::new(vec![(
        LayerRef::from_path(source.to_string_lossy()),
        PropertyBindings::new().with(KmlProperty::Name, "id"),
    )])
    .with_output(&out);

    let artifact = exporter().run(&request).unwrap();

    assert_eq!(artifact, ExportArtifact::Document(out.clone()));
    let xml = std::fs::read_to_string(&out).unwrap();
    assert!(xml.starts_with("<?xml version=\"1.0\" encoding=\"UTF-8\"?>"));
    assert!(xml.contains("xmlns=\"http://www.opengis.net/kml/2.2\""));
    assert_eq!(xml.matches("<Folder>").count(), 1);
    assert_eq!(element_text(&xml, "name"), "places");
    assert_eq!(xml.matches("<Placemark>").count(), 2);

    let a = xml.find("<name>A</name>").unwrap();
    let b = xml.find("<name>B</name>").unwrap();
    assert!(a < b);
    assert!(xml.find("<Point>").unwrap() < b);
    assert!(xml.find("<Polygon>").unwrap() > b);
    assert!(!xml.contains("GroundOverlay"));
}

/// A raster in Web Mercator is exported at native size, fully opaque, with
/// a lat/lon box matching its extent in degrees.
#[test]
fn test_projected_raster_to_archive() {
    let dir = tempfile::tempdir().unwrap();
    let raster = write_raster(
        dir.path(),
        "scan",
        (100, 50),
        (1_000_000.0, 6_000_000.0),
        1000.0,
        "EPSG:3857",
    );
    let out = dir.path().join("scan.kmz");
    let recorder = Recorder::default();
    let request = ExportRequest::new(vec![(
        LayerRef::from_path(raster.to_string_lossy()),
        PropertyBindings::new(),
    )])
    .with_output(&out);

    let artifact = exporter()
        .with_progress(Box::new(recorder.clone()))
        .run(&request)
        .unwrap();

    assert!(artifact.is_archive());
    assert_eq!(entry_names(&out), vec!["doc.kml", "rasters/scan.png"]);
    assert_eq!(*recorder.percents.lock().unwrap(), vec![100]);

    let png = read_entry(&out, &format!("{}/scan.png", RASTER_DIR));
    let image = image::load_from_memory(&png).unwrap();
    assert_eq!((image.width(), image.height()), (100, 50));
    assert!(!image.color().has_alpha());
    let pixel = image.to_rgba8().get_pixel(0, 0).0;
    assert_eq!(pixel[3], 255);
    assert_eq!(pixel[0], 255);
    assert!((126..=128).contains(&pixel[1]), "{:?}", pixel);

    let xml = String::from_utf8(read_entry(&out, DOCUMENT_NAME)).unwrap();
    assert_eq!(element_text(&xml, "visibility"), "1");
    assert_eq!(element_text(&xml, "href"), "rasters/scan.png");

    let lon = |x: f64| (x / EARTH_RADIUS).to_degrees();
    let lat = |y: f64| {
        (2.0 * (y / EARTH_RADIUS).exp().atan() - std::f64::consts::FRAC_PI_2).to_degrees()
    };
    let (north, south) = (degrees(&xml, "north"), degrees(&xml, "south"));
    let (east, west) = (degrees(&xml, "east"), degrees(&xml, "west"));

    assert!(south < north && west < east);
    assert!((west - lon(1_000_000.0)).abs() < 1e-6, "west {}", west);
    assert!((north - lat(6_000_000.0)).abs() < 1e-6, "north {}", north);
    // East and south snap to the square pixel grid of the view.
    assert!((east - lon(1_100_000.0)).abs() < 0.01, "east {}", east);
    assert!((south - lat(5_950_000.0)).abs() < 0.01, "south {}", south);
}

/// A geographic raster goes through the default renderer untouched.
#[test]
fn test_geographic_raster_with_file_renderer() {
    let dir = tempfile::tempdir().unwrap();
    let raster = write_raster(dir.path(), "dem", (8, 4), (10.0, 50.0), 0.25, "EPSG:4326");
    let out = dir.path().join("dem.kmz");
    let request = ExportRequest::new(vec![(
        LayerRef::from_path(raster.to_string_lossy()),
        PropertyBindings::new().with_folder_name("Elevation"),
    )])
    .with_output(&out);

    Exporter::default().run(&request).unwrap();

    let xml = String::from_utf8(read_entry(&out, DOCUMENT_NAME)).unwrap();
    assert_eq!(element_text(&xml, "name"), "Elevation");
    assert_eq!(degrees(&xml, "north"), 50.0);
    assert_eq!(degrees(&xml, "south"), 49.0);
    assert_eq!(degrees(&xml, "east"), 12.0);
    assert_eq!(degrees(&xml, "west"), 10.0);

    let png = read_entry(&out, "rasters/dem.png");
    let image = image::load_from_memory(&png).unwrap().to_rgb8();
    assert_eq!(image.dimensions(), (8, 4));
    assert!(image.pixels().all(|p| p.0 == [10, 20, 30]));
}

/// Vector and raster together give one archive with one folder and one
/// overlay, in selection order.
#[test]
fn test_mixed_selection() {
    let dir = tempfile::tempdir().unwrap();
    let places = write_places(dir.path());
    let raster = write_raster(dir.path(), "scan", (4, 4), (0.0, 4.0), 1.0, "EPSG:4326");
    let out = dir.path().join("mixed.kmz");
    let request = ExportRequest::default()
        .with_layer(
            LayerRef::from_path(places.to_string_lossy()),
            PropertyBindings::new(),
        )
        .with_layer(
            LayerRef::from_path(raster.to_string_lossy()),
            PropertyBindings::new(),
        )
        .with_output(&out);

    exporter().run(&request).unwrap();

    assert_eq!(entry_names(&out), vec!["doc.kml", "rasters/scan.png"]);
    let xml = String::from_utf8(read_entry(&out, DOCUMENT_NAME)).unwrap();
    assert_eq!(xml.matches("<Folder>").count(), 1);
    assert_eq!(xml.matches("<GroundOverlay>").count(), 1);
    assert!(xml.find("<Folder>").unwrap() < xml.find("<GroundOverlay>").unwrap());
}

/// A requested extended field missing from the schema is skipped.
#[test]
fn test_unknown_extended_field_is_skipped() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_places(dir.path());
    let out = dir.path().join("places.kml");
    let request = ExportRequest::new(vec![(
        LayerRef::from_path(source.to_string_lossy()),
        PropertyBindings::new().with_fields(["nope", "kind"]),
    )])
    .with_output(&out);

    exporter().run(&request).unwrap();

    let xml = std::fs::read_to_string(&out).unwrap();
    assert!(!xml.contains("name=\"nope\""));
    assert_eq!(xml.matches("<Data name=\"kind\">").count(), 2);
    assert!(xml.contains("<value>well</value>"));
}

/// Two runs over the same inputs produce identical documents.
#[test]
fn test_export_is_repeatable() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_places(dir.path());
    let bindings = PropertyBindings::new()
        .with(KmlProperty::Name, "id")
        .with(KmlProperty::Description, "Survey point")
        .with_fields(["kind"]);
    let layers = vec![(LayerRef::from_path(source.to_string_lossy()), bindings)];

    let first = dir.path().join("first.kml");
    let second = dir.path().join("second.kml");
    exporter()
        .run(&ExportRequest::new(layers.clone()).with_output(&first))
        .unwrap();
    exporter()
        .run(&ExportRequest::new(layers).with_output(&second))
        .unwrap();

    assert_eq!(
        std::fs::read(&first).unwrap(),
        std::fs::read(&second).unwrap()
    );
}

/// Without an output path nothing runs.
#[test]
fn test_missing_output_path() {
    let dir = tempfile::tempdir().unwrap();
    let source = write_places(dir.path());
    let request = ExportRequest::new(vec![(
        LayerRef::from_path(source.to_string_lossy()),
        PropertyBindings::new(),
    )]);

    let err = exporter().run(&request).unwrap_err();
    assert!(matches!(err, ExportError::Config(ConfigError::MissingOutput)));
}

/// A source that cannot be opened aborts the run and leaves no output.
#[test]
fn test_missing_source_aborts_run() {
    let dir = tempfile::tempdir().unwrap();
    let raster = write_raster(dir.path(), "scan", (4, 4), (0.0, 4.0), 1.0, "EPSG:4326");
    let out = dir.path().join("broken.kmz");
    let recorder = Recorder::default();
    let request = ExportRequest::default()
        .with_layer(
            LayerRef::from_path(raster.to_string_lossy()),
            PropertyBindings::new(),
        )
        .with_layer(
            LayerRef::vector(dir.path().join("gone.geojson").to_string_lossy()),
            PropertyBindings::new(),
        )
        .with_output(&out);

    let err = exporter()
        .with_progress(Box::new(recorder.clone()))
        .run(&request)
        .unwrap_err();

    assert!(matches!(
        err,
        ExportError::DataSource(DataSourceError::Open { .. })
    ));
    assert!(!out.exists());
    assert_eq!(*recorder.percents.lock().unwrap(), vec![100]);
    let failures = recorder.failures.lock().unwrap();
    assert_eq!(failures.len(), 1);
    assert!(failures[0].contains("gone.geojson"), "{}", failures[0]);
}

/// Malformed GeoJSON is a data source error.
#[test]
fn test_malformed_source() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("bad.geojson");
    std::fs::write(&source, "{\"type\": \"FeatureCollection\", \"features\": [").unwrap();
    let request = ExportRequest::new(vec![(
        LayerRef::from_path(source.to_string_lossy()),
        PropertyBindings::new(),
    )])
    .with_output(dir.path().join("bad.kml"));

    let err = exporter().run(&request).unwrap_err();
    assert!(matches!(err, ExportError::DataSource(DataSourceError::Read { .. })));
}

/// A raster without a `.prj` cannot be placed.
#[test]
fn test_raster_with_custom_lambert_prj() {
    let dir = tempfile::tempdir().unwrap();
    let lcc = r#"PROJCS["custom",GEOGCS["GCS_WGS_1984",DATUM["D_WGS_1984",SPHEROID["WGS_1984",6378137.0,298.257223563]],PRIMEM["Greenwich",0.0],UNIT["Degree",0.0174532925199433]],PROJECTION["Lambert_Conformal_Conic"],PARAMETER["False_Easting",0.0],PARAMETER["False_Northing",0.0],PARAMETER["Central_Meridian",-96.0],PARAMETER["Standard_Parallel_1",33.0],PARAMETER["Standard_Parallel_2",45.0],PARAMETER["Latitude_Of_Origin",39.0],UNIT["Meter",1.0]]"#;
    // 40 x 20 km straddling the projection origin at 96W 39N.
    let raster = write_raster(dir.path(), "plains", (40, 20), (-20_000.0, 10_000.0), 1_000.0, lcc);
    let out = dir.path().join("plains.kmz");
    let request = ExportRequest::new(vec![(
        LayerRef::from_path(raster.to_string_lossy()),
        PropertyBindings::new(),
    )])
    .with_output(&out);

    Exporter::default().run(&request).unwrap();

    let xml = String::from_utf8(read_entry(&out, DOCUMENT_NAME)).unwrap();
    let (north, south) = (degrees(&xml, "north"), degrees(&xml, "south"));
    let (east, west) = (degrees(&xml, "east"), degrees(&xml, "west"));
    assert!(south < 39.0 && 39.0 < north, "{} .. {}", south, north);
    assert!(west < -96.0 && -96.0 < east, "{} .. {}", west, east);
    // About 0.18 degrees of latitude and 0.46 of longitude.
    assert!((north - south - 0.18).abs() < 0.02, "{}", north - south);
    assert!((east - west - 0.46).abs() < 0.03, "{}", east - west);
}

#[test]
fn test_raster_without_reference() {
    let dir = tempfile::tempdir().unwrap();
    let raster = write_raster(dir.path(), "scan", (4, 4), (0.0, 4.0), 1.0, "EPSG:4326");
    std::fs::remove_file(dir.path().join("scan.prj")).unwrap();
    let out = dir.path().join("scan.kmz");
    let request = ExportRequest::new(vec![(
        LayerRef::from_path(raster.to_string_lossy()),
        PropertyBindings::new(),
    )])
    .with_output(&out);

    let err = exporter().run(&request).unwrap_err();
    assert!(matches!(err, ExportError::Reprojection(_)));
    assert!(!out.exists());
}

/// Progress is reported once per raster and never for vectors.
#[test]
fn test_progress_per_raster() {
    let dir = tempfile::tempdir().unwrap();
    let places = write_places(dir.path());
    let mut request = ExportRequest::default().with_layer(
        LayerRef::from_path(places.to_string_lossy()),
        PropertyBindings::new(),
    );
    for name in ["a", "b", "c"] {
        let raster = write_raster(dir.path(), name, (2, 2), (0.0, 2.0), 1.0, "EPSG:4326");
        request = request.with_layer(
            LayerRef::from_path(raster.to_string_lossy()),
            PropertyBindings::new(),
        );
    }
    let recorder = Recorder::default();

    exporter()
        .with_progress(Box::new(recorder.clone()))
        .run(&request.with_output(dir.path().join("all.kmz")))
        .unwrap();

    assert_eq!(*recorder.percents.lock().unwrap(), vec![33, 66, 100]);
    assert!(recorder.failures.lock().unwrap().is_empty());
}

/// A job file drives a full run, with bindings and order taken from it.
#[test]
fn test_job_file_run() {
    let dir = tempfile::tempdir().unwrap();
    write_places(dir.path());
    write_raster(dir.path(), "scan", (4, 2), (5.0, 45.0), 0.5, "EPSG:4326");
    let job_path = dir.path().join("job.ini");
    std::fs::write(
        &job_path,
        "\
[output]
path = out/survey.kmz

[layer Scan]
path = scan.png
Name = Survey scan

[layer Places]
path = places.geojson
Name = id
description = kind
folder_name = Points of interest
",
    )
    .unwrap();

    let job = ExportJob::load(&job_path).unwrap();
    let artifact = exporter().run(&job.into_request(None)).unwrap();

    let out = dir.path().join("out/survey.kmz");
    assert_eq!(artifact.path(), out);
    let xml = String::from_utf8(read_entry(&out, DOCUMENT_NAME)).unwrap();
    assert!(xml.find("<GroundOverlay>").unwrap() < xml.find("<Folder>").unwrap());
    assert!(xml.contains("<name>Survey scan</name>"));
    assert!(xml.contains("<name>Points of interest</name>"));
    assert!(xml.contains("<description>well</description>"));
}

/// With vector reprojection enabled, Web Mercator features land in degrees.
#[test]
fn test_vector_reprojection_opt_in() {
    let dir = tempfile::tempdir().unwrap();
    let source = dir.path().join("merc.geojson");
    std::fs::write(
        &source,
        r#"{"type": "FeatureCollection",
            "crs": {"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}},
            "features": [
              {"type": "Feature", "properties": {},
               "geometry": {"type": "Point", "coordinates": [2500000.0, 0.0]}}
            ]}"#,
    )
    .unwrap();
    let layers = vec![(
        LayerRef::from_path(source.to_string_lossy()),
        PropertyBindings::new(),
    )];

    let plain = dir.path().join("plain.kml");
    exporter()
        .run(&ExportRequest::new(layers.clone()).with_output(&plain))
        .unwrap();
    let xml = std::fs::read_to_string(&plain).unwrap();
    assert_eq!(element_text(&xml, "coordinates"), "2500000,0");

    let reprojected = dir.path().join("reprojected.kml");
    Exporter::new(ExportConfig::default().with_reproject_vectors(true))
        .run(&ExportRequest::new(layers).with_output(&reprojected))
        .unwrap();
    let xml = std::fs::read_to_string(&reprojected).unwrap();
    let coords = element_text(&xml, "coordinates");
    let lon: f64 = coords.split(',').next().unwrap().parse().unwrap();
    assert!((lon - (2_500_000.0 / EARTH_RADIUS).to_degrees()).abs() < 1e-6, "{}", coords);
}
