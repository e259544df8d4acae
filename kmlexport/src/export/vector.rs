//! Vector layers to KML folders.

use tracing::{debug, info, warn};

use crate::bindings::{BindingValue, KmlProperty, PropertyBindings};
use crate::crs::{CoordinateTransform, SpatialRef};
use crate::error::ExportResult;
use crate::geometry::{to_kml, translate_wkb, wkb};
use crate::kml::{Folder, KmlElement, Placemark};
use crate::layer::VectorLayer;
use crate::source::{Feature, LayerProvider, VectorDataset};

/// Build the folder for one vector layer.
///
/// One placemark per feature, in source order. `name` and `description`
/// bindings that match a schema field are read from each feature; any other
/// value is used literally. Requested extended fields missing from the
/// schema are skipped.
///
/// With `reproject` set, features declared in a reference other than WGS84
/// are transformed before translation.
pub fn export_vector(
    provider: &dyn LayerProvider,
    layer: &VectorLayer,
    bindings: &PropertyBindings,
    reproject: bool,
) -> ExportResult<Folder> {
    let dataset = provider.open_vector(layer)?;

    let label = bindings
        .folder_name()
        .map(str::to_string)
        .unwrap_or_else(|| layer.base_name());
    let name = bindings
        .name()
        .map(|v| BindingValue::classify(v, &dataset.fields));
    let description = bindings
        .description()
        .map(|v| BindingValue::classify(v, &dataset.fields));

    let (fields, missing): (Vec<&String>, Vec<&String>) = bindings
        .fields()
        .iter()
        .partition(|f| dataset.has_field(f));
    if !missing.is_empty() {
        warn!(layer = %label, ?missing, "Skipping fields not in layer schema");
    }
    for (property, value) in bindings.iter() {
        if !matches!(property, KmlProperty::Name | KmlProperty::Description) {
            debug!(layer = %label, %property, value, "Binding has no placemark output");
        }
    }

    let transform = if reproject {
        geographic_transform(&dataset)?
    } else {
        None
    };

    let mut folder = Folder::new(label);
    for feature in &dataset.features {
        folder.placemarks.push(Placemark {
            name: name.as_ref().map(|b| resolve(b, feature)),
            description: description.as_ref().map(|b| resolve(b, feature)),
            extended_data: fields
                .iter()
                .map(|f| (f.to_string(), feature.field_string(f)))
                .collect(),
            geometry: geometry(feature, transform.as_ref())?,
        });
    }

    info!(
        layer = %folder.name,
        features = folder.placemarks.len(),
        reprojected = transform.is_some(),
        "Exported vector layer"
    );
    Ok(folder)
}

fn resolve(binding: &BindingValue, feature: &Feature) -> String {
    match binding {
        BindingValue::Field(field) => feature.field_string(field),
        BindingValue::Literal(text) => text.clone(),
    }
}

fn geometry(
    feature: &Feature,
    transform: Option<&CoordinateTransform>,
) -> ExportResult<Option<KmlElement>> {
    let Some(bytes) = feature.geometry.as_deref() else {
        return Ok(None);
    };
    match transform {
        None => Ok(Some(translate_wkb(bytes)?)),
        Some(transform) => {
            let mut geometry = wkb::decode(bytes)?;
            transform.apply(&mut geometry)?;
            Ok(Some(to_kml(&geometry)))
        }
    }
}

/// Transform to WGS84, when the dataset declares a different reference.
fn geographic_transform(dataset: &VectorDataset) -> ExportResult<Option<CoordinateTransform>> {
    let Some(definition) = dataset.spatial_ref.as_deref() else {
        return Ok(None);
    };
    let source = SpatialRef::from_definition(definition)?;
    let target = SpatialRef::wgs84();
    if source == target {
        return Ok(None);
    }
    Ok(Some(CoordinateTransform::new(&source, &target)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ExportError;
    use crate::geometry::{Coord, Geometry};
    use crate::layer::{LayerSource, RasterLayer};
    use crate::source::{DataSourceError, FieldValue, RasterDataset};

    /// Serves one fixed vector dataset.
    struct StaticProvider(VectorDataset);

    impl LayerProvider for StaticProvider {
        fn open_vector(&self, _: &VectorLayer) -> Result<VectorDataset, DataSourceError> {
            Ok(self.0.clone())
        }

        fn open_raster(&self, layer: &RasterLayer) -> Result<RasterDataset, DataSourceError> {
            Err(DataSourceError::UnsupportedFormat(layer.path().to_path_buf()))
        }
    }

    fn layer() -> VectorLayer {
        VectorLayer(LayerSource::new("/data/places.geojson"))
    }

    fn dataset() -> VectorDataset {
        let point = wkb::encode(&Geometry::Point(Some(Coord::xy(1.0, 2.0))));
        let polygon = wkb::encode(&Geometry::Polygon(vec![vec![
            Coord::xy(0.0, 0.0),
            Coord::xy(1.0, 0.0),
            Coord::xy(1.0, 1.0),
            Coord::xy(0.0, 0.0),
        ]]));
        VectorDataset {
            fields: vec!["id".to_string(), "kind".to_string()],
            features: vec![
                Feature::new()
                    .with_attribute("id", FieldValue::String("A".into()))
                    .with_attribute("kind", FieldValue::Integer(1))
                    .with_geometry(point),
                Feature::new()
                    .with_attribute("id", FieldValue::String("B".into()))
                    .with_attribute("kind", FieldValue::Null)
                    .with_geometry(polygon),
            ],
            spatial_ref: Some("EPSG:4326".to_string()),
        }
    }

    #[test]
    fn test_field_binding_and_geometry() {
        let provider = StaticProvider(dataset());
        let bindings = PropertyBindings::new().with(KmlProperty::Name, "id");
        let folder = export_vector(&provider, &layer(), &bindings, false).unwrap();

        assert_eq!(folder.name, "places");
        assert_eq!(folder.placemarks.len(), 2);
        assert_eq!(folder.placemarks[0].name.as_deref(), Some("A"));
        assert_eq!(folder.placemarks[1].name.as_deref(), Some("B"));
        assert_eq!(folder.placemarks[0].geometry.as_ref().unwrap().name(), "Point");
        assert_eq!(folder.placemarks[1].geometry.as_ref().unwrap().name(), "Polygon");
        assert_eq!(folder.placemarks[0].description, None);
    }

    #[test]
    fn test_literal_binding_is_repeated() {
        let provider = StaticProvider(dataset());
        let bindings = PropertyBindings::new()
            .with(KmlProperty::Name, "Landmark")
            .with(KmlProperty::Description, "kind")
            .with_folder_name("Places of interest");
        let folder = export_vector(&provider, &layer(), &bindings, false).unwrap();

        assert_eq!(folder.name, "Places of interest");
        for placemark in &folder.placemarks {
            assert_eq!(placemark.name.as_deref(), Some("Landmark"));
        }
        assert_eq!(folder.placemarks[0].description.as_deref(), Some("1"));
        assert_eq!(folder.placemarks[1].description.as_deref(), Some(""));
    }

    #[test]
    fn test_padded_literal_is_kept_verbatim() {
        let provider = StaticProvider(dataset());
        let bindings = PropertyBindings::new().with(KmlProperty::Name, "  Lot 7 ");
        let folder = export_vector(&provider, &layer(), &bindings, false).unwrap();

        for placemark in &folder.placemarks {
            assert_eq!(placemark.name.as_deref(), Some("  Lot 7 "));
        }
    }

    #[test]
    fn test_padded_field_name_still_matches() {
        let mut data = dataset();
        data.fields[1] = " kind ".to_string();
        for feature in &mut data.features {
            let value = feature.attributes.remove("kind").unwrap();
            feature.attributes.insert(" kind ".to_string(), value);
        }
        let provider = StaticProvider(data);
        let bindings = PropertyBindings::new().with(KmlProperty::Description, " kind ");
        let folder = export_vector(&provider, &layer(), &bindings, false).unwrap();

        assert_eq!(folder.placemarks[0].description.as_deref(), Some("1"));
    }

    #[test]
    fn test_extended_fields_skip_unknown() {
        let provider = StaticProvider(dataset());
        let bindings = PropertyBindings::new().with_fields(["kind", "missing", "id"]);
        let folder = export_vector(&provider, &layer(), &bindings, false).unwrap();

        let data = &folder.placemarks[0].extended_data;
        assert_eq!(
            data,
            &vec![
                ("kind".to_string(), "1".to_string()),
                ("id".to_string(), "A".to_string())
            ]
        );
    }

    #[test]
    fn test_null_geometry_gives_label_only_placemark() {
        let mut data = dataset();
        data.features[1].geometry = None;
        let provider = StaticProvider(data);
        let folder =
            export_vector(&provider, &layer(), &PropertyBindings::new(), false).unwrap();
        assert!(folder.placemarks[0].geometry.is_some());
        assert!(folder.placemarks[1].geometry.is_none());
    }

    #[test]
    fn test_malformed_geometry_fails() {
        let mut data = dataset();
        data.features[0].geometry = Some(vec![1, 1, 0]);
        let provider = StaticProvider(data);
        let err =
            export_vector(&provider, &layer(), &PropertyBindings::new(), false).unwrap_err();
        assert!(matches!(err, ExportError::Geometry(_)));
    }

    #[test]
    fn test_geometry_kept_as_is_without_reprojection() {
        let mut data = dataset();
        data.spatial_ref = Some("EPSG:3857".to_string());
        data.features[0].geometry =
            Some(wkb::encode(&Geometry::Point(Some(Coord::xy(2_500_000.0, 0.0)))));
        let provider = StaticProvider(data);

        let folder =
            export_vector(&provider, &layer(), &PropertyBindings::new(), false).unwrap();
        let point = folder.placemarks[0].geometry.as_ref().unwrap();
        assert_eq!(point.child_text("coordinates"), Some("2500000,0"));

        let folder = export_vector(&provider, &layer(), &PropertyBindings::new(), true).unwrap();
        let point = folder.placemarks[0].geometry.as_ref().unwrap();
        let coords = point.child_text("coordinates").unwrap();
        let lon: f64 = coords.split(',').next().unwrap().parse().unwrap();
        let expected = (2_500_000.0f64 / 6_378_137.0).to_degrees();
        assert!((lon - expected).abs() < 1e-6, "{}", coords);
    }

    #[test]
    fn test_open_failure_is_data_source_error() {
        let provider = crate::source::FileLayerProvider;
        let missing = VectorLayer(LayerSource::new("/nope/x.geojson"));
        let err = export_vector(&provider, &missing, &PropertyBindings::new(), false).unwrap_err();
        assert!(matches!(err, ExportError::DataSource(_)));
    }
}
