//! GeoJSON vector sources.

use std::collections::HashMap;
use std::path::Path;

use geojson::{GeoJson, Value};
use serde_json::{Map, Value as JsonValue};

use super::{DataSourceError, Feature, FieldValue, VectorDataset};
use crate::geometry::{wkb, Coord, Geometry};

/// GeoJSON coordinates are WGS84 unless a legacy `crs` member says otherwise.
const DEFAULT_SPATIAL_REF: &str = "EPSG:4326";

pub(super) fn read(path: &Path) -> Result<VectorDataset, DataSourceError> {
    let text = std::fs::read_to_string(path).map_err(|source| DataSourceError::Open {
        path: path.to_path_buf(),
        source,
    })?;
    let geojson: GeoJson = text
        .parse()
        .map_err(|e| DataSourceError::read(path, format!("invalid GeoJSON: {}", e)))?;

    let (features, foreign_members) = match geojson {
        GeoJson::FeatureCollection(fc) => (fc.features, fc.foreign_members),
        GeoJson::Feature(f) => (vec![f], None),
        GeoJson::Geometry(g) => (
            vec![geojson::Feature {
                bbox: None,
                geometry: Some(g),
                id: None,
                properties: None,
                foreign_members: None,
            }],
            None,
        ),
    };

    let mut dataset = VectorDataset {
        spatial_ref: Some(
            foreign_members
                .as_ref()
                .and_then(crs_member)
                .unwrap_or_else(|| DEFAULT_SPATIAL_REF.to_string()),
        ),
        ..Default::default()
    };

    for (index, feature) in features.into_iter().enumerate() {
        let mut attributes = HashMap::new();
        if let Some(properties) = feature.properties {
            for (key, value) in properties {
                if !dataset.fields.contains(&key) {
                    dataset.fields.push(key.clone());
                }
                attributes.insert(key, field_value(&value));
            }
        }

        let geometry = match feature.geometry {
            Some(g) => {
                let geometry = convert_value(&g.value).map_err(|reason| {
                    DataSourceError::read(path, format!("feature {}: {}", index, reason))
                })?;
                Some(wkb::encode(&geometry))
            }
            None => None,
        };

        dataset.features.push(Feature {
            attributes,
            geometry,
        });
    }

    Ok(dataset)
}

fn field_value(value: &JsonValue) -> FieldValue {
    match value {
        JsonValue::Null => FieldValue::Null,
        JsonValue::Bool(b) => FieldValue::Bool(*b),
        JsonValue::Number(n) => match n.as_i64() {
            Some(i) => FieldValue::Integer(i),
            None => FieldValue::Real(n.as_f64().unwrap_or(f64::NAN)),
        },
        JsonValue::String(s) => FieldValue::String(s.clone()),
        other => FieldValue::String(other.to_string()),
    }
}

/// Spatial reference from a GeoJSON 2008 `crs` member, e.g.
/// `{"type": "name", "properties": {"name": "urn:ogc:def:crs:EPSG::3857"}}`.
fn crs_member(members: &Map<String, JsonValue>) -> Option<String> {
    let name = members
        .get("crs")?
        .get("properties")?
        .get("name")?
        .as_str()?;
    Some(crs_name_to_definition(name))
}

fn crs_name_to_definition(name: &str) -> String {
    if name.ends_with("CRS84") {
        return DEFAULT_SPATIAL_REF.to_string();
    }
    let upper = name.to_ascii_uppercase();
    match upper.find("EPSG") {
        Some(pos) => {
            let code: String = upper[pos..]
                .chars()
                .skip_while(|c| !c.is_ascii_digit())
                .take_while(|c| c.is_ascii_digit())
                .collect();
            if code.is_empty() {
                name.to_string()
            } else {
                format!("EPSG:{}", code)
            }
        }
        None => name.to_string(),
    }
}

fn coord(position: &[f64]) -> Result<Coord, String> {
    match position {
        [x, y] => Ok(Coord::xy(*x, *y)),
        [x, y, z, ..] => Ok(Coord::xyz(*x, *y, *z)),
        _ => Err(format!("position has {} ordinates", position.len())),
    }
}

fn coords(positions: &[Vec<f64>]) -> Result<Vec<Coord>, String> {
    positions.iter().map(|p| coord(p)).collect()
}

fn rings(rings: &[Vec<Vec<f64>>]) -> Result<Vec<Vec<Coord>>, String> {
    rings.iter().map(|r| coords(r)).collect()
}

fn convert_value(value: &Value) -> Result<Geometry, String> {
    Ok(match value {
        Value::Point(p) => Geometry::Point(Some(coord(p)?)),
        Value::MultiPoint(points) => Geometry::MultiPoint(coords(points)?),
        Value::LineString(line) => Geometry::LineString(coords(line)?),
        Value::MultiLineString(lines) => Geometry::MultiLineString(rings(lines)?),
        Value::Polygon(polygon) => Geometry::Polygon(rings(polygon)?),
        Value::MultiPolygon(polygons) => Geometry::MultiPolygon(
            polygons
                .iter()
                .map(|p| rings(p))
                .collect::<Result<_, _>>()?,
        ),
        Value::GeometryCollection(members) => Geometry::GeometryCollection(
            members
                .iter()
                .map(|g| convert_value(&g.value))
                .collect::<Result<_, _>>()?,
        ),
    })
}
