//! ESRI Shapefile vector sources (`.shp` + `.dbf`, optional `.prj`).

use std::collections::HashMap;
use std::path::Path;

use shapefile::dbase;
use shapefile::{PolygonRing, Shape};

use super::{read_prj_sidecar, DataSourceError, Feature, FieldValue, VectorDataset};
use crate::geometry::{wkb, Coord, Geometry};

/// Name dbase gives the record deletion marker column.
const DELETION_FLAG: &str = "DeletionFlag";

pub(super) fn read(path: &Path) -> Result<VectorDataset, DataSourceError> {
    let shapes = shapefile::ShapeReader::from_path(path)
        .and_then(|reader| reader.read())
        .map_err(|e| DataSourceError::read(path, e))?;

    let dbf_path = path.with_extension("dbf");
    let (fields, records) = if dbf_path.is_file() {
        let mut reader =
            dbase::Reader::from_path(&dbf_path).map_err(|e| DataSourceError::read(&dbf_path, e))?;
        let fields: Vec<String> = reader
            .fields()
            .iter()
            .map(|f| f.name().to_string())
            .filter(|name| name != DELETION_FLAG)
            .collect();
        let records = reader
            .read()
            .map_err(|e| DataSourceError::read(&dbf_path, e))?;
        (fields, Some(records))
    } else {
        (Vec::new(), None)
    };

    if let Some(records) = &records {
        if records.len() != shapes.len() {
            return Err(DataSourceError::read(
                path,
                format!(
                    "{} shapes but {} attribute records",
                    shapes.len(),
                    records.len()
                ),
            ));
        }
    }

    let mut features = Vec::with_capacity(shapes.len());
    for (index, shape) in shapes.iter().enumerate() {
        let geometry = convert_shape(shape)
            .map_err(|reason| DataSourceError::read(path, format!("shape {}: {}", index, reason)))?
            .map(|g| wkb::encode(&g));

        let mut attributes = HashMap::new();
        if let Some(record) = records.as_ref().and_then(|r| r.get(index)) {
            for field in &fields {
                if let Some(value) = record.get(field) {
                    attributes.insert(field.clone(), field_value(value));
                }
            }
        }

        features.push(Feature {
            attributes,
            geometry,
        });
    }

    Ok(VectorDataset {
        fields,
        features,
        spatial_ref: read_prj_sidecar(path)?,
    })
}

fn field_value(value: &dbase::FieldValue) -> FieldValue {
    use dbase::FieldValue as Dbf;
    match value {
        Dbf::Character(Some(s)) => FieldValue::String(s.trim_end().to_string()),
        Dbf::Numeric(Some(n)) => numeric(*n),
        Dbf::Float(Some(n)) => FieldValue::Real(f64::from(*n)),
        Dbf::Logical(Some(b)) => FieldValue::Bool(*b),
        Dbf::Date(Some(d)) => FieldValue::Date {
            year: d.year(),
            month: d.month(),
            day: d.day(),
        },
        Dbf::Integer(i) => FieldValue::Integer(i64::from(*i)),
        Dbf::Double(n) | Dbf::Currency(n) => FieldValue::Real(*n),
        Dbf::Memo(s) => FieldValue::String(s.clone()),
        // Empty values and types with no plain-text form.
        _ => FieldValue::Null,
    }
}

/// DBF numerics are stored as text; whole numbers stay integers.
fn numeric(n: f64) -> FieldValue {
    if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
        FieldValue::Integer(n as i64)
    } else {
        FieldValue::Real(n)
    }
}

fn convert_shape(shape: &Shape) -> Result<Option<Geometry>, String> {
    let xy = |p: &shapefile::Point| Coord::xy(p.x, p.y);
    let xym = |p: &shapefile::PointM| Coord::xy(p.x, p.y);
    let xyz = |p: &shapefile::PointZ| Coord::xyz(p.x, p.y, p.z);

    Ok(Some(match shape {
        Shape::NullShape => return Ok(None),
        Shape::Point(p) => Geometry::Point(Some(xy(p))),
        Shape::PointM(p) => Geometry::Point(Some(xym(p))),
        Shape::PointZ(p) => Geometry::Point(Some(xyz(p))),
        Shape::Polyline(l) => lines(l.parts(), xy),
        Shape::PolylineM(l) => lines(l.parts(), xym),
        Shape::PolylineZ(l) => lines(l.parts(), xyz),
        Shape::Polygon(p) => polygons(p.rings(), xy),
        Shape::PolygonM(p) => polygons(p.rings(), xym),
        Shape::PolygonZ(p) => polygons(p.rings(), xyz),
        Shape::Multipoint(m) => Geometry::MultiPoint(m.points().iter().map(xy).collect()),
        Shape::MultipointM(m) => Geometry::MultiPoint(m.points().iter().map(xym).collect()),
        Shape::MultipointZ(m) => Geometry::MultiPoint(m.points().iter().map(xyz).collect()),
        Shape::Multipatch(_) => return Err("multipatch shapes are not supported".to_string()),
    }))
}

fn lines<P>(parts: &[Vec<P>], to_coord: impl Fn(&P) -> Coord) -> Geometry {
    let mut parts: Vec<Vec<Coord>> = parts
        .iter()
        .map(|part| part.iter().map(&to_coord).collect())
        .collect();
    if parts.len() == 1 {
        Geometry::LineString(parts.remove(0))
    } else {
        Geometry::MultiLineString(parts)
    }
}

/// Shapefile polygons list outer rings each followed by their holes.
fn polygons<P>(rings: &[PolygonRing<P>], to_coord: impl Fn(&P) -> Coord) -> Geometry {
    let mut polygons: Vec<Vec<Vec<Coord>>> = Vec::new();
    for ring in rings {
        let coords: Vec<Coord> = ring.points().iter().map(&to_coord).collect();
        match ring {
            PolygonRing::Outer(_) => polygons.push(vec![coords]),
            PolygonRing::Inner(_) => match polygons.last_mut() {
                Some(polygon) => polygon.push(coords),
                // Hole before any shell: keep it as its own shell.
                None => polygons.push(vec![coords]),
            },
        }
    }
    if polygons.len() == 1 {
        Geometry::Polygon(polygons.remove(0))
    } else {
        Geometry::MultiPolygon(polygons)
    }
}
