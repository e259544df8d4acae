//! Geometry to KML translation.

use super::{wkb, Coord, Geometry, GeometryError};
use crate::kml::KmlElement;

/// Decode WKB and translate it into a KML geometry element.
pub fn translate_wkb(bytes: &[u8]) -> Result<KmlElement, GeometryError> {
    Ok(to_kml(&wkb::decode(bytes)?))
}

/// Translate a geometry into its KML element.
///
/// | Geometry                  | KML                                  |
/// |---------------------------|--------------------------------------|
/// | Point                     | `Point`                              |
/// | LineString                | `LineString`                         |
/// | Polygon                   | `Polygon` with outer/inner boundaries |
/// | Multi* / collection       | `MultiGeometry`                      |
pub fn to_kml(geometry: &Geometry) -> KmlElement {
    match geometry {
        Geometry::Point(coord) => point(coord.as_ref()),
        Geometry::LineString(coords) => line_string(coords),
        Geometry::Polygon(rings) => polygon(rings),
        Geometry::MultiPoint(points) => points
            .iter()
            .fold(KmlElement::new("MultiGeometry"), |multi, c| {
                multi.with_child(point(Some(c)))
            }),
        Geometry::MultiLineString(lines) => lines
            .iter()
            .fold(KmlElement::new("MultiGeometry"), |multi, line| {
                multi.with_child(line_string(line))
            }),
        Geometry::MultiPolygon(polygons) => polygons
            .iter()
            .fold(KmlElement::new("MultiGeometry"), |multi, rings| {
                multi.with_child(polygon(rings))
            }),
        Geometry::GeometryCollection(members) => members
            .iter()
            .fold(KmlElement::new("MultiGeometry"), |multi, member| {
                multi.with_child(to_kml(member))
            }),
    }
}

fn point(coord: Option<&Coord>) -> KmlElement {
    let text = coord.map(|c| format_coordinates(std::slice::from_ref(c)));
    KmlElement::new("Point").with_child(KmlElement::text_element(
        "coordinates",
        text.unwrap_or_default(),
    ))
}

fn line_string(coords: &[Coord]) -> KmlElement {
    KmlElement::new("LineString").with_child(coordinates(coords))
}

fn linear_ring(coords: &[Coord]) -> KmlElement {
    KmlElement::new("LinearRing").with_child(coordinates(coords))
}

fn polygon(rings: &[Vec<Coord>]) -> KmlElement {
    let mut element = KmlElement::new("Polygon");
    let mut rings = rings.iter();
    if let Some(outer) = rings.next() {
        element.push(KmlElement::new("outerBoundaryIs").with_child(linear_ring(outer)));
    }
    for inner in rings {
        element.push(KmlElement::new("innerBoundaryIs").with_child(linear_ring(inner)));
    }
    element
}

fn coordinates(coords: &[Coord]) -> KmlElement {
    KmlElement::text_element("coordinates", format_coordinates(coords))
}

/// Format positions as a KML coordinate tuple list: `x,y[,z] x,y[,z] ...`.
///
/// Values are written in their shortest round-trip form so no precision
/// is lost.
pub fn format_coordinates(coords: &[Coord]) -> String {
    coords
        .iter()
        .map(|c| match c.z {
            Some(z) => format!("{},{},{}", c.x, c.y, z),
            None => format!("{},{}", c.x, c.y),
        })
        .collect::<Vec<_>>()
        .join(" ")
}
