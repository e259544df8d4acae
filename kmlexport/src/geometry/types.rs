//! Geometry model shared by the decoder, encoder and KML translator.

use std::fmt;

/// A single position, with optional elevation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    pub x: f64,
    pub y: f64,
    pub z: Option<f64>,
}

impl Coord {
    /// Create a 2D coordinate.
    pub fn xy(x: f64, y: f64) -> Self {
        Self { x, y, z: None }
    }

    /// Create a 3D coordinate.
    pub fn xyz(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z: Some(z) }
    }
}

/// The seven simple feature geometry types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GeometryType {
    Point,
    LineString,
    Polygon,
    MultiPoint,
    MultiLineString,
    MultiPolygon,
    GeometryCollection,
}

impl GeometryType {
    /// WKB type code (without dimension offsets).
    pub fn wkb_code(self) -> u32 {
        match self {
            GeometryType::Point => 1,
            GeometryType::LineString => 2,
            GeometryType::Polygon => 3,
            GeometryType::MultiPoint => 4,
            GeometryType::MultiLineString => 5,
            GeometryType::MultiPolygon => 6,
            GeometryType::GeometryCollection => 7,
        }
    }

    /// Look up a type from its base WKB code.
    pub fn from_wkb_code(code: u32) -> Option<Self> {
        match code {
            1 => Some(GeometryType::Point),
            2 => Some(GeometryType::LineString),
            3 => Some(GeometryType::Polygon),
            4 => Some(GeometryType::MultiPoint),
            5 => Some(GeometryType::MultiLineString),
            6 => Some(GeometryType::MultiPolygon),
            7 => Some(GeometryType::GeometryCollection),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            GeometryType::Point => "Point",
            GeometryType::LineString => "LineString",
            GeometryType::Polygon => "Polygon",
            GeometryType::MultiPoint => "MultiPoint",
            GeometryType::MultiLineString => "MultiLineString",
            GeometryType::MultiPolygon => "MultiPolygon",
            GeometryType::GeometryCollection => "GeometryCollection",
        }
    }
}

impl fmt::Display for GeometryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A decoded feature geometry.
///
/// Polygons are stored as rings with the exterior first. An empty point
/// (encoded in WKB as NaN ordinates) is `Point(None)`.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(Option<Coord>),
    LineString(Vec<Coord>),
    Polygon(Vec<Vec<Coord>>),
    MultiPoint(Vec<Coord>),
    MultiLineString(Vec<Vec<Coord>>),
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
    GeometryCollection(Vec<Geometry>),
}

impl Geometry {
    pub fn geometry_type(&self) -> GeometryType {
        match self {
            Geometry::Point(_) => GeometryType::Point,
            Geometry::LineString(_) => GeometryType::LineString,
            Geometry::Polygon(_) => GeometryType::Polygon,
            Geometry::MultiPoint(_) => GeometryType::MultiPoint,
            Geometry::MultiLineString(_) => GeometryType::MultiLineString,
            Geometry::MultiPolygon(_) => GeometryType::MultiPolygon,
            Geometry::GeometryCollection(_) => GeometryType::GeometryCollection,
        }
    }

    /// Total number of positions in the geometry, across all parts.
    pub fn coord_count(&self) -> usize {
        match self {
            Geometry::Point(c) => usize::from(c.is_some()),
            Geometry::LineString(coords) | Geometry::MultiPoint(coords) => coords.len(),
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
                rings.iter().map(Vec::len).sum()
            }
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .flat_map(|rings| rings.iter().map(Vec::len))
                .sum(),
            Geometry::GeometryCollection(members) => members.iter().map(Geometry::coord_count).sum(),
        }
    }

    /// Whether the geometry carries elevation.
    ///
    /// Decided by the first position found; WKB fixes the dimension per
    /// geometry so mixed input does not occur.
    pub fn has_z(&self) -> bool {
        match self {
            Geometry::Point(c) => c.is_some_and(|c| c.z.is_some()),
            Geometry::LineString(coords) | Geometry::MultiPoint(coords) => {
                coords.first().is_some_and(|c| c.z.is_some())
            }
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => rings
                .iter()
                .flatten()
                .next()
                .is_some_and(|c| c.z.is_some()),
            Geometry::MultiPolygon(polygons) => polygons
                .iter()
                .flatten()
                .flatten()
                .next()
                .is_some_and(|c| c.z.is_some()),
            Geometry::GeometryCollection(members) => members.iter().any(Geometry::has_z),
        }
    }

    /// Visit every position mutably, stopping at the first error.
    pub fn try_for_each_coord_mut<E, F>(&mut self, f: &mut F) -> Result<(), E>
    where
        F: FnMut(&mut Coord) -> Result<(), E>,
    {
        match self {
            Geometry::Point(Some(c)) => f(c),
            Geometry::Point(None) => Ok(()),
            Geometry::LineString(coords) | Geometry::MultiPoint(coords) => {
                coords.iter_mut().try_for_each(|c| f(c))
            }
            Geometry::Polygon(rings) | Geometry::MultiLineString(rings) => {
                rings.iter_mut().flatten().try_for_each(|c| f(c))
            }
            Geometry::MultiPolygon(polygons) => polygons
                .iter_mut()
                .flatten()
                .flatten()
                .try_for_each(|c| f(c)),
            Geometry::GeometryCollection(members) => members
                .iter_mut()
                .try_for_each(|member| member.try_for_each_coord_mut(f)),
        }
    }
}
