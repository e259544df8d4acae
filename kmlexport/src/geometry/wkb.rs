//! Well-known binary (WKB) decoding and encoding.
//!
//! The decoder accepts both byte orders, ISO dimension offsets
//! (`1000`/`2000`/`3000`) and the extended (EWKB) high-bit flags including an
//! embedded SRID, so it reads what OGR, PostGIS and GeoPackage hand out.
//! The encoder always writes little-endian ISO WKB.

use super::{Coord, Geometry, GeometryError, GeometryType};

/// Deepest collection nesting accepted.
const MAX_DEPTH: usize = 32;

const EWKB_Z: u32 = 0x8000_0000;
const EWKB_M: u32 = 0x4000_0000;
const EWKB_SRID: u32 = 0x2000_0000;
const EWKB_FLAGS: u32 = EWKB_Z | EWKB_M | EWKB_SRID;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ByteOrder {
    Big,
    Little,
}

#[derive(Debug, Clone, Copy)]
struct Header {
    order: ByteOrder,
    kind: GeometryType,
    has_z: bool,
    has_m: bool,
}

impl Header {
    fn coord_size(&self) -> usize {
        8 * (2 + usize::from(self.has_z) + usize::from(self.has_m))
    }
}

/// Decode a complete WKB buffer.
///
/// Fails if the buffer is truncated, uses an unknown type, mixes member
/// types inside a multi-geometry, or has bytes left over.
pub fn decode(bytes: &[u8]) -> Result<Geometry, GeometryError> {
    let mut reader = WkbReader { bytes, pos: 0 };
    let geometry = reader.read_geometry(0)?;
    let remaining = reader.remaining();
    if remaining > 0 {
        return Err(GeometryError::TrailingBytes(remaining));
    }
    Ok(geometry)
}

struct WkbReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> WkbReader<'a> {
    fn remaining(&self) -> usize {
        self.bytes.len() - self.pos
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], GeometryError> {
        if self.remaining() < n {
            return Err(GeometryError::UnexpectedEof {
                offset: self.pos,
                needed: n - self.remaining(),
            });
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, GeometryError> {
        Ok(self.take(1)?[0])
    }

    fn read_u32(&mut self, order: ByteOrder) -> Result<u32, GeometryError> {
        let mut buf = [0u8; 4];
        buf.copy_from_slice(self.take(4)?);
        Ok(match order {
            ByteOrder::Big => u32::from_be_bytes(buf),
            ByteOrder::Little => u32::from_le_bytes(buf),
        })
    }

    fn read_f64(&mut self, order: ByteOrder) -> Result<f64, GeometryError> {
        let mut buf = [0u8; 8];
        buf.copy_from_slice(self.take(8)?);
        Ok(match order {
            ByteOrder::Big => f64::from_be_bytes(buf),
            ByteOrder::Little => f64::from_le_bytes(buf),
        })
    }

    /// Read an element count and reject counts that cannot possibly fit.
    fn read_count(&mut self, order: ByteOrder, min_item_size: usize) -> Result<usize, GeometryError> {
        let count = self.read_u32(order)?;
        let remaining = self.remaining();
        if (count as usize).saturating_mul(min_item_size) > remaining {
            return Err(GeometryError::ImplausibleCount { count, remaining });
        }
        Ok(count as usize)
    }

    fn read_header(&mut self) -> Result<Header, GeometryError> {
        let order = match self.read_u8()? {
            0 => ByteOrder::Big,
            1 => ByteOrder::Little,
            other => return Err(GeometryError::InvalidByteOrder(other)),
        };
        let raw = self.read_u32(order)?;

        let code = raw & !EWKB_FLAGS;
        let (base, iso_z, iso_m) = match code / 1000 {
            0 => (code, false, false),
            1 => (code % 1000, true, false),
            2 => (code % 1000, false, true),
            3 => (code % 1000, true, true),
            _ => return Err(GeometryError::UnsupportedType(raw)),
        };
        let kind = GeometryType::from_wkb_code(base).ok_or(GeometryError::UnsupportedType(raw))?;

        if raw & EWKB_SRID != 0 {
            // SRID is informational only; the layer carries the reference.
            self.read_u32(order)?;
        }

        Ok(Header {
            order,
            kind,
            has_z: iso_z || raw & EWKB_Z != 0,
            has_m: iso_m || raw & EWKB_M != 0,
        })
    }

    fn read_coord(&mut self, header: &Header) -> Result<Coord, GeometryError> {
        let x = self.read_f64(header.order)?;
        let y = self.read_f64(header.order)?;
        let z = if header.has_z {
            Some(self.read_f64(header.order)?)
        } else {
            None
        };
        if header.has_m {
            self.read_f64(header.order)?;
        }
        Ok(Coord { x, y, z })
    }

    fn read_coords(&mut self, header: &Header) -> Result<Vec<Coord>, GeometryError> {
        let count = self.read_count(header.order, header.coord_size())?;
        (0..count).map(|_| self.read_coord(header)).collect()
    }

    fn read_rings(&mut self, header: &Header) -> Result<Vec<Vec<Coord>>, GeometryError> {
        let count = self.read_count(header.order, 4)?;
        (0..count).map(|_| self.read_coords(header)).collect()
    }

    fn read_geometry(&mut self, depth: usize) -> Result<Geometry, GeometryError> {
        if depth > MAX_DEPTH {
            return Err(GeometryError::TooDeep(MAX_DEPTH));
        }
        let header = self.read_header()?;

        match header.kind {
            GeometryType::Point => {
                let coord = self.read_coord(&header)?;
                if coord.x.is_nan() && coord.y.is_nan() {
                    Ok(Geometry::Point(None))
                } else {
                    Ok(Geometry::Point(Some(coord)))
                }
            }
            GeometryType::LineString => Ok(Geometry::LineString(self.read_coords(&header)?)),
            GeometryType::Polygon => Ok(Geometry::Polygon(self.read_rings(&header)?)),
            GeometryType::MultiPoint => {
                let members = self.read_members(&header, depth)?;
                let mut points = Vec::with_capacity(members.len());
                for member in members {
                    match member {
                        Geometry::Point(Some(coord)) => points.push(coord),
                        // Empty members carry no position to keep
                        Geometry::Point(None) => {}
                        other => return Err(invalid_member(GeometryType::MultiPoint, &other)),
                    }
                }
                Ok(Geometry::MultiPoint(points))
            }
            GeometryType::MultiLineString => {
                let members = self.read_members(&header, depth)?;
                let mut lines = Vec::with_capacity(members.len());
                for member in members {
                    match member {
                        Geometry::LineString(coords) => lines.push(coords),
                        other => {
                            return Err(invalid_member(GeometryType::MultiLineString, &other))
                        }
                    }
                }
                Ok(Geometry::MultiLineString(lines))
            }
            GeometryType::MultiPolygon => {
                let members = self.read_members(&header, depth)?;
                let mut polygons = Vec::with_capacity(members.len());
                for member in members {
                    match member {
                        Geometry::Polygon(rings) => polygons.push(rings),
                        other => return Err(invalid_member(GeometryType::MultiPolygon, &other)),
                    }
                }
                Ok(Geometry::MultiPolygon(polygons))
            }
            GeometryType::GeometryCollection => Ok(Geometry::GeometryCollection(
                self.read_members(&header, depth)?,
            )),
        }
    }

    fn read_members(&mut self, header: &Header, depth: usize) -> Result<Vec<Geometry>, GeometryError> {
        // Smallest member: byte order + type + empty count.
        let count = self.read_count(header.order, 9)?;
        (0..count).map(|_| self.read_geometry(depth + 1)).collect()
    }
}

fn invalid_member(container: GeometryType, found: &Geometry) -> GeometryError {
    GeometryError::InvalidMember {
        container: container.name(),
        found: found.geometry_type().name(),
    }
}

/// Encode a geometry as little-endian ISO WKB.
pub fn encode(geometry: &Geometry) -> Vec<u8> {
    let mut out = Vec::with_capacity(64);
    write_geometry(&mut out, geometry);
    out
}

fn write_header(out: &mut Vec<u8>, kind: GeometryType, has_z: bool) {
    out.push(1);
    let code = kind.wkb_code() + if has_z { 1000 } else { 0 };
    out.extend_from_slice(&code.to_le_bytes());
}

fn write_coord(out: &mut Vec<u8>, coord: &Coord, has_z: bool) {
    out.extend_from_slice(&coord.x.to_le_bytes());
    out.extend_from_slice(&coord.y.to_le_bytes());
    if has_z {
        out.extend_from_slice(&coord.z.unwrap_or(0.0).to_le_bytes());
    }
}

fn write_count(out: &mut Vec<u8>, count: usize) {
    out.extend_from_slice(&(count as u32).to_le_bytes());
}

fn write_coords(out: &mut Vec<u8>, coords: &[Coord], has_z: bool) {
    write_count(out, coords.len());
    for coord in coords {
        write_coord(out, coord, has_z);
    }
}

fn write_rings(out: &mut Vec<u8>, rings: &[Vec<Coord>], has_z: bool) {
    write_count(out, rings.len());
    for ring in rings {
        write_coords(out, ring, has_z);
    }
}

fn write_geometry(out: &mut Vec<u8>, geometry: &Geometry) {
    let has_z = geometry.has_z();
    write_header(out, geometry.geometry_type(), has_z);

    match geometry {
        Geometry::Point(Some(coord)) => write_coord(out, coord, has_z),
        Geometry::Point(None) => {
            out.extend_from_slice(&f64::NAN.to_le_bytes());
            out.extend_from_slice(&f64::NAN.to_le_bytes());
        }
        Geometry::LineString(coords) => write_coords(out, coords, has_z),
        Geometry::Polygon(rings) => write_rings(out, rings, has_z),
        Geometry::MultiPoint(points) => {
            write_count(out, points.len());
            for point in points {
                write_header(out, GeometryType::Point, has_z);
                write_coord(out, point, has_z);
            }
        }
        Geometry::MultiLineString(lines) => {
            write_count(out, lines.len());
            for line in lines {
                write_header(out, GeometryType::LineString, has_z);
                write_coords(out, line, has_z);
            }
        }
        Geometry::MultiPolygon(polygons) => {
            write_count(out, polygons.len());
            for rings in polygons {
                write_header(out, GeometryType::Polygon, has_z);
                write_rings(out, rings, has_z);
            }
        }
        Geometry::GeometryCollection(members) => {
            write_count(out, members.len());
            for member in members {
                write_geometry(out, member);
            }
        }
    }
}
