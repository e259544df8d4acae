//! Point transforms between two spatial references.

use std::fmt;

use proj4rs::Proj;

use super::{ReprojectionError, SpatialRef};
use crate::geometry::{Coord, Geometry};

/// A prepared transform from `source` to `target`.
///
/// Geographic coordinates are taken and returned in degrees.
pub struct CoordinateTransform {
    source: Proj,
    target: Proj,
    source_geographic: bool,
    target_geographic: bool,
    description: String,
}

impl fmt::Debug for CoordinateTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoordinateTransform")
            .field("path", &self.description)
            .finish()
    }
}

impl CoordinateTransform {
    pub fn new(source: &SpatialRef, target: &SpatialRef) -> Result<Self, ReprojectionError> {
        Ok(Self {
            source: source.to_proj()?,
            target: target.to_proj()?,
            source_geographic: source.is_geographic(),
            target_geographic: target.is_geographic(),
            description: format!("{} -> {}", source, target),
        })
    }

    /// Transform one `(x, y)` position.
    pub fn transform(&self, x: f64, y: f64) -> Result<(f64, f64), ReprojectionError> {
        let mut point = if self.source_geographic {
            (x.to_radians(), y.to_radians(), 0.0)
        } else {
            (x, y, 0.0)
        };

        proj4rs::transform::transform(&self.source, &self.target, &mut point).map_err(|e| {
            ReprojectionError::TransformFailed {
                x,
                y,
                reason: e.to_string(),
            }
        })?;

        let (tx, ty) = if self.target_geographic {
            (point.0.to_degrees(), point.1.to_degrees())
        } else {
            (point.0, point.1)
        };
        if !tx.is_finite() || !ty.is_finite() {
            return Err(ReprojectionError::TransformFailed {
                x,
                y,
                reason: "result is not finite".to_string(),
            });
        }
        Ok((tx, ty))
    }

    /// Transform every coordinate of `geometry` in place. Elevations are kept.
    pub fn apply(&self, geometry: &mut Geometry) -> Result<(), ReprojectionError> {
        geometry.try_for_each_coord_mut(&mut |coord: &mut Coord| {
            let (x, y) = self.transform(coord.x, coord.y)?;
            coord.x = x;
            coord.y = y;
            Ok(())
        })
    }
}
