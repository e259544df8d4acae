//! Georeferenced raster sources.
//!
//! A raster is any image the `image` crate can decode, placed on the map by
//! an ESRI world file and referenced by a `.prj` sidecar.

use std::path::{Path, PathBuf};

use super::{read_prj_sidecar, DataSourceError};

/// Affine pixel-to-map transform, in the usual six-coefficient order:
/// `[origin_x, pixel_width, row_rotation, origin_y, column_rotation, pixel_height]`.
///
/// The origin is the outer corner of the top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoTransform(pub [f64; 6]);

impl GeoTransform {
    /// North-up transform without rotation.
    pub fn north_up(origin_x: f64, origin_y: f64, pixel_width: f64, pixel_height: f64) -> Self {
        GeoTransform([origin_x, pixel_width, 0.0, origin_y, 0.0, pixel_height])
    }

    pub fn origin_x(&self) -> f64 {
        self.0[0]
    }

    pub fn origin_y(&self) -> f64 {
        self.0[3]
    }

    pub fn pixel_width(&self) -> f64 {
        self.0[1]
    }

    /// Negative for north-up rasters.
    pub fn pixel_height(&self) -> f64 {
        self.0[5]
    }

    /// Map coordinates of pixel position `(col, row)`.
    pub fn apply(&self, col: f64, row: f64) -> (f64, f64) {
        let gt = &self.0;
        (
            gt[0] + col * gt[1] + row * gt[2],
            gt[3] + col * gt[4] + row * gt[5],
        )
    }
}

/// Axis-aligned rectangle in a raster's native coordinates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Extent {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl Extent {
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }
}

/// An ESRI world file: six lines `A D B E C F`, where `C`/`F` locate the
/// centre of the top-left pixel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WorldFile {
    pub a: f64,
    pub d: f64,
    pub b: f64,
    pub e: f64,
    pub c: f64,
    pub f: f64,
}

impl WorldFile {
    pub fn parse(text: &str) -> Result<Self, String> {
        let values = text
            .split_whitespace()
            .map(|token| {
                token
                    .parse::<f64>()
                    .map_err(|_| format!("not a number: {:?}", token))
            })
            .collect::<Result<Vec<f64>, _>>()?;
        match values.as_slice() {
            [a, d, b, e, c, f] => Ok(WorldFile {
                a: *a,
                d: *d,
                b: *b,
                e: *e,
                c: *c,
                f: *f,
            }),
            _ => Err(format!("expected 6 values, found {}", values.len())),
        }
    }

    pub fn load(path: &Path) -> Result<Self, DataSourceError> {
        let text = std::fs::read_to_string(path).map_err(|source| DataSourceError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&text).map_err(|reason| DataSourceError::InvalidWorldFile {
            path: path.to_path_buf(),
            reason,
        })
    }

    /// Shift from pixel centre to pixel corner.
    pub fn to_geo_transform(&self) -> GeoTransform {
        GeoTransform([
            self.c - self.a / 2.0 - self.b / 2.0,
            self.a,
            self.b,
            self.f - self.d / 2.0 - self.e / 2.0,
            self.d,
            self.e,
        ])
    }
}

/// Sidecar names tried for a raster's world file, in priority order.
///
/// For `scan.png` these are `scan.pgw`, `scan.pngw` and `scan.wld`.
pub fn world_file_candidates(path: &Path) -> Vec<PathBuf> {
    let mut candidates = Vec::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        if let (Some(first), Some(last)) = (ext.chars().next(), ext.chars().last()) {
            if ext.len() >= 2 {
                let short = format!("{}{}w", first, last);
                let short = if ext.chars().all(|c| c.is_ascii_uppercase()) {
                    short.to_ascii_uppercase()
                } else {
                    short
                };
                candidates.push(path.with_extension(short));
            }
        }
        candidates.push(path.with_extension(format!("{}w", ext)));
    }
    candidates.push(path.with_extension("wld"));
    candidates
}

/// Raster metadata needed for export.
#[derive(Debug, Clone, PartialEq)]
pub struct RasterDataset {
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
    pub geo_transform: GeoTransform,
    /// Declared spatial reference definition, if any.
    pub spatial_ref: Option<String>,
}

impl RasterDataset {
    /// Read size and georeferencing of the image at `path`.
    pub fn open(path: &Path) -> Result<Self, DataSourceError> {
        if !path.is_file() {
            return Err(DataSourceError::Open {
                path: path.to_path_buf(),
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "no such file"),
            });
        }
        let (width, height) =
            image::image_dimensions(path).map_err(|e| DataSourceError::read(path, e))?;

        let world_file = world_file_candidates(path)
            .into_iter()
            .find(|candidate| candidate.is_file())
            .ok_or_else(|| DataSourceError::MissingGeoreference(path.to_path_buf()))?;
        let geo_transform = WorldFile::load(&world_file)?.to_geo_transform();

        Ok(RasterDataset {
            path: path.to_path_buf(),
            width,
            height,
            geo_transform,
            spatial_ref: read_prj_sidecar(path)?,
        })
    }

    /// Bounding rectangle of the raster's four corners in native coordinates.
    pub fn extent(&self) -> Extent {
        let (w, h) = (f64::from(self.width), f64::from(self.height));
        let corners = [
            self.geo_transform.apply(0.0, 0.0),
            self.geo_transform.apply(w, 0.0),
            self.geo_transform.apply(0.0, h),
            self.geo_transform.apply(w, h),
        ];
        let mut extent = Extent {
            min_x: f64::INFINITY,
            min_y: f64::INFINITY,
            max_x: f64::NEG_INFINITY,
            max_y: f64::NEG_INFINITY,
        };
        for (x, y) in corners {
            extent.min_x = extent.min_x.min(x);
            extent.min_y = extent.min_y.min(y);
            extent.max_x = extent.max_x.max(x);
            extent.max_y = extent.max_y.max(y);
        }
        extent
    }
}
