//! Export job files.
//!
//! A job file lists the layers to export, with their bindings, in the order
//! they should appear in the document:
//!
//! ```ini
//! [output]
//! path = out/survey.kmz
//!
//! [layer Roads]
//! path = data/roads.shp
//! Name = ROAD_NAME
//! description = Main road network
//! fields = SURFACE, LANES
//!
//! [layer Elevation]
//! path = data/dem.png
//! kind = raster
//! folder_name = Elevation model
//! ```
//!
//! Relative paths are resolved against the job file's directory. Binding
//! values of `<None>` or empty are unset.

use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::warn;

use crate::bindings::{KmlProperty, PropertyBindings};
use crate::config::ConfigError;
use crate::export::ExportRequest;
use crate::layer::{infer_kind, LayerKind, LayerRef, LayerSource, RasterLayer, VectorLayer};

const OUTPUT_SECTION: &str = "output";
const LAYER_PREFIX: &str = "layer";

/// A parsed job file.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportJob {
    pub output: Option<PathBuf>,
    pub layers: Vec<(LayerRef, PropertyBindings)>,
}

impl ExportJob {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::parse(&text, base).map_err(|e| match e {
            ConfigError::Load { reason, .. } => ConfigError::Load {
                path: path.to_path_buf(),
                reason,
            },
            other => other,
        })
    }

    /// Parse job text, resolving relative paths against `base`.
    pub fn parse(text: &str, base: &Path) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(text).map_err(|e| ConfigError::Load {
            path: PathBuf::new(),
            reason: e.to_string(),
        })?;

        let mut job = ExportJob::default();
        for (section, properties) in ini.iter() {
            let Some(section) = section else { continue };

            if section.eq_ignore_ascii_case(OUTPUT_SECTION) {
                job.output = properties
                    .get("path")
                    .map(str::trim)
                    .filter(|p| !p.is_empty())
                    .map(|p| resolve(base, p));
                continue;
            }

            let Some(label) = layer_label(section) else {
                warn!(section, "Ignoring unknown job section");
                continue;
            };

            let source = properties
                .get("path")
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .ok_or_else(|| ConfigError::MissingLayerPath {
                    section: section.to_string(),
                })?;
            let source = resolve(base, source).to_string_lossy().into_owned();

            let kind = match properties.get("kind").map(str::trim) {
                None | Some("") => None,
                Some(kind) => Some(parse_kind(kind).ok_or_else(|| ConfigError::UnknownLayerKind {
                    section: section.to_string(),
                    kind: kind.to_string(),
                })?),
            };

            let mut layer_source = LayerSource::new(source);
            if !label.is_empty() {
                layer_source = layer_source.with_name(label);
            }
            let layer = match kind.unwrap_or_else(|| infer_kind(layer_source.path())) {
                LayerKind::Vector => LayerRef::Vector(VectorLayer(layer_source)),
                LayerKind::Raster => LayerRef::Raster(RasterLayer(layer_source)),
            };

            let mut bindings = PropertyBindings::new();
            for (key, value) in properties.iter() {
                match key {
                    "path" | "kind" => {}
                    "folder_name" => bindings = bindings.with_folder_name(value),
                    "fields" => bindings = bindings.with_fields(value.split(',')),
                    other => match KmlProperty::from_key(other) {
                        Some(property) => bindings.set(property, value),
                        None => warn!(section, key = other, "Ignoring unknown layer key"),
                    },
                }
            }

            job.layers.push((layer, bindings));
        }
        Ok(job)
    }

    /// Turn the job into a run request, preferring `output` over the job's own.
    pub fn into_request(self, output: Option<PathBuf>) -> ExportRequest {
        ExportRequest {
            layers: self.layers,
            output: output.or(self.output),
        }
    }
}

fn layer_label(section: &str) -> Option<&str> {
    let prefix = section.get(..LAYER_PREFIX.len())?;
    if !prefix.eq_ignore_ascii_case(LAYER_PREFIX) {
        return None;
    }
    let rest = &section[LAYER_PREFIX.len()..];
    if rest.is_empty() || rest.starts_with(char::is_whitespace) {
        Some(rest.trim())
    } else {
        None
    }
}

fn parse_kind(kind: &str) -> Option<LayerKind> {
    match kind.to_ascii_lowercase().as_str() {
        "vector" => Some(LayerKind::Vector),
        "raster" => Some(LayerKind::Raster),
        _ => None,
    }
}

fn resolve(base: &Path, path: &str) -> PathBuf {
    let path = Path::new(path);
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
