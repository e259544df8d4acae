//! Building the document from the selected layers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::progress::percent;
use super::raster::export_raster;
use super::vector::export_vector;
use super::{PackagingError, ProgressSink};
use crate::bindings::PropertyBindings;
use crate::error::ExportResult;
use crate::kml::KmlDocument;
use crate::layer::LayerRef;
use crate::render::RasterRenderer;
use crate::source::LayerProvider;

/// Name of the document inside the working directory and the archive.
pub const DOCUMENT_NAME: &str = "doc.kml";

/// Directory holding overlay images, relative to the document.
pub const RASTER_DIR: &str = "rasters";

/// What [`assemble`] leaves in the working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Assembly {
    /// The serialized document.
    pub document: PathBuf,
    /// One image per distinct raster base name, in first-seen order.
    pub images: Vec<PathBuf>,
}

/// Collaborators used while assembling.
pub struct AssemblyContext<'a> {
    pub provider: &'a dyn LayerProvider,
    pub renderer: &'a dyn RasterRenderer,
    pub progress: &'a dyn ProgressSink,
    pub reproject_vectors: bool,
}

/// Export every layer in order into `workdir` and serialize the document.
///
/// Vector layers become folders and raster layers ground overlays, pushed
/// in request order. Progress is reported after each raster. The document
/// is only written once every layer succeeded.
pub fn assemble(
    layers: &[(LayerRef, PropertyBindings)],
    ctx: &AssemblyContext<'_>,
    workdir: &Path,
) -> ExportResult<Assembly> {
    let raster_dir = workdir.join(RASTER_DIR);
    let total_rasters = layers.iter().filter(|(l, _)| l.is_raster()).count();
    let mut rasters_done = 0;

    let mut document = KmlDocument::new();
    let mut images: Vec<PathBuf> = Vec::new();
    let mut image_sources: HashMap<PathBuf, String> = HashMap::new();

    for (layer, bindings) in layers {
        match layer {
            LayerRef::Vector(vector) => {
                let folder = export_vector(ctx.provider, vector, bindings, ctx.reproject_vectors)?;
                document.push(folder.to_element());
            }
            LayerRef::Raster(raster) => {
                let export = export_raster(
                    ctx.provider,
                    raster,
                    bindings,
                    ctx.renderer,
                    &raster_dir,
                )?;
                document.push(export.overlay.to_element());

                match image_sources.get(&export.image_path) {
                    Some(previous) => warn!(
                        image = %export.image_path.display(),
                        previous = %previous,
                        layer = raster.source(),
                        "Raster base name already used, image is overwritten"
                    ),
                    None => {
                        image_sources
                            .insert(export.image_path.clone(), raster.source().to_string());
                        images.push(export.image_path);
                    }
                }

                rasters_done += 1;
                ctx.progress.report(percent(rasters_done, total_rasters));
            }
        }
    }

    let path = workdir.join(DOCUMENT_NAME);
    document
        .save(&path)
        .map_err(|e| PackagingError::io(&path, e))?;
    debug!(
        path = %path.display(),
        layers = layers.len(),
        images = images.len(),
        "Wrote document"
    );

    Ok(Assembly {
        document: path,
        images,
    })
}
