//! Export runs.

use std::fmt;
use std::path::{Path, PathBuf};

use tempfile::TempDir;
use tracing::{error, info};

use super::assembler::{assemble, AssemblyContext};
use super::package::package;
use super::{ExportArtifact, NoProgress, PackagingError, ProgressSink};
use crate::bindings::PropertyBindings;
use crate::config::{ConfigError, ExportConfig};
use crate::error::ExportResult;
use crate::layer::LayerRef;
use crate::render::{ImageFileRenderer, RasterRenderer};
use crate::source::{FileLayerProvider, LayerProvider};

const WORKDIR_PREFIX: &str = "kmlexport-";

/// The resolved selection for one run.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExportRequest {
    /// Layers with their bindings, in document order.
    pub layers: Vec<(LayerRef, PropertyBindings)>,
    pub output: Option<PathBuf>,
}

impl ExportRequest {
    pub fn new(layers: Vec<(LayerRef, PropertyBindings)>) -> Self {
        Self {
            layers,
            output: None,
        }
    }

    pub fn with_output(mut self, output: impl Into<PathBuf>) -> Self {
        self.output = Some(output.into());
        self
    }

    pub fn with_layer(mut self, layer: LayerRef, bindings: PropertyBindings) -> Self {
        self.layers.push((layer, bindings));
        self
    }

    pub fn raster_count(&self) -> usize {
        self.layers.iter().filter(|(l, _)| l.is_raster()).count()
    }

    /// True when the run will produce an archive.
    pub fn has_rasters(&self) -> bool {
        self.raster_count() > 0
    }
}

/// Runs exports with a fixed set of collaborators.
///
/// # Example
///
/// ```no_run
/// use kmlexport::{ExportConfig, ExportRequest, Exporter, LayerRef, PropertyBindings};
///
/// let request = ExportRequest::new(vec![(
///     LayerRef::from_path("roads.geojson"),
///     PropertyBindings::new(),
/// )])
/// .with_output("roads.kml");
///
/// let artifact = Exporter::new(ExportConfig::default()).run(&request)?;
/// println!("{}", artifact.path().display());
/// # Ok::<(), kmlexport::ExportError>(())
/// ```
pub struct Exporter {
    config: ExportConfig,
    provider: Box<dyn LayerProvider>,
    renderer: Box<dyn RasterRenderer>,
    progress: Box<dyn ProgressSink>,
}

impl Default for Exporter {
    fn default() -> Self {
        Self::new(ExportConfig::default())
    }
}

impl fmt::Debug for Exporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exporter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Exporter {
    /// Exporter reading local files and rendering rasters from their pixels.
    pub fn new(config: ExportConfig) -> Self {
        Self {
            config,
            provider: Box::new(FileLayerProvider),
            renderer: Box::new(ImageFileRenderer::default()),
            progress: Box::new(NoProgress),
        }
    }

    pub fn with_provider(mut self, provider: Box<dyn LayerProvider>) -> Self {
        self.provider = provider;
        self
    }

    pub fn with_renderer(mut self, renderer: Box<dyn RasterRenderer>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn with_progress(mut self, progress: Box<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export the request's layers to its output path.
    ///
    /// The first failure aborts the run; its message goes to the progress
    /// sink and no output file is left behind.
    pub fn run(&self, request: &ExportRequest) -> ExportResult<ExportArtifact> {
        let result = self.try_run(request);
        match &result {
            Ok(artifact) => info!("Exported to {}", artifact.path().display()),
            Err(e) => {
                error!(error = %e, "Export failed");
                self.progress.fail(&e.to_string());
            }
        }
        result
    }

    fn try_run(&self, request: &ExportRequest) -> ExportResult<ExportArtifact> {
        let output = request
            .output
            .as_deref()
            .ok_or(ConfigError::MissingOutput)?;
        self.config.validate()?;

        let workdir = self.create_workdir()?;
        info!(
            layers = request.layers.len(),
            rasters = request.raster_count(),
            workdir = %workdir.path().display(),
            "Starting export"
        );

        let result = self.assemble_and_package(request, workdir.path(), output);
        if self.config.keep_workdir {
            let kept = workdir.keep();
            info!(path = %kept.display(), "Kept working directory");
        }
        result
    }

    fn assemble_and_package(
        &self,
        request: &ExportRequest,
        workdir: &Path,
        output: &Path,
    ) -> ExportResult<ExportArtifact> {
        let ctx = AssemblyContext {
            provider: self.provider.as_ref(),
            renderer: self.renderer.as_ref(),
            progress: self.progress.as_ref(),
            reproject_vectors: self.config.reproject_vectors,
        };
        let assembly = assemble(&request.layers, &ctx, workdir)?;
        Ok(package(
            &assembly.document,
            &assembly.images,
            output,
            self.config.compression_level,
        )?)
    }

    fn create_workdir(&self) -> Result<TempDir, PackagingError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(WORKDIR_PREFIX);
        match &self.config.workdir_parent {
            Some(parent) => {
                std::fs::create_dir_all(parent).map_err(PackagingError::WorkDir)?;
                builder.tempdir_in(parent)
            }
            None => builder.tempdir(),
        }
        .map_err(PackagingError::WorkDir)
    }
}
