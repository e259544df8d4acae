//! The `export` command.

use std::path::PathBuf;

use clap::Args;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use kmlexport::{
    ConfigError, ConfigFile, ExportConfig, ExportJob, ExportRequest, Exporter, KmlProperty,
    LayerRef, ProgressSink, PropertyBindings,
};
use tracing::debug;

use super::common::resolve_output;
use crate::error::CliError;

/// Arguments for `kmlexport export`.
#[derive(Debug, Args)]
pub struct ExportArgs {
    /// Layer files to export, in document order (after any job layers)
    pub layers: Vec<String>,

    /// Job file listing layers, bindings and output
    #[arg(long, value_name = "FILE")]
    pub job: Option<PathBuf>,

    /// Output file (.kml or .kmz; forced to .kmz when rasters are selected)
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Placemark name for command-line layers: a field name or a literal
    #[arg(long)]
    pub name: Option<String>,

    /// Placemark description for command-line layers: a field name or a literal
    #[arg(long)]
    pub description: Option<String>,

    /// Folder or overlay label for command-line layers
    #[arg(long)]
    pub folder_name: Option<String>,

    /// Field to attach as extended data (repeatable)
    #[arg(long = "field", value_name = "FIELD")]
    pub fields: Vec<String>,

    /// Reproject vector features to WGS84
    #[arg(long)]
    pub reproject_vectors: bool,

    /// Keep the working directory after the run
    #[arg(long)]
    pub keep_workdir: bool,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,
}

impl ExportArgs {
    /// Bindings applied to every layer given on the command line.
    fn bindings(&self) -> PropertyBindings {
        let mut bindings = PropertyBindings::new().with_fields(self.fields.iter());
        if let Some(name) = &self.name {
            bindings.set(KmlProperty::Name, name.as_str());
        }
        if let Some(description) = &self.description {
            bindings.set(KmlProperty::Description, description.as_str());
        }
        if let Some(folder_name) = &self.folder_name {
            bindings = bindings.with_folder_name(folder_name.as_str());
        }
        bindings
    }

    /// Config file settings, with command-line switches layered on top.
    fn export_config(&self) -> Result<ExportConfig, ConfigError> {
        let config = match &self.config {
            Some(path) => ConfigFile::load(path)?,
            None => ConfigFile::load_default()?,
        };
        let reproject = config.reproject_vectors || self.reproject_vectors;
        let keep = config.keep_workdir || self.keep_workdir;
        Ok(config
            .with_reproject_vectors(reproject)
            .with_keep_workdir(keep))
    }

    /// Combine the job file and command-line layers into one request.
    ///
    /// The output extension is adjusted to the selection.
    pub fn request(&self) -> Result<ExportRequest, CliError> {
        let job = match &self.job {
            Some(path) => ExportJob::load(path)?,
            None => ExportJob::default(),
        };
        let bindings = self.bindings();
        let mut request = job.into_request(self.output.clone());
        for layer in &self.layers {
            request = request.with_layer(LayerRef::from_path(layer.as_str()), bindings.clone());
        }

        if request.layers.is_empty() {
            return Err(ConfigError::NoLayers.into());
        }
        let has_rasters = request.has_rasters();
        request.output = request
            .output
            .map(|path| resolve_output(&path, has_rasters));
        Ok(request)
    }
}

/// Progress bar fed by the exporter.
struct BarProgress(ProgressBar);

impl ProgressSink for BarProgress {
    fn report(&self, percent: u8) {
        self.0.set_position(u64::from(percent));
    }

    fn fail(&self, message: &str) {
        self.0.abandon_with_message(message.to_string());
    }
}

fn progress_bar(rasters: usize) -> ProgressBar {
    if rasters == 0 {
        return ProgressBar::hidden();
    }
    let bar = ProgressBar::new(100);
    if let Ok(bar_style) =
        ProgressStyle::with_template("{spinner} Rendering rasters [{bar:40}] {pos:>3}% {msg}")
    {
        bar.set_style(bar_style.progress_chars("=> "));
    }
    bar
}

/// Run the export command.
pub fn run(args: ExportArgs) -> Result<(), CliError> {
    let config = args.export_config()?;
    let request = args.request()?;
    debug!(?config, layers = request.layers.len(), "Resolved export request");

    let bar = progress_bar(request.raster_count());
    let exporter = Exporter::new(config).with_progress(Box::new(BarProgress(bar.clone())));
    let artifact = exporter.run(&request)?;
    bar.finish_and_clear();

    println!(
        "{} {}",
        style("Exported to").green().bold(),
        artifact.path().display()
    );
    Ok(())
}
