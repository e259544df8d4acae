//! kmlexport CLI - Command-line interface
//!
//! Exports GIS layers to KML/KMZ. The layer selection and bindings come
//! from a job file and/or the command line; progress and errors go to
//! stderr.

mod commands;
mod error;

use std::process::ExitCode;

use clap::{Parser, Subcommand};
use console::style;
use tracing_subscriber::EnvFilter;

use commands::export::ExportArgs;
use error::CliError;

#[derive(Debug, Parser)]
#[command(name = "kmlexport", version, about = "Export vector and raster layers to KML/KMZ")]
struct Cli {
    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Export layers to a KML document or KMZ archive
    Export(ExportArgs),

    /// Show the fields of a vector layer, or the size of a raster
    Fields {
        /// Layer file to inspect
        layer: String,
    },
}

/// Log level from the command-line switches.
fn default_filter(verbose: u8, quiet: bool) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Log to stderr; `RUST_LOG` wins over the switches.
fn init_logging(verbose: u8, quiet: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter(verbose, quiet)));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .without_time()
        .init();
}

fn run(cli: Cli) -> Result<(), CliError> {
    match cli.command {
        Commands::Export(args) => commands::export::run(args),
        Commands::Fields { layer } => commands::fields::run(&layer),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.quiet);

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", style("Error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
