//! Common types and utilities shared across CLI commands.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Output container chosen for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Plain KML document (vectors only).
    Kml,
    /// Zipped KML with overlay images.
    Kmz,
}

impl OutputFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Kml => "kml",
            OutputFormat::Kmz => "kmz",
        }
    }

    fn from_extension(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        match ext.as_str() {
            "kml" => Some(OutputFormat::Kml),
            "kmz" => Some(OutputFormat::Kmz),
            _ => None,
        }
    }

    /// Format for a run: KMZ whenever rasters are exported, otherwise
    /// whatever the path asks for, defaulting to KML.
    pub fn select(path: &Path, has_rasters: bool) -> Self {
        if has_rasters {
            return OutputFormat::Kmz;
        }
        OutputFormat::from_extension(path).unwrap_or(OutputFormat::Kml)
    }
}

/// Adjust `path` so its extension matches the selected format.
///
/// A `.kml`/`.kmz` extension is replaced when it disagrees; any other path
/// gets the extension appended.
pub fn resolve_output(path: &Path, has_rasters: bool) -> PathBuf {
    let format = OutputFormat::select(path, has_rasters);
    if OutputFormat::from_extension(path).is_some() {
        return path.with_extension(format.extension());
    }
    let mut appended = OsString::from(path.as_os_str());
    appended.push(".");
    appended.push(format.extension());
    PathBuf::from(appended)
}
