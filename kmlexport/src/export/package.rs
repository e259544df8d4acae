//! Final artifact: a plain document or a KMZ archive.

use std::fs::File;
use std::io::{self, BufWriter, Seek, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use super::{PackagingError, DOCUMENT_NAME, RASTER_DIR};

/// The file an export run produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportArtifact {
    /// A single KML document.
    Document(PathBuf),
    /// A KMZ archive and the entry names it holds, in write order.
    Archive { path: PathBuf, entries: Vec<String> },
}

impl ExportArtifact {
    pub fn path(&self) -> &Path {
        match self {
            ExportArtifact::Document(path) => path,
            ExportArtifact::Archive { path, .. } => path,
        }
    }

    pub fn is_archive(&self) -> bool {
        matches!(self, ExportArtifact::Archive { .. })
    }
}

/// Move the document to `out`, or bundle it with `images` into an archive.
///
/// Without images the document is moved as-is. Otherwise `out` becomes a
/// deflate-compressed zip holding `doc.kml` and `rasters/<file name>` per
/// image. The extension of `out` is the caller's choice and is not checked.
/// A partially written output is removed on failure.
pub fn package(
    doc: &Path,
    images: &[PathBuf],
    out: &Path,
    compression_level: Option<i64>,
) -> Result<ExportArtifact, PackagingError> {
    if let Some(parent) = out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| PackagingError::io(parent, e))?;
    }

    if images.is_empty() {
        move_file(doc, out)?;
        debug!(path = %out.display(), "Wrote document");
        return Ok(ExportArtifact::Document(out.to_path_buf()));
    }

    match write_archive(doc, images, out, compression_level) {
        Ok(entries) => {
            debug!(path = %out.display(), entries = entries.len(), "Wrote archive");
            Ok(ExportArtifact::Archive {
                path: out.to_path_buf(),
                entries,
            })
        }
        Err(e) => {
            remove_partial(out);
            Err(e)
        }
    }
}

fn move_file(from: &Path, to: &Path) -> Result<(), PackagingError> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    // Rename fails across filesystems; fall back to copying.
    if let Err(e) = std::fs::copy(from, to) {
        remove_partial(to);
        return Err(PackagingError::io(to, e));
    }
    if let Err(e) = std::fs::remove_file(from) {
        debug!(path = %from.display(), error = %e, "Could not remove moved document");
    }
    Ok(())
}

fn write_archive(
    doc: &Path,
    images: &[PathBuf],
    out: &Path,
    compression_level: Option<i64>,
) -> Result<Vec<String>, PackagingError> {
    let file = File::create(out).map_err(|e| PackagingError::io(out, e))?;
    let mut zip = ZipWriter::new(BufWriter::new(file));
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(compression_level);

    let mut entries = Vec::with_capacity(images.len() + 1);
    add_entry(&mut zip, options, doc, DOCUMENT_NAME.to_string(), out)?;
    entries.push(DOCUMENT_NAME.to_string());
    for image in images {
        let Some(file_name) = image.file_name() else {
            warn!(path = %image.display(), "Skipping image without a file name");
            continue;
        };
        let name = format!("{}/{}", RASTER_DIR, file_name.to_string_lossy());
        add_entry(&mut zip, options, image, name.clone(), out)?;
        entries.push(name);
    }

    zip.finish().map_err(|e| PackagingError::Archive {
        path: out.to_path_buf(),
        reason: e.to_string(),
    })?;
    Ok(entries)
}

fn add_entry<W: Write + Seek>(
    zip: &mut ZipWriter<W>,
    options: SimpleFileOptions,
    source: &Path,
    name: String,
    out: &Path,
) -> Result<(), PackagingError> {
    zip.start_file(name.as_str(), options)
        .map_err(|e| PackagingError::Archive {
            path: out.to_path_buf(),
            reason: format!("{}: {}", name, e),
        })?;
    let mut input = File::open(source).map_err(|e| PackagingError::io(source, e))?;
    io::copy(&mut input, zip).map_err(|e| PackagingError::io(out, e))?;
    Ok(())
}

/// Best-effort removal of a half-written output.
pub(crate) fn remove_partial(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => debug!(path = %path.display(), "Removed partial output"),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => warn!(path = %path.display(), error = %e, "Could not remove partial output"),
    }
}
