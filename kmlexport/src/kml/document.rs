//! The root KML document.

use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use super::{writer, KmlElement};

/// KML 2.2 namespace declared on the root element.
pub const KML_NAMESPACE: &str = "http://www.opengis.net/kml/2.2";

/// A `<kml><Document>` tree under construction.
///
/// Nodes are appended to the single `Document` in the order they are
/// pushed, which is the order they appear in the output.
#[derive(Debug, Clone, PartialEq)]
pub struct KmlDocument {
    document: KmlElement,
}

impl Default for KmlDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl KmlDocument {
    pub fn new() -> Self {
        Self {
            document: KmlElement::new("Document"),
        }
    }

    /// Append a top-level node (a `Folder` or `GroundOverlay`).
    pub fn push(&mut self, node: KmlElement) {
        self.document.push(node);
    }

    /// The `Document` element and everything added to it.
    pub fn document(&self) -> &KmlElement {
        &self.document
    }

    /// Build the full tree including the namespaced `kml` root.
    pub fn to_element(&self) -> KmlElement {
        KmlElement::new("kml")
            .with_attribute("xmlns", KML_NAMESPACE)
            .with_child(self.document.clone())
    }

    pub fn to_xml_string(&self) -> io::Result<String> {
        writer::to_xml_string(&self.to_element())
    }

    /// Serialize the document to `path`.
    pub fn save(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        writer::write_document(&self.to_element(), BufWriter::new(file))
    }
}
