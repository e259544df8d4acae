//! KML document model and serialization.
//!
//! The exporters build typed nodes ([`Folder`], [`Placemark`],
//! [`GroundOverlay`]) which lower to a generic [`KmlElement`] tree owned by a
//! [`KmlDocument`]. Serialization writes the tree with an XML declaration in
//! UTF-8; output order is insertion order throughout.

mod document;
mod element;
mod features;
mod writer;

pub use document::{KmlDocument, KML_NAMESPACE};
pub use element::KmlElement;
pub use features::{format_degrees, Folder, GeoBounds, GroundOverlay, Placemark};
pub use writer::{to_xml_string, write_document};
