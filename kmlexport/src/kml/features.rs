//! Typed KML nodes produced by the exporters.
//!
//! These are thin builders over [`KmlElement`] that fix the child order the
//! output format requires.

use super::KmlElement;

/// One vector feature.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Placemark {
    pub name: Option<String>,
    pub description: Option<String>,
    /// `(field name, value)` pairs in request order.
    pub extended_data: Vec<(String, String)>,
    pub geometry: Option<KmlElement>,
}

impl Placemark {
    pub fn to_element(&self) -> KmlElement {
        let mut element = KmlElement::new("Placemark");
        if let Some(name) = &self.name {
            element.push(KmlElement::text_element("name", name));
        }
        if let Some(description) = &self.description {
            element.push(KmlElement::text_element("description", description));
        }
        if !self.extended_data.is_empty() {
            let mut extended = KmlElement::new("ExtendedData");
            for (field, value) in &self.extended_data {
                extended.push(
                    KmlElement::new("Data")
                        .with_attribute("name", field)
                        .with_child(KmlElement::text_element("value", value)),
                );
            }
            element.push(extended);
        }
        if let Some(geometry) = &self.geometry {
            element.push(geometry.clone());
        }
        element
    }
}

/// One vector layer: a labelled folder of placemarks.
#[derive(Debug, Clone, PartialEq)]
pub struct Folder {
    pub name: String,
    pub placemarks: Vec<Placemark>,
}

impl Folder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            placemarks: Vec::new(),
        }
    }

    pub fn to_element(&self) -> KmlElement {
        let mut element = KmlElement::new("Folder");
        element.push(KmlElement::text_element("name", &self.name));
        for placemark in &self.placemarks {
            element.push(placemark.to_element());
        }
        element
    }
}

/// Geographic bounding box in decimal degrees (EPSG:4326).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl GeoBounds {
    /// True when the box has positive extent in both directions.
    pub fn is_valid(&self) -> bool {
        self.south < self.north && self.west < self.east
    }
}

/// One raster layer: an image pinned to a lat/lon box.
#[derive(Debug, Clone, PartialEq)]
pub struct GroundOverlay {
    pub name: String,
    /// Image reference relative to the document, e.g. `rasters/dem.png`.
    pub href: String,
    pub bounds: GeoBounds,
}

impl GroundOverlay {
    pub fn to_element(&self) -> KmlElement {
        let bounds = &self.bounds;
        KmlElement::new("GroundOverlay")
            .with_child(KmlElement::text_element("visibility", "1"))
            .with_child(KmlElement::text_element("name", &self.name))
            .with_child(
                KmlElement::new("Icon").with_child(KmlElement::text_element("href", &self.href)),
            )
            .with_child(
                KmlElement::new("LatLonBox")
                    .with_child(KmlElement::text_element("north", format_degrees(bounds.north)))
                    .with_child(KmlElement::text_element("south", format_degrees(bounds.south)))
                    .with_child(KmlElement::text_element("east", format_degrees(bounds.east)))
                    .with_child(KmlElement::text_element("west", format_degrees(bounds.west))),
            )
    }
}

/// Format a degree value as a decimal string.
///
/// Uses the shortest representation that reads back to the same `f64`, and
/// always keeps a fractional part (`45` becomes `45.0`).
pub fn format_degrees(value: f64) -> String {
    let text = value.to_string();
    if value.is_finite() && !text.contains(['.', 'e', 'E']) {
        format!("{}.0", text)
    } else {
        text
    }
}
