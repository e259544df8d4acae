//! In-memory vector datasets.

use std::collections::HashMap;
use std::fmt;

/// One attribute value.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Integer(i64),
    Real(f64),
    String(String),
    Bool(bool),
    Date { year: u32, month: u32, day: u32 },
}

/// The string form written to KML. Null is empty.
impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Null => Ok(()),
            FieldValue::Integer(v) => write!(f, "{}", v),
            FieldValue::Real(v) => write!(f, "{}", v),
            FieldValue::String(v) => f.write_str(v),
            FieldValue::Bool(v) => write!(f, "{}", v),
            FieldValue::Date { year, month, day } => {
                write!(f, "{:04}-{:02}-{:02}", year, month, day)
            }
        }
    }
}

/// One record of a vector layer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Feature {
    pub attributes: HashMap<String, FieldValue>,
    /// Geometry as well-known binary, `None` for a null geometry.
    pub geometry: Option<Vec<u8>>,
}

impl Feature {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: FieldValue) -> Self {
        self.attributes.insert(name.into(), value);
        self
    }

    pub fn with_geometry(mut self, wkb: Vec<u8>) -> Self {
        self.geometry = Some(wkb);
        self
    }

    /// The stringified value of `field`; missing fields read as empty.
    pub fn field_string(&self, field: &str) -> String {
        self.attributes
            .get(field)
            .map(ToString::to_string)
            .unwrap_or_default()
    }
}

/// A vector layer read into memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct VectorDataset {
    /// Field names in schema order.
    pub fields: Vec<String>,
    /// Features in source order.
    pub features: Vec<Feature>,
    /// Declared spatial reference definition, if any.
    pub spatial_ref: Option<String>,
}

impl VectorDataset {
    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|f| f == name)
    }
}
