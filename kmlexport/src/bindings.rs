//! Per-layer property bindings.
//!
//! A binding maps one of the recognised KML properties to a value string.
//! Whether that string names a field or is a literal is decided once per
//! layer against the layer's schema: names present in the schema are
//! resolved per feature, anything else is emitted verbatim.

use std::collections::BTreeMap;
use std::fmt;

/// Marker the selection table uses for "no value".
pub const UNSET_MARKER: &str = "<None>";

/// KML properties a binding can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KmlProperty {
    Name,
    Description,
    Timestamp,
    Begin,
    End,
    AltitudeMode,
    Tessellate,
    Extrude,
    Visibility,
    DrawOrder,
    Icon,
}

impl KmlProperty {
    pub const ALL: [KmlProperty; 11] = [
        KmlProperty::Name,
        KmlProperty::Description,
        KmlProperty::Timestamp,
        KmlProperty::Begin,
        KmlProperty::End,
        KmlProperty::AltitudeMode,
        KmlProperty::Tessellate,
        KmlProperty::Extrude,
        KmlProperty::Visibility,
        KmlProperty::DrawOrder,
        KmlProperty::Icon,
    ];

    /// Column label as shown in the selection table.
    pub fn label(&self) -> &'static str {
        match self {
            KmlProperty::Name => "Name",
            KmlProperty::Description => "description",
            KmlProperty::Timestamp => "timestamp",
            KmlProperty::Begin => "begin",
            KmlProperty::End => "end",
            KmlProperty::AltitudeMode => "altitudeMode",
            KmlProperty::Tessellate => "tessellate",
            KmlProperty::Extrude => "extrude",
            KmlProperty::Visibility => "visibility",
            KmlProperty::DrawOrder => "drawOrder",
            KmlProperty::Icon => "icon",
        }
    }

    /// Look up a property by label, ignoring case.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|p| p.label().eq_ignore_ascii_case(key.trim()))
    }
}

impl fmt::Display for KmlProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Bindings chosen for one layer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PropertyBindings {
    values: BTreeMap<KmlProperty, String>,
    folder_name: Option<String>,
    fields: Vec<String>,
}

impl PropertyBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind `property` to `value`. Empty values and `<None>` clear the binding.
    pub fn with(mut self, property: KmlProperty, value: impl Into<String>) -> Self {
        self.set(property, value);
        self
    }

    pub fn set(&mut self, property: KmlProperty, value: impl Into<String>) {
        match normalize(value.into()) {
            Some(value) => {
                self.values.insert(property, value);
            }
            None => {
                self.values.remove(&property);
            }
        }
    }

    pub fn with_folder_name(mut self, folder_name: impl Into<String>) -> Self {
        self.folder_name = normalize(folder_name.into());
        self
    }

    /// Additional fields to attach as extended data, in output order.
    ///
    /// Duplicates are dropped so each field is emitted once.
    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for field in fields {
            if let Some(field) = normalize(field.into()) {
                if !self.fields.contains(&field) {
                    self.fields.push(field);
                }
            }
        }
        self
    }

    pub fn get(&self, property: KmlProperty) -> Option<&str> {
        self.values.get(&property).map(String::as_str)
    }

    pub fn name(&self) -> Option<&str> {
        self.get(KmlProperty::Name)
    }

    pub fn description(&self) -> Option<&str> {
        self.get(KmlProperty::Description)
    }

    pub fn folder_name(&self) -> Option<&str> {
        self.folder_name.as_deref()
    }

    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// All set bindings, in property order.
    pub fn iter(&self) -> impl Iterator<Item = (KmlProperty, &str)> {
        self.values.iter().map(|(p, v)| (*p, v.as_str()))
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty() && self.folder_name.is_none() && self.fields.is_empty()
    }
}

/// `None` for blank values and the unset marker; anything else is kept
/// exactly as given.
fn normalize(value: String) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() || trimmed == UNSET_MARKER {
        None
    } else {
        Some(value)
    }
}

/// A binding value classified against a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingValue {
    /// Resolve from this field on every feature.
    Field(String),
    /// Emit unchanged on every feature.
    Literal(String),
}

impl BindingValue {
    /// Classify `value`: a field if the schema contains it, otherwise a literal.
    pub fn classify(value: &str, schema: &[String]) -> Self {
        if schema.iter().any(|f| f == value) {
            BindingValue::Field(value.to_string())
        } else {
            BindingValue::Literal(value.to_string())
        }
    }
}
