//! In-memory KML element tree.

/// A KML element: a tag with attributes, optional text and ordered children.
///
/// Children keep their insertion order, which is the order they are
/// serialized in.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct KmlElement {
    name: String,
    attributes: Vec<(String, String)>,
    text: Option<String>,
    children: Vec<KmlElement>,
}

impl KmlElement {
    /// Create an empty element.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Create an element holding only text, e.g. `<name>Roads</name>`.
    pub fn text_element(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: Some(text.into()),
            ..Default::default()
        }
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push((key.into(), value.into()));
        self
    }

    /// Add a child element.
    pub fn with_child(mut self, child: KmlElement) -> Self {
        self.children.push(child);
        self
    }

    /// Append a child element.
    pub fn push(&mut self, child: KmlElement) {
        self.children.push(child);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn attributes(&self) -> &[(String, String)] {
        &self.attributes
    }

    pub fn attribute(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn children(&self) -> &[KmlElement] {
        &self.children
    }

    /// First direct child with the given tag.
    pub fn child(&self, name: &str) -> Option<&KmlElement> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All direct children with the given tag, in order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a KmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Text of the first direct child with the given tag.
    pub fn child_text(&self, name: &str) -> Option<&str> {
        self.child(name).and_then(KmlElement::text)
    }
}
