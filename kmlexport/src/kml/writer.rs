//! KML serialization with `quick-xml`.

use std::io::{self, Write};

use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::KmlElement;

/// Write `root` as a UTF-8 XML document with a declaration header.
pub fn write_document<W: Write>(root: &KmlElement, out: W) -> io::Result<()> {
    let mut xml = Writer::new_with_indent(out, b' ', 2);
    xml.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    write_element(&mut xml, root)?;
    let mut out = xml.into_inner();
    out.write_all(b"\n")?;
    out.flush()
}

/// Serialize `root` to a string.
pub fn to_xml_string(root: &KmlElement) -> io::Result<String> {
    let mut buffer = Vec::new();
    write_document(root, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn write_element<W: Write>(xml: &mut Writer<W>, element: &KmlElement) -> io::Result<()> {
    let mut start = BytesStart::new(element.name());
    for (key, value) in element.attributes() {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.text().is_none() && element.children().is_empty() {
        return xml.write_event(Event::Empty(start));
    }

    xml.write_event(Event::Start(start))?;
    if let Some(text) = element.text() {
        xml.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in element.children() {
        write_element(xml, child)?;
    }
    xml.write_event(Event::End(BytesEnd::new(element.name())))
}
