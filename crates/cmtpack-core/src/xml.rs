//! Minimal owned XML element tree
//!
//! The document is assembled in memory so relationship tables can attach
//! links to entity subtrees emitted earlier, then written out in one pass
//! with quick-xml. No XML declaration is written.

use quick_xml::Writer;
use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use std::io::Write;

use crate::error::{Error, Result};

/// An XML element with ordered attributes and children
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Tag name
    pub name: String,

    /// Attributes in insertion order
    pub attributes: Vec<(String, String)>,

    /// Child elements in document order
    pub children: Vec<Element>,

    /// Text content, written before any children
    pub text: Option<String>,
}

impl Element {
    /// Create an element without attributes or content
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    /// Builder form of [`Element::set_attr`]
    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    /// Builder form setting text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Set an attribute, replacing an existing value in place
    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attributes.iter_mut().find(|(k, _)| *k == key) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((key, value)),
        }
    }

    /// Attribute value by name
    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Append a child and return a handle to it
    pub fn push(&mut self, child: Element) -> &mut Element {
        self.children.push(child);
        let last = self.children.len() - 1;
        &mut self.children[last]
    }

    /// First child with the given tag
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First child with the given tag, appended if absent
    pub fn child_or_insert(&mut self, name: &str) -> &mut Element {
        match self.children.iter().position(|c| c.name == name) {
            Some(i) => &mut self.children[i],
            None => self.push(Element::new(name)),
        }
    }

    /// Children with the given tag
    pub fn children_named<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Element> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// First child with the given tag whose attribute `key` equals `value`
    pub fn find_child_mut(&mut self, name: &str, key: &str, value: &str) -> Option<&mut Element> {
        self.children
            .iter_mut()
            .find(|c| c.name == name && c.attr(key) == Some(value))
    }

    /// Serialize the tree to a string
    pub fn to_xml_string(&self) -> Result<String> {
        let mut buffer = Vec::new();
        self.write_to(&mut buffer)?;
        String::from_utf8(buffer).map_err(|e| Error::Io(std::io::Error::other(e)))
    }

    /// Serialize the tree to a writer
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        let mut writer = Writer::new(writer);
        write_element(&mut writer, self)
    }
}

fn write_element<W: Write>(writer: &mut Writer<W>, element: &Element) -> Result<()> {
    let mut start = BytesStart::new(element.name.as_str());
    for (key, value) in &element.attributes {
        start.push_attribute((key.as_str(), value.as_str()));
    }

    if element.children.is_empty() && element.text.is_none() {
        writer.write_event(Event::Empty(start))?;
        return Ok(());
    }

    writer.write_event(Event::Start(start))?;
    if let Some(text) = &element.text {
        writer.write_event(Event::Text(BytesText::new(text)))?;
    }
    for child in &element.children {
        write_element(writer, child)?;
    }
    writer.write_event(Event::End(BytesEnd::new(element.name.as_str())))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attributes_keep_order_and_replace_in_place() {
        let mut el = Element::new("field").with_attr("name", "a").with_attr("value", "1");
        el.set_attr("name", "b");
        assert_eq!(
            el.attributes,
            vec![
                ("name".to_string(), "b".to_string()),
                ("value".to_string(), "1".to_string())
            ]
        );
        assert_eq!(el.attr("value"), Some("1"));
        assert_eq!(el.attr("missing"), None);
    }

    #[test]
    fn test_serialize_nested() {
        let mut root = Element::new("entities");
        let entity = root.push(Element::new("entity").with_attr("name", "contact"));
        entity.push(Element::new("records"));
        let xml = root.to_xml_string().unwrap();
        assert_eq!(
            xml,
            r#"<entities><entity name="contact"><records/></entity></entities>"#
        );
        assert!(!xml.starts_with("<?xml"));
    }

    #[test]
    fn test_serialize_escapes_text_and_attributes() {
        let mut root = Element::new("r").with_attr("v", "a<b & \"c\"");
        root.push(Element::new("t").with_text("x < y & z"));
        let xml = root.to_xml_string().unwrap();

        let doc = roxmltree::Document::parse(&xml).unwrap();
        let r = doc.root_element();
        assert_eq!(r.attribute("v"), Some("a<b & \"c\""));
        assert_eq!(r.first_element_child().unwrap().text(), Some("x < y & z"));
    }

    #[test]
    fn test_child_lookup() {
        let mut root = Element::new("entities");
        root.push(Element::new("entity").with_attr("name", "a"));
        root.push(Element::new("entity").with_attr("name", "b"));

        let b = root.find_child_mut("entity", "name", "b").unwrap();
        b.child_or_insert("m2mrelationships");
        b.child_or_insert("m2mrelationships");
        assert_eq!(b.children.len(), 1);

        assert!(root.find_child_mut("entity", "name", "c").is_none());
        assert_eq!(root.children_named("entity").count(), 2);
        assert!(root.child("entity").is_some());
        assert!(root.child("records").is_none());
    }
}
