use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{PrefixDeclaration, ResolveResult};
use quick_xml::reader::NsReader;

use super::element::{XmlAttribute, XmlElement, XmlNode};
use super::MAX_NESTING_DEPTH;
use crate::types::{Error, Result};

/// Parse a document with exactly one root element into an owned tree
///
/// Whitespace-only text is dropped where it only indents child elements and
/// kept everywhere else; comments, processing instructions and the XML
/// declaration are skipped. CDATA sections become plain text. Elements nested
/// deeper than [`MAX_NESTING_DEPTH`] are rejected.
pub fn parse_document(xml: &str) -> Result<XmlElement> {
    let mut reader = NsReader::from_str(xml);
    let mut open: Vec<XmlElement> = Vec::new();
    let mut root: Option<XmlElement> = None;

    loop {
        let position = reader.buffer_position();
        let (resolved, event) = reader
            .read_resolved_event()
            .map_err(|e| Error::parse(format!("malformed XML near byte {}: {}", position, e)))?;
        let namespace = resolve_namespace(resolved)?;

        match event {
            Event::Start(start) => {
                check_new_element(&open, &root)?;
                open.push(open_element(&start, namespace)?);
            }
            Event::Empty(start) => {
                check_new_element(&open, &root)?;
                let element = open_element(&start, namespace)?;
                close_element(&mut open, &mut root, element);
            }
            Event::End(end) => {
                let element = open.pop().ok_or_else(|| {
                    Error::parse(format!(
                        "unexpected closing tag `{}`",
                        String::from_utf8_lossy(end.name().as_ref())
                    ))
                })?;
                close_element(&mut open, &mut root, element);
            }
            Event::Text(text) => {
                let text = text
                    .unescape()
                    .map_err(|e| Error::parse(format!("invalid text content: {}", e)))?;
                push_text(&mut open, &text)?;
            }
            Event::CData(data) => {
                let text = std::str::from_utf8(&data)
                    .map_err(|e| Error::parse(format!("invalid CDATA content: {}", e)))?;
                push_text(&mut open, text)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctypes
            _ => {}
        }
    }

    if let Some(unclosed) = open.last() {
        return Err(Error::parse(format!(
            "unexpected end of document inside `{}`",
            unclosed.name
        )));
    }
    root.ok_or_else(|| Error::parse("document has no root element"))
}

fn check_new_element(open: &[XmlElement], root: &Option<XmlElement>) -> Result<()> {
    if root.is_some() {
        return Err(Error::parse("document has more than one root element"));
    }
    if open.len() >= MAX_NESTING_DEPTH {
        return Err(Error::parse(format!(
            "elements are nested deeper than {} levels",
            MAX_NESTING_DEPTH
        )));
    }
    Ok(())
}

fn resolve_namespace(resolved: ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(decode(ns.as_ref())?)),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::parse(format!(
            "namespace prefix `{}` is not declared",
            String::from_utf8_lossy(&prefix)
        ))),
    }
}

fn open_element(start: &BytesStart<'_>, namespace: Option<String>) -> Result<XmlElement> {
    let name = start.name();
    let mut element = XmlElement {
        name: decode(name.local_name().as_ref())?,
        namespace,
        prefix: name.prefix().map(|p| decode(p.as_ref())).transpose()?,
        ..XmlElement::default()
    };

    for attr in start.attributes() {
        let attr = attr.map_err(|e| Error::parse(format!("invalid attribute: {}", e)))?;
        let value = attr
            .unescape_value()
            .map_err(|e| Error::parse(format!("invalid attribute value: {}", e)))?
            .into_owned();

        match attr.key.as_namespace_binding() {
            // The default namespace is already resolved into `namespace`
            Some(PrefixDeclaration::Default) => {}
            Some(PrefixDeclaration::Named(prefix)) => {
                element.prefix_declarations.push((decode(prefix)?, value));
            }
            None => element.attributes.push(XmlAttribute {
                name: decode(attr.key.as_ref())?,
                value,
            }),
        }
    }

    Ok(element)
}

fn close_element(open: &mut [XmlElement], root: &mut Option<XmlElement>, mut element: XmlElement) {
    strip_indentation(&mut element);
    match open.last_mut() {
        Some(parent) => parent.children.push(XmlNode::Element(element)),
        None => *root = Some(element),
    }
}

/// Drop the text of an element whose text is only whitespace between child elements
fn strip_indentation(element: &mut XmlElement) {
    let has_elements = element.children.iter().any(|c| matches!(c, XmlNode::Element(_)));
    let blank_text = element.children.iter().all(|c| match c {
        XmlNode::Text(t) => t.trim().is_empty(),
        XmlNode::Element(_) => true,
    });
    if has_elements && blank_text {
        element.children.retain(|c| matches!(c, XmlNode::Element(_)));
    }
}

fn push_text(open: &mut [XmlElement], text: &str) -> Result<()> {
    let Some(parent) = open.last_mut() else {
        if text.trim().is_empty() {
            return Ok(());
        }
        return Err(Error::parse("text content outside of the root element"));
    };

    // Text split by a CDATA section or a skipped comment stays one node
    if let Some(XmlNode::Text(previous)) = parent.children.last_mut() {
        previous.push_str(text);
    } else {
        parent.children.push(XmlNode::Text(text.to_string()));
    }
    Ok(())
}

fn decode(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::parse(format!("invalid UTF-8 in XML name: {}", e)))
}
