use quick_xml::events::{BytesEnd, BytesStart, BytesText, Event};
use quick_xml::Writer;

use super::element::{XmlElement, XmlNode};
use super::MAX_NESTING_DEPTH;
use crate::types::{Error, Result};

const INDENT: &str = "  ";

/// Namespace bindings visible at the element being written
#[derive(Clone, Default)]
struct Scope<'a> {
    default: Option<&'a str>,
    prefixes: Vec<(&'a str, &'a str)>,
}

impl<'a> Scope<'a> {
    fn prefix_bound_to(&self, prefix: &str, uri: &str) -> bool {
        self.prefixes
            .iter()
            .rev()
            .find(|(p, _)| *p == prefix)
            .is_some_and(|(_, bound)| *bound == uri)
    }
}

/// Serialize an element tree without an XML declaration
///
/// Element-only content is indented by two spaces per level; an element
/// holding text is written on one line so its text survives a re-parse
/// unchanged. Namespace declarations are emitted only where the in-scope
/// binding changes. Trees nested deeper than [`MAX_NESTING_DEPTH`] are
/// refused, since they could not be parsed back.
pub fn to_xml_string(root: &XmlElement) -> Result<String> {
    let mut writer = Writer::new(Vec::new());
    write_element(&mut writer, root, Some(0), 1, &Scope::default())?;
    String::from_utf8(writer.into_inner()).map_err(|e| Error::Serialize(e.to_string()))
}

fn write_element<'a>(
    writer: &mut Writer<Vec<u8>>,
    element: &'a XmlElement,
    indent: Option<usize>,
    level: usize,
    parent_scope: &Scope<'a>,
) -> Result<()> {
    if level > MAX_NESTING_DEPTH {
        return Err(Error::Serialize(format!(
            "elements are nested deeper than {} levels",
            MAX_NESTING_DEPTH
        )));
    }

    let mut scope = parent_scope.clone();
    let qualified_name = match &element.prefix {
        Some(prefix) => format!("{}:{}", prefix, element.name),
        None => element.name.clone(),
    };
    let mut start = BytesStart::new(qualified_name.as_str());

    for (prefix, uri) in &element.prefix_declarations {
        start.push_attribute((format!("xmlns:{}", prefix).as_str(), uri.as_str()));
        scope.prefixes.push((prefix.as_str(), uri.as_str()));
    }

    match (&element.prefix, element.namespace.as_deref()) {
        (Some(prefix), Some(uri)) => {
            if !scope.prefix_bound_to(prefix, uri) {
                start.push_attribute((format!("xmlns:{}", prefix).as_str(), uri));
                scope.prefixes.push((prefix.as_str(), uri));
            }
        }
        (Some(prefix), None) => {
            return Err(Error::Serialize(format!(
                "element `{}:{}` has a prefix but no namespace",
                prefix, element.name
            )));
        }
        (None, namespace) => {
            if namespace != scope.default {
                start.push_attribute(("xmlns", namespace.unwrap_or("")));
                scope.default = namespace;
            }
        }
    }

    for attr in &element.attributes {
        start.push_attribute((attr.name.as_str(), attr.value.as_str()));
    }

    if element.children.is_empty() {
        return emit(writer, Event::Empty(start));
    }

    emit(writer, Event::Start(start))?;
    // Indentation would add text to mixed content
    let child_indent = match indent {
        Some(d) if !element.has_text() => Some(d + 1),
        _ => None,
    };
    for child in &element.children {
        if let Some(d) = child_indent {
            write_indent(writer, d)?;
        }
        match child {
            XmlNode::Element(e) => write_element(writer, e, child_indent, level + 1, &scope)?,
            XmlNode::Text(t) => emit(writer, Event::Text(BytesText::new(t)))?,
        }
    }
    if let (Some(d), Some(_)) = (indent, child_indent) {
        write_indent(writer, d)?;
    }
    emit(writer, Event::End(BytesEnd::new(qualified_name.as_str())))
}

fn write_indent(writer: &mut Writer<Vec<u8>>, depth: usize) -> Result<()> {
    let indent = format!("\n{}", INDENT.repeat(depth));
    emit(writer, Event::Text(BytesText::new(&indent)))
}

fn emit(writer: &mut Writer<Vec<u8>>, event: Event<'_>) -> Result<()> {
    writer
        .write_event(event)
        .map_err(|e| Error::Serialize(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xml::parse_document;

    #[test]
    fn indents_element_content_and_keeps_text_inline() {
        let root = XmlElement::new("Configuration")
            .with_child(XmlElement::new("Enabled").with_text("true"))
            .with_child(XmlElement::new("Public").with_child(XmlElement::new("Leaf")));

        assert_eq!(
            to_xml_string(&root).unwrap(),
            "<Configuration>\n  <Enabled>true</Enabled>\n  <Public>\n    <Leaf/>\n  </Public>\n</Configuration>"
        );
    }

    #[test]
    fn declares_default_namespace_only_where_it_changes() {
        let root = XmlElement::new("Outer").with_child(
            XmlElement::new("Inner")
                .in_namespace("urn:diag")
                .with_child(XmlElement::new("Deep").in_namespace("urn:diag"))
                .with_child(XmlElement::new("Plain")),
        );

        assert_eq!(
            to_xml_string(&root).unwrap(),
            "<Outer>\n  <Inner xmlns=\"urn:diag\">\n    <Deep/>\n    <Plain xmlns=\"\"/>\n  </Inner>\n</Outer>"
        );
    }

    #[test]
    fn escapes_text_and_attribute_values() {
        let root = XmlElement::new("a")
            .with_attribute("q", "\"<&>\"")
            .with_text("1 < 2 & 3");
        let written = to_xml_string(&root).unwrap();
        assert_eq!(parse_document(&written).unwrap(), root);
    }

    #[test]
    fn reparse_preserves_prefixes_and_mixed_content() {
        let source = r#"<r xmlns:p="urn:p"><p:item p:k="v">a <b>bold</b> c</p:item><p:other/></r>"#;
        let parsed = parse_document(source).unwrap();
        let written = to_xml_string(&parsed).unwrap();
        assert_eq!(parse_document(&written).unwrap(), parsed);
        assert!(written.contains("a <b>bold</b> c"));
    }

    #[test]
    fn whitespace_text_survives_a_reparse() {
        let root = XmlElement::new("Root")
            .with_child(XmlElement::new("Sep").with_text(" "))
            .with_child(XmlElement::new("Empty"));
        let written = to_xml_string(&root).unwrap();
        assert_eq!(written, "<Root>\n  <Sep> </Sep>\n  <Empty/>\n</Root>");
        assert_eq!(parse_document(&written).unwrap(), root);
    }

    #[test]
    fn refuses_trees_too_deep_to_read_back() {
        let nest = |levels: usize| {
            let mut root = XmlElement::new("a");
            for _ in 1..levels {
                root = XmlElement::new("a").with_child(root);
            }
            root
        };

        let deepest = to_xml_string(&nest(MAX_NESTING_DEPTH)).unwrap();
        assert!(parse_document(&deepest).is_ok());
        assert!(matches!(to_xml_string(&nest(MAX_NESTING_DEPTH + 1)), Err(Error::Serialize(_))));
    }
}
