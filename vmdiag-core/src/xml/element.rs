/// An attribute as written in the source: raw qualified name and unescaped value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    pub name: String,
    pub value: String,
}

/// Child of an element
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlNode {
    Element(XmlElement),
    Text(String),
}

/// Owned XML element tree
///
/// `namespace` holds the resolved namespace URI, so two elements compare equal
/// regardless of whether the namespace was declared on them or inherited.
/// Default namespace declarations are not stored; they are re-derived from
/// `namespace` when the tree is written back out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    pub name: String,
    pub namespace: Option<String>,
    pub prefix: Option<String>,
    pub attributes: Vec<XmlAttribute>,
    /// `xmlns:prefix="uri"` declarations carried by this element
    pub prefix_declarations: Vec<(String, String)>,
    pub children: Vec<XmlNode>,
}

impl XmlElement {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn in_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.namespace = Some(namespace.into());
        self
    }

    pub fn with_attribute(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(XmlAttribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn with_child(mut self, child: XmlElement) -> Self {
        self.children.push(XmlNode::Element(child));
        self
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.children.push(XmlNode::Text(text.into()));
        self
    }

    /// Value of the attribute with the given raw name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Direct child elements, in order
    pub fn elements(&self) -> impl DoubleEndedIterator<Item = &XmlElement> {
        self.children.iter().filter_map(|child| match child {
            XmlNode::Element(e) => Some(e),
            XmlNode::Text(_) => None,
        })
    }

    /// All elements below this one in document order, not including itself
    pub fn descendants(&self) -> Descendants<'_> {
        Descendants {
            stack: self.elements().rev().collect(),
        }
    }

    /// This element or the first descendant whose local name matches,
    /// whatever its namespace
    pub fn find(&self, local_name: &str) -> Option<&XmlElement> {
        if self.name == local_name {
            return Some(self);
        }
        self.descendants().find(|e| e.name == local_name)
    }

    /// Concatenated text of the direct text children
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                XmlNode::Text(t) => Some(t.as_str()),
                XmlNode::Element(_) => None,
            })
            .collect()
    }

    pub fn has_text(&self) -> bool {
        self.children.iter().any(|c| matches!(c, XmlNode::Text(_)))
    }

    /// Moves every element of the tree that has no namespace into `namespace`
    ///
    /// Consumes the tree; callers that want to keep their copy clone first.
    pub fn adopt_namespace(mut self, namespace: &str) -> Self {
        self.for_each_element_mut(|e| {
            if e.namespace.is_none() && e.prefix.is_none() {
                e.namespace = Some(namespace.to_string());
            }
        });
        self
    }

    /// Inverse of [`XmlElement::adopt_namespace`]: unprefixed elements in
    /// `namespace` lose their namespace
    pub fn release_namespace(mut self, namespace: &str) -> Self {
        self.for_each_element_mut(|e| {
            if e.prefix.is_none() && e.namespace.as_deref() == Some(namespace) {
                e.namespace = None;
            }
        });
        self
    }

    /// Visit this element and every descendant without recursing
    fn for_each_element_mut(&mut self, mut f: impl FnMut(&mut XmlElement)) {
        let mut stack: Vec<&mut XmlElement> = vec![self];
        while let Some(element) = stack.pop() {
            f(&mut *element);
            stack.extend(element.children.iter_mut().filter_map(|child| match child {
                XmlNode::Element(e) => Some(e),
                XmlNode::Text(_) => None,
            }));
        }
    }
}

/// Depth-first iterator returned by [`XmlElement::descendants`]
pub struct Descendants<'a> {
    stack: Vec<&'a XmlElement>,
}

impl<'a> Iterator for Descendants<'a> {
    type Item = &'a XmlElement;

    fn next(&mut self) -> Option<Self::Item> {
        let next = self.stack.pop()?;
        self.stack.extend(next.elements().rev());
        Some(next)
    }
}
