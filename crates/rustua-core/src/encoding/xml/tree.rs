use crate::DecodeError;

/// Default namespace of OPC UA XML-encoded values.
pub const TYPES_NAMESPACE: &str = "http://opcfoundation.org/UA/2008/02/Types.xsd";
pub const XSI_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema-instance";

/// An owned element: local name, concatenated character data, the
/// `xsi:nil` flag and child elements in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlNode {
    pub name: String,
    pub text: String,
    pub nil: bool,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn leaf(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            ..Self::default()
        }
    }

    pub fn nil(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nil: true,
            ..Self::default()
        }
    }

    pub fn with_child(mut self, child: XmlNode) -> Self {
        self.children.push(child);
        self
    }

    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// First character in this subtree's text that XML 1.0 cannot carry.
    pub fn invalid_char(&self) -> Option<char> {
        self.text
            .chars()
            .find(|&c| !is_xml_char(c))
            .or_else(|| self.children.iter().find_map(XmlNode::invalid_char))
    }

    /// Parses a document into its root element, refusing nesting deeper
    /// than `max_depth` elements.
    pub fn parse(text: &str, max_depth: usize) -> Result<Self, DecodeError> {
        let document = roxmltree::Document::parse(text)
            .map_err(|err| DecodeError::MalformedDocument(err.to_string()))?;
        convert(document.root_element(), 0, max_depth)
    }

    /// Serializes as a document root carrying the namespace declarations.
    pub fn to_document_string(&self) -> String {
        let mut out = String::new();
        self.write(&mut out, true);
        out
    }

    fn write(&self, out: &mut String, root: bool) {
        out.push('<');
        out.push_str(&self.name);
        if root {
            out.push_str(" xmlns=\"");
            out.push_str(TYPES_NAMESPACE);
            out.push_str("\" xmlns:xsi=\"");
            out.push_str(XSI_NAMESPACE);
            out.push('"');
        }
        if self.nil {
            out.push_str(" xsi:nil=\"true\"");
        }
        if self.text.is_empty() && self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        escape_text(&self.text, out);
        for child in &self.children {
            child.write(out, false);
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn convert(node: roxmltree::Node<'_, '_>, depth: usize, max_depth: usize) -> Result<XmlNode, DecodeError> {
    if depth > max_depth {
        return Err(DecodeError::LimitExceeded {
            what: "nesting depth",
            limit: max_depth,
        });
    }
    let mut out = XmlNode::new(node.tag_name().name());
    out.nil = node
        .attributes()
        .any(|a| a.name() == "nil" && matches!(a.value(), "true" | "1"));
    for child in node.children() {
        if child.is_element() {
            out.children.push(convert(child, depth + 1, max_depth)?);
        } else if child.is_text() {
            out.text.push_str(child.text().unwrap_or_default());
        }
    }
    Ok(out)
}

/// The XML 1.0 `Char` production; `str` already excludes surrogates.
pub fn is_xml_char(c: char) -> bool {
    matches!(c, '\t' | '\n' | '\r' | '\u{20}'..='\u{FFFD}' | '\u{10000}'..)
}

fn escape_text(text: &str, out: &mut String) {
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '\r' => out.push_str("&#xD;"),
            c => out.push(c),
        }
    }
}
