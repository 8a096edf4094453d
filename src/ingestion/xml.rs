//! XML source reader.
//!
//! Reads a document of the shape
//!
//! ```xml
//! <orders>
//!   <order>
//!     <order_id>ORD-2024-1</order_id>
//!     ...
//!   </order>
//! </orders>
//! ```
//!
//! into a list of [`RawNode`]s, one per direct child of the root with the requested element name.
//! Only structural problems are errors here; whether a node carries usable fields is decided by
//! the normalizer.

use std::fs;
use std::path::Path;

use quick_xml::Reader;
use quick_xml::events::Event;

use crate::error::{InputError, InputResult};

/// One repeated element under the document root, with its child elements' text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawNode {
    /// 1-based position among nodes of the same name.
    pub position: usize,
    children: Vec<(String, Option<String>)>,
}

impl RawNode {
    pub fn new(position: usize) -> Self {
        Self {
            position,
            children: Vec::new(),
        }
    }

    /// Add a child element (builder style, mostly useful in tests).
    pub fn with_child(mut self, name: impl Into<String>, text: Option<&str>) -> Self {
        self.children.push((name.into(), text.map(str::to_owned)));
        self
    }

    /// Look up the first child named `name`.
    ///
    /// Returns `None` if no such child exists, `Some(None)` if it exists without text.
    pub fn child(&self, name: &str) -> Option<Option<&str>> {
        self.children
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, text)| text.as_deref())
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}

/// Read an XML file and collect the root's children named `node_name`.
pub fn read_nodes_from_path(path: impl AsRef<Path>, node_name: &str) -> InputResult<Vec<RawNode>> {
    let text = fs::read_to_string(path)?;
    read_nodes_from_str(&text, node_name)
}

/// Read XML from an in-memory string and collect the root's children named `node_name`.
pub fn read_nodes_from_str(input: &str, node_name: &str) -> InputResult<Vec<RawNode>> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(true);

    let mut depth = 0usize;
    let mut root_closed = false;
    let mut nodes: Vec<RawNode> = Vec::new();
    let mut current: Option<RawNode> = None;
    let mut child: Option<(String, Option<String>)> = None;

    loop {
        let event = match reader.read_event() {
            Ok(e) => e,
            Err(source) => {
                return Err(InputError::Xml {
                    position: reader.buffer_position() as u64,
                    source,
                });
            }
        };

        match event {
            Event::Start(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match depth {
                    0 if root_closed => return Err(multiple_roots()),
                    1 if name == node_name => current = Some(RawNode::new(nodes.len() + 1)),
                    2 if current.is_some() => child = Some((name, None)),
                    _ => {}
                }
                depth += 1;
            }
            Event::Empty(e) => {
                let name = String::from_utf8_lossy(e.name().as_ref()).into_owned();
                match depth {
                    0 if root_closed => return Err(multiple_roots()),
                    0 => root_closed = true,
                    1 if name == node_name => nodes.push(RawNode::new(nodes.len() + 1)),
                    2 => {
                        if let Some(node) = current.as_mut() {
                            node.children.push((name, None));
                        }
                    }
                    _ => {}
                }
            }
            Event::End(_) => {
                depth = depth.checked_sub(1).ok_or_else(|| InputError::Malformed {
                    message: "end tag without matching start tag".to_string(),
                })?;
                match depth {
                    0 => root_closed = true,
                    1 => {
                        if let Some(node) = current.take() {
                            nodes.push(node);
                        }
                    }
                    2 => {
                        if let (Some(c), Some(node)) = (child.take(), current.as_mut()) {
                            node.children.push(c);
                        }
                    }
                    _ => {}
                }
            }
            Event::Text(t) => {
                let text = t.unescape().map_err(|source| InputError::Xml {
                    position: reader.buffer_position() as u64,
                    source,
                })?;
                if depth == 0 && !text.trim().is_empty() {
                    return Err(InputError::Malformed {
                        message: format!("text outside the root element: '{text}'"),
                    });
                }
                if depth == 3 {
                    push_text(&mut child, &text);
                }
            }
            Event::CData(c) => {
                let text = std::str::from_utf8(&c).map_err(|e| InputError::Malformed {
                    message: format!("CDATA section is not valid UTF-8: {e}"),
                })?;
                if depth == 3 {
                    push_text(&mut child, text);
                }
            }
            Event::Eof => {
                if depth != 0 {
                    return Err(InputError::Malformed {
                        message: format!("unexpected end of document with {depth} unclosed element(s)"),
                    });
                }
                if !root_closed {
                    return Err(InputError::Malformed {
                        message: "document has no root element".to_string(),
                    });
                }
                break;
            }
            // Declarations, comments, processing instructions, doctype.
            _ => {}
        }
    }

    Ok(nodes)
}

fn push_text(child: &mut Option<(String, Option<String>)>, text: &str) {
    if let Some((_, slot)) = child.as_mut() {
        slot.get_or_insert_with(String::new).push_str(text);
    }
}

fn multiple_roots() -> InputError {
    InputError::Malformed {
        message: "document has more than one root element".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_order_children_in_document_order() {
        let xml = r#"<?xml version="1.0"?>
            <orders>
              <order><order_id>ORD-2024-1</order_id><sku_id> SKU1 </sku_id></order>
              <note>ignored</note>
              <order><order_id>ORD-2024-2</order_id></order>
            </orders>"#;
        let nodes = read_nodes_from_str(xml, "order").unwrap();
        assert_eq!(nodes.len(), 2);
        assert_eq!(nodes[0].position, 1);
        assert_eq!(nodes[0].child("order_id"), Some(Some("ORD-2024-1")));
        assert_eq!(nodes[0].child("sku_id"), Some(Some("SKU1")));
        assert_eq!(nodes[1].child("order_id"), Some(Some("ORD-2024-2")));
        assert_eq!(nodes[1].child("sku_id"), None);
    }

    #[test]
    fn empty_children_have_no_text() {
        let xml = "<orders><order><sku_id/><order_id></order_id></order></orders>";
        let nodes = read_nodes_from_str(xml, "order").unwrap();
        assert_eq!(nodes[0].child("sku_id"), Some(None));
        assert_eq!(nodes[0].child("order_id"), Some(None));
    }

    #[test]
    fn unescapes_entities_and_reads_cdata() {
        let xml = "<orders><order><sku_id>A&amp;B</sku_id><order_id><![CDATA[ORD-1]]></order_id></order></orders>";
        let nodes = read_nodes_from_str(xml, "order").unwrap();
        assert_eq!(nodes[0].child("sku_id"), Some(Some("A&B")));
        assert_eq!(nodes[0].child("order_id"), Some(Some("ORD-1")));
    }

    #[test]
    fn first_duplicate_child_wins() {
        let xml = "<orders><order><sku_id>A</sku_id><sku_id>B</sku_id></order></orders>";
        let nodes = read_nodes_from_str(xml, "order").unwrap();
        assert_eq!(nodes[0].child("sku_id"), Some(Some("A")));
        assert_eq!(nodes[0].child_count(), 2);
    }

    #[test]
    fn empty_root_yields_no_nodes() {
        assert!(read_nodes_from_str("<orders/>", "order").unwrap().is_empty());
        assert!(read_nodes_from_str("<orders></orders>", "order").unwrap().is_empty());
    }

    #[test]
    fn structural_problems_are_errors() {
        assert!(read_nodes_from_str("", "order").is_err());
        assert!(read_nodes_from_str("<orders><order>", "order").is_err());
        assert!(read_nodes_from_str("<orders></order>", "order").is_err());
        assert!(read_nodes_from_str("<a/><b/>", "order").is_err());
        assert!(read_nodes_from_str("just text", "order").is_err());
    }
}
