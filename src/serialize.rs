//! Canonical serialization of a parsed [`Document`] back to markup text:
//! 4-space indent per depth, `<tag/>` for elements with no content
//! children, collapsed text runs, escaped attribute values.

use std::fmt::Write as _;

use crate::node::{Document, NodeId, NodeKind};

const INDENT: &str = "    ";

/// Render the whole document as canonical markup text.
pub fn to_string(doc: &Document) -> String {
    let mut out = String::new();
    for child in doc.children(doc.root()) {
        write_node(doc, child, 0, &mut out);
    }
    out
}

fn write_node(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    match &doc.get(id).kind {
        NodeKind::Root | NodeKind::Attribute(..) => {}
        NodeKind::DocumentType(_) => write_doctype(doc, id, depth, out),
        NodeKind::ElementType(_) | NodeKind::EntityDefinition(_) => {
            // Only meaningful inside a DocumentType's subset; see write_declaration.
        }
        NodeKind::Comment(body) => {
            let _ = writeln!(out, "{}<!--{}-->", indent, body);
        }
        NodeKind::ProcessingInstruction(name, attrs) => {
            let mut attrs_str = String::new();
            for (k, v) in attrs {
                let _ = write!(attrs_str, " {}=\"{}\"", k, v);
            }
            let _ = writeln!(out, "{}<?{}{}?>", indent, name, attrs_str);
        }
        NodeKind::Element(name) => {
            let mut attrs_str = String::new();
            let mut content_children = Vec::new();
            for child in doc.children(id) {
                match &doc.get(child).kind {
                    NodeKind::Attribute(attr_name, value) => {
                        let _ = write!(attrs_str, " {}=\"{}\"", attr_name, value.escape());
                    }
                    _ => content_children.push(child),
                }
            }
            if content_children.is_empty() {
                let _ = writeln!(out, "{}<{}{}/>", indent, name, attrs_str);
            } else {
                let _ = writeln!(out, "{}<{}{}>", indent, name, attrs_str);
                for child in content_children {
                    write_node(doc, child, depth + 1, out);
                }
                let _ = writeln!(out, "{}</{}>", indent, name);
            }
        }
        NodeKind::Text(text) => {
            let collapsed = text.collapse();
            let trimmed = collapsed.trim();
            if !trimmed.is_empty() {
                let _ = writeln!(out, "{}{}", indent, trimmed);
            }
        }
    }
}

fn write_doctype(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    let dt = match &doc.get(id).kind {
        NodeKind::DocumentType(dt) => dt,
        _ => return,
    };
    let mut head = format!("{}<!DOCTYPE {}", indent, dt.root_name);
    match dt.location.len() {
        2 => {
            let _ = write!(head, " PUBLIC \"{}\" \"{}\"", dt.location[0], dt.location[1]);
        }
        1 => {
            let _ = write!(head, " SYSTEM \"{}\"", dt.location[0]);
        }
        _ => {}
    }
    let kids: Vec<NodeId> = doc.children(id).collect();
    if kids.is_empty() {
        out.push_str(&head);
        out.push_str(">\n");
        return;
    }
    out.push_str(&head);
    out.push_str(" [\n");
    for kid in kids {
        write_declaration(doc, kid, depth + 1, out);
    }
    let _ = writeln!(out, "{}]>", indent);
}

fn write_declaration(doc: &Document, id: NodeId, depth: usize, out: &mut String) {
    let indent = INDENT.repeat(depth);
    match &doc.get(id).kind {
        NodeKind::ElementType(et) => {
            let _ = writeln!(out, "{}<!ELEMENT {} {}>", indent, et.name, et.content);
        }
        NodeKind::EntityDefinition(ed) if ed.system => {
            let _ = writeln!(out, "{}<!ENTITY % {} \"{}\">", indent, ed.name, ed.value);
        }
        NodeKind::EntityDefinition(ed) => {
            let _ = writeln!(out, "{}<!ENTITY {} \"{}\">", indent, ed.name, ed.value);
        }
        NodeKind::Comment(body) => {
            let _ = writeln!(out, "{}<!--{}-->", indent, body);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{Name, Text};

    #[test]
    fn empty_element_has_no_separate_close_tag() {
        let mut doc = Document::new();
        doc.append(doc.root(), NodeKind::Element(Name::new("x")));
        assert_eq!(to_string(&doc), "<x/>\n");
    }

    #[test]
    fn element_with_text_child_round_trips_readably() {
        let mut doc = Document::new();
        let root = doc.append(doc.root(), NodeKind::Element(Name::new("a")));
        doc.append(root, NodeKind::Text(Text::new("hello")));
        assert_eq!(to_string(&doc), "<a>\n    hello\n</a>\n");
    }
}
