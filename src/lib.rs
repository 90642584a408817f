//! A validating XML/SGML parser and DTD-aware document tree.
//!
//! Parsing builds a [`Document`]: an arena of nodes covering elements,
//! attributes, text, comments, processing instructions, and the DTD
//! declarations (`<!DOCTYPE>`, `<!ELEMENT>`, `<!ATTLIST>`, `<!ENTITY>`) a
//! document may carry. [`parse_str`] and [`parse_file`] are the two entry
//! points; [`ParserOptions`] selects validating mode, external DTD
//! fetching, and file-lock behavior. [`to_string`] renders a `Document`
//! back to canonical markup text.

mod content;
mod declaration;
mod element;
mod entity;
mod error;
mod lock;
mod node;
mod parser;
mod serialize;
mod stream;
mod tokenizer;
mod validator;

pub use content::{Bound, ContentModel, Occurrence};
pub use error::{Context, Error, MarkupError, Result, TextPos};
pub use lock::WaitPolicy;
pub use node::{
    Document, DocumentTypeData, ElementTypeData, EntityDefinitionData, Name, NodeData, NodeId, NodeKind, Text,
};
pub use parser::{parse_file, parse_file_with, parse_str, ParserOptions};
pub use serialize::to_string;
pub use stream::{CharStream, Whence};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_document() {
        let doc = parse_str("<root><child/></root>", ParserOptions::default()).unwrap();
        let root = doc.element_children(doc.root()).next().unwrap();
        assert!(matches!(&doc.get(root).kind, NodeKind::Element(n) if n == &Name::new("root")));
        let child = doc.element_children(root).next().unwrap();
        assert!(matches!(&doc.get(child).kind, NodeKind::Element(n) if n == &Name::new("child")));
    }

    #[test]
    fn entity_reference_expands_inline() {
        let doc = parse_str("<root>a &amp; b</root>", ParserOptions::default()).unwrap();
        let root = doc.element_children(doc.root()).next().unwrap();
        let text = doc.children(root).find_map(|c| match &doc.get(c).kind {
            NodeKind::Text(t) => Some(t.0.clone()),
            _ => None,
        });
        assert_eq!(text.as_deref(), Some("a & b"));
    }

    #[test]
    fn mismatched_closing_tag_is_rejected() {
        let result = parse_str("<r><a></b></r>", ParserOptions::validating());
        assert!(result.is_err());
    }

    #[test]
    fn validating_mode_requires_dtd() {
        let result = parse_str("<root/>", ParserOptions::validating());
        assert!(result.is_err());
    }

    #[test]
    fn validating_mode_accepts_matching_dtd() {
        let xml = r#"<!DOCTYPE root [
<!ELEMENT root (child)>
<!ELEMENT child EMPTY>
]>
<root><child/></root>"#;
        let doc = parse_str(xml, ParserOptions::validating()).unwrap();
        let root = doc.element_children(doc.root()).next().unwrap();
        assert!(doc.element_children(root).next().is_some());
    }

    #[test]
    fn serialization_round_trips_through_a_second_parse() {
        let doc = parse_str("<root><child/>text</root>", ParserOptions::default()).unwrap();
        let rendered = to_string(&doc);
        let doc2 = parse_str(&rendered, ParserOptions::default()).unwrap();
        assert_eq!(to_string(&doc2), rendered);
    }
}
