//! End-to-end parse/validate scenarios, one per §8 of the specification.

use sgmltree::{parse_str, to_string, Error, Name, NodeKind, ParserOptions};

#[test]
fn scenario_01_mixed_empty_and_text_children() {
    let doc = parse_str("<r><a/><b>hi</b></r>", ParserOptions::default()).unwrap();
    let r = doc.element_children(doc.root()).next().unwrap();
    let kids: Vec<_> = doc.element_children(r).collect();
    assert_eq!(kids.len(), 2);

    assert!(matches!(&doc.get(kids[0]).kind, NodeKind::Element(n) if n == &Name::new("a")));
    assert!(doc.element_children(kids[0]).next().is_none());
    assert!(doc.children(kids[0]).next().is_none());

    assert!(matches!(&doc.get(kids[1]).kind, NodeKind::Element(n) if n == &Name::new("b")));
    let text = doc.children(kids[1]).find_map(|c| match &doc.get(c).kind {
        NodeKind::Text(t) => Some(t.0.clone()),
        _ => None,
    });
    assert_eq!(text.as_deref(), Some("hi"));
}

#[test]
fn scenario_02_content_model_accepts_and_rejects() {
    let dtd = "<!DOCTYPE d [<!ELEMENT d (x,y?)> <!ELEMENT x EMPTY> <!ELEMENT y (#PCDATA)> <!ELEMENT z EMPTY>]>";

    let accepted = parse_str(&format!("{}<d><x/></d>", dtd), ParserOptions::validating());
    assert!(accepted.is_ok());

    // "z" is declared but never appears in "d"'s content model (x,y?) at
    // all, so it's rejected regardless of where it would sit in the
    // sequence — unlike "y", which legitimately trails `last(x,y?)` and
    // would be accepted by the coarse last-set check test_kids performs.
    let rejected = parse_str(&format!("{}<d><z/></d>", dtd), ParserOptions::validating());
    match rejected {
        Err(e) => assert!(matches!(e.error, Error::InvalidNesting(..))),
        Ok(_) => panic!("expected InvalidNesting"),
    }
}

#[test]
fn scenario_03_entity_expands_into_a_single_text_node() {
    let doc = parse_str(
        "<!DOCTYPE d [<!ENTITY greet \"hello\">]><d>&greet; world</d>",
        ParserOptions::default(),
    )
    .unwrap();
    let d = doc.element_children(doc.root()).next().unwrap();
    let text_children: Vec<String> = doc
        .children(d)
        .filter_map(|c| match &doc.get(c).kind {
            NodeKind::Text(t) => Some(t.0.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(text_children, vec!["hello world".to_string()]);
}

#[test]
fn scenario_04_mismatched_closing_tag_carries_context() {
    let dtd = "<!DOCTYPE r [<!ELEMENT r ANY> <!ELEMENT a ANY>]>";
    let result = parse_str(&format!("{}<r><a></b></r>", dtd), ParserOptions::validating());
    match result {
        Err(e) => {
            assert!(matches!(e.error, Error::TagNotMatching { .. }));
            assert!(e.context.ancestors.iter().any(|n| n == "r"));
        }
        Ok(_) => panic!("expected TagNotMatching"),
    }
}

#[test]
fn scenario_05_undefined_entity_non_validating_vs_validating() {
    let dir = std::env::temp_dir().join(format!("sgmltree-ast-scenario5-{}", std::process::id()));
    let _ = std::fs::remove_file(&dir);
    let options = ParserOptions { undefined_entity_log: dir.clone(), ..ParserOptions::default() };
    let doc = parse_str("<r>&unk;</r>", options).unwrap();
    let r = doc.element_children(doc.root()).next().unwrap();
    let text = doc.children(r).find_map(|c| match &doc.get(c).kind {
        NodeKind::Text(t) => Some(t.0.clone()),
        _ => None,
    });
    assert!(text.is_none());
    let contents = std::fs::read_to_string(&dir).unwrap();
    assert!(contents.contains("unk"));
    let _ = std::fs::remove_file(&dir);

    let validating = parse_str("<r>&unk;</r>", ParserOptions::validating());
    assert!(validating.is_err());
}

#[test]
fn scenario_06_failed_external_dtd_fetch_is_non_fatal() {
    let options = ParserOptions { validating: false, ..ParserOptions::default() };
    let result = parse_str(r#"<!DOCTYPE d SYSTEM "missing.dtd"><d/>"#, options);
    assert!(result.is_ok());
}

#[test]
fn parse_serialize_parse_idempotence() {
    let doc = parse_str(
        "<!DOCTYPE d [<!ELEMENT d (x)> <!ELEMENT x EMPTY>]><d><x/></d>",
        ParserOptions::default(),
    )
    .unwrap();
    let rendered = to_string(&doc);
    let doc2 = parse_str(&rendered, ParserOptions::default()).unwrap();
    assert_eq!(to_string(&doc2), rendered);
}
