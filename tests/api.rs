use sgmltree::{parse_str, Error, Name, NodeKind, ParserOptions};

#[test]
fn root_element_01() {
    let data = "\
<!-- comment -->
<e/>
";
    let doc = parse_str(data, ParserOptions::default()).unwrap();
    let root = doc.element_children(doc.root()).next().unwrap();
    assert!(matches!(&doc.get(root).kind, NodeKind::Element(n) if n == &Name::new("e")));
}

#[test]
fn get_text_01() {
    let data = "<root>hello <child/> world</root>";
    let doc = parse_str(data, ParserOptions::default()).unwrap();
    let root = doc.element_children(doc.root()).next().unwrap();

    let texts: Vec<String> = doc
        .children(root)
        .filter_map(|c| match &doc.get(c).kind {
            NodeKind::Text(t) => Some(t.0.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(texts, vec!["hello ".to_string(), " world".to_string()]);
}

#[test]
fn get_text_expands_builtin_entity() {
    let data = "<root>&apos;</root>";
    let doc = parse_str(data, ParserOptions::default()).unwrap();
    let root = doc.element_children(doc.root()).next().unwrap();
    let text = doc.children(root).find_map(|c| match &doc.get(c).kind {
        NodeKind::Text(t) => Some(t.0.clone()),
        _ => None,
    });
    assert_eq!(text.as_deref(), Some("'"));
}

#[test]
fn namespaces_are_syntactic_only() {
    let data = "<a:e attr=\"no_ns\" a:attr=\"a_ns\"/>";
    let doc = parse_str(data, ParserOptions::default()).unwrap();
    let e = doc.element_children(doc.root()).next().unwrap();
    match &doc.get(e).kind {
        NodeKind::Element(name) => {
            assert_eq!(name.local, "e");
            assert_eq!(name.space.as_deref(), Some("a"));
        }
        _ => panic!("expected element"),
    }

    let attr_names: Vec<&Name> = doc
        .children(e)
        .filter_map(|c| match &doc.get(c).kind {
            NodeKind::Attribute(n, _) => Some(n),
            _ => None,
        })
        .collect();
    assert!(attr_names.iter().any(|n| n.local == "attr" && n.space.is_none()));
    assert!(attr_names.iter().any(|n| n.local == "attr" && n.space.as_deref() == Some("a")));
}

#[test]
fn empty_element_and_explicit_close_are_structurally_identical() {
    let a = parse_str("<x/>", ParserOptions::default()).unwrap();
    let b = parse_str("<x></x>", ParserOptions::default()).unwrap();
    assert_eq!(sgmltree::to_string(&a), sgmltree::to_string(&b));
}

#[test]
fn comment_containing_double_dash_stops_at_first_close() {
    let doc = parse_str("<r><!-- a -- b --></r>", ParserOptions::default()).unwrap();
    let root = doc.element_children(doc.root()).next().unwrap();
    let comment = doc.children(root).find_map(|c| match &doc.get(c).kind {
        NodeKind::Comment(body) => Some(body.clone()),
        _ => None,
    });
    assert_eq!(comment.as_deref(), Some(" a -- b "));
}

#[test]
fn numeric_character_references() {
    let doc = parse_str("<r>&#65;&#x41;</r>", ParserOptions::default()).unwrap();
    let root = doc.element_children(doc.root()).next().unwrap();
    let text = doc.children(root).find_map(|c| match &doc.get(c).kind {
        NodeKind::Text(t) => Some(t.0.clone()),
        _ => None,
    });
    assert_eq!(text.as_deref(), Some("AA"));
}

#[test]
fn numeric_reference_above_unicode_max_is_rejected() {
    let result = parse_str("<r>&#x110000;</r>", ParserOptions::validating());
    assert!(result.is_err());
}

#[test]
fn unknown_entity_in_non_validating_mode_logs_and_continues() {
    let dir = std::env::temp_dir().join(format!("sgmltree-api-test-{}", std::process::id()));
    let _ = std::fs::remove_file(&dir);

    let options = ParserOptions { undefined_entity_log: dir.clone(), ..ParserOptions::default() };
    let doc = parse_str("<r>&unk;</r>", options).unwrap();

    let root = doc.element_children(doc.root()).next().unwrap();
    let text = doc.children(root).find_map(|c| match &doc.get(c).kind {
        NodeKind::Text(t) => Some(t.0.clone()),
        _ => None,
    });
    assert!(text.is_none() || text.as_deref() == Some(""));

    let contents = std::fs::read_to_string(&dir).unwrap();
    assert!(contents.contains("unk"));
    let _ = std::fs::remove_file(&dir);
}

#[test]
fn unknown_entity_in_validating_mode_errors() {
    let result = parse_str("<r>&unk;</r>", ParserOptions::validating());
    match result {
        Err(e) => assert!(matches!(e.error, Error::EntityNotDefined(..)) || matches!(e.error, Error::NoDtdDefined)),
        Ok(_) => panic!("expected an error"),
    }
}
