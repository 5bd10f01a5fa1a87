//! Parse/serialize behavior of the SVG document tree.

use expect_test::expect;
use twin_svg::{Document, NodeKind, SvgError};

#[test]
fn namespaced_markup_survives_a_round_trip() {
    let source = concat!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" id="tank" width="100">"#,
        "\n  <!-- tank body -->\n",
        r#"  <metadata data-level="50"><level>50</level></metadata>"#,
        "\n",
        r##"  <use xlink:href="#body"/>"##,
        "\n</svg>"
    );
    let doc = Document::parse(source).expect("parse");
    expect![[r##"
        <svg xmlns="http://www.w3.org/2000/svg" xmlns:xlink="http://www.w3.org/1999/xlink" id="tank" width="100">
          <!-- tank body -->
          <metadata data-level="50"><level>50</level></metadata>
          <use xlink:href="#body"/>
        </svg>"##]]
    .assert_eq(&doc.to_string());
}

#[test]
fn declaration_and_doctype_are_dropped() {
    let doc = Document::parse(r#"<?xml version="1.0"?><!DOCTYPE svg><svg id="a"/>"#)
        .expect("parse");
    assert_eq!(doc.to_string(), r#"<svg id="a"/>"#);
}

#[test]
fn markup_without_svg_root_is_rejected() {
    let err = Document::parse("<html/>").expect_err("no svg");
    assert_eq!(err, SvgError::MissingSvgRoot);
}

#[test]
fn malformed_markup_reports_parse_error() {
    let err = Document::parse("<svg><g></svg>").expect_err("malformed");
    assert!(matches!(err, SvgError::Parse(_)), "unexpected error: {err}");
}

#[test]
fn several_fragments_share_one_document() {
    let mut doc = Document::new();
    let root = doc.root();
    doc.append_parsed(root, r#"<svg id="pump"><circle id="impeller"/></svg>"#)
        .expect("pump");
    doc.append_parsed(root, r#"<svg id="valve"><rect id="valve-1"/></svg>"#)
        .expect("valve");

    let roots: Vec<_> = doc
        .svg_roots()
        .into_iter()
        .filter_map(|node| doc.attribute(node, "id"))
        .collect();
    assert_eq!(roots, vec!["pump", "valve"]);

    let valve = doc.find_by_id("valve-1").expect("valve element");
    let owner = doc.svg_root_of(valve).expect("owner");
    assert_eq!(doc.attribute(owner, "id"), Some("valve"));
}

#[test]
fn text_content_collects_descendant_text() {
    let mut doc = Document::parse("<svg><text id=\"t\">Level: <tspan>42</tspan>%</text></svg>")
        .expect("parse");
    let text = doc.find_by_id("t").expect("text");
    assert_eq!(doc.text_content(text), "Level: 42%");

    doc.set_text_content(text, "Level: 50%");
    assert_eq!(doc.children(text).len(), 1);
    assert!(matches!(
        doc.kind(doc.children(text)[0]),
        NodeKind::Text(value) if value == "Level: 50%"
    ));
}

#[test]
fn prefixed_element_names_keep_their_prefix() {
    let doc = Document::parse(concat!(
        r#"<svg xmlns="http://www.w3.org/2000/svg" xmlns:inkscape="http://www.inkscape.org/namespaces/inkscape">"#,
        r#"<inkscape:grid id="g"/></svg>"#
    ))
    .expect("parse");
    let grid = doc.find_by_id("g").expect("grid");
    assert_eq!(doc.name(grid), Some("inkscape:grid"));
    assert_eq!(doc.local_name(grid), Some("grid"));
}
