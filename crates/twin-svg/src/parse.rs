//! Markup loading via `roxmltree`.

use std::collections::BTreeSet;

use crate::document::{Document, NodeId};
use crate::SvgError;

const XML_NS: &str = "http://www.w3.org/XML/1998/namespace";

pub(crate) fn append_markup(
    doc: &mut Document,
    parent: NodeId,
    text: &str,
) -> Result<Vec<NodeId>, SvgError> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    };
    let source = roxmltree::Document::parse_with_options(text, options)
        .map_err(|err| SvgError::Parse(err.to_string()))?;
    let mut appended = Vec::new();
    for child in source.root().children() {
        if let Some(node) = copy_node(doc, child) {
            doc.append_child(parent, node);
            appended.push(node);
        }
    }
    Ok(appended)
}

fn copy_node(doc: &mut Document, node: roxmltree::Node<'_, '_>) -> Option<NodeId> {
    if node.is_text() {
        return node.text().map(|text| doc.create_text(text));
    }
    if node.is_comment() {
        return node.text().map(|text| doc.create_comment(text));
    }
    if !node.is_element() {
        return None;
    }
    let id = doc.create_element(&qualified_element_name(node));
    for (name, value) in declared_namespaces(node) {
        doc.set_attribute(id, &name, value);
    }
    for attribute in node.attributes() {
        let name = match attribute.namespace() {
            Some(uri) => match prefix_for(node, uri) {
                Some(prefix) => format!("{prefix}:{}", attribute.name()),
                None => attribute.name().to_string(),
            },
            None => attribute.name().to_string(),
        };
        doc.set_attribute(id, &name, attribute.value());
    }
    for child in node.children() {
        if let Some(copied) = copy_node(doc, child) {
            doc.append_child(id, copied);
        }
    }
    Some(id)
}

fn qualified_element_name(node: roxmltree::Node<'_, '_>) -> String {
    let tag = node.tag_name();
    match tag.namespace().and_then(|uri| prefix_for(node, uri)) {
        Some(prefix) => format!("{prefix}:{}", tag.name()),
        None => tag.name().to_string(),
    }
}

fn prefix_for(node: roxmltree::Node<'_, '_>, uri: &str) -> Option<String> {
    if uri == XML_NS {
        return Some("xml".to_string());
    }
    node.lookup_prefix(uri)
        .filter(|prefix| !prefix.is_empty())
        .map(str::to_string)
}

fn namespace_set(node: roxmltree::Node<'_, '_>) -> BTreeSet<(Option<String>, String)> {
    node.namespaces()
        .filter(|ns| ns.name() != Some("xml"))
        .map(|ns| (ns.name().map(str::to_string), ns.uri().to_string()))
        .collect()
}

/// Namespaces in scope on `node` that its parent element does not already
/// provide, rendered as `xmlns` / `xmlns:prefix` attributes.
fn declared_namespaces(node: roxmltree::Node<'_, '_>) -> Vec<(String, String)> {
    let own = namespace_set(node);
    let inherited = node
        .parent_element()
        .map(namespace_set)
        .unwrap_or_default();
    own.difference(&inherited)
        .map(|(prefix, uri)| {
            let name = match prefix {
                Some(prefix) => format!("xmlns:{prefix}"),
                None => "xmlns".to_string(),
            };
            (name, uri.clone())
        })
        .collect()
}
