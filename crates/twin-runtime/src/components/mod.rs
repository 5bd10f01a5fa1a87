//! Built-in process components: tank, pump, valve and sensor.
//!
//! Each module provides a [`Component`](crate::component::Component) and a
//! click handler registered under the component's name.

use std::sync::Arc;

use twin_svg::{Document, NodeId};

use crate::binding::HandlerRegistry;
use crate::component::ComponentRegistry;

pub mod pump;
pub mod sensor;
pub mod tank;
pub mod valve;

/// Register the built-in components and their script handlers.
pub fn register_builtin(components: &mut ComponentRegistry, handlers: &mut HandlerRegistry) {
    components.register("tank", Arc::new(tank::Tank));
    components.register("pump", Arc::new(pump::Pump));
    components.register("valve", Arc::new(valve::Valve));
    components.register("sensor", Arc::new(sensor::Sensor));

    handlers.register("tank", Arc::new(tank::on_click));
    handlers.register("pump", Arc::new(pump::on_click));
    handlers.register("valve", Arc::new(valve::on_click));
    handlers.register("sensor", Arc::new(sensor::on_click));
}

/// SVG root that owns `element`, or `element` itself outside any SVG.
fn scope_of(doc: &Document, element: NodeId) -> NodeId {
    doc.svg_root_of(element).unwrap_or(element)
}

fn has_class(doc: &Document, node: NodeId, class: &str) -> bool {
    doc.attribute(node, "class")
        .is_some_and(|classes| classes.split_whitespace().any(|name| name == class))
}

/// Part located by `id`, else by class name.
fn find_part(doc: &Document, scope: NodeId, id: &str, class: &str) -> Option<NodeId> {
    doc.find_in(scope, id).or_else(|| {
        doc.descendants(scope)
            .find(|node| has_class(doc, *node, class))
    })
}

fn elements_with_id_prefix(doc: &Document, scope: NodeId, prefix: &str) -> Vec<NodeId> {
    doc.descendants(scope)
        .filter(|node| {
            doc.attribute(*node, "id")
                .is_some_and(|id| id.starts_with(prefix))
        })
        .collect()
}

fn next_element_sibling(doc: &Document, node: NodeId) -> Option<NodeId> {
    let parent = doc.parent(node)?;
    let mut siblings = doc.element_children(parent).skip_while(|child| *child != node);
    siblings.next();
    siblings.next()
}

/// Number as an attribute value: no trailing `.0`, at most two decimals.
fn attr_number(value: f64) -> String {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded.fract() == 0.0 {
        format!("{rounded:.0}")
    } else {
        let text = format!("{rounded:.2}");
        text.trim_end_matches('0').to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_numbers_are_compact() {
        assert_eq!(attr_number(100.0), "100");
        assert_eq!(attr_number(80.0), "80");
        assert_eq!(attr_number(40.5), "40.5");
        assert_eq!(attr_number(12.345), "12.35");
        assert_eq!(attr_number(0.0), "0");
    }

    #[test]
    fn parts_resolve_by_id_then_class() {
        let doc = Document::parse(
            "<svg><circle class=\"status-light big\"/><g id=\"impeller\"/><text id=\"a\"/><text id=\"b\"/></svg>",
        )
        .expect("parse");
        let root = doc.svg_roots()[0];
        let light = find_part(&doc, root, "statusLight", "status-light").expect("light");
        assert_eq!(doc.local_name(light), Some("circle"));
        let impeller = find_part(&doc, root, "impeller", "impeller").expect("impeller");
        assert_eq!(doc.attribute(impeller, "id"), Some("impeller"));
        let a = doc.find_by_id("a").expect("a");
        let b = next_element_sibling(&doc, a).expect("sibling");
        assert_eq!(doc.attribute(b, "id"), Some("b"));
        assert_eq!(next_element_sibling(&doc, b), None);
    }
}
