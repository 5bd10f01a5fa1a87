//! Valves: every `valve-*` element under the root, open or closed.

use twin_svg::{Document, NodeId};

use super::{elements_with_id_prefix, next_element_sibling, scope_of};
use crate::binding::DomEvent;
use crate::component::{Component, HandlerContext, HandlerResult};

pub const STATE_ATTR: &str = "data-state";

pub struct Valve;

impl Component for Valve {
    fn init(&self, ctx: &mut HandlerContext<'_>, root: NodeId) -> HandlerResult {
        for valve in elements_with_id_prefix(ctx.doc, root, "valve-") {
            if !ctx.doc.has_attribute(valve, STATE_ATTR) {
                ctx.doc.set_attribute(valve, STATE_ATTR, "closed");
            }
            paint(ctx.doc, valve);
        }
        Ok(())
    }

    /// Applies `position` (sensor API) or `valvePosition` (mock feed) to every valve.
    fn update(&self, ctx: &mut HandlerContext<'_>, element: NodeId) -> HandlerResult {
        let record = ctx.read_metadata(element);
        let Some(position) = record.get("position").or_else(|| record.get("valvePosition")) else {
            return Ok(());
        };
        let state = if position.trim().eq_ignore_ascii_case("open") {
            "open"
        } else {
            "closed"
        };
        let scope = scope_of(ctx.doc, element);
        for valve in elements_with_id_prefix(ctx.doc, scope, "valve-") {
            ctx.doc.set_attribute(valve, STATE_ATTR, state);
            paint(ctx.doc, valve);
        }
        Ok(())
    }
}

#[must_use]
pub fn colors(state: &str) -> (&'static str, &'static str) {
    if state == "open" {
        ("#4CAF50", "#2E7D32")
    } else {
        ("#9E9E9E", "#333")
    }
}

fn paint(doc: &mut Document, valve: NodeId) {
    let state = doc.attribute(valve, STATE_ATTR).unwrap_or("closed");
    let (fill, stroke) = colors(state);
    doc.set_attribute(valve, "fill", fill);
    doc.set_attribute(valve, "stroke", stroke);
}

/// Toggle the clicked valve and relabel the `<text>` that follows it.
pub fn on_click(ctx: &mut HandlerContext<'_>, element: NodeId, _event: &DomEvent) -> HandlerResult {
    let current = ctx.doc.attribute(element, STATE_ATTR).unwrap_or("closed");
    let next = if current == "closed" { "open" } else { "closed" };
    ctx.doc.set_attribute(element, STATE_ATTR, next);
    paint(ctx.doc, element);

    let Some(label) = next_element_sibling(ctx.doc, element) else {
        return Ok(());
    };
    if ctx.doc.local_name(label) != Some("text") {
        return Ok(());
    }
    let name = ctx
        .doc
        .attribute(element, "id")
        .and_then(|id| id.split('-').nth(1))
        .unwrap_or("valve")
        .to_ascii_uppercase();
    ctx.doc
        .set_text_content(label, &format!("{name}: {}", next.to_ascii_uppercase()));
    Ok(())
}
