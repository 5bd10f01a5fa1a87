//! Pump: status light and a rotating impeller while running.

use twin_svg::{Document, NodeId};

use super::{find_part, scope_of};
use crate::binding::DomEvent;
use crate::component::{Component, HandlerContext, HandlerResult};
use crate::metadata::MetadataRecord;

const DEFAULTS: [(&str, &str); 5] = [
    ("state", "off"),
    ("flowRate", "0"),
    ("pressure", "0"),
    ("temperature", "25"),
    ("alerts", ""),
];

pub struct Pump;

impl Component for Pump {
    fn init(&self, ctx: &mut HandlerContext<'_>, root: NodeId) -> HandlerResult {
        let existing = ctx.read_metadata(root);
        let missing: MetadataRecord = DEFAULTS
            .iter()
            .filter(|(key, _)| !existing.contains_key(key))
            .copied()
            .collect();
        if !missing.is_empty() {
            ctx.merge_metadata(root, &missing);
        }
        refresh(ctx, root);
        Ok(())
    }

    fn update(&self, ctx: &mut HandlerContext<'_>, element: NodeId) -> HandlerResult {
        refresh(ctx, element);
        Ok(())
    }
}

/// Running state: `state`, else the sensor API's `status`.
#[must_use]
pub fn is_on(record: &MetadataRecord) -> bool {
    record.get("state").or_else(|| record.get("status")) == Some("on")
}

#[must_use]
pub fn light_color(record: &MetadataRecord) -> &'static str {
    if record.get("alerts").is_some_and(|alerts| !alerts.trim().is_empty()) {
        "#ff0000"
    } else if is_on(record) {
        "#00ff00"
    } else {
        "#888888"
    }
}

fn refresh(ctx: &mut HandlerContext<'_>, element: NodeId) {
    let record = ctx.read_metadata(element);
    let scope = scope_of(ctx.doc, element);
    if let Some(light) = find_part(ctx.doc, scope, "statusLight", "status-light") {
        ctx.doc.set_attribute(light, "fill", light_color(&record));
    }
    if let Some(impeller) = find_part(ctx.doc, scope, "impeller", "impeller") {
        if is_on(&record) {
            start_animation(ctx.doc, impeller);
        } else {
            stop_animation(ctx.doc, impeller);
        }
    }
}

fn start_animation(doc: &mut Document, impeller: NodeId) {
    if doc.child_named(impeller, "animateTransform").is_some() {
        return;
    }
    let cx = doc.attribute(impeller, "cx").unwrap_or("0").to_string();
    let cy = doc.attribute(impeller, "cy").unwrap_or("0").to_string();
    let animation = doc.create_element("animateTransform");
    doc.set_attribute(animation, "attributeName", "transform");
    doc.set_attribute(animation, "type", "rotate");
    doc.set_attribute(animation, "dur", "1s");
    doc.set_attribute(animation, "repeatCount", "indefinite");
    doc.set_attribute(animation, "from", format!("0 {cx} {cy}"));
    doc.set_attribute(animation, "to", format!("360 {cx} {cy}"));
    doc.append_child(impeller, animation);
}

fn stop_animation(doc: &mut Document, impeller: NodeId) {
    while let Some(animation) = doc.child_named(impeller, "animateTransform") {
        doc.detach(animation);
    }
}

/// Toggle the pump between `on` and `off`.
pub fn on_click(ctx: &mut HandlerContext<'_>, element: NodeId, _event: &DomEvent) -> HandlerResult {
    let record = ctx.read_metadata(element);
    let next = if is_on(&record) { "off" } else { "on" };
    ctx.set_metadata(element, "state", next);
    Ok(())
}
