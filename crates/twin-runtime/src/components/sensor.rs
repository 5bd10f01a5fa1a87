//! Threshold sensors: `sensor-top` (temperature), `sensor-middle`
//! (pressure) and `sensor-bottom` (level).

use twin_svg::{Document, NodeId};

use super::{elements_with_id_prefix, scope_of, tank};
use crate::binding::DomEvent;
use crate::component::{Component, HandlerContext, HandlerResult};
use crate::metadata::MetadataRecord;

const ACTIVE_ATTR: &str = "data-active";

pub struct Sensor;

impl Component for Sensor {
    fn init(&self, ctx: &mut HandlerContext<'_>, root: NodeId) -> HandlerResult {
        for sensor in elements_with_id_prefix(ctx.doc, root, "sensor-") {
            ctx.doc.set_attribute(sensor, ACTIVE_ATTR, "false");
        }
        Ok(())
    }

    fn update(&self, ctx: &mut HandlerContext<'_>, element: NodeId) -> HandlerResult {
        let record = ctx.read_metadata(element);
        let scope = scope_of(ctx.doc, element);
        refresh_sensors(ctx, scope, &record);
        Ok(())
    }
}

/// Position part of a sensor id (`sensor-top` -> `top`).
fn position(doc: &Document, sensor: NodeId) -> Option<String> {
    doc.attribute(sensor, "id")
        .and_then(|id| id.split('-').nth(1))
        .map(str::to_string)
}

/// Alarm state and base color for one sensor position. `None` when the
/// position is unknown or its reading is missing.
#[must_use]
pub fn evaluate(position: &str, record: &MetadataRecord) -> Option<(bool, &'static str)> {
    match position {
        "top" => record.number("temperature").map(|value| (value > 30.0, "#FF5722")),
        "middle" => record.number("pressure").map(|value| (value > 1100.0, "#4CAF50")),
        "bottom" => tank::level_of(record).map(|value| (value < 25.0, "#2196F3")),
        _ => None,
    }
}

pub(crate) fn refresh_sensors(ctx: &mut HandlerContext<'_>, scope: NodeId, record: &MetadataRecord) {
    for sensor in elements_with_id_prefix(ctx.doc, scope, "sensor-") {
        let Some(position) = position(ctx.doc, sensor) else {
            continue;
        };
        let Some((active, color)) = evaluate(&position, record) else {
            continue;
        };
        if active {
            activate(ctx.doc, sensor, color);
        } else {
            deactivate(ctx.doc, sensor, color);
        }
    }
}

fn activate(doc: &mut Document, sensor: NodeId, color: &str) {
    doc.set_attribute(sensor, ACTIVE_ATTR, "true");
    doc.set_attribute(sensor, "fill", color);
    doc.set_attribute(sensor, "stroke-width", "2");
    if doc.child_named(sensor, "animate").is_none() {
        let pulse = doc.create_element("animate");
        doc.set_attribute(pulse, "attributeName", "opacity");
        doc.set_attribute(pulse, "values", "1;0.3;1");
        doc.set_attribute(pulse, "dur", "2s");
        doc.set_attribute(pulse, "repeatCount", "indefinite");
        doc.append_child(sensor, pulse);
    }
}

fn deactivate(doc: &mut Document, sensor: NodeId, color: &str) {
    doc.set_attribute(sensor, ACTIVE_ATTR, "false");
    doc.set_attribute(sensor, "fill", color);
    doc.set_attribute(sensor, "stroke-width", "1");
    while let Some(pulse) = doc.child_named(sensor, "animate") {
        doc.detach(pulse);
    }
}

/// Flip the clicked sensor's reading across its alarm threshold.
pub fn on_click(ctx: &mut HandlerContext<'_>, element: NodeId, _event: &DomEvent) -> HandlerResult {
    let Some(position) = position(ctx.doc, element) else {
        return Ok(());
    };
    let record = ctx.read_metadata(element);
    let Some((active, _)) = evaluate(&position, &record) else {
        return Ok(());
    };
    let (key, value) = match (position.as_str(), active) {
        ("top", true) => ("temperature", "25.5"),
        ("top", false) => ("temperature", "32.5"),
        ("middle", true) => ("pressure", "1013"),
        ("middle", false) => ("pressure", "1150"),
        ("bottom", true) => ("level", "75"),
        _ => ("level", "15"),
    };
    ctx.set_metadata(element, key, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_match_positions() {
        let record: MetadataRecord = [("temperature", "31"), ("pressure", "1000"), ("tankLevel", "20")]
            .into_iter()
            .collect();
        assert_eq!(evaluate("top", &record), Some((true, "#FF5722")));
        assert_eq!(evaluate("middle", &record), Some((false, "#4CAF50")));
        assert_eq!(evaluate("bottom", &record), Some((true, "#2196F3")));
        assert_eq!(evaluate("side", &record), None);
        assert_eq!(evaluate("top", &MetadataRecord::new()), None);
    }
}
