//! Storage tank: level bar, temperature and pressure readouts, status border.

use twin_svg::NodeId;

use super::{attr_number, scope_of, sensor};
use crate::binding::DomEvent;
use crate::component::{Component, HandlerContext, HandlerResult};
use crate::metadata::MetadataRecord;

const TANK_HEIGHT: f64 = 200.0;
const TANK_BOTTOM: f64 = 250.0;
const ALERT: &str = "#F44336";

pub struct Tank;

impl Component for Tank {
    fn init(&self, ctx: &mut HandlerContext<'_>, root: NodeId) -> HandlerResult {
        refresh(ctx, root);
        Ok(())
    }

    fn update(&self, ctx: &mut HandlerContext<'_>, element: NodeId) -> HandlerResult {
        refresh(ctx, element);
        Ok(())
    }
}

/// Level in percent: `level`, else the simulation's `tankLevel`.
pub(crate) fn level_of(record: &MetadataRecord) -> Option<f64> {
    record.number("level").or_else(|| record.number("tankLevel"))
}

#[must_use]
pub fn level_color(level: f64) -> &'static str {
    if level < 25.0 {
        ALERT
    } else if level < 50.0 {
        "#FF9800"
    } else {
        "#2196F3"
    }
}

fn refresh(ctx: &mut HandlerContext<'_>, element: NodeId) {
    let record = ctx.read_metadata(element);
    let scope = scope_of(ctx.doc, element);

    if let (Some(bar), Some(level)) = (ctx.find(scope, "tank-level"), level_of(&record)) {
        let level = level.clamp(0.0, 100.0);
        let height = TANK_HEIGHT * level / 100.0;
        ctx.doc.set_attribute(bar, "height", attr_number(height));
        ctx.doc.set_attribute(bar, "y", attr_number(TANK_BOTTOM - height));
        ctx.doc.set_attribute(bar, "fill", level_color(level));
    }

    if let (Some(text), Some(temperature)) = (ctx.find(scope, "tank-temp"), record.number("temperature")) {
        ctx.doc
            .set_text_content(text, &format!("Temperature: {temperature:.1}°C"));
        let fill = if temperature > 30.0 { ALERT } else { "#000000" };
        ctx.doc.set_attribute(text, "fill", fill);
    }

    if let (Some(text), Some(pressure)) = (ctx.find(scope, "tank-press"), record.number("pressure")) {
        ctx.doc
            .set_text_content(text, &format!("Pressure: {pressure:.0} hPa"));
        let fill = if pressure > 1100.0 { ALERT } else { "#000000" };
        ctx.doc.set_attribute(text, "fill", fill);
    }

    if let Some(body) = ctx.find(scope, "tank-body") {
        let (stroke, width) = if record.get("status") == Some("warning") {
            (ALERT, "3")
        } else {
            ("#333", "2")
        };
        ctx.doc.set_attribute(body, "stroke", stroke);
        ctx.doc.set_attribute(body, "stroke-width", width);
    }

    sensor::refresh_sensors(ctx, scope, &record);
}

/// Toggle the tank status: `normal` becomes `warning`, anything else `normal`.
pub fn on_click(ctx: &mut HandlerContext<'_>, element: NodeId, _event: &DomEvent) -> HandlerResult {
    let record = ctx.read_metadata(element);
    let next = if record.get("status") == Some("normal") {
        "warning"
    } else {
        "normal"
    };
    ctx.set_metadata(element, "status", next);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn level_colors_follow_thresholds() {
        assert_eq!(level_color(10.0), "#F44336");
        assert_eq!(level_color(25.0), "#FF9800");
        assert_eq!(level_color(49.9), "#FF9800");
        assert_eq!(level_color(50.0), "#2196F3");
    }
}
