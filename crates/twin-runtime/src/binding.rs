//! Element bindings, script handler resolution and event listeners.

use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::{debug, warn};
use twin_svg::{Document, NodeId};

use crate::component::{HandlerContext, HandlerResult};

pub const SCRIPT_ATTR: &str = "data-script";
pub const EVENT_ATTR: &str = "data-event";
pub const DEFAULT_EVENT: &str = "click";

/// Event delivered to script handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomEvent {
    pub kind: SmolStr,
    /// Element the event was fired on.
    pub target: NodeId,
}

impl DomEvent {
    pub fn new(kind: impl Into<SmolStr>, target: NodeId) -> Self {
        Self {
            kind: kind.into(),
            target,
        }
    }
}

/// Binding stored on an element as `data-script` / `data-event`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Binding {
    pub script: SmolStr,
    pub event: SmolStr,
}

fn event_or_default(event: Option<&str>) -> &str {
    event
        .map(str::trim)
        .filter(|event| !event.is_empty())
        .unwrap_or(DEFAULT_EVENT)
}

/// Bind `element` to `script` for `event` (default `click`). Rebinding overwrites.
pub fn bind(doc: &mut Document, element: NodeId, event: Option<&str>, script: &str) {
    let event = event_or_default(event).to_string();
    doc.set_attribute(element, SCRIPT_ATTR, script.trim());
    doc.set_attribute(element, EVENT_ATTR, event);
}

pub fn unbind(doc: &mut Document, element: NodeId) {
    doc.remove_attribute(element, SCRIPT_ATTR);
    doc.remove_attribute(element, EVENT_ATTR);
}

#[must_use]
pub fn binding_of(doc: &Document, element: NodeId) -> Option<Binding> {
    let script = doc
        .attribute(element, SCRIPT_ATTR)
        .map(str::trim)
        .filter(|script| !script.is_empty())?;
    Some(Binding {
        script: SmolStr::new(script),
        event: SmolStr::new(event_or_default(doc.attribute(element, EVENT_ATTR))),
    })
}

/// Every bound element under `root` (inclusive) in document order.
#[must_use]
pub fn collect_bindings(doc: &Document, root: NodeId) -> Vec<(NodeId, Binding)> {
    doc.descendants(root)
        .filter_map(|node| binding_of(doc, node).map(|binding| (node, binding)))
        .collect()
}

/// Base name of a script id: directory and `.js` suffix removed.
#[must_use]
pub fn script_base_name(script_id: &str) -> &str {
    let trimmed = script_id.trim();
    let file = trimmed
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(trimmed);
    match file.len().checked_sub(3) {
        Some(cut) if file.is_char_boundary(cut) && file[cut..].eq_ignore_ascii_case(".js") => {
            &file[..cut]
        }
        _ => file,
    }
}

/// Script handler called as `(element, event, data)`; the current
/// simulation data is available through the context.
pub type ScriptHandler =
    Arc<dyn Fn(&mut HandlerContext<'_>, NodeId, &DomEvent) -> HandlerResult + Send + Sync>;

/// Script handlers by name.
#[derive(Default, Clone)]
pub struct HandlerRegistry {
    handlers: FxHashMap<SmolStr, ScriptHandler>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&SmolStr> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("HandlerRegistry").field("names", &names).finish()
    }
}

impl HandlerRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, handler: ScriptHandler) {
        self.handlers.insert(SmolStr::new(name), handler);
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Look up `base`, then `base + "Handler"`, where `base` is the script
    /// id's base name.
    #[must_use]
    pub fn resolve(&self, script_id: &str) -> Option<ScriptHandler> {
        let base = script_base_name(script_id);
        if base.is_empty() {
            debug!(script = script_id, "empty script id");
            return None;
        }
        if let Some(handler) = self.handlers.get(base) {
            return Some(handler.clone());
        }
        let suffixed = format!("{base}Handler");
        let found = self.handlers.get(suffixed.as_str()).cloned();
        if found.is_none() {
            debug!(script = script_id, base, "no handler for script");
        }
        found
    }
}

/// Installed (element, event) listeners.
#[derive(Debug, Default)]
pub struct ListenerTable {
    installed: FxHashSet<(NodeId, SmolStr)>,
    order: Vec<(NodeId, SmolStr)>,
}

impl ListenerTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a listener for every bound element under `root`. Returns the
    /// number of listeners added; repeated calls never add duplicates.
    pub fn install(&mut self, doc: &Document, root: NodeId) -> usize {
        let mut added = 0;
        for (element, binding) in collect_bindings(doc, root) {
            let key = (element, binding.event);
            if self.installed.insert(key.clone()) {
                self.order.push(key);
                added += 1;
            }
        }
        added
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    #[must_use]
    pub fn is_installed(&self, element: NodeId, event: &str) -> bool {
        self.installed.contains(&(element, SmolStr::new(event)))
    }

    /// Deliver `event` to listeners on its target and the target's
    /// ancestors, innermost first. Returns the number of handlers invoked.
    pub fn dispatch(
        &self,
        ctx: &mut HandlerContext<'_>,
        handlers: &HandlerRegistry,
        event: &DomEvent,
    ) -> usize {
        let path: Vec<NodeId> = std::iter::once(event.target)
            .chain(ctx.doc.ancestors(event.target))
            .collect();
        let mut invoked = 0;
        for element in path {
            if !self.installed.contains(&(element, event.kind.clone())) {
                continue;
            }
            // The binding is read at dispatch time so rebinding takes effect
            // without reinstalling.
            let Some(binding) = binding_of(ctx.doc, element) else {
                continue;
            };
            if binding.event != event.kind {
                continue;
            }
            let Some(handler) = handlers.resolve(&binding.script) else {
                continue;
            };
            invoked += 1;
            if let Err(err) = handler(ctx, element, event) {
                warn!(script = %binding.script, event = %event.kind, "script handler failed: {err}");
            }
        }
        invoked
    }
}
