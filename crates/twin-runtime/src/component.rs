//! Component handlers and their registry.
//!
//! A component is looked up by tag: the `data-component` attribute of the
//! component element, else its `id`. Tags compare case-insensitively, so a
//! root with `id="Tank"` and one with `id="tank"` reach the same component.

use std::sync::Arc;

use rustc_hash::FxHashMap;
use smol_str::SmolStr;
use thiserror::Error;
use tracing::debug;
use twin_svg::{Document, NodeId};

use crate::changes::ChangeQueue;
use crate::feed::DataSnapshot;
use crate::metadata::{self, MetadataRecord, WriteMode};

/// Failure reported by a component or script handler.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct HandlerError(pub SmolStr);

impl HandlerError {
    pub fn new(message: impl Into<SmolStr>) -> Self {
        Self(message.into())
    }
}

pub type HandlerResult = Result<(), HandlerError>;

/// Everything a handler may touch while it runs.
///
/// Metadata writes made through the context are queued and delivered in
/// the next change batch, never re-entrantly.
pub struct HandlerContext<'a> {
    pub doc: &'a mut Document,
    pub changes: &'a mut ChangeQueue,
    pub data: &'a DataSnapshot,
}

impl HandlerContext<'_> {
    #[must_use]
    pub fn read_metadata(&self, element: NodeId) -> MetadataRecord {
        metadata::read(self.doc, element)
    }

    pub fn merge_metadata(&mut self, element: NodeId, record: &MetadataRecord) {
        metadata::write(self.doc, self.changes, element, record, WriteMode::Merge);
    }

    pub fn set_metadata(&mut self, element: NodeId, key: &str, value: impl Into<String>) {
        let record: MetadataRecord = std::iter::once((key, value.into())).collect();
        self.merge_metadata(element, &record);
    }

    /// First element under `scope` (inclusive) with the given `id`.
    #[must_use]
    pub fn find(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        self.doc.find_in(scope, id)
    }
}

/// Lifecycle callbacks of one component type.
pub trait Component: Send + Sync {
    /// Called once when the component's SVG root starts being observed.
    fn init(&self, _ctx: &mut HandlerContext<'_>, _root: NodeId) -> HandlerResult {
        Ok(())
    }

    /// Called at most once per change batch that touched the component's metadata.
    fn update(&self, ctx: &mut HandlerContext<'_>, element: NodeId) -> HandlerResult;
}

/// Tag of a component element: `data-component`, else `id`.
#[must_use]
pub fn component_tag(doc: &Document, element: NodeId) -> Option<SmolStr> {
    doc.attribute(element, "data-component")
        .or_else(|| doc.attribute(element, "id"))
        .map(str::trim)
        .filter(|tag| !tag.is_empty())
        .map(SmolStr::new)
}

fn normalize(tag: &str) -> SmolStr {
    SmolStr::new(tag.trim().to_ascii_lowercase())
}

/// Components by tag, plus an optional fallback used on a miss.
#[derive(Default, Clone)]
pub struct ComponentRegistry {
    components: FxHashMap<SmolStr, Arc<dyn Component>>,
    fallback: Option<Arc<dyn Component>>,
}

impl std::fmt::Debug for ComponentRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut tags = self.tags();
        tags.sort();
        f.debug_struct("ComponentRegistry")
            .field("tags", &tags)
            .field("fallback", &self.fallback.is_some())
            .finish()
    }
}

impl ComponentRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `component` under `tag`. A later registration replaces an earlier one.
    pub fn register(&mut self, tag: &str, component: Arc<dyn Component>) {
        self.components.insert(normalize(tag), component);
    }

    pub fn set_fallback(&mut self, component: Arc<dyn Component>) {
        self.fallback = Some(component);
    }

    #[must_use]
    pub fn get(&self, tag: &str) -> Option<Arc<dyn Component>> {
        self.components.get(&normalize(tag)).cloned()
    }

    /// Registered component for `tag`, else the fallback.
    #[must_use]
    pub fn resolve(&self, tag: Option<&str>) -> Option<Arc<dyn Component>> {
        let found = tag.and_then(|tag| self.get(tag));
        if found.is_some() {
            return found;
        }
        if self.fallback.is_none() {
            debug!(tag = ?tag, "no component registered");
        }
        self.fallback.clone()
    }

    #[must_use]
    pub fn tags(&self) -> Vec<SmolStr> {
        self.components.keys().cloned().collect()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty() && self.fallback.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Noop;

    impl Component for Noop {
        fn update(&self, _ctx: &mut HandlerContext<'_>, _element: NodeId) -> HandlerResult {
            Ok(())
        }
    }

    #[test]
    fn lookup_is_case_insensitive() {
        let mut registry = ComponentRegistry::new();
        registry.register("Tank", Arc::new(Noop));
        assert!(registry.get("tank").is_some());
        assert!(registry.get(" TANK ").is_some());
        assert!(registry.get("pump").is_none());
    }

    #[test]
    fn resolve_falls_back_on_miss() {
        let mut registry = ComponentRegistry::new();
        assert!(registry.resolve(Some("pump")).is_none());
        registry.set_fallback(Arc::new(Noop));
        assert!(registry.resolve(Some("pump")).is_some());
        assert!(registry.resolve(None).is_some());
    }

    #[test]
    fn tag_prefers_data_component() {
        let doc = Document::parse(
            "<svg id=\"root\"><g id=\"p1\" data-component=\"pump\"/><g id=\"v1\"/><g/></svg>",
        )
        .expect("parse");
        let p1 = doc.find_by_id("p1").expect("p1");
        let v1 = doc.find_by_id("v1").expect("v1");
        assert_eq!(component_tag(&doc, p1).as_deref(), Some("pump"));
        assert_eq!(component_tag(&doc, v1).as_deref(), Some("v1"));
        let svg = doc.svg_roots()[0];
        let anonymous = doc.element_children(svg).nth(2).expect("third group");
        assert_eq!(component_tag(&doc, anonymous), None);
    }
}
