//! Update coordinator.
//!
//! Tracks each SVG root through `Uninitialized -> Observing`. Entering
//! `Observing` runs the root component's `init` once. While observing, every
//! change batch touching the root's metadata triggers `update` on the
//! affected component elements, at most once per element per batch.

use indexmap::IndexMap;
use tracing::{debug, warn};
use twin_svg::{Document, NodeId};

use crate::changes::ChangeBatch;
use crate::component::{component_tag, ComponentRegistry, HandlerContext};

/// Upper bound on change rounds delivered by one flush.
pub const MAX_FLUSH_ROUNDS: usize = 16;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootState {
    Uninitialized,
    Observing,
}

#[derive(Debug, Default)]
pub struct Coordinator {
    roots: IndexMap<NodeId, RootState>,
}

impl Coordinator {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn state(&self, root: NodeId) -> RootState {
        self.roots
            .get(&root)
            .copied()
            .unwrap_or(RootState::Uninitialized)
    }

    /// Roots currently observed, in the order they started.
    pub fn observed_roots(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.roots
            .iter()
            .filter(|(_, state)| **state == RootState::Observing)
            .map(|(root, _)| *root)
    }

    /// Initialize and start observing every SVG root not yet observed.
    /// Returns the roots that transitioned.
    pub fn observe_new_roots(
        &mut self,
        ctx: &mut HandlerContext<'_>,
        components: &ComponentRegistry,
    ) -> Vec<NodeId> {
        let pending: Vec<NodeId> = ctx
            .doc
            .svg_roots()
            .into_iter()
            .filter(|root| self.state(*root) == RootState::Uninitialized)
            .collect();
        for root in &pending {
            let tag = component_tag(ctx.doc, *root);
            match components.resolve(tag.as_deref()) {
                Some(component) => {
                    if let Err(err) = component.init(ctx, *root) {
                        warn!(component = ?tag, "component init failed: {err}");
                    }
                }
                None => debug!(component = ?tag, "no init for root"),
            }
            self.roots.insert(*root, RootState::Observing);
        }
        pending
    }

    /// Deliver one batch. Returns the component elements whose `update` ran,
    /// in first-change order. A failed update still counts as run.
    pub fn on_batch(
        &mut self,
        ctx: &mut HandlerContext<'_>,
        components: &ComponentRegistry,
        batch: &ChangeBatch,
    ) -> Vec<NodeId> {
        let mut targets: Vec<NodeId> = Vec::new();
        for metadata in batch.metadata_nodes() {
            let Some(root) = ctx.doc.svg_root_of(metadata) else {
                continue;
            };
            if self.state(root) != RootState::Observing {
                continue;
            }
            let element = component_element(ctx.doc, metadata, root);
            if !targets.contains(&element) {
                targets.push(element);
            }
        }
        let mut updated = Vec::with_capacity(targets.len());
        for element in targets {
            let tag = component_tag(ctx.doc, element);
            let Some(component) = components.resolve(tag.as_deref()) else {
                continue;
            };
            if let Err(err) = component.update(ctx, element) {
                warn!(component = ?tag, "component update failed: {err}");
            }
            updated.push(element);
        }
        updated
    }
}

/// Nearest element at or above the metadata's owner that carries an `id`,
/// bounded by `root`; `root` itself when none does.
fn component_element(doc: &Document, metadata: NodeId, root: NodeId) -> NodeId {
    let Some(owner) = doc.parent(metadata) else {
        return root;
    };
    for node in std::iter::once(owner).chain(doc.ancestors(owner)) {
        if doc.has_attribute(node, "id") {
            return node;
        }
        if node == root {
            break;
        }
    }
    root
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_element_prefers_nearest_id() {
        let doc = Document::parse(
            "<svg id=\"plant\"><metadata id=\"m0\"/><g><g id=\"pump1\"><metadata id=\"m1\"/></g></g><g><metadata id=\"m2\"/></g></svg>",
        )
        .expect("parse");
        let root = doc.svg_roots()[0];
        let m0 = doc.find_by_id("m0").expect("m0");
        let m1 = doc.find_by_id("m1").expect("m1");
        let m2 = doc.find_by_id("m2").expect("m2");
        let pump = doc.find_by_id("pump1").expect("pump1");
        assert_eq!(component_element(&doc, m0, root), root);
        assert_eq!(component_element(&doc, m1, root), pump);
        assert_eq!(component_element(&doc, m2, root), root);
    }

    #[test]
    fn unknown_root_is_uninitialized() {
        let doc = Document::parse("<svg/>").expect("parse");
        let coordinator = Coordinator::new();
        assert_eq!(coordinator.state(doc.svg_roots()[0]), RootState::Uninitialized);
        assert_eq!(coordinator.observed_roots().count(), 0);
    }
}
