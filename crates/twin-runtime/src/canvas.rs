//! Live canvas: an SVG document with the binding and update protocol.
//!
//! A canvas is driven in turns. Metadata writes, bindings and event
//! dispatch mutate the document and queue changes; [`Canvas::flush`] ends
//! the turn by publishing the queued changes as one batch per round.

use smol_str::SmolStr;
use tracing::{debug, warn};
use twin_svg::{Document, NodeId};

use crate::binding::{self, Binding, DomEvent, HandlerRegistry, ListenerTable};
use crate::changes::{ChangeBatch, ChangeQueue};
use crate::component::{ComponentRegistry, HandlerContext};
use crate::coordinator::{Coordinator, RootState, MAX_FLUSH_ROUNDS};
use crate::error::TwinError;
use crate::feed::DataSnapshot;
use crate::metadata::{self, MetadataRecord, WriteMode};

/// Subscriber notified of every published change batch.
pub trait ChangeObserver: Send {
    fn on_batch(&mut self, doc: &Document, batch: &ChangeBatch);
}

/// What one [`Canvas::flush`] delivered.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FlushReport {
    pub rounds: usize,
    /// Component elements updated, one entry per update call.
    pub updated: Vec<NodeId>,
    /// Changes still queued because the round limit was reached.
    pub deferred: bool,
}

pub struct Canvas {
    doc: Document,
    changes: ChangeQueue,
    coordinator: Coordinator,
    components: ComponentRegistry,
    handlers: HandlerRegistry,
    listeners: ListenerTable,
    observers: Vec<Box<dyn ChangeObserver>>,
    data: DataSnapshot,
}

impl std::fmt::Debug for Canvas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Canvas")
            .field("roots", &self.roots().len())
            .field("listeners", &self.listeners.len())
            .field("components", &self.components)
            .field("handlers", &self.handlers)
            .finish_non_exhaustive()
    }
}

impl Default for Canvas {
    fn default() -> Self {
        Self::new(ComponentRegistry::new(), HandlerRegistry::new())
    }
}

impl Canvas {
    #[must_use]
    pub fn new(components: ComponentRegistry, handlers: HandlerRegistry) -> Self {
        Self {
            doc: Document::new(),
            changes: ChangeQueue::new(),
            coordinator: Coordinator::new(),
            components,
            handlers,
            listeners: ListenerTable::new(),
            observers: Vec::new(),
            data: DataSnapshot::new(),
        }
    }

    /// Canvas with the built-in tank, pump, valve and sensor components.
    #[must_use]
    pub fn with_builtin() -> Self {
        let mut components = ComponentRegistry::new();
        let mut handlers = HandlerRegistry::new();
        crate::components::register_builtin(&mut components, &mut handlers);
        Self::new(components, handlers)
    }

    #[must_use]
    pub fn document(&self) -> &Document {
        &self.doc
    }

    pub fn components_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.components
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.handlers
    }

    pub fn subscribe(&mut self, observer: Box<dyn ChangeObserver>) {
        self.observers.push(observer);
    }

    #[must_use]
    pub fn data(&self) -> &DataSnapshot {
        &self.data
    }

    pub fn set_data(&mut self, data: DataSnapshot) {
        self.data = data;
    }

    /// Outermost SVG roots in document order.
    #[must_use]
    pub fn roots(&self) -> Vec<NodeId> {
        self.doc.svg_roots()
    }

    #[must_use]
    pub fn root_state(&self, root: NodeId) -> RootState {
        self.coordinator.state(root)
    }

    #[must_use]
    pub fn element_by_id(&self, id: &str) -> Option<NodeId> {
        self.doc.find_by_id(id)
    }

    pub fn require_element(&self, id: &str) -> Result<NodeId, TwinError> {
        self.element_by_id(id)
            .ok_or_else(|| TwinError::UnknownElement(SmolStr::new(id)))
    }

    /// Parse `text` and add its SVG roots to the canvas: listeners are
    /// installed, new roots initialized, and the turn flushed.
    pub fn load_svg(&mut self, name: &str, text: &str) -> Result<Vec<NodeId>, TwinError> {
        let before = self.roots();
        let root = self.doc.root();
        let appended = self
            .doc
            .append_parsed(root, text)
            .map_err(|err| TwinError::Svg {
                file: name.into(),
                message: err.to_string().into(),
            })?;
        let added: Vec<NodeId> = self
            .roots()
            .into_iter()
            .filter(|root| !before.contains(root))
            .collect();
        if added.is_empty() {
            for node in appended {
                self.doc.detach(node);
            }
            return Err(TwinError::Svg {
                file: name.into(),
                message: "no <svg> root element".into(),
            });
        }
        let mut listeners = 0;
        for root in &added {
            listeners += self.listeners.install(&self.doc, *root);
        }
        let mut ctx = HandlerContext {
            doc: &mut self.doc,
            changes: &mut self.changes,
            data: &self.data,
        };
        self.coordinator.observe_new_roots(&mut ctx, &self.components);
        debug!(file = name, roots = added.len(), listeners, "svg loaded");
        self.flush();
        Ok(added)
    }

    #[must_use]
    pub fn read_metadata(&self, element: NodeId) -> MetadataRecord {
        metadata::read(&self.doc, element)
    }

    /// Write metadata. Observers see the change at the next flush.
    pub fn write_metadata(&mut self, element: NodeId, record: &MetadataRecord, mode: WriteMode) -> NodeId {
        metadata::write(&mut self.doc, &mut self.changes, element, record, mode)
    }

    pub fn remove_metadata_key(&mut self, element: NodeId, key: &str) -> bool {
        metadata::remove_key(&mut self.doc, &mut self.changes, element, key)
    }

    /// Bind `element` and install its listener.
    pub fn bind(&mut self, element: NodeId, event: Option<&str>, script: &str) {
        binding::bind(&mut self.doc, element, event, script);
        self.listeners.install(&self.doc, element);
    }

    pub fn unbind(&mut self, element: NodeId) {
        binding::unbind(&mut self.doc, element);
    }

    #[must_use]
    pub fn binding_of(&self, element: NodeId) -> Option<Binding> {
        binding::binding_of(&self.doc, element)
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Fire `kind` at `target` and flush the turn. Returns the number of
    /// script handlers invoked.
    pub fn dispatch_event(&mut self, target: NodeId, kind: &str) -> usize {
        let event = DomEvent::new(kind, target);
        let mut ctx = HandlerContext {
            doc: &mut self.doc,
            changes: &mut self.changes,
            data: &self.data,
        };
        let invoked = self.listeners.dispatch(&mut ctx, &self.handlers, &event);
        self.flush();
        invoked
    }

    /// End the turn: publish queued changes. Writes made by handlers during
    /// a round are published in the following round.
    pub fn flush(&mut self) -> FlushReport {
        let mut report = FlushReport::default();
        while report.rounds < MAX_FLUSH_ROUNDS {
            let Some(batch) = self.changes.take_batch() else {
                return report;
            };
            report.rounds += 1;
            for observer in &mut self.observers {
                observer.on_batch(&self.doc, &batch);
            }
            let mut ctx = HandlerContext {
                doc: &mut self.doc,
                changes: &mut self.changes,
                data: &self.data,
            };
            let updated = self.coordinator.on_batch(&mut ctx, &self.components, &batch);
            report.updated.extend(updated);
        }
        if !self.changes.is_empty() {
            warn!(rounds = MAX_FLUSH_ROUNDS, "change rounds exhausted, deferring remaining changes");
            report.deferred = true;
        }
        report
    }

    /// Serialized document.
    #[must_use]
    pub fn to_markup(&self) -> String {
        self.doc.to_string()
    }
}
