//! Metadata change notification.
//!
//! Every metadata write appends a [`MetadataChange`] to the owning
//! [`ChangeQueue`]. Changes accumulate for the rest of the current turn and
//! are published as one [`ChangeBatch`] when the canvas flushes, so a burst
//! of writes is seen by subscribers as a single notification.

use smol_str::SmolStr;
use twin_svg::NodeId;

/// One key written into one `<metadata>` node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataChange {
    pub metadata: NodeId,
    pub key: SmolStr,
}

/// Changes accumulated during one turn, in write order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ChangeBatch {
    pub changes: Vec<MetadataChange>,
}

impl ChangeBatch {
    #[must_use]
    pub fn len(&self) -> usize {
        self.changes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    /// Distinct metadata nodes touched by this batch, in first-write order.
    #[must_use]
    pub fn metadata_nodes(&self) -> Vec<NodeId> {
        let mut nodes: Vec<NodeId> = Vec::new();
        for change in &self.changes {
            if !nodes.contains(&change.metadata) {
                nodes.push(change.metadata);
            }
        }
        nodes
    }
}

/// Pending changes not yet published.
#[derive(Debug, Default)]
pub struct ChangeQueue {
    pending: Vec<MetadataChange>,
}

impl ChangeQueue {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, metadata: NodeId, key: impl Into<SmolStr>) {
        self.pending.push(MetadataChange {
            metadata,
            key: key.into(),
        });
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Drain everything recorded so far into a batch.
    pub fn take_batch(&mut self) -> Option<ChangeBatch> {
        if self.pending.is_empty() {
            return None;
        }
        Some(ChangeBatch {
            changes: std::mem::take(&mut self.pending),
        })
    }
}
