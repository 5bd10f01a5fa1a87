//! Metadata records and their SVG encoding.
//!
//! A record is stored inside a `<metadata>` element twice: once as
//! `data-<key>` attributes on the `<metadata>` node and once as one child
//! entry per key. Entries are written as `<key>value</key>` when `key` is a
//! usable element name and as `<data key="key">value</data>` otherwise.
//! Reading also accepts `<data-key>value</data-key>` entries and nested leaf
//! elements; attributes win over entries when both carry the same key.
//!
//! Only keys accepted by [`is_valid_key`] are written, so that `data-<key>`
//! stays a well-formed attribute name.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use smol_str::SmolStr;
use tracing::warn;
use twin_svg::{Document, NodeId};

use crate::changes::ChangeQueue;

pub const METADATA_TAG: &str = "metadata";
const ATTRIBUTE_PREFIX: &str = "data-";
const GENERIC_ENTRY_TAG: &str = "data";

/// Ordered key/value metadata. Values are always strings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataRecord(IndexMap<SmolStr, String>);

impl MetadataRecord {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<SmolStr>, value: impl Into<String>) -> Option<String> {
        self.0.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Parse a value as a number on read. Missing or non-numeric values yield `None`.
    #[must_use]
    pub fn number(&self, key: &str) -> Option<f64> {
        self.get(key)
            .and_then(|value| value.trim().parse::<f64>().ok())
            .filter(|value| value.is_finite())
    }

    pub fn remove(&mut self, key: &str) -> Option<String> {
        self.0.shift_remove(key)
    }

    #[must_use]
    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(key, value)| (key.as_str(), value.as_str()))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(SmolStr::as_str)
    }

    /// Overlay `other` onto this record.
    pub fn merge(&mut self, other: &MetadataRecord) {
        for (key, value) in other.iter() {
            self.insert(key, value);
        }
    }
}

impl<K: Into<SmolStr>, V: Into<String>> FromIterator<(K, V)> for MetadataRecord {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(
            iter.into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        )
    }
}

/// How [`write`] treats keys already stored but absent from the new record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Keep them.
    Merge,
    /// Remove them.
    Replace,
}

/// The `<metadata>` node that holds metadata for `element`: its own direct
/// `<metadata>` child, else the one of its owning SVG root.
#[must_use]
pub fn locate(doc: &Document, element: NodeId) -> Option<NodeId> {
    if doc.local_name(element) == Some(METADATA_TAG) {
        return Some(element);
    }
    if let Some(own) = doc.child_named(element, METADATA_TAG) {
        return Some(own);
    }
    doc.svg_root_of(element)
        .filter(|root| *root != element)
        .and_then(|root| doc.child_named(root, METADATA_TAG))
}

/// Read the metadata visible from `element`. Empty when none exists.
#[must_use]
pub fn read(doc: &Document, element: NodeId) -> MetadataRecord {
    locate(doc, element)
        .map(|metadata| decode(doc, metadata))
        .unwrap_or_default()
}

/// Decode both encodings of one `<metadata>` node.
#[must_use]
pub fn decode(doc: &Document, metadata: NodeId) -> MetadataRecord {
    let mut record = MetadataRecord::new();
    for (key, entry) in entries(doc, metadata) {
        record.insert(key, doc.text_content(entry));
    }
    for (name, value) in doc.attributes(metadata) {
        if let Some(key) = name.strip_prefix(ATTRIBUTE_PREFIX).filter(|key| !key.is_empty()) {
            record.insert(key, value);
        }
    }
    record
}

/// Whether `key` can be stored: non-empty and made of ASCII letters, digits,
/// `-`, `_` and `.` only.
#[must_use]
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}

/// Write `record` into the metadata visible from `element`, creating the
/// `<metadata>` node on first use. Returns the metadata node.
pub fn write(
    doc: &mut Document,
    changes: &mut ChangeQueue,
    element: NodeId,
    record: &MetadataRecord,
    mode: WriteMode,
) -> NodeId {
    let metadata = match locate(doc, element) {
        Some(metadata) => metadata,
        None => create_metadata(doc, element),
    };
    encode(doc, changes, metadata, record, mode);
    metadata
}

/// Encode `record` into an existing `<metadata>` node. Keys rejected by
/// [`is_valid_key`] are skipped.
pub fn encode(
    doc: &mut Document,
    changes: &mut ChangeQueue,
    metadata: NodeId,
    record: &MetadataRecord,
    mode: WriteMode,
) {
    if mode == WriteMode::Replace {
        let stale: Vec<SmolStr> = decode(doc, metadata)
            .keys()
            .filter(|key| !record.contains_key(key))
            .map(SmolStr::new)
            .collect();
        for key in stale {
            remove_encoded(doc, metadata, &key);
            changes.record(metadata, key);
        }
    }
    for (key, value) in record.iter() {
        if !is_valid_key(key) {
            warn!(key, "skipping metadata key that is not a valid attribute name");
            continue;
        }
        doc.set_attribute(metadata, &format!("{ATTRIBUTE_PREFIX}{key}"), value);
        let entry = match find_entry(doc, metadata, key) {
            Some(entry) => entry,
            None => create_entry(doc, metadata, key),
        };
        doc.set_text_content(entry, value);
        changes.record(metadata, key);
    }
}

/// Remove one key from both encodings. Returns whether anything was removed.
pub fn remove_key(doc: &mut Document, changes: &mut ChangeQueue, element: NodeId, key: &str) -> bool {
    let Some(metadata) = locate(doc, element) else {
        return false;
    };
    let removed = remove_encoded(doc, metadata, key);
    if removed {
        changes.record(metadata, key);
    }
    removed
}

fn remove_encoded(doc: &mut Document, metadata: NodeId, key: &str) -> bool {
    let mut removed = doc
        .remove_attribute(metadata, &format!("{ATTRIBUTE_PREFIX}{key}"))
        .is_some();
    let stale: Vec<NodeId> = entries(doc, metadata)
        .into_iter()
        .filter(|(entry_key, _)| entry_key == key)
        .map(|(_, entry)| entry)
        .collect();
    for entry in stale {
        doc.detach(entry);
        removed = true;
    }
    removed
}

fn create_metadata(doc: &mut Document, element: NodeId) -> NodeId {
    let owner = doc.svg_root_of(element).unwrap_or(element);
    let metadata = doc.create_element(METADATA_TAG);
    doc.insert_child(owner, 0, metadata);
    metadata
}

fn create_entry(doc: &mut Document, metadata: NodeId, key: &str) -> NodeId {
    let entry = if is_entry_name(key) {
        doc.create_element(key)
    } else {
        let entry = doc.create_element(GENERIC_ENTRY_TAG);
        doc.set_attribute(entry, "key", key);
        entry
    };
    doc.append_child(metadata, entry);
    entry
}

fn find_entry(doc: &Document, metadata: NodeId, key: &str) -> Option<NodeId> {
    entries(doc, metadata)
        .into_iter()
        .find(|(entry_key, _)| entry_key == key)
        .map(|(_, entry)| entry)
}

/// Leaf entries below `metadata` with their decoded keys, in document order.
fn entries(doc: &Document, metadata: NodeId) -> Vec<(SmolStr, NodeId)> {
    let mut out = Vec::new();
    collect_entries(doc, metadata, &mut out);
    out
}

fn collect_entries(doc: &Document, parent: NodeId, out: &mut Vec<(SmolStr, NodeId)>) {
    for child in doc.element_children(parent) {
        if doc.element_children(child).next().is_some() {
            collect_entries(doc, child, out);
            continue;
        }
        if let Some(key) = entry_key(doc, child) {
            out.push((key, child));
        }
    }
}

fn entry_key(doc: &Document, entry: NodeId) -> Option<SmolStr> {
    let name = doc.local_name(entry)?;
    if name == GENERIC_ENTRY_TAG {
        if let Some(key) = doc.attribute(entry, "key") {
            return Some(SmolStr::new(key));
        }
    }
    if let Some(key) = name.strip_prefix(ATTRIBUTE_PREFIX) {
        if !key.is_empty() {
            return Some(SmolStr::new(key));
        }
    }
    Some(SmolStr::new(name))
}

/// Whether `key` can be written as `<key>` and decoded back to itself.
fn is_entry_name(key: &str) -> bool {
    let mut chars = key.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    if !(first.is_ascii_alphabetic() || first == '_') {
        return false;
    }
    if key == GENERIC_ENTRY_TAG || key.starts_with(ATTRIBUTE_PREFIX) {
        return false;
    }
    if key.len() >= 3 && key[..3].eq_ignore_ascii_case("xml") {
        return false;
    }
    chars.all(|ch| ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.'))
}
