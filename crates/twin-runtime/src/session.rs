//! Editing state of one IDE session.
//!
//! The session owns the canvas the selected SVGs are loaded into and keeps
//! track of the selected element and of the metadata and bindings the user
//! has applied, so they can be carried into a generated document.

use indexmap::IndexMap;
use rustc_hash::FxHashMap;
use serde::Serialize;
use serde_json::Value;
use smol_str::SmolStr;
use tracing::debug;
use twin_svg::NodeId;

use crate::binding::Binding;
use crate::canvas::Canvas;
use crate::error::TwinError;
use crate::generate::{BindingSpec, GenerateRequest};
use crate::metadata::{self, MetadataRecord, WriteMode};
use crate::resources::{ResourceKind, ResourceStore};

/// What the property panel shows for one element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ElementProperties {
    pub id: SmolStr,
    pub metadata: MetadataRecord,
    pub binding: Option<Binding>,
}

#[derive(Debug, Default)]
pub struct EditorSession {
    canvas: Canvas,
    svg_files: Vec<SmolStr>,
    script_files: Vec<SmolStr>,
    cache: FxHashMap<(ResourceKind, SmolStr), String>,
    selected: Option<SmolStr>,
    metadata: IndexMap<SmolStr, MetadataRecord>,
    bindings: IndexMap<SmolStr, Binding>,
}

fn kind_label(kind: ResourceKind) -> &'static str {
    match kind {
        ResourceKind::Svg => "SVG",
        ResourceKind::Script => "script",
    }
}

/// Metadata values are strings; other JSON scalars keep their JSON text,
/// `null` becomes empty and nested values are stored as JSON.
fn check_key(key: &str) -> Result<(), TwinError> {
    if key.is_empty() {
        return Err(TwinError::InvalidMetadata("empty key".into()));
    }
    if !metadata::is_valid_key(key) {
        return Err(TwinError::InvalidMetadata(
            format!("key '{key}' may only contain letters, digits, '-', '_' and '.'").into(),
        ));
    }
    Ok(())
}

fn json_to_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

impl EditorSession {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Session over a prepared canvas, e.g. one with registered components.
    #[must_use]
    pub fn with_canvas(canvas: Canvas) -> Self {
        Self {
            canvas,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn canvas_mut(&mut self) -> &mut Canvas {
        &mut self.canvas
    }

    #[must_use]
    pub fn svg_files(&self) -> &[SmolStr] {
        &self.svg_files
    }

    #[must_use]
    pub fn script_files(&self) -> &[SmolStr] {
        &self.script_files
    }

    #[must_use]
    pub fn selected_element(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    fn load(&mut self, store: &ResourceStore, kind: ResourceKind, name: &str) -> Result<String, TwinError> {
        let key = (kind, SmolStr::new(name));
        if let Some(text) = self.cache.get(&key) {
            return Ok(text.clone());
        }
        let text = store.read(kind, name)?;
        self.cache.insert(key, text.clone());
        Ok(text)
    }

    /// Select an SVG file and load it onto the canvas.
    pub fn add_svg(&mut self, store: &ResourceStore, name: &str) -> Result<Vec<NodeId>, TwinError> {
        if self.svg_files.iter().any(|file| file == name) {
            return Err(TwinError::AlreadySelected {
                kind: kind_label(ResourceKind::Svg).into(),
                name: name.into(),
            });
        }
        let text = self.load(store, ResourceKind::Svg, name)?;
        let roots = self.canvas.load_svg(name, &text)?;
        self.svg_files.push(SmolStr::new(name));
        Ok(roots)
    }

    pub fn add_script(&mut self, store: &ResourceStore, name: &str) -> Result<(), TwinError> {
        if self.script_files.iter().any(|file| file == name) {
            return Err(TwinError::AlreadySelected {
                kind: kind_label(ResourceKind::Script).into(),
                name: name.into(),
            });
        }
        self.load(store, ResourceKind::Script, name)?;
        self.script_files.push(SmolStr::new(name));
        Ok(())
    }

    /// Cached content of a selected or previously loaded file.
    #[must_use]
    pub fn cached(&self, kind: ResourceKind, name: &str) -> Option<&str> {
        self.cache
            .get(&(kind, SmolStr::new(name)))
            .map(String::as_str)
    }

    pub fn select_element(&mut self, id: &str) -> Result<ElementProperties, TwinError> {
        self.canvas.require_element(id)?;
        self.selected = Some(SmolStr::new(id));
        self.properties()
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    fn selection(&self) -> Result<(SmolStr, NodeId), TwinError> {
        let id = self.selected.clone().ok_or(TwinError::NoElementSelected)?;
        let element = self.canvas.require_element(&id)?;
        Ok((id, element))
    }

    /// Properties of the selected element.
    pub fn properties(&self) -> Result<ElementProperties, TwinError> {
        let (id, element) = self.selection()?;
        Ok(ElementProperties {
            id,
            metadata: self.canvas.read_metadata(element),
            binding: self.canvas.binding_of(element),
        })
    }

    pub fn set_metadata_field(&mut self, key: &str, value: &str) -> Result<(), TwinError> {
        let key = key.trim();
        check_key(key)?;
        let (id, element) = self.selection()?;
        let mut record = MetadataRecord::new();
        record.insert(key, value);
        self.canvas.write_metadata(element, &record, WriteMode::Merge);
        self.canvas.flush();
        self.metadata.entry(id).or_default().insert(key, value);
        Ok(())
    }

    /// Returns whether the key was present.
    pub fn remove_metadata_field(&mut self, key: &str) -> Result<bool, TwinError> {
        let (id, element) = self.selection()?;
        let removed = self.canvas.remove_metadata_key(element, key);
        self.canvas.flush();
        if let Some(pending) = self.metadata.get_mut(&id) {
            pending.remove(key);
        }
        Ok(removed)
    }

    /// Replace the selected element's metadata with a JSON object.
    pub fn apply_metadata_json(&mut self, text: &str) -> Result<MetadataRecord, TwinError> {
        let value: Value = serde_json::from_str(text)
            .map_err(|err| TwinError::InvalidMetadata(err.to_string().into()))?;
        let Value::Object(fields) = value else {
            return Err(TwinError::InvalidMetadata("expected a JSON object".into()));
        };
        for key in fields.keys() {
            check_key(key)?;
        }
        let record: MetadataRecord = fields
            .iter()
            .map(|(key, value)| (SmolStr::new(key), json_to_text(value)))
            .collect();
        let (id, element) = self.selection()?;
        self.canvas.write_metadata(element, &record, WriteMode::Replace);
        self.canvas.flush();
        debug!(element = %id, keys = record.len(), "metadata replaced");
        self.metadata.insert(id, record.clone());
        Ok(record)
    }

    /// The selected element's metadata as pretty JSON.
    pub fn metadata_json(&self) -> Result<String, TwinError> {
        let properties = self.properties()?;
        serde_json::to_string_pretty(&properties.metadata)
            .map_err(|err| TwinError::InvalidMetadata(err.to_string().into()))
    }

    pub fn apply_binding(&mut self, script: &str, event: Option<&str>) -> Result<Binding, TwinError> {
        let (id, element) = self.selection()?;
        if script.trim().is_empty() {
            return Err(TwinError::InvalidBinding("script is required".into()));
        }
        self.canvas.bind(element, event, script);
        let binding = self
            .canvas
            .binding_of(element)
            .ok_or_else(|| TwinError::InvalidBinding(id.clone()))?;
        self.bindings.insert(id, binding.clone());
        Ok(binding)
    }

    pub fn remove_binding(&mut self) -> Result<(), TwinError> {
        let (id, element) = self.selection()?;
        self.canvas.unbind(element);
        self.bindings.shift_remove(&id);
        Ok(())
    }

    /// Request for a document with the selected files and everything applied
    /// in this session.
    #[must_use]
    pub fn generate_request(&self, title: Option<&str>) -> GenerateRequest {
        GenerateRequest {
            svg_files: self.svg_files.iter().map(ToString::to_string).collect(),
            script_files: self.script_files.iter().map(ToString::to_string).collect(),
            title: title.map(str::to_string),
            bindings: self
                .bindings
                .iter()
                .map(|(id, binding)| {
                    (
                        id.to_string(),
                        BindingSpec {
                            script: binding.script.to_string(),
                            event: Some(binding.event.to_string()),
                        },
                    )
                })
                .collect(),
            metadata: self
                .metadata
                .iter()
                .filter(|(_, record)| !record.is_empty())
                .map(|(id, record)| (id.to_string(), record.clone()))
                .collect(),
            simulation: false,
            interval_ms: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_scalars_become_text() {
        assert_eq!(json_to_text(&Value::from("open")), "open");
        assert_eq!(json_to_text(&Value::from(42)), "42");
        assert_eq!(json_to_text(&Value::from(true)), "true");
        assert_eq!(json_to_text(&Value::Null), "");
        assert_eq!(json_to_text(&serde_json::json!([1, 2])), "[1,2]");
    }

    #[test]
    fn editing_requires_a_selection() {
        let mut session = EditorSession::new();
        assert_eq!(
            session.set_metadata_field("level", "1"),
            Err(TwinError::NoElementSelected)
        );
        assert_eq!(
            session.apply_binding("tank.js", None),
            Err(TwinError::NoElementSelected)
        );
        assert!(matches!(
            session.select_element("nothing"),
            Err(TwinError::UnknownElement(_))
        ));
    }
}
