//! Arena-backed SVG document.

use indexmap::IndexMap;
use smol_str::SmolStr;

use crate::SvgError;

/// Index of a node inside its [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }

    /// Raw arena index, stable for the lifetime of the document.
    #[must_use]
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

/// Element name and attributes in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    /// Qualified name as written (`svg`, `rect`, `inkscape:label`).
    pub name: SmolStr,
    /// Attributes keyed by qualified name, including `xmlns*` declarations.
    pub attributes: IndexMap<SmolStr, String>,
}

/// Payload of a node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    /// Synthetic root holding top-level nodes.
    Document,
    /// Element node.
    Element(ElementData),
    /// Character data.
    Text(String),
    /// `<!-- comment -->`
    Comment(String),
}

#[derive(Debug, Clone)]
struct NodeData {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Mutable SVG document.
///
/// Nodes are never freed; detached nodes stay in the arena but are no longer
/// reachable from [`Document::root`].
#[derive(Debug, Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl Document {
    /// Create an empty document containing only the synthetic root.
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: vec![NodeData {
                kind: NodeKind::Document,
                parent: None,
                children: Vec::new(),
            }],
        }
    }

    /// Parse SVG markup into a new document.
    pub fn parse(text: &str) -> Result<Self, SvgError> {
        let mut doc = Self::new();
        let root = doc.root();
        doc.append_parsed(root, text)?;
        if doc.svg_roots().is_empty() {
            return Err(SvgError::MissingSvgRoot);
        }
        Ok(doc)
    }

    /// Parse markup and append its top-level nodes to `parent`.
    ///
    /// Returns the appended top-level nodes in order.
    pub fn append_parsed(&mut self, parent: NodeId, text: &str) -> Result<Vec<NodeId>, SvgError> {
        crate::parse::append_markup(self, parent, text)
    }

    /// The synthetic document root.
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    fn data(&self, id: NodeId) -> &NodeData {
        &self.nodes[id.index()]
    }

    fn data_mut(&mut self, id: NodeId) -> &mut NodeData {
        &mut self.nodes[id.index()]
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.data_mut(id).kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Payload of a node.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.data(id).kind
    }

    /// Element payload, if `id` is an element.
    #[must_use]
    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.data(id).kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    /// Whether `id` is an element node.
    #[must_use]
    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    /// Qualified element name.
    #[must_use]
    pub fn name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.name.as_str())
    }

    /// Element name without its namespace prefix.
    #[must_use]
    pub fn local_name(&self, id: NodeId) -> Option<&str> {
        self.name(id)
            .map(|name| name.rsplit_once(':').map_or(name, |(_, local)| local))
    }

    /// Attribute value by qualified name.
    #[must_use]
    pub fn attribute(&self, id: NodeId, name: &str) -> Option<&str> {
        self.element(id)
            .and_then(|element| element.attributes.get(name))
            .map(String::as_str)
    }

    /// Whether the element carries the attribute.
    #[must_use]
    pub fn has_attribute(&self, id: NodeId, name: &str) -> bool {
        self.attribute(id, name).is_some()
    }

    /// Attributes of an element in source order; empty for non-elements.
    pub fn attributes(&self, id: NodeId) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.element(id)
            .into_iter()
            .flat_map(|element| element.attributes.iter())
            .map(|(name, value)| (name.as_str(), value.as_str()))
    }

    /// Set an attribute, returning the previous value.
    ///
    /// Setting an attribute on a non-element node is ignored.
    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> Option<String> {
        let element = self.element_mut(id)?;
        element.attributes.insert(SmolStr::new(name), value.into())
    }

    /// Remove an attribute, returning its value.
    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Option<String> {
        self.element_mut(id)?.attributes.shift_remove(name)
    }

    /// Parent node; `None` for the root and detached nodes.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.data(id).parent
    }

    /// Direct children in order.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.data(id).children
    }

    /// Direct element children in order.
    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
    }

    /// First direct element child with the given local name.
    #[must_use]
    pub fn child_named(&self, id: NodeId, local_name: &str) -> Option<NodeId> {
        self.element_children(id)
            .find(|child| self.local_name(*child) == Some(local_name))
    }

    /// Ancestors from the parent upwards, excluding the synthetic root.
    #[must_use]
    pub fn ancestors(&self, id: NodeId) -> Ancestors<'_> {
        Ancestors {
            doc: self,
            next: self.parent(id),
        }
    }

    /// Pre-order traversal starting at (and including) `id`.
    #[must_use]
    pub fn descendants(&self, id: NodeId) -> Descendants<'_> {
        Descendants {
            doc: self,
            stack: vec![id],
        }
    }

    /// `id` itself or its nearest ancestor with the given local name.
    #[must_use]
    pub fn closest(&self, id: NodeId, local_name: &str) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .find(|node| self.local_name(*node) == Some(local_name))
    }

    /// Outermost `<svg>` element containing `id` (or `id` itself).
    #[must_use]
    pub fn svg_root_of(&self, id: NodeId) -> Option<NodeId> {
        std::iter::once(id)
            .chain(self.ancestors(id))
            .filter(|node| self.local_name(*node) == Some("svg"))
            .last()
    }

    /// Every outermost `<svg>` element in document order.
    #[must_use]
    pub fn svg_roots(&self) -> Vec<NodeId> {
        let mut roots = Vec::new();
        let mut stack = vec![self.root()];
        while let Some(node) = stack.pop() {
            if self.local_name(node) == Some("svg") {
                roots.push(node);
                continue;
            }
            stack.extend(self.children(node).iter().rev().copied());
        }
        roots
    }

    /// First element in the document whose `id` attribute equals `id`.
    #[must_use]
    pub fn find_by_id(&self, id: &str) -> Option<NodeId> {
        self.find_in(self.root(), id)
    }

    /// First element under `scope` (inclusive) whose `id` attribute equals `id`.
    #[must_use]
    pub fn find_in(&self, scope: NodeId, id: &str) -> Option<NodeId> {
        self.descendants(scope)
            .find(|node| self.attribute(*node, "id") == Some(id))
    }

    /// Concatenated text of every descendant text node.
    #[must_use]
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        for node in self.descendants(id) {
            if let NodeKind::Text(text) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }

    /// Replace all children of `id` with a single text node.
    pub fn set_text_content(&mut self, id: NodeId, text: &str) {
        if let NodeKind::Text(existing) = &mut self.data_mut(id).kind {
            *existing = text.to_string();
            return;
        }
        self.remove_children(id);
        if !text.is_empty() {
            let node = self.create_text(text);
            self.append_child(id, node);
        }
    }

    /// Create a detached element.
    pub fn create_element(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Element(ElementData {
            name: SmolStr::new(name),
            attributes: IndexMap::new(),
        }))
    }

    /// Create a detached text node.
    pub fn create_text(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Text(text.to_string()))
    }

    /// Create a detached comment node.
    pub fn create_comment(&mut self, text: &str) -> NodeId {
        self.push(NodeKind::Comment(text.to_string()))
    }

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(u32::try_from(self.nodes.len()).unwrap_or(u32::MAX));
        self.nodes.push(NodeData {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.data_mut(child).parent = Some(parent);
        self.data_mut(parent).children.push(child);
    }

    /// Insert `child` at `index` among the children of `parent`.
    ///
    /// `index` is clamped to the number of children.
    pub fn insert_child(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.data_mut(child).parent = Some(parent);
        let children = &mut self.data_mut(parent).children;
        let index = index.min(children.len());
        children.insert(index, child);
    }

    /// Unlink `id` from its parent.
    pub fn detach(&mut self, id: NodeId) {
        let Some(parent) = self.data_mut(id).parent.take() else {
            return;
        };
        self.data_mut(parent).children.retain(|child| *child != id);
    }

    /// Unlink every child of `id`.
    pub fn remove_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.data_mut(id).children);
        for child in children {
            self.data_mut(child).parent = None;
        }
    }

    /// Serialize one node and its subtree.
    #[must_use]
    pub fn to_markup(&self, id: NodeId) -> String {
        let mut out = String::new();
        crate::serialize::write_node(self, id, &mut out);
        out
    }
}

impl std::fmt::Display for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_markup(self.root()))
    }
}

/// Iterator over ancestors, see [`Document::ancestors`].
#[derive(Debug)]
pub struct Ancestors<'a> {
    doc: &'a Document,
    next: Option<NodeId>,
}

impl Iterator for Ancestors<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        if current == self.doc.root() {
            self.next = None;
            return None;
        }
        self.next = self.doc.parent(current);
        Some(current)
    }
}

/// Pre-order iterator, see [`Document::descendants`].
#[derive(Debug)]
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(current).iter().rev().copied());
        Some(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ancestors_stop_below_synthetic_root() {
        let doc = Document::parse("<svg id=\"a\"><g id=\"b\"><rect id=\"c\"/></g></svg>")
            .expect("parse");
        let rect = doc.find_by_id("c").expect("rect");
        let chain: Vec<_> = doc
            .ancestors(rect)
            .filter_map(|node| doc.attribute(node, "id"))
            .collect();
        assert_eq!(chain, vec!["b", "a"]);
    }

    #[test]
    fn insert_child_clamps_index_and_moves_node() {
        let mut doc = Document::parse("<svg><a/><b/></svg>").expect("parse");
        let svg = doc.svg_roots()[0];
        let c = doc.create_element("c");
        doc.insert_child(svg, 99, c);
        doc.insert_child(svg, 0, c);
        assert_eq!(doc.to_string(), "<svg><c/><a/><b/></svg>");
    }

    #[test]
    fn nested_svg_is_not_a_separate_root() {
        let doc = Document::parse("<svg id=\"outer\"><svg id=\"inner\"><rect id=\"r\"/></svg></svg>")
            .expect("parse");
        assert_eq!(doc.svg_roots().len(), 1);
        let rect = doc.find_by_id("r").expect("rect");
        let root = doc.svg_root_of(rect).expect("root");
        assert_eq!(doc.attribute(root, "id"), Some("outer"));
    }
}
