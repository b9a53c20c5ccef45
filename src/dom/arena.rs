//! Arena-backed mutable node tree
//!
//! Nodes live in a single `Vec` and refer to each other by index. Detaching a
//! node only unlinks it from its parent; the node and its subtree stay in the
//! arena, so ids held elsewhere never dangle.

use crate::errors::{DomLiteError, Result};

/// Index of a node inside its document's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementData {
    pub(crate) name: String,
    pub(crate) attrs: Vec<(String, String)>,
}

impl ElementData {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_ascii_lowercase(),
            attrs: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(key))
            .map(|(_, value)| value.as_str())
    }

    pub fn attrs(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attrs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class")
            .unwrap_or_default()
            .split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    fn set_attr(&mut self, key: String, value: String) {
        match self
            .attrs
            .iter_mut()
            .find(|(name, _)| name.eq_ignore_ascii_case(&key))
        {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    fn remove_attr(&mut self, key: &str) -> Option<String> {
        let position = self
            .attrs
            .iter()
            .position(|(name, _)| name.eq_ignore_ascii_case(key))?;
        Some(self.attrs.remove(position).1)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Document,
    Doctype(String),
    Element(ElementData),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    parent: Option<NodeId>,
    children: Vec<NodeId>,
    kind: NodeKind,
}

#[derive(Debug, Clone)]
pub struct Dom {
    nodes: Vec<Node>,
    root: NodeId,
}

impl Default for Dom {
    fn default() -> Self {
        Self::new()
    }
}

impl Dom {
    /// Create a tree holding only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                parent: None,
                children: Vec::new(),
                kind: NodeKind::Document,
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    /// Create a node with no parent
    pub fn create(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            parent: None,
            children: Vec::new(),
            kind,
        });
        id
    }

    /// Create a node as the last child of `parent`
    pub fn append(&mut self, parent: NodeId, kind: NodeKind) -> NodeId {
        let id = self.create(kind);
        self.nodes[id.0].parent = Some(parent);
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn element_children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        self.children(id)
            .iter()
            .copied()
            .filter(|child| self.is_element(*child))
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(data) => Some(data),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        matches!(self.nodes[id.0].kind, NodeKind::Element(_))
    }

    /// Parent only when it is an element; the document node does not count
    pub fn parent_element(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).filter(|parent| self.is_element(*parent))
    }

    pub fn previous_element_sibling(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.parent(id)?;
        let siblings = self.children(parent);
        let position = siblings.iter().position(|sibling| *sibling == id)?;
        siblings[..position]
            .iter()
            .rev()
            .copied()
            .find(|sibling| self.is_element(*sibling))
    }

    /// True when following parent links from `id` reaches the document node
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current == self.root
    }

    /// Every node below `id` in document order, `id` excluded
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(current) = stack.pop() {
            out.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }
        out
    }

    pub fn attr(&self, id: NodeId, key: &str) -> Option<&str> {
        self.element(id)?.attr(key)
    }

    /// Set an attribute on an element. Names are lowercased; non-elements are left alone.
    pub fn set_attr(&mut self, id: NodeId, key: &str, value: &str) -> Result<()> {
        let key = validate_attribute_name(key)?;
        if let Some(element) = self.element_mut(id) {
            element.set_attr(key, value.to_string());
        }
        Ok(())
    }

    pub fn remove_attr(&mut self, id: NodeId, key: &str) -> Option<String> {
        self.element_mut(id)?.remove_attr(key)
    }

    pub fn add_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        validate_token(class)?;
        self.update_classes(id, |classes| {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        });
        Ok(())
    }

    pub fn remove_class(&mut self, id: NodeId, class: &str) -> Result<()> {
        validate_token(class)?;
        self.update_classes(id, |classes| classes.retain(|c| c != class));
        Ok(())
    }

    /// Flip one class on one element, returning whether it is now present
    pub fn toggle_class(&mut self, id: NodeId, class: &str) -> Result<bool> {
        validate_token(class)?;
        let mut present = false;
        self.update_classes(id, |classes| {
            if classes.iter().any(|c| c == class) {
                classes.retain(|c| c != class);
            } else {
                classes.push(class.to_string());
                present = true;
            }
        });
        Ok(present)
    }

    // Mirrors DOMTokenList: duplicates collapse on write, and a missing class
    // attribute is only created when there is something to put in it.
    fn update_classes(&mut self, id: NodeId, update: impl FnOnce(&mut Vec<String>)) {
        let Some(element) = self.element_mut(id) else {
            return;
        };
        let had_attr = element.attr("class").is_some();
        let mut classes: Vec<String> = Vec::new();
        for class in element.classes() {
            if !classes.iter().any(|c| c == class) {
                classes.push(class.to_string());
            }
        }
        update(&mut classes);
        if !had_attr && classes.is_empty() {
            return;
        }
        element.set_attr("class".to_string(), classes.join(" "));
    }

    /// Unlink `id` from its parent. Returns false when it had no parent.
    pub fn detach(&mut self, id: NodeId) -> bool {
        let Some(parent) = self.nodes[id.0].parent.take() else {
            return false;
        };
        self.nodes[parent.0].children.retain(|child| *child != id);
        true
    }

    /// Detach every child of `id`
    pub fn clear_children(&mut self, id: NodeId) {
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = None;
        }
    }

    /// Deep-copy `source`'s subtree rooted at `from` under `parent` in this tree
    pub fn import(&mut self, source: &Dom, from: NodeId, parent: NodeId) -> NodeId {
        let top = self.append(parent, source.kind(from).clone());
        let mut stack = vec![(from, top)];
        while let Some((source_id, copy_id)) = stack.pop() {
            for child in source.children(source_id) {
                let child_copy = self.append(copy_id, source.kind(*child).clone());
                stack.push((*child, child_copy));
            }
        }
        top
    }

    /// Concatenated text of every text node under `id`
    pub fn text(&self, id: NodeId) -> String {
        if let NodeKind::Text(text) = self.kind(id) {
            return text.clone();
        }
        self.descendants(id)
            .into_iter()
            .filter_map(|node| match self.kind(node) {
                NodeKind::Text(text) => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }
}

fn validate_token(token: &str) -> Result<()> {
    if token.is_empty() || token.chars().any(|c| c.is_ascii_whitespace()) {
        return Err(DomLiteError::InvalidToken(token.to_string()));
    }
    Ok(())
}

fn validate_attribute_name(name: &str) -> Result<String> {
    let invalid = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || matches!(c, '"' | '\'' | '>' | '/' | '='));
    if invalid {
        return Err(DomLiteError::InvalidAttributeName(name.to_string()));
    }
    Ok(name.to_ascii_lowercase())
}
