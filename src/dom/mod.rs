//! # dom
//!
//! The host document that collections operate on.
//!
//! A [`Document`] is a cheap, cloneable handle to an arena-backed HTML tree
//! parsed with `scraper`. [`Element`] is a handle to one element node inside a
//! document. Handles compare equal when they point at the same node of the
//! same document.
//!
//! ```rust
//! use domlite::dom::Document;
//!
//! let doc = Document::parse("<ul><li>a</li><li>b</li></ul>");
//! let items = doc.query_selector_all("li").unwrap();
//! assert_eq!(items.len(), 2);
//! assert_eq!(items[1].text(), "b");
//! ```

pub mod arena;
pub mod parse;
pub mod selector;
pub mod serialize;

pub use arena::{Dom, ElementData, NodeId, NodeKind};
pub use selector::Selector;

use crate::errors::Result;
use crate::utils::{arcify, lock};
use log::debug;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

/// Shared handle to a parsed HTML document
///
/// Nodes are never reclaimed. Removing, emptying or replacing content only
/// unlinks nodes, so old handles stay readable, and every `set_html` or
/// `append` adds fresh nodes. A document that is rewritten over and over keeps
/// growing for as long as it lives; parse a new one to start clean.
#[derive(Clone)]
pub struct Document {
    inner: Arc<Mutex<Dom>>,
}

impl fmt::Debug for Document {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Document")
            .field("nodes", &self.dom().len())
            .finish()
    }
}

impl PartialEq for Document {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Document {}

impl Default for Document {
    fn default() -> Self {
        Self::from_dom(Dom::new())
    }
}

impl Document {
    /// Parse a complete HTML document
    pub fn parse(markup: &str) -> Self {
        Self::from_dom(parse::parse_document(markup))
    }

    pub fn from_dom(dom: Dom) -> Self {
        Self {
            inner: arcify(dom),
        }
    }

    /// Lock the underlying tree. Never hold the guard across user callbacks.
    pub(crate) fn dom(&self) -> MutexGuard<'_, Dom> {
        lock(&self.inner)
    }

    pub(crate) fn element(&self, id: NodeId) -> Element {
        Element {
            document: self.clone(),
            id,
        }
    }

    /// Run `selector` against every element of the document
    pub fn query_selector_all(&self, selector: &str) -> Result<Vec<Element>> {
        let ids = self.select_ids(None, selector)?;
        Ok(ids.into_iter().map(|id| self.element(id)).collect())
    }

    /// Matching descendants of `scope` (or of the whole document), in document order
    pub(crate) fn select_ids(&self, scope: Option<NodeId>, selector: &str) -> Result<Vec<NodeId>> {
        let parsed = Selector::parse(selector)?;
        let dom = self.dom();
        let matches = parsed.query(&dom, scope.unwrap_or_else(|| dom.root()));
        debug!("selector {:?} matched {} elements", selector, matches.len());
        Ok(matches)
    }

    /// The `<html>` element, if present
    pub fn document_element(&self) -> Option<Element> {
        let id = {
            let dom = self.dom();
            dom.element_children(dom.root()).next()
        };
        id.map(|id| self.element(id))
    }

    /// Create a new element that is not attached anywhere yet
    pub fn create_element(&self, name: &str) -> Element {
        let id = self
            .dom()
            .create(NodeKind::Element(ElementData::new(name)));
        self.element(id)
    }

    /// Serialize the whole document
    pub fn html(&self) -> String {
        let dom = self.dom();
        serialize::outer_html(&dom, dom.root())
    }
}

/// Handle to a single element node
#[derive(Clone, PartialEq, Eq)]
pub struct Element {
    document: Document,
    id: NodeId,
}

impl fmt::Debug for Element {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Element")
            .field("id", &self.id)
            .field("name", &self.name())
            .finish()
    }
}

impl Element {
    pub fn id(&self) -> NodeId {
        self.id
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Lowercased tag name
    pub fn name(&self) -> String {
        self.document
            .dom()
            .element(self.id)
            .map(|element| element.name().to_string())
            .unwrap_or_default()
    }

    pub fn attr(&self, key: &str) -> Option<String> {
        self.document.dom().attr(self.id, key).map(str::to_string)
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.document
            .dom()
            .element(self.id)
            .is_some_and(|element| element.has_class(class))
    }

    /// Parent element; `None` for detached elements and for `<html>`
    pub fn parent(&self) -> Option<Element> {
        let parent = self.document.dom().parent_element(self.id);
        parent.map(|id| self.document.element(id))
    }

    /// Whether the element is still reachable from the document root
    pub fn is_connected(&self) -> bool {
        self.document.dom().is_connected(self.id)
    }

    pub fn text(&self) -> String {
        self.document.dom().text(self.id)
    }

    pub fn inner_html(&self) -> String {
        serialize::inner_html(&self.document.dom(), self.id)
    }

    pub fn outer_html(&self) -> String {
        serialize::outer_html(&self.document.dom(), self.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handles_compare_by_identity() {
        let doc = Document::parse("<p>a</p><p>a</p>");
        let first = doc.query_selector_all("p").unwrap();
        let again = doc.query_selector_all("p").unwrap();
        assert_eq!(first, again);
        assert_ne!(first[0], first[1]);

        let other = Document::parse("<p>a</p><p>a</p>");
        assert_ne!(doc, other);
        assert_ne!(first[0], other.query_selector_all("p").unwrap()[0]);
    }

    #[test]
    fn element_accessors() {
        let doc = Document::parse(r#"<div class="a b" title="t"><i>x</i></div>"#);
        let div = &doc.query_selector_all("div").unwrap()[0];
        assert_eq!(div.name(), "div");
        assert_eq!(div.attr("title").as_deref(), Some("t"));
        assert_eq!(div.attr("missing"), None);
        assert!(div.has_class("b"));
        assert_eq!(div.inner_html(), "<i>x</i>");
        assert_eq!(div.parent().unwrap().name(), "body");
        assert!(doc.document_element().unwrap().parent().is_none());
    }

    #[test]
    fn created_elements_start_detached() {
        let doc = Document::parse("<p></p>");
        let span = doc.create_element("SPAN");
        assert_eq!(span.name(), "span");
        assert!(!span.is_connected());
        assert!(span.parent().is_none());
        assert!(doc.query_selector_all("span").unwrap().is_empty());
    }

    #[test]
    fn replaced_content_stays_in_the_arena() {
        let doc = Document::parse(r#"<div id="box"></div>"#);
        let boxed = crate::Collection::from_elements(&doc, &doc.query_selector_all("#box").unwrap());
        boxed.set_html("<p>x</p>");
        let old = doc.query_selector_all("p").unwrap().remove(0);
        let before = doc.dom().len();
        for _ in 0..10 {
            boxed.set_html("<p>x</p>");
        }
        assert_eq!(doc.dom().len(), before + 10 * 2);
        assert!(!old.is_connected());
        assert_eq!(old.text(), "x");
        assert_eq!(doc.query_selector_all("p").unwrap().len(), 1);
    }
}
