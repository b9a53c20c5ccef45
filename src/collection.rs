//! # collection
//!
//! An ordered group of element handles with chainable bulk operations.
//!
//! A [`Collection`] is built once from a concrete list of elements. Later tree
//! mutations never change which elements it holds; operations that produce
//! other elements (`find`, `children`, `parent`) return a new collection.
//!
//! ```rust
//! use domlite::dom::Document;
//! use domlite::{Config, Lite};
//!
//! let doc = Document::parse(r#"<ul><li>a</li><li class="x">b</li></ul>"#);
//! let lite = Lite::from_config(doc, &Config::default()).unwrap();
//! let items = lite.select("li").unwrap();
//! items.add_class("item").unwrap().toggle_class("x").unwrap();
//! assert_eq!(items.attr("class").as_deref(), Some("item"));
//! assert_eq!(items.parent().len(), 1);
//! ```

use crate::dom::{Document, Dom, Element, NodeId, parse, serialize};
use crate::errors::Result;
use log::debug;
use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collection {
    document: Document,
    nodes: Vec<NodeId>,
}

impl Collection {
    pub(crate) fn new(document: Document, nodes: Vec<NodeId>) -> Self {
        Self { document, nodes }
    }

    /// Collection holding exactly the given elements, in order.
    /// Elements from another document are skipped.
    pub fn from_elements<'a>(
        document: &Document,
        elements: impl IntoIterator<Item = &'a Element>,
    ) -> Self {
        let nodes = elements
            .into_iter()
            .filter(|element| element.document() == document)
            .map(Element::id)
            .collect();
        Self::new(document.clone(), nodes)
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<Element> {
        self.nodes
            .get(index)
            .map(|id| self.document.element(*id))
    }

    pub fn first(&self) -> Option<Element> {
        self.get(0)
    }

    pub fn iter(&self) -> impl Iterator<Item = Element> + '_ {
        self.nodes.iter().map(|id| self.document.element(*id))
    }

    /// Call `callback(element, index)` for every element, in order
    ///
    /// # Arguments
    /// * `callback` - Receives each element and its position in the collection
    ///
    /// # Returns
    /// * Returns the same collection for chaining
    ///
    /// # Example
    /// ```rust
    /// use domlite::dom::Document;
    /// use domlite::{Config, Lite};
    ///
    /// let lite = Lite::from_config(Document::parse("<p>a</p><p>b</p>"), &Config::default()).unwrap();
    /// let mut seen = Vec::new();
    /// lite.select("p").unwrap().each(|p, index| seen.push((index, p.text())));
    /// assert_eq!(seen, vec![(0, "a".to_string()), (1, "b".to_string())]);
    /// ```
    pub fn each<F>(&self, mut callback: F) -> &Self
    where
        F: FnMut(&Element, usize),
    {
        for (index, element) in self.iter().enumerate() {
            callback(&element, index);
        }
        self
    }

    /// Detach every element from its parent. Elements without a parent are skipped.
    pub fn remove(&self) -> &Self {
        let mut dom = self.document.dom();
        let detached = self.nodes.iter().filter(|id| dom.detach(**id)).count();
        debug!("removed {} of {} elements", detached, self.nodes.len());
        self
    }

    /// Attribute `key` of the first element
    ///
    /// # Arguments
    /// * `key` - Attribute name, matched case-insensitively
    ///
    /// # Returns
    /// * Returns `None` when the first element lacks the attribute or the collection is empty
    ///
    /// # Example
    /// ```rust
    /// use domlite::dom::Document;
    /// use domlite::{Config, Lite};
    ///
    /// let doc = Document::parse(r#"<a href="/one"></a><a href="/two"></a>"#);
    /// let lite = Lite::from_config(doc, &Config::default()).unwrap();
    /// assert_eq!(lite.select("a").unwrap().attr("href").as_deref(), Some("/one"));
    /// assert_eq!(lite.select("table").unwrap().attr("href"), None);
    /// ```
    pub fn attr(&self, key: &str) -> Option<String> {
        let first = *self.nodes.first()?;
        self.document.dom().attr(first, key).map(str::to_string)
    }

    /// Set attribute `key` to `value` on every element
    ///
    /// # Arguments
    /// * `key` - Attribute name; stored lowercased
    /// * `value` - New value, replacing any existing one
    ///
    /// # Returns
    /// * Returns the same collection for chaining, or
    ///   `DomLiteError::InvalidAttributeName` when `key` is not a valid name
    ///
    /// # Example
    /// ```rust
    /// use domlite::dom::Document;
    /// use domlite::{Config, Lite};
    ///
    /// let lite = Lite::from_config(Document::parse("<a></a><a></a>"), &Config::default()).unwrap();
    /// lite.select("a").unwrap().set_attr("rel", "nofollow").unwrap();
    /// assert_eq!(lite.select("a[rel=nofollow]").unwrap().len(), 2);
    /// assert!(lite.select("a").unwrap().set_attr("bad name", "x").is_err());
    /// ```
    pub fn set_attr(&self, key: &str, value: &str) -> Result<&Self> {
        let mut dom = self.document.dom();
        for id in &self.nodes {
            dom.set_attr(*id, key, value)?;
        }
        Ok(self)
    }

    pub fn remove_attr(&self, key: &str) -> &Self {
        let mut dom = self.document.dom();
        for id in &self.nodes {
            dom.remove_attr(*id, key);
        }
        self
    }

    pub fn add_class(&self, class: &str) -> Result<&Self> {
        let mut dom = self.document.dom();
        for id in &self.nodes {
            dom.add_class(*id, class)?;
        }
        Ok(self)
    }

    pub fn remove_class(&self, class: &str) -> Result<&Self> {
        let mut dom = self.document.dom();
        for id in &self.nodes {
            dom.remove_class(*id, class)?;
        }
        Ok(self)
    }

    /// Toggle `class` on each element independently
    pub fn toggle_class(&self, class: &str) -> Result<&Self> {
        let mut dom = self.document.dom();
        for id in &self.nodes {
            dom.toggle_class(*id, class)?;
        }
        Ok(self)
    }

    pub fn has_class(&self, class: &str) -> bool {
        let dom = self.document.dom();
        self.nodes.iter().any(|id| {
            dom.element(*id)
                .is_some_and(|element| element.has_class(class))
        })
    }

    /// Descendants of every element matching `selector`, concatenated in
    /// element order. Overlapping subtrees yield duplicates.
    ///
    /// # Arguments
    /// * `selector` - CSS selector, matched against descendants only
    ///
    /// # Returns
    /// * Returns a new collection, or `DomLiteError::SelectorError` when
    ///   `selector` does not parse
    ///
    /// # Example
    /// ```rust
    /// use domlite::dom::Document;
    /// use domlite::{Config, Lite};
    ///
    /// let doc = Document::parse("<div><p>a</p></div><div><p>b</p></div><p>c</p>");
    /// let lite = Lite::from_config(doc, &Config::default()).unwrap();
    /// assert_eq!(lite.select("div").unwrap().find("p").unwrap().text(), "ab");
    /// ```
    pub fn find(&self, selector: &str) -> Result<Collection> {
        let mut found = Vec::new();
        for id in &self.nodes {
            found.extend(self.document.select_ids(Some(*id), selector)?);
        }
        Ok(Self::new(self.document.clone(), found))
    }

    /// Direct element children of every element, concatenated
    pub fn children(&self) -> Collection {
        let guard = self.document.dom();
        let dom: &Dom = &guard;
        let children = self
            .nodes
            .iter()
            .flat_map(move |id| dom.element_children(*id))
            .collect();
        Self::new(self.document.clone(), children)
    }

    /// Distinct parent elements, in first-seen order
    ///
    /// # Returns
    /// * Returns a new collection. Detached elements and `<html>` contribute nothing.
    ///
    /// # Example
    /// ```rust
    /// use domlite::dom::Document;
    /// use domlite::{Config, Lite};
    ///
    /// let doc = Document::parse(r#"<ul id="l"><li>a</li><li>b</li></ul>"#);
    /// let lite = Lite::from_config(doc, &Config::default()).unwrap();
    /// let parents = lite.select("li").unwrap().parent();
    /// assert_eq!(parents.len(), 1);
    /// assert_eq!(parents.attr("id").as_deref(), Some("l"));
    /// ```
    pub fn parent(&self) -> Collection {
        let dom = self.document.dom();
        let mut seen = HashSet::new();
        let parents = self
            .nodes
            .iter()
            .filter_map(|id| dom.parent_element(*id))
            .filter(|parent| seen.insert(*parent))
            .collect();
        Self::new(self.document.clone(), parents)
    }

    /// Inner HTML of the first element
    pub fn html(&self) -> Option<String> {
        let first = *self.nodes.first()?;
        Some(serialize::inner_html(&self.document.dom(), first))
    }

    /// Replace the content of every element with `markup`
    pub fn set_html(&self, markup: &str) -> &Self {
        self.empty();
        self.append(markup)
    }

    /// Combined text of every element
    pub fn text(&self) -> String {
        let dom = self.document.dom();
        self.nodes.iter().map(|id| dom.text(*id)).collect()
    }

    /// Detach all child nodes of every element
    pub fn empty(&self) -> &Self {
        let mut dom = self.document.dom();
        for id in &self.nodes {
            dom.clear_children(*id);
        }
        self
    }

    /// Parse `markup` as a fragment and append a copy of it to every element
    pub fn append(&self, markup: &str) -> &Self {
        let fragment = parse::parse_fragment(markup);
        let top: Vec<NodeId> = fragment.children(fragment.root()).to_vec();
        let mut dom = self.document.dom();
        for id in &self.nodes {
            for node in &top {
                dom.import(&fragment, *node, *id);
            }
        }
        self
    }
}

impl IntoIterator for Collection {
    type Item = Element;
    type IntoIter = std::vec::IntoIter<Element>;

    fn into_iter(self) -> Self::IntoIter {
        let document = self.document;
        self.nodes
            .into_iter()
            .map(|id| document.element(id))
            .collect::<Vec<_>>()
            .into_iter()
    }
}

impl<'a> IntoIterator for &'a Collection {
    type Item = Element;
    type IntoIter = Box<dyn Iterator<Item = Element> + 'a>;

    fn into_iter(self) -> Self::IntoIter {
        Box::new(self.iter())
    }
}
