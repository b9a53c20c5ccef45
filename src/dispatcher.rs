//! # dispatcher
//!
//! [`Lite`] is the entry point. It owns a document, a queue of callbacks
//! deferred until the document is ready, and an Ajax engine. Each instance is
//! independent; nothing is stored globally.
//!
//! The single polymorphic entry point is [`Lite::call`], which takes an
//! [`Arg`]:
//! - a ready callback is queued (or run right away once the document is ready)
//! - a selector string is queried against the document
//! - an element is wrapped into a one-element collection
//!
//! [`Lite::ready`], [`Lite::select`] and [`Lite::wrap`] are the same three
//! shapes as separate methods.

use crate::collection::Collection;
use crate::config::Config;
use crate::dom::{Document, Element};
use crate::errors::Result;
use crate::networking::{AjaxEngine, AjaxFailure, AjaxOptions, HttpTransport, RequestId, Transport};
use crate::utils::lock;
use log::{debug, info};
use std::fmt;
use std::sync::{Arc, Mutex};

/// Deferred work run once the document is ready
pub type ReadyCallback = Box<dyn FnOnce(&Document) + Send + 'static>;

/// What [`Lite::call`] can be invoked with
pub enum Arg {
    Ready(ReadyCallback),
    Selector(String),
    Element(Element),
}

impl Arg {
    pub fn ready<F>(callback: F) -> Self
    where
        F: FnOnce(&Document) + Send + 'static,
    {
        Arg::Ready(Box::new(callback))
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Ready(_) => f.write_str("Ready(..)"),
            Arg::Selector(selector) => f.debug_tuple("Selector").field(selector).finish(),
            Arg::Element(element) => f.debug_tuple("Element").field(element).finish(),
        }
    }
}

impl From<&str> for Arg {
    fn from(selector: &str) -> Self {
        Arg::Selector(selector.to_string())
    }
}

impl From<String> for Arg {
    fn from(selector: String) -> Self {
        Arg::Selector(selector)
    }
}

impl From<Element> for Arg {
    fn from(element: Element) -> Self {
        Arg::Element(element)
    }
}

impl From<&Element> for Arg {
    fn from(element: &Element) -> Self {
        Arg::Element(element.clone())
    }
}

/// Outcome of registering a ready callback
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadyState {
    /// Waiting; the value is the number of callbacks now queued
    Queued(usize),
    /// The document was already ready and the callback has run
    Ran,
}

/// Result of [`Lite::call`]
#[derive(Debug)]
pub enum Dispatched {
    Registered(ReadyState),
    Collection(Collection),
}

impl Dispatched {
    pub fn into_collection(self) -> Option<Collection> {
        match self {
            Dispatched::Collection(collection) => Some(collection),
            Dispatched::Registered(_) => None,
        }
    }
}

#[derive(Default)]
struct ReadyQueue {
    ready: bool,
    pending: Vec<ReadyCallback>,
}

/// Document, ready latch and Ajax engine behind one handle
///
/// # Example
/// ```rust
/// use domlite::dom::Document;
/// use domlite::{Config, Lite};
///
/// let lite = Lite::from_config(Document::parse("<p>hi</p>"), &Config::default()).unwrap();
/// lite.ready(|doc| assert_eq!(doc.query_selector_all("p").unwrap().len(), 1));
/// assert_eq!(lite.mark_ready(), 1);
/// assert!(lite.is_ready());
/// ```
pub struct Lite {
    document: Document,
    ready: Mutex<ReadyQueue>,
    ajax: AjaxEngine,
}

impl fmt::Debug for Lite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let queue = lock(&self.ready);
        f.debug_struct("Lite")
            .field("document", &self.document)
            .field("ready", &queue.ready)
            .field("queued", &queue.pending.len())
            .field("ajax", &self.ajax)
            .finish()
    }
}

impl Lite {
    /// Context over `document` that sends requests through `transport`
    pub fn new(document: Document, transport: Arc<dyn Transport>) -> Self {
        Self {
            document,
            ready: Mutex::new(ReadyQueue::default()),
            ajax: AjaxEngine::new(transport),
        }
    }

    /// Context with a real HTTP transport built from `config`
    ///
    /// # Arguments
    /// * `document` - Document every selector runs against
    /// * `config` - Settings for the underlying reqwest client
    ///
    /// # Returns
    /// * Returns the context, or `DomLiteError::NetworkError` when the client
    ///   cannot be built, or `DomLiteError::UrlError` for a bad `base_url`
    pub fn from_config(document: Document, config: &Config) -> Result<Self> {
        Ok(Self::new(document, Arc::new(HttpTransport::new(config)?)))
    }

    pub fn document(&self) -> &Document {
        &self.document
    }

    /// Dispatch on the shape of `arg`
    ///
    /// # Arguments
    /// * `arg` - A ready callback (via [`Arg::ready`]), a selector string, or an element
    ///
    /// # Returns
    /// * Returns [`Dispatched::Registered`] for callbacks and
    ///   [`Dispatched::Collection`] for selectors and elements
    ///
    /// # Example
    /// ```rust
    /// use domlite::dom::Document;
    /// use domlite::{Config, Lite};
    ///
    /// let lite = Lite::from_config(Document::parse("<b>x</b>"), &Config::default()).unwrap();
    /// let bold = lite.call("b").unwrap().into_collection().unwrap();
    /// let again = lite.call(bold.first().unwrap()).unwrap().into_collection().unwrap();
    /// assert_eq!(again.text(), "x");
    /// ```
    pub fn call(&self, arg: impl Into<Arg>) -> Result<Dispatched> {
        let arg = arg.into();
        debug!("dispatching {:?}", arg);
        Ok(match arg {
            Arg::Ready(callback) => Dispatched::Registered(self.register(callback)),
            Arg::Selector(selector) => Dispatched::Collection(self.select(&selector)?),
            Arg::Element(element) => Dispatched::Collection(self.wrap(&element)),
        })
    }

    /// Run `callback` once the document is ready
    pub fn ready<F>(&self, callback: F) -> ReadyState
    where
        F: FnOnce(&Document) + Send + 'static,
    {
        self.register(Box::new(callback))
    }

    fn register(&self, callback: ReadyCallback) -> ReadyState {
        let mut queue = lock(&self.ready);
        if !queue.ready {
            queue.pending.push(callback);
            return ReadyState::Queued(queue.pending.len());
        }
        drop(queue);
        callback(&self.document);
        ReadyState::Ran
    }

    /// Query the whole document
    pub fn select(&self, selector: &str) -> Result<Collection> {
        let ids = self.document.select_ids(None, selector)?;
        Ok(Collection::new(self.document.clone(), ids))
    }

    /// One-element collection over `element`, in whichever document it belongs to
    pub fn wrap(&self, element: &Element) -> Collection {
        Collection::new(element.document().clone(), vec![element.id()])
    }

    pub fn is_ready(&self) -> bool {
        lock(&self.ready).ready
    }

    /// Latch the document as ready and run queued callbacks in registration
    /// order. Later calls do nothing. Returns how many callbacks ran.
    pub fn mark_ready(&self) -> usize {
        let pending = {
            let mut queue = lock(&self.ready);
            if queue.ready {
                return 0;
            }
            queue.ready = true;
            std::mem::take(&mut queue.pending)
        };
        info!("document ready, running {} deferred callbacks", pending.len());
        let count = pending.len();
        for callback in pending {
            callback(&self.document);
        }
        count
    }

    /// Start a request; see [`AjaxOptions`] for the defaults
    ///
    /// # Arguments
    /// * `options` - Overrides merged over the defaults, plus callbacks
    ///
    /// # Returns
    /// * Returns the request id. Callbacks run later, from
    ///   [`Lite::poll_requests`] or [`Lite::flush_requests`].
    ///
    /// # Example
    /// ```no_run
    /// use domlite::dom::Document;
    /// use domlite::networking::AjaxOptions;
    /// use domlite::{Config, Lite};
    ///
    /// let lite = Lite::from_config(Document::default(), &Config::default()).unwrap();
    /// lite.ajax(
    ///     AjaxOptions::new()
    ///         .url("https://example.org/search")
    ///         .param("q", "rust")
    ///         .success(|body| println!("{body}")),
    /// )
    /// .unwrap();
    /// let failures = lite.flush_requests();
    /// ```
    pub fn ajax(&self, options: AjaxOptions) -> Result<RequestId> {
        self.ajax.send(options)
    }

    /// Run callbacks for requests that have completed, without blocking
    pub fn poll_requests(&self) -> Vec<AjaxFailure> {
        self.ajax.poll()
    }

    /// Wait for all in-flight requests and run their callbacks
    pub fn flush_requests(&self) -> Vec<AjaxFailure> {
        self.ajax.flush()
    }

    pub fn requests_in_flight(&self) -> usize {
        self.ajax.in_flight()
    }
}
