//! # domlite
//!
//! A small jQuery-style wrapper over a parsed HTML document, plus an Ajax helper.
//!
//! [`Lite`] holds a [`dom::Document`] and hands out [`Collection`]s: ordered
//! groups of elements with chainable class, attribute, traversal and removal
//! operations. [`Lite::ajax`] issues background HTTP requests with
//! jQuery-like default options.
//!
//! ## Usage
//!
//! ```rust
//! use domlite::dom::Document;
//! use domlite::{Config, Lite};
//!
//! let doc = Document::parse(r#"<div id="menu"><a href="/a">A</a><a href="/b">B</a></div>"#);
//! let lite = Lite::from_config(doc, &Config::default()).unwrap();
//!
//! let links = lite.select("#menu a").unwrap();
//! links.add_class("nav").unwrap().set_attr("rel", "nofollow").unwrap();
//! assert_eq!(links.attr("href").as_deref(), Some("/a"));
//! assert_eq!(links.parent().attr("id").as_deref(), Some("menu"));
//! ```

#[macro_use]
mod utils;

pub mod collection;
pub mod config;
pub mod dispatcher;
pub mod dom;
pub mod errors;
pub mod extend;
pub mod networking;

pub use collection::Collection;
pub use config::Config;
pub use dispatcher::{Arg, Dispatched, Lite, ReadyState};
pub use dom::{Document, Element};
pub use errors::DomLiteError;
pub use extend::extend;

/// Initialize `pretty_env_logger` from `RUST_LOG`. Safe to call more than once.
pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}
