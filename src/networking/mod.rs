//! # networking
//!
//! The Ajax helper and the transports it runs on.
//!
//! This module provides:
//! - jQuery-style request options merged over fixed defaults
//! - a background engine that queues completions for the caller to dispatch
//! - a pluggable [`Transport`], with a reqwest-backed [`HttpTransport`]
//!
//! ## Usage
//!
//! ```no_run
//! use domlite::dom::Document;
//! use domlite::networking::AjaxOptions;
//! use domlite::{Config, Lite};
//!
//! let config = Config::from_json_str(r#"{"base_url": "http://localhost:8080"}"#).unwrap();
//! let lite = Lite::from_config(Document::default(), &config).unwrap();
//! lite.ajax(
//!     AjaxOptions::new()
//!         .url("/items")
//!         .param("page", 2)
//!         .success(|body| println!("got {body}"))
//!         .error(|body| eprintln!("failed: {body}")),
//! )
//! .unwrap();
//! for failure in lite.flush_requests() {
//!     eprintln!("no response from {}: {}", failure.url, failure.error);
//! }
//! ```

// Module declarations
pub mod ajax;
pub mod client;

// Re-export commonly used items for convenience
pub use ajax::{
    AjaxEngine, AjaxFailure, AjaxOptions, AjaxRequest, Callbacks, DEFAULT_CONTENT_TYPE, RequestId,
    ResponseCallback, append_query,
};
pub use client::blocking::{HttpTransport, create_client};
pub use client::{Transport, TransportResponse};

// Re-export types from dependencies for convenience
pub use reqwest::Error as NetworkError;
pub use reqwest::blocking::Client;
