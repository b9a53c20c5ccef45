//! Transport seam between the Ajax engine and the network
pub mod blocking;

use crate::errors::DomLiteError;
use crate::networking::ajax::AjaxRequest;

/// Status and raw body of a completed exchange
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
        }
    }
}

/// Performs one request synchronously. Called from worker threads.
///
/// An `Err` means no response was received at all; any HTTP status,
/// including errors, is an `Ok`.
pub trait Transport: Send + Sync {
    fn send(&self, request: &AjaxRequest) -> Result<TransportResponse, DomLiteError>;
}
