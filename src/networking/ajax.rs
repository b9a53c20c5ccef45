//! Fire-and-forget Ajax requests with jQuery-style default options
//!
//! Every request gets its own named worker thread, so a slow server never
//! holds up other requests or any thread the caller owns. Completions are queued and
//! only dispatched to the `success`/`error` callbacks when the owner calls
//! [`AjaxEngine::poll`] or [`AjaxEngine::flush`], so callbacks always run on
//! the polling thread.

use super::client::{Transport, TransportResponse};
use crate::errors::{DomLiteError, Result};
use crate::extend::extend;
use crate::utils::lock;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

pub const DEFAULT_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=UTF-8";

pub type RequestId = u64;

/// Receives the raw response body
pub type ResponseCallback = Box<dyn FnOnce(String) + Send + 'static>;

/// A fully resolved request, after defaults have been merged in
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AjaxRequest {
    pub content_type: String,
    pub method: String,
    pub url: String,
    pub data: Map<String, Value>,
}

impl Default for AjaxRequest {
    fn default() -> Self {
        Self {
            content_type: DEFAULT_CONTENT_TYPE.to_string(),
            method: "GET".to_string(),
            url: String::new(),
            data: Map::new(),
        }
    }
}

impl AjaxRequest {
    /// JSON-encoded `data`, or `None` for methods that carry no body
    pub fn body(&self) -> Option<String> {
        match self.method.as_str() {
            "GET" | "HEAD" => None,
            _ => Some(Value::Object(self.data.clone()).to_string()),
        }
    }
}

fn query_value(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Append `data` to `url` as a urlencoded query string
pub fn append_query(url: &str, data: &Map<String, Value>) -> String {
    if data.is_empty() {
        return url.to_string();
    }
    let mut serializer = url::form_urlencoded::Serializer::new(String::new());
    for (key, value) in data {
        serializer.append_pair(key, &query_value(value));
    }
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{url}{separator}{}", serializer.finish())
}

/// Caller-supplied overrides. Only the keys that were set replace the defaults.
///
/// ```rust
/// use domlite::networking::AjaxOptions;
///
/// let (request, _) = AjaxOptions::new()
///     .method("get")
///     .url("/search")
///     .param("q", "rust lang")
///     .resolve()
///     .unwrap();
/// assert_eq!(request.method, "GET");
/// assert_eq!(request.url, "/search?q=rust+lang");
/// ```
#[derive(Default)]
pub struct AjaxOptions {
    fields: Map<String, Value>,
    success: Option<ResponseCallback>,
    error: Option<ResponseCallback>,
}

impl fmt::Debug for AjaxOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AjaxOptions")
            .field("fields", &self.fields)
            .field("success", &self.success.is_some())
            .field("error", &self.error.is_some())
            .finish()
    }
}

/// The pair of callbacks a request completes into
pub struct Callbacks {
    pub success: ResponseCallback,
    pub error: ResponseCallback,
}

impl AjaxOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Options from a JSON object using the wire names
    ///
    /// # Arguments
    /// * `value` - Object with any of `contentType`, `method`, `url` and `data`
    ///
    /// # Returns
    /// * Returns the options, or `DomLiteError::GenericError` when `value` is not an object
    ///
    /// # Example
    /// ```rust
    /// use domlite::networking::AjaxOptions;
    /// use serde_json::json;
    ///
    /// let options = AjaxOptions::from_value(json!({"method": "post", "url": "/save"})).unwrap();
    /// let (request, _) = options.resolve().unwrap();
    /// assert_eq!(request.method, "POST");
    /// ```
    pub fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Object(fields) => Ok(Self {
                fields,
                ..Self::default()
            }),
            other => Err(DomLiteError::GenericError(format!(
                "ajax options must be an object, got {other}"
            ))),
        }
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.fields.insert("url".into(), Value::String(url.into()));
        self
    }

    pub fn method(mut self, method: impl Into<String>) -> Self {
        self.fields
            .insert("method".into(), Value::String(method.into()));
        self
    }

    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.fields
            .insert("contentType".into(), Value::String(content_type.into()));
        self
    }

    /// Replace the whole data mapping
    pub fn data(mut self, data: Map<String, Value>) -> Self {
        self.fields.insert("data".into(), Value::Object(data));
        self
    }

    /// Add one entry to the data mapping
    ///
    /// # Arguments
    /// * `key` - Data key; for GET it becomes a query parameter
    /// * `value` - Anything convertible to a JSON value
    pub fn param(mut self, key: &str, value: impl Into<Value>) -> Self {
        let data = self
            .fields
            .entry("data")
            .or_insert_with(|| Value::Object(Map::new()));
        if !data.is_object() {
            *data = Value::Object(Map::new());
        }
        if let Value::Object(map) = data {
            map.insert(key.to_string(), value.into());
        }
        self
    }

    pub fn success<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(String) + Send + 'static,
    {
        self.success = Some(Box::new(callback));
        self
    }

    pub fn error<F>(mut self, callback: F) -> Self
    where
        F: FnOnce(String) + Send + 'static,
    {
        self.error = Some(Box::new(callback));
        self
    }

    /// Merge over the defaults, normalize the method and build the final URL
    ///
    /// # Returns
    /// * Returns the resolved request and its callbacks (no-ops where unset),
    ///   or `DomLiteError::SerdeError` when an option has the wrong type
    pub fn resolve(self) -> Result<(AjaxRequest, Callbacks)> {
        let mut merged = match serde_json::to_value(AjaxRequest::default())? {
            Value::Object(defaults) => defaults,
            _ => {
                return Err(DomLiteError::GenericError(
                    "ajax defaults are not an object".to_string(),
                ));
            }
        };
        extend(&mut merged, [&self.fields]);
        let mut request: AjaxRequest = serde_json::from_value(Value::Object(merged))?;
        request.method = request.method.to_uppercase();
        if request.method == "GET" {
            request.url = append_query(&request.url, &request.data);
        }
        let callbacks = Callbacks {
            success: self.success.unwrap_or_else(|| Box::new(|_| {})),
            error: self.error.unwrap_or_else(|| Box::new(|_| {})),
        };
        Ok((request, callbacks))
    }
}

/// A request that never produced a response. Neither callback was run.
#[derive(Debug)]
pub struct AjaxFailure {
    pub id: RequestId,
    pub url: String,
    pub error: DomLiteError,
}

struct Pending {
    url: String,
    callbacks: Callbacks,
}

struct Completion {
    id: RequestId,
    result: Result<TransportResponse>,
}

/// Issues requests and routes their completions to callbacks
pub struct AjaxEngine {
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
    pending: Mutex<HashMap<RequestId, Pending>>,
    sender: Sender<Completion>,
    receiver: Mutex<Receiver<Completion>>,
}

impl fmt::Debug for AjaxEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AjaxEngine")
            .field("in_flight", &self.in_flight())
            .finish()
    }
}

impl AjaxEngine {
    pub fn new(transport: Arc<dyn Transport>) -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            transport,
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            sender,
            receiver: Mutex::new(receiver),
        }
    }

    /// Resolve `options` and start the request in the background
    pub fn send(&self, options: AjaxOptions) -> Result<RequestId> {
        let (request, callbacks) = options.resolve()?;
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!("request {} queued: {} {}", id, request.method, request.url);
        lock(&self.pending).insert(
            id,
            Pending {
                url: request.url.clone(),
                callbacks,
            },
        );

        let transport = Arc::clone(&self.transport);
        let sender = self.sender.clone();
        let spawned = thread::Builder::new()
            .name(format!("domlite-ajax-{id}"))
            .spawn(move || {
                let result = transport.send(&request);
                // The receiver lives as long as the engine; if it is gone nobody is listening.
                let _ = sender.send(Completion { id, result });
            });
        if let Err(err) = spawned {
            lock(&self.pending).remove(&id);
            warn!("request {} could not start a worker: {}", id, err);
            return Err(err.into());
        }
        Ok(id)
    }

    /// Requests whose callbacks have not run yet
    pub fn in_flight(&self) -> usize {
        lock(&self.pending).len()
    }

    /// Dispatch whatever has completed so far without blocking
    pub fn poll(&self) -> Vec<AjaxFailure> {
        let completed: Vec<Completion> = lock(&self.receiver).try_iter().collect();
        completed
            .into_iter()
            .filter_map(|completion| self.dispatch(completion))
            .collect()
    }

    /// Block until every in-flight request has been dispatched
    pub fn flush(&self) -> Vec<AjaxFailure> {
        let mut failures = Vec::new();
        while self.in_flight() > 0 {
            let next = lock(&self.receiver).recv_timeout(Duration::from_millis(50));
            match next {
                Ok(completion) => failures.extend(self.dispatch(completion)),
                // Another thread may have dispatched the last one; re-check.
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        failures
    }

    fn dispatch(&self, completion: Completion) -> Option<AjaxFailure> {
        let Completion { id, result } = completion;
        let pending = lock(&self.pending).remove(&id)?;
        match result {
            Ok(response) if response.status == 200 => {
                debug!("request {} to {} succeeded", id, pending.url);
                (pending.callbacks.success)(response.body);
                None
            }
            Ok(response) => {
                warn!(
                    "request {} to {} returned status {}",
                    id, pending.url, response.status
                );
                (pending.callbacks.error)(response.body);
                None
            }
            Err(error) => {
                warn!("request {} to {} got no response: {}", id, pending.url, error);
                Some(AjaxFailure {
                    id,
                    url: pending.url,
                    error,
                })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct Fixed {
        seen: Mutex<Vec<AjaxRequest>>,
        reply: fn(&AjaxRequest) -> Result<TransportResponse>,
    }

    impl Transport for Fixed {
        fn send(&self, request: &AjaxRequest) -> Result<TransportResponse> {
            lock(&self.seen).push(request.clone());
            (self.reply)(request)
        }
    }

    fn engine(reply: fn(&AjaxRequest) -> Result<TransportResponse>) -> (Arc<Fixed>, AjaxEngine) {
        let transport = Arc::new(Fixed {
            seen: Mutex::new(Vec::new()),
            reply,
        });
        let engine = AjaxEngine::new(transport.clone());
        (transport, engine)
    }

    #[test]
    fn defaults_fill_missing_options() {
        let (request, _) = AjaxOptions::new().resolve().unwrap();
        assert_eq!(request, AjaxRequest::default());
        assert_eq!(request.content_type, DEFAULT_CONTENT_TYPE);
        assert_eq!(request.url, "");
    }

    #[test]
    fn get_moves_data_into_query_string() {
        let (request, _) = AjaxOptions::from_value(json!({
            "method": "get",
            "url": "/x",
            "data": {"q": "1"}
        }))
        .unwrap()
        .resolve()
        .unwrap();
        assert_eq!(request.method, "GET");
        assert_eq!(request.url, "/x?q=1");
        assert_eq!(request.body(), None);
    }

    #[test]
    fn query_string_encodes_values() {
        let data = json!({"a": "x y", "n": 2, "flag": true, "none": null, "amp": "&"});
        let url = append_query("/p?z=0", data.as_object().unwrap());
        assert_eq!(url, "/p?z=0&a=x+y&n=2&flag=true&none=&amp=%26");
    }

    #[test]
    fn post_sends_json_body() {
        let (request, _) = AjaxOptions::new()
            .method("Post")
            .url("/save")
            .param("id", 7)
            .content_type("application/json")
            .resolve()
            .unwrap();
        assert_eq!(request.method, "POST");
        assert_eq!(request.url, "/save");
        assert_eq!(request.body().as_deref(), Some(r#"{"id":7}"#));
        assert_eq!(request.content_type, "application/json");
    }

    #[test]
    fn ill_typed_options_are_rejected() {
        assert!(matches!(
            AjaxOptions::from_value(json!({"url": 5})).unwrap().resolve(),
            Err(DomLiteError::SerdeError(_))
        ));
        assert!(AjaxOptions::from_value(json!("nope")).is_err());
    }

    #[test]
    fn status_routes_to_callbacks() {
        let (transport, engine) = engine(|request| {
            Ok(if request.url.starts_with("/ok") {
                TransportResponse::new(200, "ok")
            } else {
                TransportResponse::new(404, "missing")
            })
        });
        let (tx, rx) = mpsc::channel();
        for url in ["/ok", "/gone"] {
            let ok = tx.clone();
            let err = tx.clone();
            engine
                .send(
                    AjaxOptions::new()
                        .url(url)
                        .success(move |body| ok.send(format!("success:{body}")).unwrap())
                        .error(move |body| err.send(format!("error:{body}")).unwrap()),
                )
                .unwrap();
        }
        assert!(engine.flush().is_empty());
        assert_eq!(engine.in_flight(), 0);
        let mut outcomes: Vec<String> = rx.try_iter().collect();
        outcomes.sort();
        assert_eq!(outcomes, vec!["error:missing", "success:ok"]);
        assert_eq!(lock(&transport.seen).len(), 2);
    }

    #[test]
    fn missing_response_is_reported_not_dispatched() {
        let (_, engine) = engine(|_| Err(DomLiteError::GenericError("connection refused".into())));
        let (tx, rx) = mpsc::channel::<String>();
        let ok = tx.clone();
        let id = engine
            .send(
                AjaxOptions::new()
                    .url("/down")
                    .success(move |body| ok.send(body).unwrap())
                    .error(move |body| tx.send(body).unwrap()),
            )
            .unwrap();
        let failures = engine.flush();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].id, id);
        assert_eq!(failures[0].url, "/down");
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn poll_never_blocks() {
        let (_, engine) = engine(|_| Ok(TransportResponse::new(200, "")));
        assert!(engine.poll().is_empty());
        engine.send(AjaxOptions::new().url("/a")).unwrap();
        while engine.in_flight() > 0 {
            engine.poll();
            std::thread::yield_now();
        }
    }

    /// Holds every `/slow` request until released
    #[derive(Default)]
    struct Gated {
        released: Mutex<bool>,
        wake: std::sync::Condvar,
    }

    impl Gated {
        fn release(&self) {
            *lock(&self.released) = true;
            self.wake.notify_all();
        }
    }

    impl Transport for Gated {
        fn send(&self, request: &AjaxRequest) -> Result<TransportResponse> {
            if request.url == "/slow" {
                let released = lock(&self.released);
                let (released, _) = self
                    .wake
                    .wait_timeout_while(released, Duration::from_secs(5), |released| !*released)
                    .unwrap();
                if !*released {
                    return Err(DomLiteError::GenericError("never released".into()));
                }
            }
            Ok(TransportResponse::new(200, &request.url))
        }
    }

    #[test]
    fn slow_requests_do_not_hold_up_others() {
        let transport = Arc::new(Gated::default());
        let engine = AjaxEngine::new(transport.clone());
        let (tx, rx) = mpsc::channel();
        for _ in 0..64 {
            let slow = tx.clone();
            engine
                .send(AjaxOptions::new().url("/slow").success(move |body| slow.send(body).unwrap()))
                .unwrap();
        }
        let fast = tx.clone();
        engine
            .send(AjaxOptions::new().url("/fast").success(move |body| fast.send(body).unwrap()))
            .unwrap();

        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        let mut seen = Vec::new();
        while seen.is_empty() && std::time::Instant::now() < deadline {
            assert!(engine.poll().is_empty());
            seen.extend(rx.try_iter());
            thread::yield_now();
        }
        assert_eq!(seen, vec!["/fast"]);
        assert_eq!(engine.in_flight(), 64);

        transport.release();
        assert!(engine.flush().is_empty());
        assert_eq!(engine.in_flight(), 0);
        assert_eq!(rx.try_iter().count(), 64);
    }
}
