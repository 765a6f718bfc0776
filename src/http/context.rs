//! Per-request context passed through the handler pipeline.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use http_body_util::Full;
use hyper::body::Bytes;
use hyper::{Response, StatusCode};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

/// Raised when a deferred result is requested at an illegal point in the
/// lifecycle.
#[derive(Debug, Error)]
#[error("deferred results cannot be started inside an exception handler")]
pub struct DeferredResultError;

type DeferredProducer = Box<dyn FnOnce() -> Vec<u8> + Send>;

/// The request/response facade handed to every pipeline stage.
///
/// One context exists per request. It carries the parsed request line and
/// headers, accumulates the response, and holds the lifecycle marks the
/// stages coordinate through (`handled`, `served_as_static`, the
/// in-exception-handler flag).
pub struct RequestContext {
    request_id: String,
    method: String,
    path: String,
    request_headers: HashMap<String, String>,

    status: u16,
    response_headers: Vec<(String, String)>,
    content_type: Option<String>,
    body: Vec<u8>,
    deferred: Option<DeferredProducer>,

    handled: bool,
    served_as_static: bool,
    in_exception_handler: Arc<AtomicBool>,
}

impl RequestContext {
    /// Create a context for the given request line.
    pub fn new(method: &str, path: &str) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            method: method.to_string(),
            path: path.to_string(),
            request_headers: HashMap::new(),
            status: StatusCode::OK.as_u16(),
            response_headers: Vec::new(),
            content_type: None,
            body: Vec::new(),
            deferred: None,
            handled: false,
            served_as_static: false,
            in_exception_handler: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Ingest one request header. Names are lowercased for lookup.
    pub fn add_request_header(&mut self, name: &str, value: &str) {
        self.request_headers
            .insert(name.to_ascii_lowercase(), value.to_string());
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    /// Current request path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Look up a request header by case-insensitive name.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.request_headers
            .get(&name.to_ascii_lowercase())
            .map(String::as_str)
    }

    /// Whether the client's `Accept` header admits an HTML response.
    pub fn accepts_html(&self) -> bool {
        self.header("accept")
            .is_some_and(|accept| accept.contains("text/html"))
    }

    /// Whether the client's `Accept-Encoding` header admits gzip.
    pub fn accepts_gzip(&self) -> bool {
        self.header("accept-encoding")
            .is_some_and(|encodings| encodings.contains("gzip"))
    }

    /// Whether this request carries a protocol-upgrade handshake.
    ///
    /// Checked at the outermost dispatch layer, before any routing logic
    /// touches the request.
    pub fn is_upgrade(&self) -> bool {
        self.header("sec-websocket-key").is_some()
    }

    /// Set the response status code.
    pub fn status(&mut self, code: u16) {
        self.status = code;
    }

    pub fn status_code(&self) -> u16 {
        self.status
    }

    /// Set a response header. Later values for the same name win.
    pub fn set_header(&mut self, name: &str, value: &str) {
        self.response_headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(name));
        self.response_headers
            .push((name.to_string(), value.to_string()));
    }

    /// Look up a response header previously set on this context.
    pub fn response_header(&self, name: &str) -> Option<&str> {
        self.response_headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Set the response body as raw bytes, leaving the content type as-is.
    pub fn result(&mut self, bytes: Vec<u8>) {
        self.body = bytes;
        self.deferred = None;
    }

    /// Set a plain-text response body.
    pub fn text(&mut self, text: &str) {
        self.content_type = Some("text/plain; charset=utf-8".to_string());
        self.result(text.as_bytes().to_vec());
    }

    /// Set an HTML response body.
    pub fn html(&mut self, html: &str) {
        self.content_type = Some("text/html; charset=utf-8".to_string());
        self.result(html.as_bytes().to_vec());
    }

    /// Serialize a value as the JSON response body.
    pub fn json<T: Serialize>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        let bytes = serde_json::to_vec(value)?;
        self.content_type = Some("application/json".to_string());
        self.result(bytes);
        Ok(())
    }

    /// Current response body bytes.
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Override the response content type.
    pub fn content_type(&mut self, content_type: &str) {
        self.content_type = Some(content_type.to_string());
    }

    /// Register a producer that builds the response body after the pipeline
    /// completes.
    ///
    /// Rejected while an exception handler is running: a deferred producer
    /// started there could race a response already being resolved.
    pub fn deferred_result<F>(&mut self, producer: F) -> Result<(), DeferredResultError>
    where
        F: FnOnce() -> Vec<u8> + Send + 'static,
    {
        if self.in_exception_handler() {
            return Err(DeferredResultError);
        }
        self.deferred = Some(Box::new(producer));
        Ok(())
    }

    /// Whether an exception handler is currently resolving this request.
    pub fn in_exception_handler(&self) -> bool {
        self.in_exception_handler.load(Ordering::SeqCst)
    }

    pub(crate) fn exception_flag(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.in_exception_handler)
    }

    /// Whether some pipeline stage has already produced the response.
    pub fn is_handled(&self) -> bool {
        self.handled
    }

    /// Mark the response as produced; later tree stages are skipped.
    pub fn mark_handled(&mut self) {
        self.handled = true;
    }

    /// Whether the resource chain produced this response.
    pub fn served_as_static(&self) -> bool {
        self.served_as_static
    }

    pub(crate) fn mark_served_as_static(&mut self) {
        self.served_as_static = true;
    }

    /// Finalize the context into a wire response.
    pub fn into_response(mut self) -> Response<Full<Bytes>> {
        if let Some(producer) = self.deferred.take() {
            self.body = producer();
        }

        let status =
            StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut builder = Response::builder().status(status);
        if let Some(content_type) = &self.content_type {
            builder = builder.header("Content-Type", content_type);
        }
        for (name, value) in &self.response_headers {
            builder = builder.header(name, value);
        }

        builder
            .body(Full::new(Bytes::from(self.body)))
            .unwrap_or_else(|error| {
                tracing::error!(error = %error, "failed to build response");
                let mut fallback = Response::new(Full::new(Bytes::new()));
                *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
                fallback
            })
    }
}
