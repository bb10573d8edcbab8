//! Response normalization.
//!
//! # Responsibilities
//! - Give every host the same response surface: header setter, chainable
//!   status setter, body sender, headers-sent flag
//! - Synthesize that surface from the one primitive a host must provide:
//!   writing a complete response (`ResponseSink`)
//! - Guarantee a single write per request
//!
//! # Design Decisions
//! - Status and headers are buffered until `send`
//! - `send` hands the buffered parts to the sink and marks headers as sent;
//!   later writes are dropped with a warning
//! - The handle is cheap to clone; clones share one underlying response

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use axum::http::{header, StatusCode};
use serde::Serialize;
use tokio::sync::oneshot;

/// A complete response as written to the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseParts {
    pub status: StatusCode,
    pub headers: Vec<(String, String)>,
    pub body: Bytes,
}

impl ResponseParts {
    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// The host's write primitive.
pub trait ResponseSink: Send + 'static {
    fn write(self: Box<Self>, parts: ResponseParts);
}

impl ResponseSink for oneshot::Sender<ResponseParts> {
    fn write(self: Box<Self>, parts: ResponseParts) {
        if (*self).send(parts).is_err() {
            tracing::debug!("Response receiver dropped before write");
        }
    }
}

struct ResponseState {
    status: StatusCode,
    headers: Vec<(String, String)>,
    sent: bool,
    sink: Option<Box<dyn ResponseSink>>,
}

/// Uniform response handle.
#[derive(Clone)]
pub struct Response {
    inner: Arc<Mutex<ResponseState>>,
}

impl Response {
    /// Normalize a host sink into a response handle.
    pub fn new(sink: impl ResponseSink) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ResponseState {
                status: StatusCode::OK,
                headers: Vec::new(),
                sent: false,
                sink: Some(Box::new(sink)),
            })),
        }
    }

    /// Handle backed by a oneshot channel.
    pub fn channel() -> (Self, oneshot::Receiver<ResponseParts>) {
        let (tx, rx) = oneshot::channel();
        (Self::new(tx), rx)
    }

    fn state(&self) -> MutexGuard<'_, ResponseState> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Set a header, replacing any existing value with the same name.
    pub fn set_header(&self, name: &str, value: impl Into<String>) -> &Self {
        let mut state = self.state();
        if state.sent {
            tracing::warn!(header = %name, "Header set after response was sent; ignored");
            return self;
        }
        state.headers.retain(|(k, _)| !k.eq_ignore_ascii_case(name));
        state.headers.push((name.to_string(), value.into()));
        self
    }

    /// Set the status code. Chainable: `res.status(StatusCode::CREATED).send("ok")`.
    pub fn status(&self, status: StatusCode) -> &Self {
        let mut state = self.state();
        if !state.sent {
            state.status = status;
        }
        self
    }

    /// Write the response. Returns `false` when a response was already sent.
    pub fn send(&self, body: impl Into<Bytes>) -> bool {
        let mut state = self.state();
        let Some(sink) = state.sink.take() else {
            tracing::warn!(status = %state.status, "Response already sent; write dropped");
            return false;
        };
        state.sent = true;
        let parts = ResponseParts {
            status: state.status,
            headers: state.headers.clone(),
            body: body.into(),
        };
        drop(state);
        sink.write(parts);
        true
    }

    /// Serialize `value` as JSON and send it.
    pub fn json<T: Serialize>(&self, value: &T) -> Result<bool, serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.set_header(header::CONTENT_TYPE.as_str(), "application/json");
        Ok(self.send(body))
    }

    pub fn headers_sent(&self) -> bool {
        self.state().sent
    }

    pub fn status_code(&self) -> StatusCode {
        self.state().status
    }

    pub fn header(&self, name: &str) -> Option<String> {
        find_header(&self.state().headers, name).map(str::to_string)
    }
}

impl std::fmt::Debug for Response {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("Response")
            .field("status", &state.status)
            .field("headers", &state.headers)
            .field("sent", &state.sent)
            .finish()
    }
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}
