//! Host-neutral request representation.
//!
//! # Responsibilities
//! - Carry the method, headers, pathname, query map and body a host hands over
//! - Carry the per-request context (transaction id, timing, merged params,
//!   per-phase errors)
//!
//! # Design Decisions
//! - Header names are stored lower-cased; lookups are case-insensitive
//! - The pathname is kept as received so captures preserve case
//! - The context is created with the request and never shared across requests

use std::collections::HashMap;
use std::sync::{Mutex, OnceLock, PoisonError};
use std::time::{Duration, Instant, SystemTime};

use axum::http::Method;
use serde_json::Value;
use uuid::Uuid;

use crate::dispatch::params::Params;

/// Request body as handed over by the host.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Json(Value),
    Text(String),
}

/// Pipeline phase an error is recorded against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    PreEvent,
    Main,
    PostEvent,
}

#[derive(Debug, Default)]
struct PhaseErrors {
    pre_event: Option<String>,
    main: Option<String>,
    post_event: Option<String>,
}

impl PhaseErrors {
    fn slot(&mut self, phase: Phase) -> &mut Option<String> {
        match phase {
            Phase::PreEvent => &mut self.pre_event,
            Phase::Main => &mut self.main,
            Phase::PostEvent => &mut self.post_event,
        }
    }
}

/// Transient per-request state.
#[derive(Debug)]
pub struct RequestContext {
    transaction_id: String,
    received_at: SystemTime,
    started: Instant,
    params: OnceLock<Params>,
    errors: Mutex<PhaseErrors>,
}

impl RequestContext {
    fn new(transaction_id: String) -> Self {
        Self {
            transaction_id,
            received_at: SystemTime::now(),
            started: Instant::now(),
            params: OnceLock::new(),
            errors: Mutex::new(PhaseErrors::default()),
        }
    }

    /// Stamp the start of dispatch. Keeps a host-supplied transaction id.
    pub(crate) fn begin(&mut self) {
        if self.transaction_id.is_empty() {
            self.transaction_id = Uuid::new_v4().to_string();
        }
        self.received_at = SystemTime::now();
        self.started = Instant::now();
    }

    pub fn transaction_id(&self) -> &str {
        &self.transaction_id
    }

    pub fn received_at(&self) -> SystemTime {
        self.received_at
    }

    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }

    /// Merged parameters, once PARAM_MERGE has run.
    pub fn params(&self) -> Option<&Params> {
        self.params.get()
    }

    /// Set once per request; later calls are ignored.
    pub(crate) fn set_params(&self, params: Params) {
        if self.params.set(params).is_err() {
            tracing::debug!("Parameters already merged for this request; ignoring");
        }
    }

    /// Error recorded for `phase`, if any.
    pub fn error(&self, phase: Phase) -> Option<String> {
        let mut errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        errors.slot(phase).clone()
    }

    /// Record an error. Only the first per phase is kept.
    pub(crate) fn record_error(&self, phase: Phase, message: impl Into<String>) {
        let mut errors = self.errors.lock().unwrap_or_else(PoisonError::into_inner);
        let slot = errors.slot(phase);
        if slot.is_none() {
            *slot = Some(message.into());
        }
    }
}

/// An inbound request.
#[derive(Debug)]
pub struct Request {
    method: Method,
    path: String,
    headers: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Option<RequestBody>,
    context: RequestContext,
}

impl Request {
    /// Build from a method and a request target (`/path?query`).
    pub fn new(method: Method, target: &str) -> Self {
        let (path, query) = match target.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (target, HashMap::new()),
        };

        Self {
            method,
            path: path.to_string(),
            headers: HashMap::new(),
            query,
            body: None,
            context: RequestContext::new(String::new()),
        }
    }

    /// Parse a method string case-insensitively.
    pub fn parse_method(method: &str) -> Option<Method> {
        Method::from_bytes(method.trim().to_ascii_uppercase().as_bytes()).ok()
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name.to_ascii_lowercase(), value.into());
        self
    }

    /// Merge extra query entries (hosts that parse the query themselves).
    pub fn with_query(mut self, query: HashMap<String, String>) -> Self {
        self.query.extend(query);
        self
    }

    pub fn with_json_body(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn with_text_body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn with_body(mut self, body: Option<RequestBody>) -> Self {
        self.body = body;
        self
    }

    /// Use a host-assigned transaction id instead of a generated one.
    pub fn with_transaction_id(mut self, id: impl Into<String>) -> Self {
        self.context.transaction_id = id.into();
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    pub fn headers(&self) -> &HashMap<String, String> {
        &self.headers
    }

    pub fn origin(&self) -> Option<&str> {
        self.header("origin")
    }

    pub fn referer(&self) -> Option<&str> {
        self.header("referer")
    }

    pub fn query(&self) -> &HashMap<String, String> {
        &self.query
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn context(&self) -> &RequestContext {
        &self.context
    }

    pub(crate) fn context_mut(&mut self) -> &mut RequestContext {
        &mut self.context
    }
}

/// Decode an `application/x-www-form-urlencoded` query string.
pub fn parse_query(query: &str) -> HashMap<String, String> {
    url::form_urlencoded::parse(query.as_bytes())
        .into_owned()
        .collect()
}
