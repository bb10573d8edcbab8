//! Endpoint storage and resolution.
//!
//! # Responsibilities
//! - Normalize registration shapes into canonical `Endpoint` records
//! - Store endpoints in registration order
//! - Resolve (pathname, method) to the single most specific endpoint
//!
//! # Design Decisions
//! - Immutable while serving (mutation needs `&mut Router`)
//! - O(endpoints × descriptors) scan; typical endpoint counts are small
//! - Ties resolve to the earliest registration, both across endpoints and
//!   across the alternatives of one endpoint
//! - Explicit `RouteNotFound` rather than a silent default

use axum::http::Method;

use crate::dispatch::handler::BoxHandler;
use crate::error::{ConfigurationError, DispatchError};
use crate::routing::matcher::{match_path, segments, MatchResult};
use crate::routing::template::{PathTemplate, RouteDescriptor};

/// Which request methods an endpoint answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerbFilter {
    /// Registered through `all`.
    Any,
    Only(Method),
}

impl VerbFilter {
    pub fn accepts(&self, method: &Method) -> bool {
        match self {
            VerbFilter::Any => true,
            VerbFilter::Only(expected) => expected == method,
        }
    }
}

impl From<Method> for VerbFilter {
    fn from(method: Method) -> Self {
        VerbFilter::Only(method)
    }
}

/// Registration arguments before validation.
///
/// Covers every call shape: `(path, handler, next)`, `(handler, next)`,
/// `(path, next)` and `(next)`. Omitted paths default to `/`.
#[derive(Clone, Default)]
pub struct EndpointSpec {
    path: PathTemplate,
    handler: Option<BoxHandler>,
    next: Option<BoxHandler>,
}

impl EndpointSpec {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path(mut self, path: impl Into<PathTemplate>) -> Self {
        self.path = path.into();
        self
    }

    /// Endpoint-level middleware, run before `next`.
    pub fn handler(mut self, handler: BoxHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Terminal handler. Required.
    pub fn next(mut self, next: BoxHandler) -> Self {
        self.next = Some(next);
        self
    }
}

impl std::fmt::Debug for EndpointSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EndpointSpec")
            .field("path", &self.path)
            .field("handler", &self.handler.is_some())
            .field("next", &self.next.is_some())
            .finish()
    }
}

/// A registered (path-set, verb, handler chain) unit.
#[derive(Clone)]
pub struct Endpoint {
    pub descriptors: Vec<RouteDescriptor>,
    pub verb: VerbFilter,
    pub handler: Option<BoxHandler>,
    pub next: BoxHandler,
}

impl Endpoint {
    /// Validate a spec. Nothing is registered when this fails.
    pub fn from_spec(verb: VerbFilter, spec: EndpointSpec) -> Result<Self, ConfigurationError> {
        let next = spec.next.ok_or(ConfigurationError::MissingNext)?;
        let descriptors = spec.path.compile()?;

        Ok(Self {
            descriptors,
            verb,
            handler: spec.handler,
            next,
        })
    }

    /// Best descriptor match for this endpoint. First registered wins ties.
    fn best_match(&self, path: &[&str]) -> Option<MatchResult> {
        let mut best: Option<MatchResult> = None;
        for descriptor in &self.descriptors {
            if let Some(m) = match_path(path, descriptor) {
                if best.as_ref().map_or(true, |b| m.specificity > b.specificity) {
                    best = Some(m);
                }
            }
        }
        best
    }
}

impl std::fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let templates: Vec<_> = self.descriptors.iter().map(|d| d.template()).collect();
        f.debug_struct("Endpoint")
            .field("templates", &templates)
            .field("verb", &self.verb)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// Winning endpoint plus the captured route parameters.
#[derive(Debug)]
pub struct Resolved<'a> {
    pub endpoint: &'a Endpoint,
    pub matched: MatchResult,
}

/// Ordered endpoint registry.
#[derive(Debug, Default, Clone)]
pub struct Router {
    endpoints: Vec<Endpoint>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate and append.
    pub fn register(&mut self, verb: VerbFilter, spec: EndpointSpec) -> Result<(), ConfigurationError> {
        let endpoint = Endpoint::from_spec(verb, spec)?;
        tracing::debug!(endpoint = ?endpoint, "Endpoint registered");
        self.endpoints.push(endpoint);
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn clear(&mut self) {
        self.endpoints.clear();
    }

    /// Select the most specific endpoint for a request.
    pub fn resolve(&self, pathname: &str, method: &Method) -> Result<Resolved<'_>, DispatchError> {
        let path = segments(pathname);
        let mut winner: Option<Resolved<'_>> = None;

        for endpoint in &self.endpoints {
            if !endpoint.verb.accepts(method) {
                continue;
            }
            let Some(matched) = endpoint.best_match(&path) else {
                continue;
            };
            let better = winner
                .as_ref()
                .map_or(true, |w| matched.specificity > w.matched.specificity);
            if better {
                winner = Some(Resolved { endpoint, matched });
            }
        }

        winner.ok_or_else(|| DispatchError::RouteNotFound {
            path: pathname.to_string(),
            method: method.to_string(),
        })
    }
}
