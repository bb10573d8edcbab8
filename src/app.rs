//! Application instance: registration surface and dispatch entry point.
//!
//! # Lifecycle
//! ```text
//! Setup (single-threaded, &mut App):
//!     App::new / App::load
//!     → get/post/.../all, endpoint, use_middleware, use_config
//!     → set_pre_event / set_post_event / set_param_extractor
//!
//! Serving (shared, &App or Arc<App>):
//!     → dispatch(request, response) per inbound request
//!
//! Reset (single-threaded again, &mut App):
//!     → reset() clears endpoints, middleware, hooks; reloads config
//! ```
//!
//! Mutation requires exclusive access, so it cannot overlap in-flight
//! requests that hold a shared borrow.

use std::path::Path;
use std::sync::Arc;

use axum::http::Method;

use crate::config::{ConfigError, ConfigPatch, ConfigSource, DispatchConfig};
use crate::dispatch::handler::{noop_hook, BoxHandler, BoxHook};
use crate::dispatch::params::{ParamExtractor, QueryBodyExtractor};
use crate::dispatch::pipeline;
use crate::error::ConfigurationError;
use crate::http::request::Request;
use crate::http::response::Response;
use crate::routing::router::{EndpointSpec, Router, VerbFilter};
use crate::routing::template::PathTemplate;
use crate::security::cors::CorsPolicy;

/// Router, middleware, hooks and configuration for one service.
pub struct App {
    router: Router,
    middleware: Vec<BoxHandler>,
    pre_event: BoxHook,
    post_event: BoxHook,
    extractor: Arc<dyn ParamExtractor>,
    config: DispatchConfig,
    cors: CorsPolicy,
    source: ConfigSource,
}

impl App {
    /// Empty app with default configuration.
    pub fn new() -> Self {
        Self::with_config(DispatchConfig::default(), ConfigSource::Defaults)
    }

    /// Empty app using an already loaded configuration.
    pub fn with_config(config: DispatchConfig, source: ConfigSource) -> Self {
        let cors = CorsPolicy::from_headers(&config.headers);
        Self {
            router: Router::new(),
            middleware: Vec::new(),
            pre_event: noop_hook(),
            post_event: noop_hook(),
            extractor: Arc::new(QueryBodyExtractor),
            config,
            cors,
            source,
        }
    }

    /// Load configuration from `source`.
    pub fn from_source(source: ConfigSource) -> Result<Self, ConfigError> {
        let config = source.load()?;
        Ok(Self::with_config(config, source))
    }

    /// Load configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        Self::from_source(ConfigSource::File(path.to_path_buf()))
    }

    /// Register an endpoint from any supported call shape.
    pub fn endpoint(&mut self, verb: VerbFilter, spec: EndpointSpec) -> Result<&mut Self, ConfigurationError> {
        self.router.register(verb, spec)?;
        Ok(self)
    }

    fn route(
        &mut self,
        verb: VerbFilter,
        path: impl Into<PathTemplate>,
        next: BoxHandler,
    ) -> Result<&mut Self, ConfigurationError> {
        self.endpoint(verb, EndpointSpec::new().path(path).next(next))
    }

    pub fn get(&mut self, path: impl Into<PathTemplate>, next: BoxHandler) -> Result<&mut Self, ConfigurationError> {
        self.route(VerbFilter::Only(Method::GET), path, next)
    }

    pub fn post(&mut self, path: impl Into<PathTemplate>, next: BoxHandler) -> Result<&mut Self, ConfigurationError> {
        self.route(VerbFilter::Only(Method::POST), path, next)
    }

    pub fn put(&mut self, path: impl Into<PathTemplate>, next: BoxHandler) -> Result<&mut Self, ConfigurationError> {
        self.route(VerbFilter::Only(Method::PUT), path, next)
    }

    pub fn delete(&mut self, path: impl Into<PathTemplate>, next: BoxHandler) -> Result<&mut Self, ConfigurationError> {
        self.route(VerbFilter::Only(Method::DELETE), path, next)
    }

    /// HEAD requests short-circuit before routing; kept for surface parity.
    pub fn head(&mut self, path: impl Into<PathTemplate>, next: BoxHandler) -> Result<&mut Self, ConfigurationError> {
        self.route(VerbFilter::Only(Method::HEAD), path, next)
    }

    /// OPTIONS requests short-circuit before routing; kept for surface parity.
    pub fn options(&mut self, path: impl Into<PathTemplate>, next: BoxHandler) -> Result<&mut Self, ConfigurationError> {
        self.route(VerbFilter::Only(Method::OPTIONS), path, next)
    }

    /// Match any verb.
    pub fn all(&mut self, path: impl Into<PathTemplate>, next: BoxHandler) -> Result<&mut Self, ConfigurationError> {
        self.route(VerbFilter::Any, path, next)
    }

    /// Append to the global middleware chain run before every endpoint.
    pub fn use_middleware(&mut self, middleware: BoxHandler) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Merge headers and parameter mode into the live configuration.
    pub fn use_config(&mut self, patch: ConfigPatch) -> &mut Self {
        self.config.merge(patch);
        self.cors = CorsPolicy::from_headers(&self.config.headers);
        self
    }

    pub fn set_pre_event(&mut self, hook: BoxHook) -> &mut Self {
        self.pre_event = hook;
        self
    }

    pub fn set_post_event(&mut self, hook: BoxHook) -> &mut Self {
        self.post_event = hook;
        self
    }

    /// Replace the body/query parameter collaborator.
    pub fn set_param_extractor(&mut self, extractor: impl ParamExtractor) -> &mut Self {
        self.extractor = Arc::new(extractor);
        self
    }

    /// Clear endpoints, middleware and hooks, then reload configuration.
    ///
    /// On a reload error the registrations are still cleared and the previous
    /// configuration stays in place.
    pub fn reset(&mut self) -> Result<(), ConfigError> {
        self.router.clear();
        self.middleware.clear();
        self.pre_event = noop_hook();
        self.post_event = noop_hook();
        self.extractor = Arc::new(QueryBodyExtractor);

        let config = self.source.load()?;
        self.cors = CorsPolicy::from_headers(&config.headers);
        self.config = config;
        tracing::info!(source = ?self.source, "App reset");
        Ok(())
    }

    /// Run the dispatch pipeline for one request. Never fails; every outcome
    /// is written to `response`.
    pub async fn dispatch(&self, request: Request, response: Response) {
        pipeline::run(self, request, response).await
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    pub fn cors_policy(&self) -> &CorsPolicy {
        &self.cors
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub(crate) fn middleware(&self) -> &[BoxHandler] {
        &self.middleware
    }

    pub(crate) fn pre_event(&self) -> &BoxHook {
        &self.pre_event
    }

    pub(crate) fn post_event(&self) -> &BoxHook {
        &self.post_event
    }

    pub(crate) fn param_extractor(&self) -> &dyn ParamExtractor {
        self.extractor.as_ref()
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for App {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("App")
            .field("router", &self.router)
            .field("middleware", &self.middleware.len())
            .field("config", &self.config)
            .field("source", &self.source)
            .finish()
    }
}
