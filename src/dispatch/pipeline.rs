//! Per-request dispatch pipeline.
//!
//! # Stages
//! ```text
//! INIT → PRE_EVENT → CORS_CHECK → METHOD_SHORT_CIRCUIT → ROUTE_RESOLVE
//!      → PARAM_MERGE → MIDDLEWARE_CHAIN → ENDPOINT_HANDLER → ENDPOINT_NEXT
//!      → POST_EVENT → DONE
//! ```
//!
//! The stage order lives in [`Stage::ORDER`] and the driver loop walks it.
//! Once any stage responds or fails, every remaining stage is skipped except
//! POST_EVENT, which runs exactly once per request.
//!
//! # Invariants
//! - At most one write from the pipeline; every framework write checks
//!   `headers_sent` first
//! - If nothing wrote a response by DONE, the buffered status is flushed with
//!   an empty body, so each request ends with exactly one write
//! - Failures never escape: `run` always completes, and a panic in user
//!   code is contained and reported as that stage's error

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::http::{header, Method, StatusCode};
use futures_util::FutureExt;
use tower::BoxError;
use tracing::Instrument;

use crate::app::App;
use crate::dispatch::params::{self, Params};
use crate::error::DispatchError;
use crate::http::request::{Phase, Request};
use crate::http::response::Response;
use crate::observability::metrics;
use crate::routing::router::Resolved;

/// One sequential phase of request processing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    PreEvent,
    CorsCheck,
    MethodShortCircuit,
    RouteResolve,
    ParamMerge,
    MiddlewareChain,
    EndpointHandler,
    EndpointNext,
    PostEvent,
}

impl Stage {
    pub const ORDER: [Stage; 9] = [
        Stage::PreEvent,
        Stage::CorsCheck,
        Stage::MethodShortCircuit,
        Stage::RouteResolve,
        Stage::ParamMerge,
        Stage::MiddlewareChain,
        Stage::EndpointHandler,
        Stage::EndpointNext,
        Stage::PostEvent,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Stage::PreEvent => "pre_event",
            Stage::CorsCheck => "cors_check",
            Stage::MethodShortCircuit => "method_short_circuit",
            Stage::RouteResolve => "route_resolve",
            Stage::ParamMerge => "param_merge",
            Stage::MiddlewareChain => "middleware_chain",
            Stage::EndpointHandler => "endpoint_handler",
            Stage::EndpointNext => "endpoint_next",
            Stage::PostEvent => "post_event",
        }
    }

    pub fn phase(self) -> Phase {
        match self {
            Stage::PreEvent => Phase::PreEvent,
            Stage::PostEvent => Phase::PostEvent,
            _ => Phase::Main,
        }
    }

    /// Runs even after an earlier stage responded or failed.
    pub fn always_runs(self) -> bool {
        self == Stage::PostEvent
    }
}

enum Outcome {
    Continue,
    /// Framework response with an empty body.
    Respond(StatusCode),
    /// User code already wrote the response.
    Sent,
    Fail(DispatchError),
}

struct Run<'a> {
    app: &'a App,
    request: Arc<Request>,
    response: Response,
    resolved: Option<Resolved<'a>>,
    params: Params,
}

/// Drive one request through every applicable stage.
pub async fn run(app: &App, mut request: Request, response: Response) {
    request.context_mut().begin();
    let span = tracing::info_span!(
        "dispatch",
        transaction_id = %request.context().transaction_id(),
        method = %request.method(),
        path = %request.path(),
    );

    async move {
        for (name, value) in app.cors_policy().required_response_headers() {
            response.set_header(name, value.as_str());
        }

        let mut run = Run {
            app,
            request: Arc::new(request),
            response,
            resolved: None,
            params: Params::new(),
        };

        let mut skipping = false;
        for stage in Stage::ORDER {
            if skipping && !stage.always_runs() {
                tracing::trace!(stage = stage.name(), "Stage skipped");
                continue;
            }
            match run.stage(stage).await {
                Outcome::Continue => {}
                Outcome::Respond(status) => {
                    run.write(status, String::new());
                    skipping = true;
                }
                Outcome::Sent => skipping = true,
                Outcome::Fail(err) => {
                    run.fail(stage, err);
                    skipping = true;
                }
            }
        }

        run.finish();
    }
    .instrument(span)
    .await
}

impl<'a> Run<'a> {
    async fn stage(&mut self, stage: Stage) -> Outcome {
        match stage {
            Stage::PreEvent => self.pre_event().await,
            Stage::CorsCheck => self.cors_check(),
            Stage::MethodShortCircuit => self.method_short_circuit(),
            Stage::RouteResolve => self.route_resolve(),
            Stage::ParamMerge => self.param_merge().await,
            Stage::MiddlewareChain => self.middleware_chain().await,
            Stage::EndpointHandler => self.endpoint_handler().await,
            Stage::EndpointNext => self.endpoint_next().await,
            Stage::PostEvent => self.post_event().await,
        }
    }

    async fn pre_event(&self) -> Outcome {
        let hook = self.app.pre_event();
        match contain(hook.call(Arc::clone(&self.request), self.response.clone())).await {
            Ok(()) => Outcome::Continue,
            Err(e) => Outcome::Fail(DispatchError::PreEvent(e)),
        }
    }

    fn cors_check(&self) -> Outcome {
        let req = &self.request;
        match self
            .app
            .cors_policy()
            .evaluate(req.origin(), req.referer(), req.method())
        {
            Ok(()) => Outcome::Continue,
            Err(rejection) => Outcome::Fail(rejection.into()),
        }
    }

    fn method_short_circuit(&self) -> Outcome {
        let method = self.request.method();
        if *method == Method::HEAD || *method == Method::OPTIONS {
            Outcome::Respond(StatusCode::OK)
        } else {
            Outcome::Continue
        }
    }

    fn route_resolve(&mut self) -> Outcome {
        match self
            .app
            .router()
            .resolve(self.request.path(), self.request.method())
        {
            Ok(resolved) => {
                tracing::debug!(endpoint = ?resolved.endpoint, "Endpoint resolved");
                self.resolved = Some(resolved);
                Outcome::Continue
            }
            Err(err) => Outcome::Fail(err),
        }
    }

    async fn param_merge(&mut self) -> Outcome {
        let mode = self.app.config().params_mode;
        let extracted = if mode.includes_body() {
            match contain(self.app.param_extractor().extract(&self.request)).await {
                Ok(params) => params,
                Err(e) => return Outcome::Fail(DispatchError::Processing(e)),
            }
        } else {
            Params::new()
        };

        let route = self
            .resolved
            .as_ref()
            .map(|r| r.matched.parameters.clone())
            .unwrap_or_default();
        self.params = params::merge(mode, &route, extracted);
        self.request.context().set_params(self.params.clone());
        Outcome::Continue
    }

    async fn middleware_chain(&self) -> Outcome {
        for middleware in self.app.middleware() {
            let result = contain(middleware.call(
                Arc::clone(&self.request),
                self.response.clone(),
                self.params.clone(),
            ))
            .await;
            if let Err(e) = result {
                return Outcome::Fail(DispatchError::Processing(e));
            }
            if self.response.headers_sent() {
                return Outcome::Sent;
            }
        }
        Outcome::Continue
    }

    async fn endpoint_handler(&self) -> Outcome {
        let Some(handler) = self.resolved.as_ref().and_then(|r| r.endpoint.handler.as_ref()) else {
            return Outcome::Continue;
        };
        match contain(handler.call(Arc::clone(&self.request), self.response.clone(), self.params.clone())).await {
            Err(e) => Outcome::Fail(DispatchError::Processing(e)),
            Ok(()) if self.response.headers_sent() => Outcome::Sent,
            Ok(()) => Outcome::Continue,
        }
    }

    async fn endpoint_next(&self) -> Outcome {
        let Some(resolved) = self.resolved.as_ref() else {
            return Outcome::Continue;
        };
        let next = &resolved.endpoint.next;
        match contain(next.call(Arc::clone(&self.request), self.response.clone(), self.params.clone())).await {
            Ok(()) => Outcome::Continue,
            Err(e) => Outcome::Fail(DispatchError::Processing(e)),
        }
    }

    async fn post_event(&self) -> Outcome {
        let hook = self.app.post_event();
        match contain(hook.call(Arc::clone(&self.request), self.response.clone())).await {
            Ok(()) => Outcome::Continue,
            Err(e) => Outcome::Fail(DispatchError::PostEvent(e)),
        }
    }

    fn write(&self, status: StatusCode, body: String) {
        if self.response.headers_sent() {
            tracing::debug!(status = %status, "Response already sent; framework write skipped");
            return;
        }
        self.response.status(status).send(body);
    }

    fn fail(&self, stage: Stage, err: DispatchError) {
        if err.is_server_error() {
            tracing::error!(stage = stage.name(), error = %err, detail = ?err, "Stage failed");
        } else {
            tracing::warn!(stage = stage.name(), status = %err.status(), error = %err, "Request rejected");
        }
        metrics::record_stage_failure(stage.name());
        self.request.context().record_error(stage.phase(), err.to_string());

        if !self.response.headers_sent() {
            self.response
                .set_header(header::CONTENT_TYPE.as_str(), "text/plain; charset=utf-8");
        }
        self.write(err.status(), err.to_string());
    }

    fn finish(&self) {
        if !self.response.headers_sent() {
            tracing::debug!("No stage wrote a response; flushing empty body");
            self.response.send(String::new());
        }

        let ctx = self.request.context();
        let status = self.response.status_code();
        metrics::record_dispatch(self.request.method().as_str(), status.as_u16(), ctx.elapsed());
        tracing::info!(
            status = status.as_u16(),
            elapsed_ms = ctx.elapsed().as_millis() as u64,
            "Request completed"
        );
    }
}

/// Await user code. Errors and panics both become the stage's message.
async fn contain<T, F>(fut: F) -> Result<T, String>
where
    F: Future<Output = Result<T, BoxError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(result) => result.map_err(|e| e.to_string()),
        Err(payload) => Err(panic_message(payload.as_ref())),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    let detail = payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str));
    match detail {
        Some(detail) => format!("panicked: {detail}"),
        None => "panicked".to_string(),
    }
}
