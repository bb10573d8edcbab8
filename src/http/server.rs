//! HTTP server host adapter.
//!
//! # Responsibilities
//! - Create an Axum router whose fallback hands every request to the app
//! - Wire up middleware (tracing, request ID)
//! - Convert between Axum requests/responses and the host-neutral types
//! - Bind server to listener and shut down gracefully
//!
//! # Design Decisions
//! - The pipeline runs in its own task: a client disconnect drops the Axum
//!   handler future but never cancels POST_EVENT
//! - The `x-request-id` assigned by tower-http becomes the transaction id
//! - Bodies are read fully (discrete exchange), up to `max_body_bytes`

use std::future::Future;
use std::sync::Arc;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response as AxumResponse},
    Router,
};
use serde_json::Value;
use tokio::net::TcpListener;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::app::App;
use crate::http::request::{Request, RequestBody};
use crate::http::response::{Response, ResponseParts};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Application state injected into the fallback handler.
#[derive(Clone)]
struct ServerState {
    app: Arc<App>,
    max_body_bytes: usize,
}

/// Always-running HTTP host for an [`App`].
pub struct HttpServer {
    router: Router,
    app: Arc<App>,
}

impl HttpServer {
    /// Create a server for a fully configured app.
    pub fn new(app: Arc<App>) -> Self {
        let state = ServerState {
            app: Arc::clone(&app),
            max_body_bytes: app.config().listener.max_body_bytes,
        };
        Self {
            router: Self::build_router(state),
            app,
        }
    }

    fn build_router(state: ServerState) -> Router {
        Router::new()
            .fallback(dispatch_handler)
            .with_state(state)
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The Axum router, for embedding or in-process testing.
    pub fn into_router(self) -> Router {
        self.router
    }

    pub fn app(&self) -> &Arc<App> {
        &self.app
    }

    /// Serve on `listener` until `shutdown` resolves.
    pub async fn run<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            endpoints = self.app.router().len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn dispatch_handler(State(state): State<ServerState>, request: axum::extract::Request) -> AxumResponse {
    let (parts, body) = request.into_parts();
    let bytes = match axum::body::to_bytes(body, state.max_body_bytes).await {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::warn!(error = %e, "Failed to read request body");
            return (StatusCode::PAYLOAD_TOO_LARGE, "Request body too large or unreadable").into_response();
        }
    };

    let target = parts
        .uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| parts.uri.path());

    let mut request = Request::new(parts.method.clone(), target).with_body(parse_body(&bytes));
    for (name, value) in parts.headers.iter() {
        if let Ok(value) = value.to_str() {
            request = request.with_header(name.as_str(), value);
        }
    }
    if let Some(id) = parts.headers.get(X_REQUEST_ID).and_then(|v| v.to_str().ok()) {
        request = request.with_transaction_id(id);
    }

    let (response, written) = Response::channel();
    let app = Arc::clone(&state.app);
    tokio::spawn(async move {
        app.dispatch(request, response).await;
    });

    match written.await {
        Ok(parts) => into_axum(parts),
        Err(_) => {
            tracing::error!("Dispatch task ended without a response");
            (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
        }
    }
}

/// JSON when it parses, text otherwise. Empty bodies are absent.
fn parse_body(bytes: &Bytes) -> Option<RequestBody> {
    if bytes.is_empty() {
        return None;
    }
    let text = String::from_utf8_lossy(bytes).into_owned();
    match serde_json::from_str::<Value>(&text) {
        Ok(value) => Some(RequestBody::Json(value)),
        Err(_) => Some(RequestBody::Text(text)),
    }
}

fn into_axum(parts: ResponseParts) -> AxumResponse {
    let mut response = AxumResponse::new(Body::from(parts.body));
    *response.status_mut() = parts.status;

    let headers = response.headers_mut();
    for (name, value) in &parts.headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.insert(name, value);
            }
            _ => tracing::warn!(header = %name, "Dropping invalid response header"),
        }
    }
    response
}
