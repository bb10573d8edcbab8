//! Error taxonomy for registration and dispatch.
//!
//! Setup-time problems surface as [`ConfigurationError`] from the registration
//! call itself. Everything that can go wrong while serving a request is a
//! [`DispatchError`], which always resolves to exactly one HTTP response.

use axum::http::StatusCode;
use thiserror::Error;

use crate::security::cors::CorsRejection;

/// Malformed registration arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigurationError {
    /// The terminal handler was not supplied.
    #[error("Missing required 'next' handler. Expected a function with shape (req,res,params)")]
    MissingNext,

    /// Path was an empty string, an empty list, or a list holding an empty string.
    #[error("Invalid path: expected a non-empty string or a non-empty list of non-empty strings")]
    EmptyPath,

    /// A `{}` segment with no parameter name.
    #[error("Invalid route template '{template}': capture segment has no name")]
    EmptyCaptureName { template: String },
}

/// Per-request failures. `Display` is the plain-text body sent to the client.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Cors(#[from] CorsRejection),

    #[error("Endpoint '{path}' for method {method} not found.")]
    RouteNotFound { path: String, method: String },

    #[error("Internal Server Error - Pre Processing error: {0}")]
    PreEvent(String),

    #[error("Internal Server Error - Processing error: {0}")]
    Processing(String),

    #[error("Internal Server Error - Post Processing error: {0}")]
    PostEvent(String),
}

impl DispatchError {
    /// HTTP status the error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            DispatchError::Cors(_) => StatusCode::FORBIDDEN,
            DispatchError::RouteNotFound { .. } => StatusCode::NOT_FOUND,
            DispatchError::PreEvent(_)
            | DispatchError::Processing(_)
            | DispatchError::PostEvent(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Client errors are logged at `warn`, server errors at `error`.
    pub fn is_server_error(&self) -> bool {
        self.status().is_server_error()
    }
}
