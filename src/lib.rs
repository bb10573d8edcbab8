//! Minimal HTTP dispatch layer.
//!
//! Compiles path templates, resolves requests to the most specific
//! endpoint, enforces a two-tier CORS policy and runs a failure-contained
//! pipeline of pre-event, middleware, handler and post-event stages. The
//! same [`App`] can sit behind the Axum [`HttpServer`] or be driven one
//! event at a time through [`serverless::invoke`].

pub mod app;
pub mod config;
pub mod demo;
pub mod dispatch;
pub mod error;
pub mod http;
pub mod observability;
pub mod routing;
pub mod security;
pub mod serverless;

pub use app::App;
pub use config::{ConfigPatch, DispatchConfig};
pub use dispatch::{handler_fn, hook_fn, Params, ParamsMode};
pub use error::{ConfigurationError, DispatchError};
pub use http::{HttpServer, Request, Response};
pub use routing::{EndpointSpec, VerbFilter};
