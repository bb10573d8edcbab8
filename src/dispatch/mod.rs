//! Request dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Host adapter (server / serverless)
//!     → App::dispatch(Request, Response)
//!     → pipeline.rs (stage table + driver loop)
//!         → pre-event hook
//!         → security::cors (policy check)
//!         → routing::router (resolve endpoint)
//!         → params.rs (extract + merge parameters)
//!         → handler.rs (global middleware, endpoint handler, next)
//!         → post-event hook
//!     → exactly one write through the response sink
//! ```
//!
//! # Design Decisions
//! - Stages run strictly in sequence; no fan-out inside one request
//! - No cancellation: a started pipeline runs every applicable stage
//! - Per-request failures are contained and mapped to a response

pub mod handler;
pub mod params;
pub mod pipeline;

pub use handler::{handler_fn, hook_fn, BoxHandler, BoxHook, Handler, HandlerResult, Hook};
pub use params::{ParamExtractor, Params, ParamsMode, QueryBodyExtractor};
pub use pipeline::Stage;
