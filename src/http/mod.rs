//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Host (Axum server or serverless event)
//!     → request.rs (host-neutral Request + RequestContext)
//!     → response.rs (Response handle over the host's write primitive)
//!     → [dispatch pipeline]
//!     → ResponseParts written once to the host
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{Phase, Request, RequestBody, RequestContext};
pub use response::{Response, ResponseParts, ResponseSink};
pub use server::{HttpServer, X_REQUEST_ID};
