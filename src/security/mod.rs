//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Configured headers
//!     → cors.rs (CorsPolicy: allowed origins, allowed methods, required headers)
//!
//! Incoming request (origin, referer, method):
//!     → cors.rs (evaluate)
//!     → allow, or CorsRejection (403)
//! ```
//!
//! # Design Decisions
//! - Fail closed: reject on any failed check
//! - Same-origin fallback when no explicit policy exists
//! - No trust in client input

pub mod cors;

pub use cors::{CorsPolicy, CorsRejection};
