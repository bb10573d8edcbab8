//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Registration (setup phase):
//!     PathTemplate (one or many)
//!     → template.rs (compile to RouteDescriptor[])
//!     → router.rs (validate, append Endpoint)
//!
//! Incoming Request (pathname, method):
//!     → router.rs (verb filter, best descriptor per endpoint)
//!     → matcher.rs (segment-by-segment comparison)
//!     → Return: Resolved endpoint + parameters, or RouteNotFound
//! ```
//!
//! # Design Decisions
//! - Templates compiled at registration, immutable while serving
//! - No regex in hot path
//! - Deterministic: same input always matches same endpoint
//! - Most specific wins, earliest registration breaks ties

pub mod matcher;
pub mod router;
pub mod template;

pub use matcher::MatchResult;
pub use router::{Endpoint, EndpointSpec, Resolved, Router, VerbFilter};
pub use template::{PathTemplate, RouteDescriptor, Segment};
