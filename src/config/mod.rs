//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DispatchConfig (validated)
//!     → owned by App; CorsPolicy derived from its headers
//!
//! During setup:
//!     App::use_config(ConfigPatch) merges headers / params mode
//!     App::reset() reloads from the recorded ConfigSource
//! ```
//!
//! # Design Decisions
//! - Config changes only during setup; it is read-only while serving
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError, ConfigSource};
pub use schema::{ConfigPatch, DispatchConfig, ListenerConfig, ObservabilityConfig};
