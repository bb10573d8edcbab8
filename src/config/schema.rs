//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::dispatch::params::ParamsMode;

/// Root configuration consumed by the dispatch layer.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct DispatchConfig {
    /// Required response headers. The CORS keys also define the policy.
    pub headers: BTreeMap<String, String>,

    /// Which sources feed the handler parameters.
    #[serde(alias = "paramsMode")]
    pub params_mode: ParamsMode,

    /// Free-form environment values, exposed to handlers.
    pub env: Map<String, Value>,

    /// Listener settings (server host only).
    pub listener: ListenerConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:3000").
    pub bind_address: String,

    /// Maximum request body size read by the server host.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:3000".to_string(),
            max_body_bytes: 2 * 1024 * 1024,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub log_filter: String,

    /// Expose Prometheus metrics.
    pub metrics_enabled: bool,

    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_filter: "http_dispatch=info,tower_http=info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9100".to_string(),
        }
    }
}

/// Partial configuration merged in through `App::use_config`.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ConfigPatch {
    pub headers: BTreeMap<String, String>,
    #[serde(alias = "paramsMode")]
    pub params_mode: Option<ParamsMode>,
}

impl ConfigPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn params_mode(mut self, mode: ParamsMode) -> Self {
        self.params_mode = Some(mode);
        self
    }
}

impl DispatchConfig {
    /// Merge a patch. Header names replace existing ones case-insensitively.
    pub fn merge(&mut self, patch: ConfigPatch) {
        for (name, value) in patch.headers {
            self.headers.retain(|k, _| !k.eq_ignore_ascii_case(&name));
            self.headers.insert(name, value);
        }
        if let Some(mode) = patch.params_mode {
            self.params_mode = mode;
        }
    }
}
