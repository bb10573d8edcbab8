//! Two-tier CORS policy.
//!
//! # Responsibilities
//! - Build a policy from the configured response headers
//! - Evaluate origin/referer/method of a request against it
//!
//! # Design Decisions
//! - Empty origin and method sets mean "not configured": the same-origin
//!   fallback applies and only GET/HEAD/OPTIONS/POST are allowed
//! - A configured `*` origin disables origin checks
//! - GET and HEAD are always allowed once a method list is configured
//! - Absent `origin`/`referer` headers are treated as empty strings
//! - Fail closed: any failed step rejects with 403

use std::collections::{BTreeMap, HashSet};

use axum::http::Method;
use thiserror::Error;

pub const ALLOW_ORIGIN: &str = "Access-Control-Allow-Origin";
pub const ALLOW_METHODS: &str = "Access-Control-Allow-Methods";

const DEFAULT_METHODS: [Method; 4] = [Method::GET, Method::HEAD, Method::OPTIONS, Method::POST];

/// Why a request was refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CorsRejection {
    #[error("Forbidden - CORS issue. Origin '{origin}' is not allowed.")]
    SameOriginViolation { origin: String },

    #[error("Forbidden - CORS issue. Method '{method}' is not allowed.")]
    MethodNotAllowedByDefault { method: String },

    #[error("Forbidden - CORS issue. Origin '{origin}' is not allowed.")]
    OriginNotAllowed { origin: String },

    #[error("Forbidden - CORS issue. Method '{method}' is not allowed.")]
    MethodNotAllowed { method: String },
}

/// Compiled CORS policy plus the headers every response must carry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CorsPolicy {
    allowed_origins: HashSet<String>,
    allowed_methods: HashSet<String>,
    required_response_headers: Vec<(String, String)>,
}

impl CorsPolicy {
    /// Derive the policy from configured headers (keys matched case-insensitively).
    pub fn from_headers(headers: &BTreeMap<String, String>) -> Self {
        let mut policy = CorsPolicy::default();
        for (key, value) in headers {
            if key.eq_ignore_ascii_case(ALLOW_ORIGIN) {
                policy.allowed_origins = split_list(value).map(|o| normalize_origin(&o)).collect();
            } else if key.eq_ignore_ascii_case(ALLOW_METHODS) {
                policy.allowed_methods = split_list(value).map(|m| m.to_ascii_uppercase()).collect();
            }
            policy.required_response_headers.push((key.clone(), value.clone()));
        }
        policy
    }

    pub fn is_configured(&self) -> bool {
        !self.allowed_origins.is_empty() || !self.allowed_methods.is_empty()
    }

    pub fn allowed_origins(&self) -> &HashSet<String> {
        &self.allowed_origins
    }

    pub fn allowed_methods(&self) -> &HashSet<String> {
        &self.allowed_methods
    }

    /// Headers applied to every response before user code runs.
    pub fn required_response_headers(&self) -> &[(String, String)] {
        &self.required_response_headers
    }

    /// Check one request.
    pub fn evaluate(
        &self,
        origin: Option<&str>,
        referer: Option<&str>,
        method: &Method,
    ) -> Result<(), CorsRejection> {
        let origin = origin.unwrap_or_default();

        if !self.is_configured() {
            let referer = referer.unwrap_or_default().to_lowercase();
            if !referer.starts_with(&origin.to_lowercase()) {
                return Err(CorsRejection::SameOriginViolation {
                    origin: origin.to_string(),
                });
            }
            if !DEFAULT_METHODS.contains(method) {
                return Err(CorsRejection::MethodNotAllowedByDefault {
                    method: method.to_string(),
                });
            }
        }

        if !self.allowed_origins.is_empty()
            && !self.allowed_origins.contains("*")
            && !self.allowed_origins.contains(&normalize_origin(origin))
        {
            return Err(CorsRejection::OriginNotAllowed {
                origin: origin.to_string(),
            });
        }

        if !self.allowed_methods.is_empty()
            && *method != Method::GET
            && *method != Method::HEAD
            && !self.allowed_methods.contains(method.as_str())
        {
            return Err(CorsRejection::MethodNotAllowed {
                method: method.to_string(),
            });
        }

        Ok(())
    }
}

fn split_list(value: &str) -> impl Iterator<Item = String> + '_ {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn normalize_origin(origin: &str) -> String {
    origin.trim().trim_end_matches('/').to_lowercase()
}
