//! Request parameters.
//!
//! # Responsibilities
//! - Hold the merged parameter map handed to handlers
//! - Define which sources feed it (`ParamsMode`)
//! - Extract query-string and body parameters (`ParamExtractor`)
//!
//! # Design Decisions
//! - Route captures always override body/query values with the same name
//! - Body values override query values with the same name
//! - Body values keep their JSON type; query and route values are strings

use std::collections::HashMap;
use std::fmt;

use futures_util::future::BoxFuture;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tower::BoxError;

use crate::http::request::{Request, RequestBody};

/// Merged parameter map.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(Map<String, Value>);

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value for `key`, if present and a JSON string.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    /// Overwrite entries with those from `other`.
    pub fn extend(&mut self, other: Params) {
        self.0.extend(other.0);
    }

    pub fn into_inner(self) -> Map<String, Value> {
        self.0
    }
}

impl From<Map<String, Value>> for Params {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

impl From<HashMap<String, String>> for Params {
    fn from(map: HashMap<String, String>) -> Self {
        Self(map.into_iter().map(|(k, v)| (k, Value::String(v))).collect())
    }
}

/// Which sources contribute to `Params`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum ParamsMode {
    #[default]
    All,
    Body,
    Route,
    None,
}

impl ParamsMode {
    pub fn includes_body(self) -> bool {
        matches!(self, ParamsMode::All | ParamsMode::Body)
    }

    pub fn includes_route(self) -> bool {
        matches!(self, ParamsMode::All | ParamsMode::Route)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ParamsMode::All => "all",
            ParamsMode::Body => "body",
            ParamsMode::Route => "route",
            ParamsMode::None => "none",
        }
    }
}

/// Unrecognized values fall back to `All`.
impl From<&str> for ParamsMode {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "body" => ParamsMode::Body,
            "route" => ParamsMode::Route,
            "none" => ParamsMode::None,
            _ => ParamsMode::All,
        }
    }
}

impl From<String> for ParamsMode {
    fn from(value: String) -> Self {
        ParamsMode::from(value.as_str())
    }
}

impl From<ParamsMode> for String {
    fn from(mode: ParamsMode) -> Self {
        mode.as_str().to_string()
    }
}

impl fmt::Display for ParamsMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source of body- and query-derived parameters.
pub trait ParamExtractor: Send + Sync + 'static {
    fn extract<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<Params, BoxError>>;
}

/// Reads a JSON object body, then overlays the parsed query map.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryBodyExtractor;

impl ParamExtractor for QueryBodyExtractor {
    fn extract<'a>(&'a self, req: &'a Request) -> BoxFuture<'a, Result<Params, BoxError>> {
        Box::pin(async move {
            let mut params = match req.body() {
                Some(RequestBody::Json(Value::Object(fields))) => Params::from(fields.clone()),
                // Non-JSON text bodies carry no named parameters.
                Some(RequestBody::Text(text)) => match serde_json::from_str::<Value>(text) {
                    Ok(Value::Object(fields)) => Params::from(fields),
                    _ => Params::new(),
                },
                _ => Params::new(),
            };

            // Query string wins over body on collision.
            params.extend(Params::from(req.query().clone()));
            Ok(params)
        })
    }
}

/// Combine route captures with extracted parameters under `mode`.
pub fn merge(mode: ParamsMode, route: &HashMap<String, String>, extracted: Params) -> Params {
    let mut merged = if mode.includes_body() { extracted } else { Params::new() };
    if mode.includes_route() {
        merged.extend(Params::from(route.clone()));
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::Method;
    use serde_json::json;

    fn route() -> HashMap<String, String> {
        HashMap::from([("name".to_string(), "neap".to_string())])
    }

    fn extracted() -> Params {
        let mut p = Params::new();
        p.insert("name", "from-body");
        p.insert("hello", "world");
        p
    }

    #[test]
    fn test_mode_parsing_defaults_to_all() {
        assert_eq!(ParamsMode::from("body"), ParamsMode::Body);
        assert_eq!(ParamsMode::from("ROUTE"), ParamsMode::Route);
        assert_eq!(ParamsMode::from("none"), ParamsMode::None);
        assert_eq!(ParamsMode::from("everything"), ParamsMode::All);
    }

    #[test]
    fn test_route_wins_on_collision() {
        let merged = merge(ParamsMode::All, &route(), extracted());
        assert_eq!(merged.get_str("name"), Some("neap"));
        assert_eq!(merged.get_str("hello"), Some("world"));
    }

    #[test]
    fn test_modes_select_sources() {
        let body = merge(ParamsMode::Body, &route(), extracted());
        assert_eq!(body.get_str("name"), Some("from-body"));

        let route_only = merge(ParamsMode::Route, &route(), extracted());
        assert_eq!(route_only.len(), 1);
        assert_eq!(route_only.get_str("name"), Some("neap"));

        assert!(merge(ParamsMode::None, &route(), extracted()).is_empty());
    }

    #[tokio::test]
    async fn test_extractor_reads_query_and_json_body() {
        let req = Request::new(Method::POST, "/company/neap?hello=world&page=2")
            .with_json_body(json!({ "page": 3, "tags": ["a"] }));
        let params = QueryBodyExtractor.extract(&req).await.unwrap();
        assert_eq!(params.get_str("hello"), Some("world"));
        assert_eq!(params.get_str("page"), Some("2"));
        assert_eq!(params.get("tags"), Some(&json!(["a"])));
    }

    #[tokio::test]
    async fn test_extractor_parses_json_text_body() {
        let req = Request::new(Method::POST, "/x").with_text_body(r#"{"a":"b"}"#);
        let params = QueryBodyExtractor.extract(&req).await.unwrap();
        assert_eq!(params.get_str("a"), Some("b"));

        let plain = Request::new(Method::POST, "/x").with_text_body("not json");
        assert!(QueryBodyExtractor.extract(&plain).await.unwrap().is_empty());
    }
}
