//! Single-invocation entry point.
//!
//! A serverless platform hands over one event and expects one response
//! document back. The event shape accepts the common gateway field names
//! (`httpMethod`, `rawPath`, `queryStringParameters`) as aliases.

use std::collections::{BTreeMap, HashMap};

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::app::App;
use crate::http::request::{Request, RequestBody};
use crate::http::response::{Response, ResponseParts};

/// Inbound event.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ServerlessEvent {
    #[serde(alias = "httpMethod")]
    pub method: String,

    #[serde(alias = "rawPath")]
    pub path: String,

    #[serde(default)]
    pub headers: HashMap<String, String>,

    #[serde(default, alias = "queryStringParameters")]
    pub query: Option<HashMap<String, String>>,

    /// JSON object, or a JSON string holding the raw body.
    #[serde(default)]
    pub body: Option<Value>,

    #[serde(default)]
    pub request_id: Option<String>,
}

/// Outbound response document.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ServerlessResponse {
    pub status_code: u16,
    pub headers: BTreeMap<String, String>,
    pub body: String,
}

impl From<ResponseParts> for ServerlessResponse {
    fn from(parts: ResponseParts) -> Self {
        Self {
            status_code: parts.status.as_u16(),
            body: parts.text(),
            headers: parts.headers.into_iter().collect(),
        }
    }
}

impl ServerlessEvent {
    fn into_request(self) -> Option<Request> {
        let method = Request::parse_method(&self.method)?;
        let body = match self.body {
            None | Some(Value::Null) => None,
            Some(Value::String(text)) => Some(RequestBody::Text(text)),
            Some(value) => Some(RequestBody::Json(value)),
        };

        let mut request = Request::new(method, &self.path)
            .with_query(self.query.unwrap_or_default())
            .with_body(body);
        for (name, value) in self.headers {
            request = request.with_header(&name, value);
        }
        if let Some(id) = self.request_id {
            request = request.with_transaction_id(id);
        }
        Some(request)
    }
}

/// Dispatch one event and return its response.
pub async fn invoke(app: &App, event: ServerlessEvent) -> ServerlessResponse {
    let method = event.method.clone();
    let Some(request) = event.into_request() else {
        tracing::warn!(method = %method, "Rejecting event with invalid method");
        return ServerlessResponse {
            status_code: StatusCode::BAD_REQUEST.as_u16(),
            headers: BTreeMap::new(),
            body: format!("Invalid method '{method}'"),
        };
    };

    let (response, written) = Response::channel();
    app.dispatch(request, response).await;

    match written.await {
        Ok(parts) => parts.into(),
        Err(_) => ServerlessResponse {
            status_code: StatusCode::INTERNAL_SERVER_ERROR.as_u16(),
            headers: BTreeMap::new(),
            body: "Internal Server Error".to_string(),
        },
    }
}
