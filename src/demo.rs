//! Built-in endpoints served by the bundled binaries.

use serde_json::json;

use crate::app::App;
use crate::dispatch::handler::{handler_fn, hook_fn};
use crate::error::ConfigurationError;
use crate::http::request::Phase;

/// Register `/`, `/health` and `/echo/{value}`, plus a post-event hook that
/// logs the outcome of every request.
pub fn register(app: &mut App) -> Result<(), ConfigurationError> {
    app.get(
        "/",
        handler_fn(|_req, res, _params| async move {
            res.send("http-dispatch is running");
            Ok(())
        }),
    )?
    .get(
        "/health",
        handler_fn(|_req, res, _params| async move {
            res.json(&json!({ "status": "ok" }))?;
            Ok(())
        }),
    )?
    .all(
        "/echo/{value}",
        handler_fn(|req, res, params| async move {
            res.json(&json!({
                "method": req.method().as_str(),
                "path": req.path(),
                "transactionId": req.context().transaction_id(),
                "params": params,
            }))?;
            Ok(())
        }),
    )?;

    app.set_post_event(hook_fn(|req, res| async move {
        let ctx = req.context();
        tracing::debug!(
            status = res.status_code().as_u16(),
            elapsed_ms = ctx.elapsed().as_millis() as u64,
            pre_event_error = ?ctx.error(Phase::PreEvent),
            error = ?ctx.error(Phase::Main),
            "Post event"
        );
        Ok(())
    }));

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Request;
    use crate::http::response::Response;
    use axum::http::Method;

    #[tokio::test]
    async fn test_echo_returns_params() {
        let mut app = App::new();
        register(&mut app).unwrap();

        let (res, rx) = Response::channel();
        app.dispatch(Request::new(Method::POST, "/echo/Hi?x=1"), res).await;
        let body: serde_json::Value = serde_json::from_slice(&rx.await.unwrap().body).unwrap();
        assert_eq!(body["method"], "POST");
        assert_eq!(body["params"]["value"], "Hi");
        assert_eq!(body["params"]["x"], "1");
    }
}
