//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::http::Method;
use http_dispatch::http::{Phase, ResponseParts};
use http_dispatch::{handler_fn, hook_fn, App, Request, Response};
use http_dispatch::dispatch::BoxHandler;

/// Dispatch one request and return what was written.
pub async fn dispatch(app: &App, request: Request) -> ResponseParts {
    let (response, written) = Response::channel();
    app.dispatch(request, response).await;
    written.await.expect("pipeline must write exactly one response")
}

pub fn get(target: &str) -> Request {
    Request::new(Method::GET, target)
}

/// Handler that replies with its name and records every call.
pub fn named(name: &'static str, calls: &Arc<Mutex<Vec<String>>>) -> BoxHandler {
    let calls = Arc::clone(calls);
    handler_fn(move |_req, res, _params| {
        let calls = Arc::clone(&calls);
        async move {
            calls.lock().unwrap().push(name.to_string());
            res.send(name);
            Ok(())
        }
    })
}

/// Handler that echoes its parameters as JSON.
pub fn echo_params() -> BoxHandler {
    handler_fn(|_req, res, params| async move {
        res.json(&params)?;
        Ok(())
    })
}

/// Counter shared between a test and its hooks.
#[derive(Clone, Default)]
pub struct Counter(Arc<AtomicUsize>);

impl Counter {
    pub fn bump(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Install a post-event hook that counts its calls and captures the
/// main-phase error it sees.
pub fn observe_post_event(app: &mut App) -> (Counter, Arc<Mutex<Option<String>>>) {
    let calls = Counter::default();
    let main_error = Arc::new(Mutex::new(None));
    let (hook_calls, hook_error) = (calls.clone(), Arc::clone(&main_error));
    app.set_post_event(hook_fn(move |req, _res| {
        let calls = hook_calls.clone();
        let main_error = Arc::clone(&hook_error);
        async move {
            calls.bump();
            *main_error.lock().unwrap() = req.context().error(Phase::Main);
            Ok(())
        }
    }));
    (calls, main_error)
}
