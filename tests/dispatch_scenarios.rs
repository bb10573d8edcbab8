//! End-to-end pipeline scenarios against a captured response.

use std::sync::{Arc, Mutex};

use axum::http::{Method, StatusCode};
use serde_json::{json, Value};
use tower::BoxError;

use futures_util::future::BoxFuture;
use http_dispatch::dispatch::{handler_fn, hook_fn, ParamExtractor, Params, ParamsMode};
use http_dispatch::http::Phase;
use http_dispatch::routing::{EndpointSpec, VerbFilter};
use http_dispatch::{App, ConfigPatch, ConfigurationError, Request};

mod common;

use common::{dispatch, echo_params, get, named, observe_post_event, Counter};

fn json_body(parts: &http_dispatch::http::ResponseParts) -> Value {
    serde_json::from_slice(&parts.body).unwrap()
}

#[tokio::test]
async fn test_route_parameters_extracted() {
    let mut app = App::new();
    app.get("/users/{username}/account/{accountId}", echo_params()).unwrap();
    app.get("/company/{name}", echo_params()).unwrap();

    let res = dispatch(&app, get("/users/nicolas/account/1234")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(json_body(&res), json!({ "username": "nicolas", "accountId": "1234" }));

    let res = dispatch(&app, get("/company/neap?hello=world")).await;
    assert_eq!(json_body(&res), json!({ "name": "neap", "hello": "world" }));
}

#[tokio::test]
async fn test_only_matching_endpoint_invoked() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.get("/users", named("users", &calls)).unwrap();
    app.get("/companies", named("companies", &calls)).unwrap();

    let res = dispatch(&app, get("/companies")).await;
    assert_eq!(res.text(), "companies");
    assert_eq!(*calls.lock().unwrap(), vec!["companies".to_string()]);
}

#[tokio::test]
async fn test_most_specific_endpoint_wins() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.all("/{a}/{b}", named("shallow", &calls)).unwrap();
    app.all("/{a}/{b}/{c}", named("deep", &calls)).unwrap();
    app.all("/x/{b}", named("tie", &calls)).unwrap();

    assert_eq!(dispatch(&app, get("/x/y/z")).await.text(), "deep");
    assert_eq!(dispatch(&app, get("/x/y")).await.text(), "shallow");
}

#[tokio::test]
async fn test_route_params_override_body_params() {
    let mut app = App::new();
    app.post("/company/{name}", echo_params()).unwrap();

    let req = Request::new(Method::POST, "/company/neap?name=query")
        .with_json_body(json!({ "name": "body", "size": 3 }));
    let res = dispatch(&app, req).await;
    assert_eq!(json_body(&res), json!({ "name": "neap", "size": 3 }));
}

#[tokio::test]
async fn test_query_params_override_body_params() {
    let mut app = App::new();
    app.post("/x", echo_params()).unwrap();

    let req = Request::new(Method::POST, "/x?k=query").with_json_body(json!({ "k": "body", "n": 1 }));
    let res = dispatch(&app, req).await;
    assert_eq!(json_body(&res), json!({ "k": "query", "n": 1 }));
}

#[tokio::test]
async fn test_params_mode_route_ignores_body() {
    let mut app = App::new();
    app.use_config(ConfigPatch::new().params_mode(ParamsMode::Route));
    app.post("/company/{name}", echo_params()).unwrap();

    let req = Request::new(Method::POST, "/company/neap?hello=world")
        .with_json_body(json!({ "size": 3 }));
    assert_eq!(json_body(&dispatch(&app, req).await), json!({ "name": "neap" }));
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = App::new();
    let res = dispatch(&app, Request::new(Method::POST, "/nowhere")).await;
    assert_eq!(res.status, StatusCode::NOT_FOUND);
    assert_eq!(res.text(), "Endpoint '/nowhere' for method POST not found.");
}

#[tokio::test]
async fn test_head_and_options_short_circuit() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.all("/users", named("users", &calls)).unwrap();

    for method in [Method::HEAD, Method::OPTIONS] {
        let res = dispatch(&app, Request::new(method.clone(), "/unregistered")).await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body.is_empty());

        let res = dispatch(&app, Request::new(method, "/users")).await;
        assert_eq!(res.status, StatusCode::OK);
        assert!(res.body.is_empty());
    }
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_same_origin_fallback() {
    let mut app = App::new();
    app.get("/", echo_params()).unwrap();

    let cross = get("/")
        .with_header("Origin", "https://evil.com")
        .with_header("Referer", "https://site.com/page");
    let res = dispatch(&app, cross).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(
        res.text(),
        "Forbidden - CORS issue. Origin 'https://evil.com' is not allowed."
    );

    let delete = Request::new(Method::DELETE, "/");
    let res = dispatch(&app, delete).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.text(), "Forbidden - CORS issue. Method 'DELETE' is not allowed.");

    let same = get("/")
        .with_header("Origin", "https://site.com")
        .with_header("Referer", "https://site.com/page");
    assert_eq!(dispatch(&app, same).await.status, StatusCode::OK);
}

#[tokio::test]
async fn test_configured_cors_policy() {
    let mut app = App::new();
    app.use_config(
        ConfigPatch::new()
            .header("Access-Control-Allow-Origin", "*")
            .header("Access-Control-Allow-Methods", "post"),
    );
    app.all("/orders", echo_params()).unwrap();

    let get_req = get("/orders")
        .with_header("origin", "https://a.com")
        .with_header("referer", "https://b.com");
    let res = dispatch(&app, get_req).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.header("access-control-allow-origin"), Some("*"));

    let res = dispatch(&app, Request::new(Method::PUT, "/orders")).await;
    assert_eq!(res.status, StatusCode::FORBIDDEN);
    assert_eq!(res.text(), "Forbidden - CORS issue. Method 'PUT' is not allowed.");
}

#[tokio::test]
async fn test_required_headers_applied_before_user_code() {
    let mut app = App::new();
    app.use_config(ConfigPatch::new().header("X-Powered-By", "dispatch"));
    app.get(
        "/",
        handler_fn(|_req, res, _params| async move {
            let seen = res.header("x-powered-by").unwrap_or_default();
            res.send(seen);
            Ok(())
        }),
    )
    .unwrap();

    let res = dispatch(&app, get("/")).await;
    assert_eq!(res.text(), "dispatch");
    assert_eq!(res.header("X-Powered-By"), Some("dispatch"));
}

#[tokio::test]
async fn test_pre_event_failure_still_runs_post_event() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let post_calls = Counter::default();
    let observed = Arc::new(Mutex::new(None));

    let mut app = App::new();
    app.get("/", named("handler", &calls)).unwrap();
    app.set_pre_event(hook_fn(|_req, _res| async { Err(BoxError::from("db down")) }));
    {
        let post_calls = post_calls.clone();
        let observed = Arc::clone(&observed);
        app.set_post_event(hook_fn(move |req, _res| {
            let post_calls = post_calls.clone();
            let observed = Arc::clone(&observed);
            async move {
                post_calls.bump();
                *observed.lock().unwrap() = req.context().error(Phase::PreEvent);
                Ok(())
            }
        }));
    }

    let res = dispatch(&app, get("/")).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text(), "Internal Server Error - Pre Processing error: db down");
    assert_eq!(post_calls.get(), 1);
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(
        observed.lock().unwrap().as_deref(),
        Some("Internal Server Error - Pre Processing error: db down")
    );
}

#[tokio::test]
async fn test_middleware_runs_in_order_then_handler_then_next() {
    let order = Arc::new(Mutex::new(Vec::new()));
    let step = |name: &'static str| {
        let order = Arc::clone(&order);
        handler_fn(move |_req, _res, _params| {
            let order = Arc::clone(&order);
            async move {
                order.lock().unwrap().push(name);
                Ok(())
            }
        })
    };

    let mut app = App::new();
    app.use_middleware(step("global-1"));
    app.use_middleware(step("global-2"));
    app.endpoint(
        VerbFilter::Only(Method::GET),
        EndpointSpec::new()
            .path("/steps")
            .handler(step("endpoint-handler"))
            .next(step("next")),
    )
    .unwrap();

    let res = dispatch(&app, get("/steps")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(
        *order.lock().unwrap(),
        vec!["global-1", "global-2", "endpoint-handler", "next"]
    );
}

#[tokio::test]
async fn test_middleware_failure_aborts_chain() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let post_calls = Counter::default();

    let mut app = App::new();
    app.use_middleware(handler_fn(|_req, _res, _params| async {
        Err(BoxError::from("token expired"))
    }));
    app.get("/", named("handler", &calls)).unwrap();
    {
        let post_calls = post_calls.clone();
        app.set_post_event(hook_fn(move |_req, _res| {
            let post_calls = post_calls.clone();
            async move {
                post_calls.bump();
                Ok(())
            }
        }));
    }

    let res = dispatch(&app, get("/")).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text(), "Internal Server Error - Processing error: token expired");
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(post_calls.get(), 1);
}

#[tokio::test]
async fn test_endpoint_handler_failure_skips_next() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.endpoint(
        VerbFilter::Only(Method::GET),
        EndpointSpec::new()
            .path("/orders/{id}")
            .handler(handler_fn(|_req, _res, _params| async {
                Err(BoxError::from("bad order"))
            }))
            .next(named("next", &calls)),
    )
    .unwrap();
    let (post_calls, main_error) = observe_post_event(&mut app);

    let res = dispatch(&app, get("/orders/7")).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text(), "Internal Server Error - Processing error: bad order");
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(post_calls.get(), 1);
    assert_eq!(
        main_error.lock().unwrap().as_deref(),
        Some("Internal Server Error - Processing error: bad order")
    );
}

#[tokio::test]
async fn test_endpoint_next_failure_is_500() {
    let mut app = App::new();
    app.get(
        "/orders",
        handler_fn(|_req, _res, _params| async { Err(BoxError::from("store offline")) }),
    )
    .unwrap();
    let (post_calls, _) = observe_post_event(&mut app);

    let res = dispatch(&app, get("/orders")).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.header("content-type"), Some("text/plain; charset=utf-8"));
    assert_eq!(res.text(), "Internal Server Error - Processing error: store offline");
    assert_eq!(post_calls.get(), 1);
}

#[tokio::test]
async fn test_error_after_send_keeps_first_response() {
    let mut app = App::new();
    app.get(
        "/",
        handler_fn(|_req, res, _params| async move {
            res.status(StatusCode::CREATED).send("partial");
            Err(BoxError::from("late failure"))
        }),
    )
    .unwrap();
    let (post_calls, main_error) = observe_post_event(&mut app);

    let res = dispatch(&app, get("/")).await;
    assert_eq!(res.status, StatusCode::CREATED);
    assert_eq!(res.text(), "partial");
    assert_eq!(post_calls.get(), 1);
    assert_eq!(
        main_error.lock().unwrap().as_deref(),
        Some("Internal Server Error - Processing error: late failure")
    );
}

struct BrokenExtractor;

impl ParamExtractor for BrokenExtractor {
    fn extract<'a>(&'a self, _req: &'a Request) -> BoxFuture<'a, Result<Params, BoxError>> {
        Box::pin(async { Err(BoxError::from("malformed body")) })
    }
}

#[tokio::test]
async fn test_param_extraction_failure_is_500() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.post("/upload", named("upload", &calls)).unwrap();
    app.set_param_extractor(BrokenExtractor);
    let (post_calls, main_error) = observe_post_event(&mut app);

    let res = dispatch(&app, Request::new(Method::POST, "/upload")).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text(), "Internal Server Error - Processing error: malformed body");
    assert!(calls.lock().unwrap().is_empty());
    assert_eq!(post_calls.get(), 1);
    assert!(main_error.lock().unwrap().is_some());
}

#[tokio::test]
async fn test_params_mode_route_skips_extractor() {
    let mut app = App::new();
    app.use_config(ConfigPatch::new().params_mode(ParamsMode::Route));
    app.set_param_extractor(BrokenExtractor);
    app.post("/company/{name}", echo_params()).unwrap();

    let res = dispatch(&app, Request::new(Method::POST, "/company/neap")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(json_body(&res), json!({ "name": "neap" }));
}

#[tokio::test]
async fn test_panicking_handler_is_contained() {
    let mut app = App::new();
    app.get(
        "/",
        handler_fn(|_req, _res, _params| async move {
            if true {
                panic!("boom");
            }
            Ok(())
        }),
    )
    .unwrap();
    let (post_calls, main_error) = observe_post_event(&mut app);

    let res = tokio::spawn(async move { dispatch(&app, get("/")).await })
        .await
        .expect("dispatch task must not panic");
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text(), "Internal Server Error - Processing error: panicked: boom");
    assert_eq!(post_calls.get(), 1);
    assert!(main_error.lock().unwrap().is_some());
}

#[tokio::test]
async fn test_panicking_hooks_are_contained() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.get("/", named("handler", &calls)).unwrap();
    app.set_pre_event(hook_fn(|_req, _res| async move {
        if true {
            panic!("pre hook");
        }
        Ok(())
    }));
    app.set_post_event(hook_fn(|_req, _res| async move {
        if true {
            panic!("post hook");
        }
        Ok(())
    }));

    let res = dispatch(&app, get("/")).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text(), "Internal Server Error - Pre Processing error: panicked: pre hook");
    assert!(calls.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_post_event_failure_never_overwrites() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.get("/", named("handler", &calls)).unwrap();
    app.set_post_event(hook_fn(|_req, _res| async { Err(BoxError::from("audit failed")) }));

    let res = dispatch(&app, get("/")).await;
    assert_eq!(res.status, StatusCode::OK);
    assert_eq!(res.text(), "handler");
}

#[tokio::test]
async fn test_post_event_failure_responds_when_nothing_sent() {
    let mut app = App::new();
    app.get("/", handler_fn(|_req, _res, _params| async { Ok(()) })).unwrap();
    app.set_post_event(hook_fn(|_req, _res| async { Err(BoxError::from("audit failed")) }));

    let res = dispatch(&app, get("/")).await;
    assert_eq!(res.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(res.text(), "Internal Server Error - Post Processing error: audit failed");
}

#[tokio::test]
async fn test_silent_handler_still_gets_one_write() {
    let mut app = App::new();
    app.get(
        "/",
        handler_fn(|_req, res, _params| async move {
            res.status(StatusCode::ACCEPTED);
            Ok(())
        }),
    )
    .unwrap();

    let res = dispatch(&app, get("/")).await;
    assert_eq!(res.status, StatusCode::ACCEPTED);
    assert!(res.body.is_empty());
}

#[tokio::test]
async fn test_failed_registration_keeps_existing_endpoints() {
    let calls = Arc::new(Mutex::new(Vec::new()));
    let mut app = App::new();
    app.get("/users", named("users", &calls)).unwrap();

    assert_eq!(
        app.get(Vec::<String>::new(), named("bad", &calls)).unwrap_err(),
        ConfigurationError::EmptyPath
    );
    assert_eq!(
        app.endpoint(VerbFilter::Any, EndpointSpec::new().path("/x")).unwrap_err(),
        ConfigurationError::MissingNext
    );

    assert_eq!(dispatch(&app, get("/users")).await.text(), "users");
}

#[tokio::test]
async fn test_transaction_id_exposed_to_handlers() {
    let mut app = App::new();
    app.get(
        "/",
        handler_fn(|req, res, _params| async move {
            res.send(req.context().transaction_id().to_string());
            Ok(())
        }),
    )
    .unwrap();

    let res = dispatch(&app, get("/").with_transaction_id("txn-1")).await;
    assert_eq!(res.text(), "txn-1");

    let res = dispatch(&app, get("/")).await;
    assert!(uuid::Uuid::parse_str(&res.text()).is_ok());
}
