//! Handler and hook abstractions.
//!
//! Handlers receive the shared request, a clone of the response handle and
//! the merged parameters. Hooks (pre/post event) receive only the request
//! and response.

use std::future::Future;
use std::sync::Arc;

use futures_util::future::BoxFuture;
use tower::BoxError;

use crate::dispatch::params::Params;
use crate::http::request::Request;
use crate::http::response::Response;

/// Outcome of user code. Any error type converts through `?`.
pub type HandlerResult = Result<(), BoxError>;

/// Middleware or terminal endpoint handler.
pub trait Handler: Send + Sync + 'static {
    fn call(&self, req: Arc<Request>, res: Response, params: Params) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Handler for F
where
    F: Fn(Arc<Request>, Response, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: Arc<Request>, res: Response, params: Params) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(req, res, params))
    }
}

/// Pre/post event hook.
pub trait Hook: Send + Sync + 'static {
    fn call(&self, req: Arc<Request>, res: Response) -> BoxFuture<'static, HandlerResult>;
}

impl<F, Fut> Hook for F
where
    F: Fn(Arc<Request>, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    fn call(&self, req: Arc<Request>, res: Response) -> BoxFuture<'static, HandlerResult> {
        Box::pin(self(req, res))
    }
}

pub type BoxHandler = Arc<dyn Handler>;
pub type BoxHook = Arc<dyn Hook>;

/// Wrap an async closure as a handler.
///
/// ```
/// use http_dispatch::dispatch::handler_fn;
///
/// let hello = handler_fn(|_req, res, _params| async move {
///     res.send("hello");
///     Ok(())
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> BoxHandler
where
    F: Fn(Arc<Request>, Response, Params) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}

/// Wrap an async closure as a hook.
pub fn hook_fn<F, Fut>(f: F) -> BoxHook
where
    F: Fn(Arc<Request>, Response) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = HandlerResult> + Send + 'static,
{
    Arc::new(f)
}

/// The default hook.
pub fn noop_hook() -> BoxHook {
    hook_fn(|_req, _res| async { Ok(()) })
}
