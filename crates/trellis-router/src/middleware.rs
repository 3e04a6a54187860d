//! Middleware pipeline for request dispatch.

use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::{debug, error, info};

use crate::error::{Result, RouterError};
use crate::request::Request;
use crate::response::Response;

/// Priority assigned by [`MiddlewareChain::add`].
pub const DEFAULT_PRIORITY: i32 = 1;

/// Trait for middleware participating in request dispatch.
///
/// A middleware either forwards the request with
/// `chain.proceed(request)` (possibly after modifying it),
/// short-circuits by returning its own response, or wraps the
/// downstream result on the way back out.
///
/// Middleware instances are shared between chain clones and across
/// requests; they must not carry per-request state.
///
/// # Example
///
/// ```ignore
/// struct NoopMiddleware;
///
/// impl Middleware for NoopMiddleware {
///     fn process<'a>(
///         &'a self,
///         request: Request,
///         chain: &'a mut MiddlewareChain,
///     ) -> BoxFuture<'a, Result<Response>> {
///         Box::pin(async move { chain.proceed(request).await })
///     }
/// }
/// ```
pub trait Middleware: Send + Sync {
    /// Processes a request, delegating to the rest of the chain as
    /// needed.
    fn process<'a>(
        &'a self,
        request: Request,
        chain: &'a mut MiddlewareChain,
    ) -> BoxFuture<'a, Result<Response>>;
}

#[derive(Clone)]
struct ChainEntry {
    middleware: Arc<dyn Middleware>,
    priority: i32,
}

/// An ordered, single-pass middleware pipeline.
///
/// Middleware run in descending priority order; equal priorities keep
/// registration order. The pipeline holds a cursor over an immutable,
/// pre-sorted list, so one chain instance serves exactly one top-level
/// request. Clone the chain to dispatch another: clones share the
/// middleware instances but start with a fresh cursor.
///
/// The terminal middleware of a configured chain must never call
/// [`proceed`](Self::proceed); a chain that runs past its last entry
/// reports [`RouterError::ChainExhausted`].
pub struct MiddlewareChain {
    entries: Vec<ChainEntry>,
    cursor: usize,
}

impl MiddlewareChain {
    /// Creates an empty chain.
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            cursor: 0,
        }
    }

    /// Registers a middleware at the given priority.
    ///
    /// Higher priorities run earlier; equal priorities run in
    /// registration order.
    pub fn register(&mut self, middleware: impl Middleware + 'static, priority: i32) {
        self.register_arc(Arc::new(middleware), priority);
    }

    /// Registers an already-shared middleware at the given priority.
    pub fn register_arc(&mut self, middleware: Arc<dyn Middleware>, priority: i32) {
        let index = self
            .entries
            .iter()
            .take_while(|entry| entry.priority >= priority)
            .count();
        self.entries.insert(index, ChainEntry { middleware, priority });
    }

    /// Registers a middleware at the default priority.
    pub fn add(&mut self, middleware: impl Middleware + 'static) {
        self.register(middleware, DEFAULT_PRIORITY);
    }

    /// Returns the number of registered middleware.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the chain has no middleware.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Invokes the next middleware in priority order.
    pub fn proceed(&mut self, request: Request) -> BoxFuture<'_, Result<Response>> {
        let Some(entry) = self.entries.get(self.cursor) else {
            return Box::pin(async { Err(RouterError::ChainExhausted) });
        };
        let middleware = Arc::clone(&entry.middleware);
        self.cursor += 1;
        Box::pin(async move { middleware.process(request, self).await })
    }
}

impl Default for MiddlewareChain {
    fn default() -> Self {
        Self::new()
    }
}

impl Clone for MiddlewareChain {
    /// Clones share middleware instances and priorities; the cursor is
    /// reset so the clone is an independent, unstarted pipeline.
    fn clone(&self) -> Self {
        Self {
            entries: self.entries.clone(),
            cursor: 0,
        }
    }
}

/// Middleware that logs each request and the outcome of dispatching it.
pub struct LoggingMiddleware;

impl Middleware for LoggingMiddleware {
    fn process<'a>(
        &'a self,
        request: Request,
        chain: &'a mut MiddlewareChain,
    ) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            let method = request.method;
            let path = request.path.clone();
            debug!(method = %method, path = %path, "Dispatching request");

            let result = chain.proceed(request).await;
            match &result {
                Ok(response) => {
                    info!(method = %method, path = %path, status = response.status, "Request handled");
                }
                Err(err) => {
                    error!(method = %method, path = %path, error = %err, "Request failed");
                }
            }
            result
        })
    }
}

/// Middleware that converts routing and dispatch errors into responses.
///
/// Registered at the head of a chain, it turns every downstream failure
/// into an HTTP response: 404 for no match, 405 with an `Allow` header
/// for a method rejection, 500 for everything else.
pub struct ErrorHandlerMiddleware;

impl Middleware for ErrorHandlerMiddleware {
    fn process<'a>(
        &'a self,
        request: Request,
        chain: &'a mut MiddlewareChain,
    ) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            match chain.proceed(request).await {
                Ok(response) => Ok(response),
                Err(RouterError::NotFound { .. }) => Ok(Response::not_found()),
                Err(RouterError::MethodNotAllowed { allowed, .. }) => {
                    Ok(Response::method_not_allowed(&allowed))
                }
                Err(err) => {
                    error!(error = %err, "Dispatch failed");
                    Ok(Response::internal_server_error())
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;

    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        terminal: bool,
    }

    impl Middleware for Recorder {
        fn process<'a>(
            &'a self,
            request: Request,
            chain: &'a mut MiddlewareChain,
        ) -> BoxFuture<'a, Result<Response>> {
            Box::pin(async move {
                self.log.lock().unwrap().push(self.name);
                if self.terminal {
                    return Ok(Response::ok());
                }
                chain.proceed(request).await
            })
        }
    }

    fn recorder(
        name: &'static str,
        log: &Arc<Mutex<Vec<&'static str>>>,
        terminal: bool,
    ) -> Recorder {
        Recorder {
            name,
            log: Arc::clone(log),
            terminal,
        }
    }

    #[tokio::test]
    async fn test_descending_priority_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.register(recorder("low", &log, false), 1);
        chain.register(recorder("terminal", &log, true), -5);
        chain.register(recorder("high", &log, false), 10);

        let response = chain.proceed(Request::get("/")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(*log.lock().unwrap(), vec!["high", "low", "terminal"]);
    }

    #[tokio::test]
    async fn test_equal_priority_keeps_registration_order() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.add(recorder("first", &log, false));
        chain.add(recorder("second", &log, false));
        chain.register(recorder("terminal", &log, true), 0);

        chain.proceed(Request::get("/")).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["first", "second", "terminal"]);
    }

    #[tokio::test]
    async fn test_short_circuit_halts_chain() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.register(recorder("outer", &log, false), 10);
        chain.register(recorder("blocker", &log, true), 5);
        chain.register(recorder("unreached", &log, false), 1);

        chain.proceed(Request::get("/")).await.unwrap();
        assert_eq!(*log.lock().unwrap(), vec!["outer", "blocker"]);
    }

    #[tokio::test]
    async fn test_clone_resets_cursor_and_shares_middleware() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut chain = MiddlewareChain::new();
        chain.register(recorder("terminal", &log, true), 1);

        chain.proceed(Request::get("/")).await.unwrap();

        let mut fresh = chain.clone();
        fresh.proceed(Request::get("/")).await.unwrap();

        // Same shared instance ran twice; the clone started from the top
        assert_eq!(*log.lock().unwrap(), vec!["terminal", "terminal"]);
    }

    #[tokio::test]
    async fn test_exhausted_chain_is_an_error() {
        let mut chain = MiddlewareChain::new();
        assert!(matches!(
            chain.proceed(Request::get("/")).await,
            Err(RouterError::ChainExhausted)
        ));
    }

    #[tokio::test]
    async fn test_error_handler_maps_not_found() {
        struct Failing;
        impl Middleware for Failing {
            fn process<'a>(
                &'a self,
                request: Request,
                _chain: &'a mut MiddlewareChain,
            ) -> BoxFuture<'a, Result<Response>> {
                Box::pin(async move {
                    Err(RouterError::NotFound {
                        method: request.method,
                        path: request.path,
                    })
                })
            }
        }

        let mut chain = MiddlewareChain::new();
        chain.register(ErrorHandlerMiddleware, 100);
        chain.register(Failing, 1);

        let response = chain.proceed(Request::get("/missing")).await.unwrap();
        assert_eq!(response.status, 404);
    }
}
