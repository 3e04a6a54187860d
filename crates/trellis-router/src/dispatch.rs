//! Glue between the router, controllers and the middleware chain.
//!
//! [`RouterMiddleware`] resolves the route and attaches the matched
//! parameters; [`ControllerMiddleware`] terminates the chain by invoking
//! the controller the match named. Everything in between is the
//! application's business.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use tracing::debug;

use crate::error::{Result, RouterError};
use crate::middleware::{Middleware, MiddlewareChain};
use crate::request::Request;
use crate::response::Response;
use crate::router::Router;

/// The match parameter that names the controller to dispatch to.
pub const CONTROLLER_PARAM: &str = "controller";

/// Errors a controller may fail with; opaque to the dispatch layer.
pub type ControllerError = Box<dyn std::error::Error + Send + Sync>;

/// Trait for application controllers invoked after routing.
pub trait Controller: Send + Sync {
    /// Handles a fully routed request.
    fn handle<'a>(
        &'a self,
        request: Request,
    ) -> BoxFuture<'a, std::result::Result<Response, ControllerError>>;
}

/// Adapter turning an infallible async function into a [`Controller`].
pub struct FnController<F>(F);

impl<F, Fut> FnController<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send + 'static,
{
    /// Wraps an async handler function.
    pub fn new(handler: F) -> Self {
        Self(handler)
    }
}

impl<F, Fut> Controller for FnController<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = Response> + Send + 'static,
{
    fn handle<'a>(
        &'a self,
        request: Request,
    ) -> BoxFuture<'a, std::result::Result<Response, ControllerError>> {
        let fut = (self.0)(request);
        Box::pin(async move { Ok(fut.await) })
    }
}

/// Name-keyed controller lookup.
#[derive(Default)]
pub struct ControllerRegistry {
    controllers: HashMap<String, Arc<dyn Controller>>,
}

impl ControllerRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a controller under a name.
    pub fn register(&mut self, name: impl Into<String>, controller: impl Controller + 'static) {
        self.controllers.insert(name.into(), Arc::new(controller));
    }

    /// Registers an async handler function under a name.
    pub fn register_fn<F, Fut>(&mut self, name: impl Into<String>, handler: F)
    where
        F: Fn(Request) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Response> + Send + 'static,
    {
        self.register(name, FnController::new(handler));
    }

    /// Looks up a controller by key.
    ///
    /// A missing registration is reported as
    /// [`RouterError::ControllerNotFound`], distinct from anything that
    /// can go wrong while the controller executes.
    pub fn resolve(&self, key: &str) -> Result<Arc<dyn Controller>> {
        self.controllers
            .get(key)
            .cloned()
            .ok_or_else(|| RouterError::ControllerNotFound {
                key: key.to_string(),
            })
    }
}

/// Middleware that routes the request and attaches matched parameters.
///
/// Routing failures propagate as errors for an upstream
/// [`ErrorHandlerMiddleware`](crate::middleware::ErrorHandlerMiddleware)
/// to convert.
pub struct RouterMiddleware {
    router: Arc<Router>,
}

impl RouterMiddleware {
    /// Creates the middleware around a built router.
    pub fn new(router: Arc<Router>) -> Self {
        Self { router }
    }
}

impl Middleware for RouterMiddleware {
    fn process<'a>(
        &'a self,
        mut request: Request,
        chain: &'a mut MiddlewareChain,
    ) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            let matched = self.router.route(&request)?;
            request.params = matched.into_params();
            chain.proceed(request).await
        })
    }
}

/// Terminal middleware that resolves and invokes the controller named by
/// the request's `controller` parameter.
///
/// As the terminal middleware it never calls `proceed`; execution
/// failures are wrapped with the controller key for context.
pub struct ControllerMiddleware {
    registry: Arc<ControllerRegistry>,
}

impl ControllerMiddleware {
    /// Creates the middleware around a controller registry.
    pub fn new(registry: Arc<ControllerRegistry>) -> Self {
        Self { registry }
    }
}

impl Middleware for ControllerMiddleware {
    fn process<'a>(
        &'a self,
        request: Request,
        _chain: &'a mut MiddlewareChain,
    ) -> BoxFuture<'a, Result<Response>> {
        Box::pin(async move {
            let key = request
                .params
                .get(CONTROLLER_PARAM)
                .ok_or(RouterError::MissingController)?
                .to_string();

            let controller = self.registry.resolve(&key)?;
            debug!(controller = %key, "Invoking controller");

            controller
                .handle(request)
                .await
                .map_err(|source| RouterError::Dispatch { key, source })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::factory::{RouteConfig, RouteFactory};
    use crate::middleware::{ErrorHandlerMiddleware, LoggingMiddleware};

    fn demo_router() -> Arc<Router> {
        let config: RouteConfig = serde_json::from_value(serde_json::json!({
            "type": "path",
            "options": {"path": "/greet"},
            "children": [
                {
                    "type": "path",
                    "options": {
                        "path": "/:name",
                        "defaults": {"controller": "greeter"}
                    }
                }
            ]
        }))
        .unwrap();
        Arc::new(Router::new().add(RouteFactory::build(&config).unwrap()))
    }

    fn demo_chain(registry: ControllerRegistry) -> MiddlewareChain {
        let mut chain = MiddlewareChain::new();
        chain.register(ErrorHandlerMiddleware, 100);
        chain.register(LoggingMiddleware, 50);
        chain.register(RouterMiddleware::new(demo_router()), 10);
        chain.register(ControllerMiddleware::new(Arc::new(registry)), 0);
        chain
    }

    #[tokio::test]
    async fn test_full_dispatch_pipeline() {
        let mut registry = ControllerRegistry::new();
        registry.register_fn("greeter", |req: Request| async move {
            let name = req.params.get("name").unwrap_or("stranger").to_string();
            Response::text(format!("Hello, {name}!"))
        });

        let mut chain = demo_chain(registry);
        let response = chain.proceed(Request::get("/greet/ada")).await.unwrap();
        assert_eq!(response.status, 200);
        assert_eq!(response.body_string(), Some("Hello, ada!".to_string()));
    }

    #[tokio::test]
    async fn test_unrouted_request_becomes_404() {
        let mut chain = demo_chain(ControllerRegistry::new());
        let response = chain.proceed(Request::get("/nowhere")).await.unwrap();
        assert_eq!(response.status, 404);
    }

    #[tokio::test]
    async fn test_unregistered_controller_is_distinguished() {
        let registry = ControllerRegistry::new();
        assert!(matches!(
            registry.resolve("missing"),
            Err(RouterError::ControllerNotFound { key }) if key == "missing"
        ));
    }

    #[tokio::test]
    async fn test_missing_controller_param() {
        let mut chain = MiddlewareChain::new();
        chain.register(
            ControllerMiddleware::new(Arc::new(ControllerRegistry::new())),
            0,
        );

        // No route match ran, so the request carries no controller key
        assert!(matches!(
            chain.proceed(Request::get("/")).await,
            Err(RouterError::MissingController)
        ));
    }

    #[tokio::test]
    async fn test_controller_failure_is_wrapped_with_key() {
        struct Exploding;
        impl Controller for Exploding {
            fn handle<'a>(
                &'a self,
                _request: Request,
            ) -> BoxFuture<'a, std::result::Result<Response, ControllerError>> {
                Box::pin(async { Err("boom".into()) })
            }
        }

        let mut registry = ControllerRegistry::new();
        registry.register("exploding", Exploding);

        let mut request = Request::get("/");
        request.params.insert(CONTROLLER_PARAM, "exploding");

        let mut chain = MiddlewareChain::new();
        chain.register(ControllerMiddleware::new(Arc::new(registry)), 0);

        match chain.proceed(request).await {
            Err(RouterError::Dispatch { key, source }) => {
                assert_eq!(key, "exploding");
                assert_eq!(source.to_string(), "boom");
            }
            other => panic!("expected Dispatch error, got {other:?}"),
        }
    }
}
