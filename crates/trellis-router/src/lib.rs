//! # trellis-router
//!
//! A request-routing and middleware-dispatch library built around
//! declarative route trees.
//!
//! This crate provides:
//! - Composable route rules: method, scheme, host, path template and
//!   query-string matching
//! - Route groups that nest rules into trees, with explicit path-offset
//!   bookkeeping between levels
//! - Regular-expression constraints on matched parameters
//! - A priority-ordered middleware chain with short-circuit semantics
//! - Controller resolution and dispatch glue
//! - Route trees built from serde-deserializable configuration
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use trellis_router::{
//!     ControllerMiddleware, ControllerRegistry, ErrorHandlerMiddleware,
//!     MiddlewareChain, Request, Response, RouteConfig, RouteFactory,
//!     Router, RouterMiddleware,
//! };
//!
//! let config: RouteConfig = serde_json::from_str(r#"{
//!     "type": "path",
//!     "options": {"path": "/users"},
//!     "children": [
//!         {
//!             "type": "path",
//!             "options": {
//!                 "path": "/:id",
//!                 "constraints": {"id": "\\d+"},
//!                 "defaults": {"controller": "user_detail"}
//!             }
//!         }
//!     ]
//! }"#)?;
//!
//! let router = Arc::new(Router::new().add(RouteFactory::build(&config)?));
//!
//! let mut registry = ControllerRegistry::new();
//! registry.register_fn("user_detail", |req: Request| async move {
//!     let id = req.params.get("id").unwrap_or("unknown");
//!     Response::json(&serde_json::json!({"id": id}))
//! });
//!
//! let mut chain = MiddlewareChain::new();
//! chain.register(ErrorHandlerMiddleware, 100);
//! chain.register(RouterMiddleware::new(router), 10);
//! chain.register(ControllerMiddleware::new(Arc::new(registry)), 0);
//!
//! // One chain clone per request
//! let response = chain.clone().proceed(Request::get("/users/42")).await?;
//! ```
//!
//! ## Route Trees
//!
//! Flat routes check one predicate each. Groups compose them: the head
//! route matches first, then children resume matching where the head
//! stopped consuming the path. An abstract group (the default) only
//! matches through a child; a non-abstract group whose head consumed the
//! whole path can stand alone.
//!
//! ```ignore
//! use trellis_router::{GroupRoute, HostRoute, PathRoute};
//!
//! let tree = GroupRoute::new(HostRoute::new("api.example.com"))
//!     .child(PathRoute::parse("/users/:id")?)
//!     .child(PathRoute::parse("/health")?);
//! ```
//!
//! ## Middleware
//!
//! Middleware run in descending priority order; each one forwards with
//! `chain.proceed(request)`, short-circuits with its own response, or
//! transforms the downstream result. A chain instance serves a single
//! request; clone it for the next one.

mod constraint;
mod dispatch;
mod error;
mod factory;
mod middleware;
mod path;
mod request;
mod response;
mod route;
mod router;

pub use constraint::{Constraint, ConstraintViolation, RegexConstraint};
pub use dispatch::{
    Controller, ControllerError, ControllerMiddleware, ControllerRegistry, FnController,
    RouterMiddleware, CONTROLLER_PARAM,
};
pub use error::{ConfigError, Result, RouterError};
pub use factory::{RouteConfig, RouteFactory, RouteOptions};
pub use middleware::{
    ErrorHandlerMiddleware, LoggingMiddleware, Middleware, MiddlewareChain, DEFAULT_PRIORITY,
};
pub use path::PathTemplate;
pub use request::{Method, Params, Request};
pub use response::Response;
pub use route::{
    GroupRoute, HostRoute, MethodRoute, PathRoute, QueryRoute, Route, RouteMatch, RouteOutcome,
};
pub use router::Router;
