//! Error types for routing and dispatch.

use std::collections::BTreeSet;

use thiserror::Error;

use crate::request::Method;

/// Request-time routing and dispatch errors.
#[derive(Debug, Error)]
pub enum RouterError {
    /// No route matched the request.
    #[error("no route matched: {method} {path}")]
    NotFound {
        /// Method of the unmatched request.
        method: Method,
        /// Path of the unmatched request.
        path: String,
    },

    /// One or more routes matched everything but the method.
    #[error("method not allowed: {method} for {path}")]
    MethodNotAllowed {
        /// Method the request arrived with.
        method: Method,
        /// Path of the request.
        path: String,
        /// Union of methods the rejecting routes would accept.
        allowed: BTreeSet<Method>,
    },

    /// The route match carries no controller parameter to dispatch by.
    #[error("route match has no controller parameter")]
    MissingController,

    /// No controller is registered under the requested key.
    #[error("no controller registered for key: {key}")]
    ControllerNotFound {
        /// The lookup key that failed to resolve.
        key: String,
    },

    /// A resolved controller failed while handling the request.
    #[error("controller {key} failed")]
    Dispatch {
        /// Key the controller was resolved by.
        key: String,
        /// The underlying controller failure.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// `proceed` was called with no middleware left in the chain.
    #[error("middleware chain exhausted")]
    ChainExhausted,
}

/// Startup-time route construction errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Unrecognized route type in a route configuration.
    #[error("unknown route type: {0}")]
    UnknownRouteType(String),

    /// A required option is missing for the given route type.
    #[error("route type {route_type} requires option {option}")]
    MissingOption {
        /// The route type being built.
        route_type: String,
        /// The option that was absent.
        option: String,
    },

    /// The configured HTTP method is not recognized.
    #[error("invalid HTTP method: {0}")]
    InvalidMethod(String),

    /// A constraint or template compiled into an invalid regular expression.
    #[error("invalid pattern: {0}")]
    InvalidPattern(#[from] regex::Error),

    /// A path template could not be parsed.
    #[error("invalid path template {template}: {message}")]
    InvalidTemplate {
        /// The offending template string.
        template: String,
        /// What was wrong with it.
        message: String,
    },
}

/// Result type alias for router operations.
pub type Result<T> = std::result::Result<T, RouterError>;
