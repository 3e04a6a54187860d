//! Declarative route configuration.
//!
//! Route trees are described by recursive [`RouteConfig`] values, usually
//! deserialized from JSON. Everything is validated while building: a
//! router constructed from configurations that passed cannot fail for
//! configuration reasons at request time.

use std::collections::HashMap;

use serde::Deserialize;

use crate::constraint::RegexConstraint;
use crate::error::ConfigError;
use crate::path::PathTemplate;
use crate::request::{Method, Params};
use crate::route::{GroupRoute, HostRoute, MethodRoute, PathRoute, QueryRoute, Route, SchemeRoute};
use crate::router::Router;

/// Options for a single route node.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RouteOptions {
    /// HTTP method name, for `method` routes.
    #[serde(default)]
    pub method: Option<String>,
    /// URL scheme, for `scheme` routes.
    #[serde(default)]
    pub scheme: Option<String>,
    /// Exact host, for `host` routes.
    #[serde(default)]
    pub host: Option<String>,
    /// Path template, for `path` routes.
    #[serde(default)]
    pub path: Option<String>,
    /// Parameter name to regular-expression constraints, for `path` and
    /// `query` routes.
    #[serde(default)]
    pub constraints: HashMap<String, String>,
    /// Default parameters returned on match.
    #[serde(default)]
    pub defaults: HashMap<String, String>,
}

/// A recursive route-tree configuration node.
///
/// A node with children builds into a [`GroupRoute`] wrapping the node's
/// own route as the head.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteConfig {
    /// Route type: `method`, `scheme`, `host`, `path` or `query`.
    #[serde(rename = "type")]
    pub kind: String,
    /// Type-specific options.
    #[serde(default)]
    pub options: RouteOptions,
    /// Child route nodes.
    #[serde(default)]
    pub children: Vec<RouteConfig>,
    /// Whether the node can only terminate the search through a child.
    #[serde(default = "default_abstract", rename = "abstract")]
    pub is_abstract: bool,
}

fn default_abstract() -> bool {
    true
}

/// Builds [`Route`] trees from configuration.
pub struct RouteFactory;

impl RouteFactory {
    /// Builds a route tree from a configuration node.
    pub fn build(config: &RouteConfig) -> Result<Route, ConfigError> {
        let head = Self::build_head(config)?;
        if config.children.is_empty() {
            return Ok(head);
        }

        let mut group = GroupRoute::new(head).with_abstract(config.is_abstract);
        for child in &config.children {
            group = group.child(Self::build(child)?);
        }
        Ok(Route::Group(group))
    }

    fn build_head(config: &RouteConfig) -> Result<Route, ConfigError> {
        let defaults = Params::from(config.options.defaults.clone());

        match config.kind.as_str() {
            "method" => {
                let name = require_option(config, config.options.method.as_deref(), "method")?;
                let method = Method::from_str(name)
                    .ok_or_else(|| ConfigError::InvalidMethod(name.to_string()))?;
                Ok(Route::Method(MethodRoute::new(method).defaults(defaults)))
            }
            "scheme" => {
                let scheme = require_option(config, config.options.scheme.as_deref(), "scheme")?;
                Ok(Route::Scheme(SchemeRoute::new(scheme).defaults(defaults)))
            }
            "host" => {
                let host = require_option(config, config.options.host.as_deref(), "host")?;
                Ok(Route::Host(HostRoute::new(host).defaults(defaults)))
            }
            "path" => {
                let template = require_option(config, config.options.path.as_deref(), "path")?;
                let mut route = PathRoute::new(PathTemplate::parse(template)?).defaults(defaults);
                for (name, pattern) in &config.options.constraints {
                    route = route.constrain(name.clone(), RegexConstraint::new(pattern)?);
                }
                Ok(Route::Path(route))
            }
            "query" => {
                let mut route = QueryRoute::new().defaults(defaults);
                for (name, pattern) in &config.options.constraints {
                    route = route.constrain(name.clone(), RegexConstraint::new(pattern)?);
                }
                Ok(Route::Query(route))
            }
            other => Err(ConfigError::UnknownRouteType(other.to_string())),
        }
    }
}

fn require_option<'a>(
    config: &RouteConfig,
    value: Option<&'a str>,
    option: &str,
) -> Result<&'a str, ConfigError> {
    value.ok_or_else(|| ConfigError::MissingOption {
        route_type: config.kind.clone(),
        option: option.to_string(),
    })
}

impl Router {
    /// Builds a router from an ordered sequence of route configurations.
    pub fn from_configs<'a>(
        configs: impl IntoIterator<Item = &'a RouteConfig>,
    ) -> Result<Self, ConfigError> {
        let mut router = Router::new();
        for config in configs {
            router = router.add(RouteFactory::build(config)?);
        }
        Ok(router)
    }
}
