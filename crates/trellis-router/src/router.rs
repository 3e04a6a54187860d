//! Route aggregation and request routing.

use std::collections::BTreeSet;

use tracing::debug;

use crate::error::{Result, RouterError};
use crate::request::{Method, Request};
use crate::route::{Route, RouteMatch, RouteOutcome};

/// An ordered collection of top-level routes.
///
/// Routes are tried in insertion order, except groups are deferred until
/// every flat route has been tried, so cheap single-predicate routes can
/// short-circuit before nested trees are walked. Relative order within
/// each class is preserved.
///
/// A router is built once at startup and is read-only afterwards; it can
/// be shared freely between requests.
#[derive(Clone, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Creates an empty router.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a route to the table.
    #[must_use]
    pub fn add(mut self, route: impl Into<Route>) -> Self {
        self.routes.push(route.into());
        self
    }

    /// Returns the number of registered routes.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns whether the router has no routes.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Routes a request, returning the first complete match.
    ///
    /// A match must consume the entire request path; prefix matches are
    /// only meaningful inside route trees, never as a final answer. When
    /// nothing matches, method rejections collected across all attempts
    /// surface as a single [`RouterError::MethodNotAllowed`] listing the
    /// union of accepted methods; otherwise the failure is
    /// [`RouterError::NotFound`].
    pub fn route(&self, request: &Request) -> Result<RouteMatch> {
        let mut allowed: BTreeSet<Method> = BTreeSet::new();

        let flat = self.routes.iter().filter(|route| !route.is_group());
        let groups = self.routes.iter().filter(|route| route.is_group());

        for route in flat.chain(groups) {
            match route.match_request(request, 0) {
                RouteOutcome::Matched(matched) if matched.offset() == request.path.len() => {
                    debug!(method = %request.method, path = %request.path, "Route matched");
                    return Ok(matched);
                }
                // Consumed only a prefix of the path: not a final answer
                RouteOutcome::Matched(_) => {}
                RouteOutcome::MethodNotAllowed(methods) => allowed.extend(methods),
                RouteOutcome::NoMatch => {}
            }
        }

        if allowed.is_empty() {
            debug!(method = %request.method, path = %request.path, "No route matched");
            Err(RouterError::NotFound {
                method: request.method,
                path: request.path.clone(),
            })
        } else {
            debug!(
                method = %request.method,
                path = %request.path,
                "Method rejected by otherwise matching routes"
            );
            Err(RouterError::MethodNotAllowed {
                method: request.method,
                path: request.path.clone(),
                allowed,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::PathTemplate;
    use crate::request::Params;
    use crate::route::{GroupRoute, MethodRoute, PathRoute};

    fn path(template: &str) -> PathRoute {
        PathRoute::new(PathTemplate::parse(template).unwrap())
    }

    fn tagged(template: &str, tag: &str) -> PathRoute {
        let mut defaults = Params::new();
        defaults.insert("route", tag);
        path(template).defaults(defaults)
    }

    #[test]
    fn test_first_match_wins() {
        let router = Router::new()
            .add(tagged("/users/:id", "first"))
            .add(tagged("/users/:name", "second"));

        let matched = router.route(&Request::get("/users/7")).unwrap();
        assert_eq!(matched.get("route"), Some("first"));
    }

    #[test]
    fn test_flat_routes_run_before_groups() {
        // Both the group and the flat route match; the flat route was
        // inserted later but still wins.
        let group = GroupRoute::new(path("/users")).child(tagged("/:id", "grouped"));
        let router = Router::new()
            .add(group)
            .add(tagged("/users/:id", "flat"));

        let matched = router.route(&Request::get("/users/3")).unwrap();
        assert_eq!(matched.get("route"), Some("flat"));
    }

    #[test]
    fn test_not_found() {
        let router = Router::new().add(path("/users"));
        assert!(matches!(
            router.route(&Request::get("/posts")),
            Err(RouterError::NotFound { .. })
        ));
    }

    #[test]
    fn test_partial_consumption_is_not_a_match() {
        let router = Router::new().add(tagged("/foo", "prefix"));
        assert!(matches!(
            router.route(&Request::get("/foo/bar")),
            Err(RouterError::NotFound { .. })
        ));
    }

    #[test]
    fn test_method_not_allowed_union() {
        let branch_a = GroupRoute::new(path("/things"))
            .child(MethodRoute::new(Method::Post))
            .child(MethodRoute::new(Method::Put));
        let branch_b = GroupRoute::new(path("/things")).child(MethodRoute::new(Method::Delete));

        let router = Router::new().add(branch_a).add(branch_b);

        match router.route(&Request::get("/things")) {
            Err(RouterError::MethodNotAllowed { allowed, .. }) => {
                assert_eq!(
                    allowed,
                    BTreeSet::from([Method::Post, Method::Put, Method::Delete])
                );
            }
            other => panic!("expected MethodNotAllowed, got {other:?}"),
        }
    }

    #[test]
    fn test_match_discards_method_rejections() {
        // The rejecting group is attempted first and signals 405; the
        // later group still matches, so the signal is discarded.
        let rejecting = GroupRoute::new(path("/things")).child(MethodRoute::new(Method::Post));
        let open = GroupRoute::new(tagged("/things", "open")).with_abstract(false);
        let router = Router::new().add(rejecting).add(open);

        let matched = router.route(&Request::get("/things")).unwrap();
        assert_eq!(matched.get("route"), Some("open"));
    }
}
