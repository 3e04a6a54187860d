//! Route variants and the match results they produce.
//!
//! A [`Route`] is a single match rule: a flat predicate (method, scheme,
//! host, path, query) or a [`GroupRoute`] composing a head route with an
//! ordered list of children. Matching walks the tree with an explicit
//! path offset so nested routes resume exactly where their parent
//! stopped consuming the path.

use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;

use crate::constraint::Constraint;
use crate::error::ConfigError;
use crate::path::PathTemplate;
use crate::request::{Method, Params, Request};

/// The immutable result of a successful match: accumulated parameters
/// plus the number of path bytes consumed, relative to the offset the
/// match started at.
#[derive(Debug, Clone, Default)]
pub struct RouteMatch {
    params: Params,
    offset: usize,
}

impl RouteMatch {
    /// Creates a match with the given parameters and consumed length.
    pub fn new(params: Params, offset: usize) -> Self {
        Self { params, offset }
    }

    /// Returns the matched parameters.
    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Consumes the match, returning its parameters.
    pub fn into_params(self) -> Params {
        self.params
    }

    /// Returns the number of path bytes consumed.
    pub fn offset(&self) -> usize {
        self.offset
    }

    /// Gets a single matched parameter.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.params.get(key)
    }

    /// Merges a child match into this one.
    ///
    /// Child parameters win on key collision. Offsets add, since the
    /// child consumed its bytes starting where this match stopped.
    #[must_use]
    pub fn merge(&self, other: &RouteMatch) -> RouteMatch {
        RouteMatch {
            params: self.params.merged(&other.params),
            offset: self.offset + other.offset,
        }
    }
}

/// Outcome of a single route-match attempt.
#[derive(Debug, Clone)]
pub enum RouteOutcome {
    /// The route matched.
    Matched(RouteMatch),
    /// Everything but the HTTP method fit; carries the methods that
    /// would have been accepted.
    MethodNotAllowed(BTreeSet<Method>),
    /// The route did not match. Ordinary branching, not an error.
    NoMatch,
}

impl RouteOutcome {
    /// Returns the match, if any.
    pub fn into_match(self) -> Option<RouteMatch> {
        match self {
            RouteOutcome::Matched(matched) => Some(matched),
            _ => None,
        }
    }

    /// Returns whether this outcome is a match.
    pub fn is_match(&self) -> bool {
        matches!(self, RouteOutcome::Matched(_))
    }
}

/// A single match rule in a route tree.
///
/// All variants are immutable once constructed; matching never mutates
/// route state, so a built tree is safe to share between requests.
#[derive(Clone)]
pub enum Route {
    /// Matches the request method.
    Method(MethodRoute),
    /// Matches the request scheme.
    Scheme(SchemeRoute),
    /// Matches the request host.
    Host(HostRoute),
    /// Matches and consumes a span of the request path.
    Path(PathRoute),
    /// Validates query-string parameters.
    Query(QueryRoute),
    /// A head route guarding an ordered list of children.
    Group(GroupRoute),
}

impl Route {
    /// Attempts to match the request starting at the given path offset.
    pub fn match_request(&self, request: &Request, path_offset: usize) -> RouteOutcome {
        match self {
            Route::Method(route) => route.match_request(request),
            Route::Scheme(route) => route.match_request(request),
            Route::Host(route) => route.match_request(request),
            Route::Path(route) => route.match_request(request, path_offset),
            Route::Query(route) => route.match_request(request),
            Route::Group(route) => route.match_request(request, path_offset),
        }
    }

    pub(crate) fn is_group(&self) -> bool {
        matches!(self, Route::Group(_))
    }
}

impl From<MethodRoute> for Route {
    fn from(route: MethodRoute) -> Self {
        Route::Method(route)
    }
}

impl From<SchemeRoute> for Route {
    fn from(route: SchemeRoute) -> Self {
        Route::Scheme(route)
    }
}

impl From<HostRoute> for Route {
    fn from(route: HostRoute) -> Self {
        Route::Host(route)
    }
}

impl From<PathRoute> for Route {
    fn from(route: PathRoute) -> Self {
        Route::Path(route)
    }
}

impl From<QueryRoute> for Route {
    fn from(route: QueryRoute) -> Self {
        Route::Query(route)
    }
}

impl From<GroupRoute> for Route {
    fn from(route: GroupRoute) -> Self {
        Route::Group(route)
    }
}

/// Matches the request's HTTP method. Consumes no path.
///
/// A method mismatch is reported as [`RouteOutcome::MethodNotAllowed`]
/// carrying this route's method, so routers can aggregate an `Allow` set
/// across rejected branches.
#[derive(Debug, Clone)]
pub struct MethodRoute {
    method: Method,
    defaults: Params,
}

impl MethodRoute {
    /// Creates a route matching the given method.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            defaults: Params::new(),
        }
    }

    /// Sets the default parameters returned on match.
    #[must_use]
    pub fn defaults(mut self, defaults: Params) -> Self {
        self.defaults = defaults;
        self
    }

    fn match_request(&self, request: &Request) -> RouteOutcome {
        if request.method == self.method {
            RouteOutcome::Matched(RouteMatch::new(self.defaults.clone(), 0))
        } else {
            RouteOutcome::MethodNotAllowed(BTreeSet::from([self.method]))
        }
    }
}

/// Matches the request's URL scheme, case-insensitively. Consumes no path.
#[derive(Debug, Clone)]
pub struct SchemeRoute {
    scheme: String,
    defaults: Params,
}

impl SchemeRoute {
    /// Creates a route matching the given scheme.
    pub fn new(scheme: impl Into<String>) -> Self {
        Self {
            scheme: scheme.into(),
            defaults: Params::new(),
        }
    }

    /// Sets the default parameters returned on match.
    #[must_use]
    pub fn defaults(mut self, defaults: Params) -> Self {
        self.defaults = defaults;
        self
    }

    fn match_request(&self, request: &Request) -> RouteOutcome {
        if request.scheme.eq_ignore_ascii_case(&self.scheme) {
            RouteOutcome::Matched(RouteMatch::new(self.defaults.clone(), 0))
        } else {
            RouteOutcome::NoMatch
        }
    }
}

/// Matches the request's host exactly. Consumes no path.
#[derive(Debug, Clone)]
pub struct HostRoute {
    host: String,
    defaults: Params,
}

impl HostRoute {
    /// Creates a route matching the given host.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            defaults: Params::new(),
        }
    }

    /// Sets the default parameters returned on match.
    #[must_use]
    pub fn defaults(mut self, defaults: Params) -> Self {
        self.defaults = defaults;
        self
    }

    fn match_request(&self, request: &Request) -> RouteOutcome {
        if request.host == self.host {
            RouteOutcome::Matched(RouteMatch::new(self.defaults.clone(), 0))
        } else {
            RouteOutcome::NoMatch
        }
    }
}

/// Matches a path template and consumes the matched span.
///
/// Captured parameters are validated against their constraints; a
/// violation makes the whole route report no match. Output parameters
/// are the defaults overlaid by the captures.
#[derive(Clone)]
pub struct PathRoute {
    template: PathTemplate,
    constraints: HashMap<String, Arc<dyn Constraint>>,
    defaults: Params,
}

impl PathRoute {
    /// Creates a route from a compiled template.
    pub fn new(template: PathTemplate) -> Self {
        Self {
            template,
            constraints: HashMap::new(),
            defaults: Params::new(),
        }
    }

    /// Parses a template string and creates a route from it.
    pub fn parse(template: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(PathTemplate::parse(template)?))
    }

    /// Adds a constraint for a named parameter.
    #[must_use]
    pub fn constrain(
        mut self,
        name: impl Into<String>,
        constraint: impl Constraint + 'static,
    ) -> Self {
        self.constraints.insert(name.into(), Arc::new(constraint));
        self
    }

    /// Sets the default parameters returned on match.
    #[must_use]
    pub fn defaults(mut self, defaults: Params) -> Self {
        self.defaults = defaults;
        self
    }

    /// Returns the underlying template.
    pub fn template(&self) -> &PathTemplate {
        &self.template
    }

    fn match_request(&self, request: &Request, path_offset: usize) -> RouteOutcome {
        let Some((captured, consumed)) = self.template.match_at(&request.path, path_offset)
        else {
            return RouteOutcome::NoMatch;
        };

        for (name, constraint) in &self.constraints {
            if let Some(value) = captured.get(name) {
                if constraint.validate(value).is_err() {
                    return RouteOutcome::NoMatch;
                }
            }
        }

        RouteOutcome::Matched(RouteMatch::new(self.defaults.merged(&captured), consumed))
    }
}

/// Validates query-string parameters. Consumes no path.
///
/// A constrained parameter that is present must validate; one that is
/// absent is skipped. Validated values are copied into the match
/// parameters over the defaults.
#[derive(Clone, Default)]
pub struct QueryRoute {
    constraints: HashMap<String, Arc<dyn Constraint>>,
    defaults: Params,
}

impl QueryRoute {
    /// Creates a query route with no constraints.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a constraint for a query parameter.
    #[must_use]
    pub fn constrain(
        mut self,
        name: impl Into<String>,
        constraint: impl Constraint + 'static,
    ) -> Self {
        self.constraints.insert(name.into(), Arc::new(constraint));
        self
    }

    /// Sets the default parameters returned on match.
    #[must_use]
    pub fn defaults(mut self, defaults: Params) -> Self {
        self.defaults = defaults;
        self
    }

    fn match_request(&self, request: &Request) -> RouteOutcome {
        let mut params = self.defaults.clone();
        for (name, constraint) in &self.constraints {
            if let Some(value) = request.get_query(name) {
                if constraint.validate(value).is_err() {
                    return RouteOutcome::NoMatch;
                }
                params.insert(name.clone(), value.to_string());
            }
        }
        RouteOutcome::Matched(RouteMatch::new(params, 0))
    }
}

/// A head route guarding an ordered list of child routes.
///
/// The head is matched first; children are then tried in order starting
/// where the head stopped consuming the path, and the first matching
/// child wins, merged into the head's match. An abstract group (the
/// default) can only terminate the search through a child; a
/// non-abstract group whose head consumed the rest of the path stands on
/// its own when no child matched.
#[derive(Clone)]
pub struct GroupRoute {
    head: Box<Route>,
    children: Vec<Route>,
    is_abstract: bool,
}

impl GroupRoute {
    /// Creates an abstract group around a head route.
    pub fn new(head: impl Into<Route>) -> Self {
        Self {
            head: Box::new(head.into()),
            children: Vec::new(),
            is_abstract: true,
        }
    }

    /// Appends a child route.
    #[must_use]
    pub fn child(mut self, child: impl Into<Route>) -> Self {
        self.children.push(child.into());
        self
    }

    /// Sets whether the group alone can be a complete route.
    #[must_use]
    pub fn with_abstract(mut self, is_abstract: bool) -> Self {
        self.is_abstract = is_abstract;
        self
    }

    /// Returns whether the group is abstract.
    pub fn is_abstract(&self) -> bool {
        self.is_abstract
    }

    fn match_request(&self, request: &Request, path_offset: usize) -> RouteOutcome {
        let head = match self.head.match_request(request, path_offset) {
            RouteOutcome::Matched(head) => head,
            other => return other,
        };
        let next_offset = path_offset + head.offset();

        // A method rejection does not stop the scan; a later sibling may
        // still match, and then the signal is discarded.
        let mut allowed = BTreeSet::new();
        for child in &self.children {
            match child.match_request(request, next_offset) {
                RouteOutcome::Matched(child_match) => {
                    return RouteOutcome::Matched(head.merge(&child_match));
                }
                RouteOutcome::MethodNotAllowed(methods) => allowed.extend(methods),
                RouteOutcome::NoMatch => {}
            }
        }

        if !self.is_abstract && next_offset == request.path.len() {
            return RouteOutcome::Matched(head);
        }
        if !allowed.is_empty() {
            return RouteOutcome::MethodNotAllowed(allowed);
        }
        RouteOutcome::NoMatch
    }
}
