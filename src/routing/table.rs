//! Route table
//!
//! Built once at startup and read-only while serving. Matching walks the
//! routes in registration order and the first match wins.

use std::fmt;

use crate::error::{HandlerError, RouteError};
use crate::http::{Request, Response};
use crate::routing::pattern::RoutePattern;

/// What a handler returns
pub type HandlerResult = Result<Response, HandlerError>;

/// Application logic bound to a route
pub trait Handler: Send + Sync {
    fn handle(&self, request: &Request, params: &PathParams) -> HandlerResult;
}

/// Adapter so plain closures can be registered
struct FnHandler<F>(F);

impl<F> Handler for FnHandler<F>
where
    F: Fn(&Request, &PathParams) -> HandlerResult + Send + Sync,
{
    fn handle(&self, request: &Request, params: &PathParams) -> HandlerResult {
        (self.0)(request, params)
    }
}

/// Values captured by a rule's variable segments, in rule order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathParams {
    entries: Vec<(String, String)>,
}

impl PathParams {
    fn from_captures(names: &[String], values: &[&str]) -> Self {
        Self {
            entries: names
                .iter()
                .zip(values)
                .map(|(name, value)| (name.clone(), (*value).to_string()))
                .collect(),
        }
    }

    /// Value captured for the named variable
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    /// Value captured at `index`, counting variables from the left
    pub fn at(&self, index: usize) -> Option<&str> {
        self.entries.get(index).map(|(_, v)| v.as_str())
    }

    pub fn values(&self) -> Vec<&str> {
        self.entries.iter().map(|(_, v)| v.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Handle returned by registration; the route's position in the table
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RouteId(usize);

impl RouteId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// A compiled rule bound to its handler
pub struct Route {
    pattern: RoutePattern,
    handler: Box<dyn Handler>,
}

impl Route {
    pub const fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    pub fn rule(&self) -> &str {
        self.pattern.rule()
    }

    pub fn handler(&self) -> &dyn Handler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Route")
            .field("rule", &self.pattern.rule())
            .finish_non_exhaustive()
    }
}

/// A successful lookup
#[derive(Debug)]
pub struct RouteMatch<'t> {
    pub id: RouteId,
    pub route: &'t Route,
    pub params: PathParams,
}

/// Ordered routes, matched first-registered-first
#[derive(Debug, Default)]
pub struct RouteTable {
    routes: Vec<Route>,
}

impl RouteTable {
    pub const fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Compile `rule` and append it with a closure handler
    pub fn register<F>(&mut self, rule: &str, handler: F) -> Result<RouteId, RouteError>
    where
        F: Fn(&Request, &PathParams) -> HandlerResult + Send + Sync + 'static,
    {
        self.register_handler(rule, FnHandler(handler))
    }

    /// Compile `rule` and append it with any [`Handler`] implementation
    pub fn register_handler<H>(&mut self, rule: &str, handler: H) -> Result<RouteId, RouteError>
    where
        H: Handler + 'static,
    {
        let pattern = RoutePattern::compile(rule)?;
        let id = RouteId(self.routes.len());
        self.routes.push(Route {
            pattern,
            handler: Box::new(handler),
        });
        Ok(id)
    }

    /// First route whose pattern matches `path`
    pub fn find(&self, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.iter().enumerate().find_map(|(idx, route)| {
            let values = route.pattern.captures(path)?;
            Some(RouteMatch {
                id: RouteId(idx),
                route,
                params: PathParams::from_captures(route.pattern.variables(), &values),
            })
        })
    }

    pub fn get(&self, id: RouteId) -> Option<&Route> {
        self.routes.get(id.0)
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Registered rules in match order
    pub fn rules(&self) -> impl Iterator<Item = &str> {
        self.routes.iter().map(Route::rule)
    }
}
