//! Radix-tree request router with aspect registration.
//!
//! One tree per HTTP method plus one tree for routes that accept any
//! method. Aspects are kept beside the routes and matched against each
//! handler's signature at dispatch time, so registration order between
//! routes and aspects does not matter.

use std::collections::HashMap;
use std::sync::Arc;

use matchit::Router as MatchitRouter;

use crate::aspect::{Aspect, Pointcut};
use crate::handler::{BoxedHandler, Handler};
use crate::method::Method;

/// A route resolved for one request.
pub(crate) struct Route {
    pub(crate) handler: BoxedHandler,
    pub(crate) params: HashMap<String, String>,
    pub(crate) aspects: Vec<Arc<dyn Aspect>>,
}

/// The application router.
///
/// Build it once at startup; pass it to [`Server::serve`](crate::Server::serve).
pub struct Router {
    routes: HashMap<Method, MatchitRouter<BoxedHandler>>,
    any: MatchitRouter<BoxedHandler>,
    aspects: Vec<(Pointcut, Arc<dyn Aspect>)>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: HashMap::new(), any: MatchitRouter::new(), aspects: Vec::new() }
    }

    /// Register a handler for a method + path pair.
    ///
    /// Path parameters use `{name}` syntax.
    ///
    /// # Panics
    ///
    /// Panics if the path is invalid or conflicts with an earlier route.
    pub fn on(mut self, method: Method, path: &str, handler: impl Handler) -> Self {
        insert(self.routes.entry(method).or_default(), path, handler.into_boxed_handler());
        self
    }

    /// Register a handler for every method. A route registered with
    /// [`on`](Self::on) for the same path takes precedence.
    ///
    /// # Panics
    ///
    /// Same as [`on`](Self::on).
    pub fn any(mut self, path: &str, handler: impl Handler) -> Self {
        insert(&mut self.any, path, handler.into_boxed_handler());
        self
    }

    /// Apply `aspect` to every handler selected by `pointcut`. Aspects
    /// registered first wrap the ones registered later.
    pub fn aspect(mut self, pointcut: Pointcut, aspect: impl Aspect) -> Self {
        let aspect: Arc<dyn Aspect> = Arc::new(aspect);
        self.aspects.push((pointcut, aspect));
        self
    }

    pub(crate) fn lookup(&self, method: Method, path: &str) -> Option<Route> {
        let matched = self.routes.get(&method)
            .and_then(|tree| tree.at(path).ok())
            .or_else(|| self.any.at(path).ok())?;

        let handler = Arc::clone(matched.value);
        let params = matched.params.iter()
            .map(|(k, v)| (k.to_owned(), v.to_owned()))
            .collect();
        let aspects = self.aspects.iter()
            .filter(|(pointcut, _)| pointcut.matches(handler.signature()))
            .map(|(_, aspect)| Arc::clone(aspect))
            .collect();
        Some(Route { handler, params, aspects })
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}

fn insert(tree: &mut MatchitRouter<BoxedHandler>, path: &str, handler: BoxedHandler) {
    tree.insert(path, handler)
        .unwrap_or_else(|e| panic!("invalid route `{path}`: {e}"));
}
