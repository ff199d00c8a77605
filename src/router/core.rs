//! Router core module - hot path for request routing.
//!
//! Lookup is two-tiered:
//!
//! 1. **Static index**: `method → exact path → route` for patterns without placeholders.
//!    Built lazily on the first lookup after a registration and published through an
//!    `ArcSwapOption`, so concurrent readers either see the previous index or the new one.
//! 2. **Linear fallback**: every route in registration order; the first whose method and
//!    compiled pattern match wins.
//!
//! `OPTIONS` never reaches either tier: it is answered from the `path → methods` map.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwapOption;
use http::Method;
use tracing::{debug, info};

use super::controller::{Controller, ControllerRoutes};
use super::{OptionsRoute, RouteDefinition, RouteError, RouteMatch};

type StaticIndex = HashMap<Method, HashMap<String, Arc<RouteDefinition>>>;

/// Route table snapshot for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RouteMapStats {
    pub total_routes: usize,
    pub static_routes: usize,
    pub parameterized_routes: usize,
    pub unique_paths: usize,
    pub index_built: bool,
}

/// Registers routes and resolves `(method, path)` to a route.
///
/// Registration takes `&mut self`; lookups take `&self` and may be issued from many
/// threads once bootstrap is done.
#[derive(Default)]
pub struct Router {
    routes: Vec<Arc<RouteDefinition>>,
    static_index: ArcSwapOption<StaticIndex>,
    /// Registered pattern → methods, in registration order.
    path_methods: HashMap<String, Vec<Method>>,
}

impl Router {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register every action of controller `C` under `prefix`.
    ///
    /// Full paths are `prefix + class prefix + action path`, slash-normalized. Route
    /// middleware is the class-level list followed by the action's own, de-duplicated.
    ///
    /// # Arguments
    ///
    /// * `prefix` - Mount prefix (e.g. a module prefix such as `/api/v1`)
    ///
    /// # Returns
    ///
    /// The number of routes added.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] if any action path fails to compile; no route of the
    /// controller is added in that case.
    pub fn register_controller<C: Controller>(&mut self, prefix: &str) -> Result<usize, RouteError> {
        let mut declared = ControllerRoutes::<C>::new();
        C::routes(&mut declared);
        let definitions = declared.into_definitions(prefix)?;
        let count = definitions.len();
        for definition in definitions {
            self.add_route(definition);
        }
        Ok(count)
    }

    /// Append a route and invalidate the static index.
    pub fn add_route(&mut self, route: RouteDefinition) {
        info!(
            method = %route.method(),
            path = %route.path(),
            handler = %route.handler().display_name(),
            middleware_count = route.middleware().len(),
            "Route registered"
        );

        let methods = self
            .path_methods
            .entry(route.path().to_string())
            .or_default();
        if !methods.contains(route.method()) {
            methods.push(route.method().clone());
        }
        self.routes.push(Arc::new(route));
        self.static_index.store(None);
    }

    /// Resolve a request to a route.
    ///
    /// # Arguments
    ///
    /// * `method` - HTTP method
    /// * `path` - Request path without query string
    ///
    /// # Returns
    ///
    /// * `Some(RouteMatch::Options(..))` - for `OPTIONS` on a path with registered methods
    /// * `Some(RouteMatch::Handler(..))` - static hit or first matching pattern
    /// * `None` - nothing registered for this method and path
    #[must_use]
    pub fn find_route(&self, method: &Method, path: &str) -> Option<RouteMatch> {
        if method == Method::OPTIONS {
            return self.options_for(path).map(RouteMatch::Options);
        }

        let start = Instant::now();
        let index = self.static_index();
        if let Some(route) = index.get(method).and_then(|by_path| by_path.get(path)) {
            debug!(
                method = %method,
                path = %path,
                route_pattern = %route.path(),
                duration_us = start.elapsed().as_micros(),
                tier = "static",
                "Route matched"
            );
            return Some(RouteMatch::Handler(Arc::clone(route)));
        }

        let found = self.routes.iter().find(|route| route.matches(method, path));
        match found {
            Some(route) => {
                debug!(
                    method = %method,
                    path = %path,
                    route_pattern = %route.path(),
                    duration_us = start.elapsed().as_micros(),
                    tier = "pattern",
                    "Route matched"
                );
                Some(RouteMatch::Handler(Arc::clone(route)))
            }
            None => {
                debug!(
                    method = %method,
                    path = %path,
                    duration_us = start.elapsed().as_micros(),
                    "No route matched"
                );
                None
            }
        }
    }

    /// Methods registered for exactly `path` (a registered pattern such as `/users/{id}`).
    ///
    /// This is the constant-time lookup `OPTIONS` is answered from; a concrete path like
    /// `/users/42` has no entry.
    #[must_use]
    pub fn allowed_methods(&self, path: &str) -> Vec<Method> {
        self.path_methods.get(path).cloned().unwrap_or_default()
    }

    /// Methods of every route whose pattern matches the concrete `path`, in registration
    /// order.
    ///
    /// Scans the whole route list; intended for preflight helpers and diagnostics, not
    /// the `OPTIONS` lookup.
    #[must_use]
    pub fn matching_methods(&self, path: &str) -> Vec<Method> {
        let mut methods: Vec<Method> = Vec::new();
        for route in &self.routes {
            if route.pattern().is_match(path) && !methods.contains(route.method()) {
                methods.push(route.method().clone());
            }
        }
        methods
    }

    /// `true` if any method is registered for `path`.
    #[must_use]
    pub fn path_exists(&self, path: &str) -> bool {
        self.path_methods.contains_key(path)
    }

    #[must_use]
    pub fn routes(&self) -> &[Arc<RouteDefinition>] {
        &self.routes
    }

    #[must_use]
    pub fn path_method_map(&self) -> &HashMap<String, Vec<Method>> {
        &self.path_methods
    }

    #[must_use]
    pub fn stats(&self) -> RouteMapStats {
        let static_routes = self.routes.iter().filter(|r| !r.has_parameters()).count();
        RouteMapStats {
            total_routes: self.routes.len(),
            static_routes,
            parameterized_routes: self.routes.len() - static_routes,
            unique_paths: self.path_methods.len(),
            index_built: self.static_index.load().is_some(),
        }
    }

    /// Log the route table at `info` level.
    pub fn log_routes(&self) {
        let stats = self.stats();
        info!(
            routes_count = stats.total_routes,
            static_routes = stats.static_routes,
            parameterized_routes = stats.parameterized_routes,
            "Routing table"
        );
        for route in &self.routes {
            info!(
                method = %route.method(),
                path = %route.path(),
                handler = %route.handler().display_name(),
                middleware = ?route
                    .middleware()
                    .iter()
                    .map(|id| id.short_name())
                    .collect::<Vec<_>>(),
                "Route"
            );
        }
    }

    fn options_for(&self, path: &str) -> Option<OptionsRoute> {
        let Some(methods) = self.path_methods.get(path) else {
            debug!(path = %path, "OPTIONS for unknown path");
            return None;
        };
        let allowed_methods = methods.clone();
        debug!(path = %path, allowed = allowed_methods.len(), tier = "options", "Route matched");
        Some(OptionsRoute {
            path: path.to_string(),
            allowed_methods,
        })
    }

    fn static_index(&self) -> Arc<StaticIndex> {
        if let Some(index) = self.static_index.load_full() {
            return index;
        }
        let index = Arc::new(self.build_static_index());
        self.static_index.store(Some(Arc::clone(&index)));
        index
    }

    fn build_static_index(&self) -> StaticIndex {
        let mut index = StaticIndex::new();
        for route in self.routes.iter().filter(|r| !r.has_parameters()) {
            index
                .entry(route.method().clone())
                .or_default()
                .entry(route.path().to_string())
                .or_insert_with(|| Arc::clone(route));
        }
        info!(
            static_routes = index.values().map(HashMap::len).sum::<usize>(),
            "Static route index rebuilt"
        );
        index
    }
}

impl std::fmt::Debug for Router {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Router")
            .field("stats", &self.stats())
            .finish_non_exhaustive()
    }
}
