//! # Application Kernel
//!
//! [`Application`] owns the container, router, middleware registry, gateway registry and
//! dispatcher, and is the single entry point a transport driver calls.
//!
//! ## Lifecycle
//!
//! 1. **Wiring**: [`Application::new`] with an explicit [`AppConfig`], then
//!    [`register_module`](Application::register_module) (or direct access through
//!    [`container_mut`](Application::container_mut) / [`router_mut`](Application::router_mut))
//!    and [`use_global`](Application::use_global).
//! 2. **Boot**: [`boot`](Application::boot) turns the configured global middleware aliases
//!    into ids and logs the route table outside production.
//! 3. **Serving**: the driver hands each normalized request to
//!    [`dispatch_from_driver`](Application::dispatch_from_driver) and writes the returned
//!    [`Response`] back to the wire. Serving only needs `&self`. WebSocket drivers look up
//!    [`gateways`](Application::gateways) by handshake path and drive them through
//!    [`gateway_dispatcher`](Application::gateway_dispatcher).
//!
//! Dispatching before boot still works, but configured global middleware aliases are not
//! applied until [`boot`](Application::boot) runs; a warning is logged once.
//!
//! ## Request Flow
//!
//! ```text
//! request ─▶ Router::find_route ──(none)──▶ 404 Not Found
//!                  │
//!                  ▼
//!          global middleware ─▶ route middleware ─▶ Dispatcher::dispatch ─▶ handler
//! ```
//!
//! ## Error Mapping
//!
//! | Error | Response |
//! |---|---|
//! | validation failure | 422 `{"error": "Validation failed", "errors": {...}}` |
//! | bad route parameter | 400 `{"error": "..."}` |
//! | [`DispatchError::Http`] | its status, `{"error": message}` |
//! | anything else | 500 `Server Error: <message>` (`Internal error` in production) |

use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use tracing::{debug, error, info, warn};

use crate::config::{AppConfig, ConfigError};
use crate::container::{Container, Injectable, ServiceId};
use crate::dispatcher::{Dispatcher, RouteHandler};
use crate::error::{BootError, DispatchError};
use crate::gateway::{GatewayDispatcher, GatewayRegistry};
use crate::http::{RequestContext, Response};
use crate::middleware::{
    handler_fn, CorsMiddleware, MetricsMiddleware, Middleware, MiddlewarePipeline,
    MiddlewareRegistry, TracingMiddleware,
};
use crate::module::{Module, ModuleContext, ModuleRegistry};
use crate::router::{RouteMatch, Router};

/// The assembled runtime.
pub struct Application {
    config: AppConfig,
    container: Container,
    router: Router,
    middleware: MiddlewareRegistry,
    modules: ModuleRegistry,
    gateways: GatewayRegistry,
    dispatcher: Dispatcher,
    global: Vec<ServiceId>,
    booted: bool,
    warned_unbooted: AtomicBool,
}

impl Application {
    /// Create an application with the built-in middleware registered under the aliases
    /// `tracing`, `cors` and `metrics`.
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let mut container = Container::new();
        container
            .register::<TracingMiddleware>()
            .register::<CorsMiddleware>()
            .register::<MetricsMiddleware>();

        let mut middleware = MiddlewareRegistry::new();
        middleware
            .register::<TracingMiddleware>()
            .register::<CorsMiddleware>()
            .register::<MetricsMiddleware>()
            .alias("tracing", ServiceId::of::<TracingMiddleware>())
            .alias("cors", ServiceId::of::<CorsMiddleware>())
            .alias("metrics", ServiceId::of::<MetricsMiddleware>());

        info!(
            app = %config.app.name,
            environment = %config.environment(),
            "Application created"
        );
        Self {
            config,
            container,
            router: Router::new(),
            middleware,
            modules: ModuleRegistry::new(),
            gateways: GatewayRegistry::new(),
            dispatcher: Dispatcher::new(),
            global: Vec::new(),
            booted: false,
            warned_unbooted: AtomicBool::new(false),
        }
    }

    /// Register `module` and everything it imports.
    ///
    /// # Errors
    ///
    /// [`BootError::Route`] if a controller's routes do not compile.
    pub fn register_module(&mut self, module: &Module) -> Result<usize, BootError> {
        let mut ctx = ModuleContext {
            container: &mut self.container,
            router: &mut self.router,
            middleware: &mut self.middleware,
            gateways: &mut self.gateways,
        };
        Ok(self.modules.register(module, &mut ctx)?)
    }

    /// Wrap every request in `M`. Global middleware runs in the order it is added, after
    /// any configured in [`MiddlewareConfig::global`](crate::config::MiddlewareConfig).
    pub fn use_global<M: Middleware + Injectable>(&mut self) -> &mut Self {
        self.container.register::<M>();
        self.middleware.register::<M>();
        self.push_global(ServiceId::of::<M>());
        self
    }

    fn push_global(&mut self, id: ServiceId) {
        if !self.global.contains(&id) {
            self.global.push(id);
        }
    }

    /// Finish wiring.
    ///
    /// Resolves `config.middleware.global` aliases (placed before middleware added with
    /// [`use_global`](Self::use_global)) and logs the route table outside production.
    /// Calling it again does nothing.
    ///
    /// # Errors
    ///
    /// [`BootError::Config`] for an alias no middleware is registered under.
    pub fn boot(&mut self) -> Result<(), BootError> {
        if self.booted {
            return Ok(());
        }
        let mut configured = Vec::with_capacity(self.config.middleware.global.len());
        for name in &self.config.middleware.global {
            let id = self
                .middleware
                .lookup(name)
                .ok_or_else(|| ConfigError::UnknownMiddleware(name.clone()))?;
            if !configured.contains(&id) {
                configured.push(id);
            }
        }
        let added = std::mem::take(&mut self.global);
        self.global = configured;
        for id in added {
            self.push_global(id);
        }

        if !self.config.environment().is_production() {
            self.router.log_routes();
        }
        let stats = self.router.stats();
        info!(
            routes = stats.total_routes,
            static_routes = stats.static_routes,
            modules = self.modules.modules().len(),
            gateways = self.gateways.len(),
            global_middleware = self.global.len(),
            "Application booted"
        );
        self.booted = true;
        Ok(())
    }

    /// Serve one request.
    ///
    /// Never fails: every error becomes a response according to the error mapping table
    /// in the module docs.
    #[must_use]
    pub fn dispatch_from_driver(&self, request: RequestContext) -> Response {
        let start = Instant::now();
        let method = request.method().clone();
        let path = request.path().to_string();
        let request_id = request.request_id();
        self.warn_if_unbooted();

        let Some(found) = self.router.find_route(&method, &path) else {
            debug!(%method, %path, "No route matched");
            return Response::text(404, "Not Found");
        };

        let global = self.middleware.resolve_all(&self.global, &self.container);
        let result = match found {
            RouteMatch::Handler(route) => {
                let terminal =
                    RouteHandler::new(&self.dispatcher, &self.container, &self.middleware, route);
                MiddlewarePipeline::with_middleware(global, terminal).run(request)
            }
            RouteMatch::Options(options) => MiddlewarePipeline::with_middleware(
                global,
                handler_fn(move |_| Ok(Dispatcher::options_response(&options))),
            )
            .run(request),
        };

        let response = match result {
            Ok(response) => response,
            Err(err) => self.error_response(&err),
        };
        debug!(
            %request_id,
            %method,
            %path,
            status = response.status,
            duration_us = start.elapsed().as_micros(),
            "Request dispatched"
        );
        response
    }

    fn warn_if_unbooted(&self) {
        if self.booted || self.config.middleware.global.is_empty() {
            return;
        }
        if !self.warned_unbooted.swap(true, Ordering::Relaxed) {
            warn!(
                configured = ?self.config.middleware.global,
                "Dispatching before boot: configured global middleware is not applied"
            );
        }
    }

    /// Map a dispatch error to its response.
    #[must_use]
    pub fn error_response(&self, err: &DispatchError) -> Response {
        match err {
            DispatchError::Validation(errors) => {
                debug!(fields = errors.len(), "Validation failed");
                Response::json(422, &errors.to_response_body())
            }
            DispatchError::BadParameter { .. } => Response::error(400, &err.to_string()),
            DispatchError::Http { status, message } => Response::error(*status, message),
            other => {
                let production = self.config.environment().is_production();
                if production {
                    warn!(error = %other, "Request failed with server error");
                } else {
                    error!(error = %other, "Request failed with server error");
                }
                let detail = if production {
                    "Internal error".to_string()
                } else {
                    other.to_string()
                };
                Response::text(500, format!("Server Error: {detail}"))
            }
        }
    }

    #[must_use]
    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    #[must_use]
    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    #[must_use]
    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn router_mut(&mut self) -> &mut Router {
        &mut self.router
    }

    #[must_use]
    pub fn middleware(&self) -> &MiddlewareRegistry {
        &self.middleware
    }

    pub fn middleware_mut(&mut self) -> &mut MiddlewareRegistry {
        &mut self.middleware
    }

    #[must_use]
    pub fn modules(&self) -> &ModuleRegistry {
        &self.modules
    }

    #[must_use]
    pub fn gateways(&self) -> &GatewayRegistry {
        &self.gateways
    }

    pub fn gateways_mut(&mut self) -> &mut GatewayRegistry {
        &mut self.gateways
    }

    /// A dispatcher for gateway hooks backed by this application's container.
    #[must_use]
    pub fn gateway_dispatcher(&self) -> GatewayDispatcher<'_> {
        GatewayDispatcher::new(&self.container)
    }

    #[must_use]
    pub fn dispatcher(&self) -> &Dispatcher {
        &self.dispatcher
    }

    /// Global middleware ids, outermost first.
    #[must_use]
    pub fn global_middleware(&self) -> &[ServiceId] {
        &self.global
    }

    #[must_use]
    pub fn is_booted(&self) -> bool {
        self.booted
    }
}

impl std::fmt::Debug for Application {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Application")
            .field("config", &self.config)
            .field("routes", &self.router.routes().len())
            .field("gateways", &self.gateways.len())
            .field("global", &self.global)
            .field("booted", &self.booted)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Environment;
    use crate::container::ContainerError;
    use crate::validation::ValidationErrors;
    use http::Method;

    #[test]
    fn test_unknown_route_is_404() {
        let app = Application::new(AppConfig::default());
        let response = app.dispatch_from_driver(RequestContext::new(Method::GET, "/nope"));
        assert_eq!(response.status, 404);
        assert_eq!(response.body, "Not Found");
    }

    #[test]
    fn test_server_error_detail_depends_on_environment() {
        let err = DispatchError::from(ContainerError::ClassNotFound("Missing".into()));

        let prod = Application::new(AppConfig::for_environment(Environment::Production));
        assert_eq!(prod.error_response(&err).body, "Server Error: Internal error");

        let dev = Application::new(AppConfig::for_environment(Environment::Development));
        let response = dev.error_response(&err);
        assert_eq!(response.status, 500);
        assert!(response.body.starts_with("Server Error: "));
        assert!(response.body.contains("Missing"));
    }

    #[test]
    fn test_validation_and_http_errors() {
        let app = Application::new(AppConfig::default());
        let mut errors = ValidationErrors::new();
        errors.add("email", "Must be a valid email");
        let response = app.error_response(&DispatchError::Validation(errors));
        assert_eq!(response.status, 422);
        assert_eq!(
            response.json_body().unwrap(),
            serde_json::json!({
                "error": "Validation failed",
                "errors": { "email": ["Must be a valid email"] }
            })
        );

        let response = app.error_response(&DispatchError::http(403, "Forbidden"));
        assert_eq!(response.status, 403);
        assert_eq!(response.body, r#"{"error":"Forbidden"}"#);
    }

    #[test]
    fn test_boot_resolves_config_aliases_first() {
        let mut config = AppConfig::default();
        config.middleware.global = vec!["cors".into(), "tracing".into()];
        let mut app = Application::new(config);
        app.use_global::<TracingMiddleware>()
            .use_global::<MetricsMiddleware>();
        app.boot().unwrap();
        assert_eq!(
            app.global_middleware(),
            &[
                ServiceId::of::<CorsMiddleware>(),
                ServiceId::of::<TracingMiddleware>(),
                ServiceId::of::<MetricsMiddleware>(),
            ]
        );
        assert!(app.is_booted());
        app.boot().unwrap();
        assert_eq!(app.global_middleware().len(), 3);
    }

    #[test]
    fn test_unbooted_dispatch_warns_only_with_configured_aliases() {
        let app = Application::new(AppConfig::default());
        let _ = app.dispatch_from_driver(RequestContext::new(Method::GET, "/nope"));
        assert!(!app.warned_unbooted.load(Ordering::Relaxed));

        let mut config = AppConfig::default();
        config.middleware.global = vec!["cors".into()];
        let mut app = Application::new(config);
        let _ = app.dispatch_from_driver(RequestContext::new(Method::GET, "/nope"));
        assert!(app.warned_unbooted.load(Ordering::Relaxed));
        assert!(app.global_middleware().is_empty());

        app.warned_unbooted.store(false, Ordering::Relaxed);
        app.boot().unwrap();
        let _ = app.dispatch_from_driver(RequestContext::new(Method::GET, "/nope"));
        assert!(!app.warned_unbooted.load(Ordering::Relaxed));
    }

    #[test]
    fn test_boot_rejects_unknown_alias() {
        let mut config = AppConfig::default();
        config.middleware.global = vec!["gzip".into()];
        let mut app = Application::new(config);
        let err = app.boot().unwrap_err();
        assert!(matches!(
            err,
            BootError::Config(ConfigError::UnknownMiddleware(ref name)) if name == "gzip"
        ));
    }
}
