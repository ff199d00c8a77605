//! Declarative modules.
//!
//! A [`Module`] groups controllers, WebSocket gateways, injectable services, interface
//! bindings and middleware under a name and an optional path prefix, and may import other
//! modules. Registering the root module with a [`ModuleRegistry`] walks the import graph
//! depth-first and feeds every declaration into the container, the router, the gateway registry and the middleware
//! registry. Gateways keep their own mount prefix and are not nested under module prefixes.
//!
//! ```rust,ignore
//! let users = Module::new("users")
//!     .prefix("/users")
//!     .controller::<UserController>()
//!     .injectable::<UserRepository>();
//!
//! let api = Module::new("api").prefix("/api/v1").import(users);
//! // UserController routes end up under /api/v1/users
//! ```

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};

use crate::container::{Container, Injectable, ServiceId};
use crate::gateway::{Gateway, GatewayRegistry};
use crate::middleware::{Middleware, MiddlewareRegistry};
use crate::router::{build_path, Controller, RouteError, Router};

type ControllerInstaller =
    Arc<dyn Fn(&mut Container, &mut Router, &str) -> Result<usize, RouteError> + Send + Sync>;
type Provider = Arc<dyn Fn(&mut ModuleContext<'_>) + Send + Sync>;

/// Everything a module registration writes into.
pub struct ModuleContext<'a> {
    pub container: &'a mut Container,
    pub router: &'a mut Router,
    pub middleware: &'a mut MiddlewareRegistry,
    pub gateways: &'a mut GatewayRegistry,
}

#[derive(Clone)]
struct ControllerEntry {
    id: ServiceId,
    install: ControllerInstaller,
}

/// A named group of controllers and services.
#[derive(Clone)]
pub struct Module {
    name: String,
    prefix: String,
    imports: Vec<Module>,
    controllers: Vec<ControllerEntry>,
    gateways: Vec<ServiceId>,
    providers: Vec<Provider>,
    exports: Vec<ServiceId>,
}

impl Module {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            prefix: String::new(),
            imports: Vec::new(),
            controllers: Vec::new(),
            gateways: Vec::new(),
            providers: Vec::new(),
            exports: Vec::new(),
        }
    }

    /// Path prefix for this module's controllers and, nested, for its imports.
    #[must_use]
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = prefix.to_string();
        self
    }

    #[must_use]
    pub fn import(mut self, module: Module) -> Self {
        self.imports.push(module);
        self
    }

    /// Register `C` in the container and its routes in the router.
    #[must_use]
    pub fn controller<C: Controller>(mut self) -> Self {
        let install: ControllerInstaller = Arc::new(
            |container: &mut Container, router: &mut Router, prefix: &str| {
                container.register::<C>();
                router.register_controller::<C>(prefix)
            },
        );
        self.controllers.push(ControllerEntry {
            id: ServiceId::of::<C>(),
            install,
        });
        self
    }

    /// Register gateway `G` in the container and the gateway registry.
    #[must_use]
    pub fn gateway<G: Gateway>(mut self) -> Self {
        self.gateways.push(ServiceId::of::<G>());
        self.provide(|ctx| {
            ctx.container.register::<G>();
            ctx.gateways.register::<G>();
        })
    }

    #[must_use]
    pub fn injectable<S: Injectable>(self) -> Self {
        self.provide(|ctx| {
            ctx.container.register::<S>();
        })
    }

    /// Register `C` and bind the interface `I` to it.
    #[must_use]
    pub fn bind_interface<I, C, F>(self, upcast: F) -> Self
    where
        I: ?Sized + Send + Sync + 'static,
        C: Injectable,
        F: Fn(Arc<C>) -> Arc<I> + Clone + Send + Sync + 'static,
    {
        self.provide(move |ctx| {
            ctx.container
                .register::<C>()
                .bind_interface::<I, C, F>(upcast.clone());
        })
    }

    /// Register middleware `M` with both the container and the middleware registry.
    #[must_use]
    pub fn middleware<M: Middleware + Injectable>(self) -> Self {
        self.provide(|ctx| {
            ctx.container.register::<M>();
            ctx.middleware.register::<M>();
        })
    }

    /// Like [`middleware`](Self::middleware), also making `M` nameable from configuration.
    #[must_use]
    pub fn middleware_alias<M: Middleware + Injectable>(self, alias: &str) -> Self {
        let alias = alias.to_string();
        self.provide(move |ctx| {
            ctx.container.register::<M>();
            ctx.middleware
                .register::<M>()
                .alias(&alias, ServiceId::of::<M>());
        })
    }

    fn provide<F>(mut self, provider: F) -> Self
    where
        F: Fn(&mut ModuleContext<'_>) + Send + Sync + 'static,
    {
        self.providers.push(Arc::new(provider));
        self
    }

    /// Mark `S` as part of this module's public surface.
    #[must_use]
    pub fn export<S: ?Sized + 'static>(mut self) -> Self {
        self.exports.push(ServiceId::of::<S>());
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn path_prefix(&self) -> &str {
        &self.prefix
    }
}

impl std::fmt::Debug for Module {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("prefix", &self.prefix)
            .field(
                "imports",
                &self.imports.iter().map(Module::name).collect::<Vec<_>>(),
            )
            .field(
                "controllers",
                &self.controllers.iter().map(|c| &c.id).collect::<Vec<_>>(),
            )
            .field("gateways", &self.gateways)
            .finish_non_exhaustive()
    }
}

/// What the registry remembers about a registered module.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisteredModule {
    pub name: String,
    /// Fully nested prefix.
    pub prefix: String,
    pub controllers: Vec<ServiceId>,
    pub gateways: Vec<ServiceId>,
    pub imports: Vec<String>,
    pub exports: Vec<ServiceId>,
}

/// Registered modules, in registration order.
#[derive(Debug, Default)]
pub struct ModuleRegistry {
    modules: Vec<RegisteredModule>,
    names: HashSet<String>,
}

impl ModuleRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `module` and, depth-first, everything it imports.
    ///
    /// Modules already registered (by name) are skipped, so shared and cyclic imports are
    /// registered once. A module's own controllers are mounted before its imports.
    ///
    /// # Returns
    ///
    /// The number of routes added.
    ///
    /// # Errors
    ///
    /// The first controller whose routes fail to compile. Modules registered before the
    /// failure stay registered.
    pub fn register(
        &mut self,
        module: &Module,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<usize, RouteError> {
        self.register_under(module, "", ctx)
    }

    fn register_under(
        &mut self,
        module: &Module,
        parent_prefix: &str,
        ctx: &mut ModuleContext<'_>,
    ) -> Result<usize, RouteError> {
        if self.has(&module.name) {
            debug!(module = %module.name, "Module already registered, skipping");
            return Ok(0);
        }
        let prefix = build_path(parent_prefix, &module.prefix);
        self.names.insert(module.name.clone());
        self.modules.push(RegisteredModule {
            name: module.name.clone(),
            prefix: prefix.clone(),
            controllers: module.controllers.iter().map(|c| c.id.clone()).collect(),
            gateways: module.gateways.clone(),
            imports: module.imports.iter().map(|m| m.name.clone()).collect(),
            exports: module.exports.clone(),
        });

        for provider in &module.providers {
            provider(&mut *ctx);
        }
        let mut routes = 0;
        for controller in &module.controllers {
            routes += (controller.install)(ctx.container, ctx.router, &prefix)?;
        }
        info!(
            module = %module.name,
            prefix = %prefix,
            controllers = module.controllers.len(),
            gateways = module.gateways.len(),
            routes,
            "Module registered"
        );
        for import in &module.imports {
            routes += self.register_under(import, &prefix, ctx)?;
        }
        Ok(routes)
    }

    #[must_use]
    pub fn has(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&RegisteredModule> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Names imported by `name`; empty for unknown modules.
    #[must_use]
    pub fn imports(&self, name: &str) -> &[String] {
        self.get(name).map_or(&[], |m| m.imports.as_slice())
    }

    #[must_use]
    pub fn exports(&self, name: &str) -> &[ServiceId] {
        self.get(name).map_or(&[], |m| m.exports.as_slice())
    }

    #[must_use]
    pub fn modules(&self) -> &[RegisteredModule] {
        &self.modules
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::{Arguments, ContainerError};
    use crate::gateway::GatewayHandlers;
    use crate::router::ControllerRoutes;
    use http::Method;

    struct Users;

    impl Injectable for Users {
        fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
            Ok(Users)
        }
    }

    impl Controller for Users {
        fn routes(r: &mut ControllerRoutes<Self>) {
            r.prefix("/users");
            r.get("/", "index").to(|_, _| Ok("users".into()));
        }
    }

    struct Health;

    impl Injectable for Health {
        fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
            Ok(Health)
        }
    }

    impl Controller for Health {
        fn routes(r: &mut ControllerRoutes<Self>) {
            r.get("/health", "check").to(|_, _| Ok("ok".into()));
        }
    }

    struct Echo;

    impl Injectable for Echo {
        fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
            Ok(Echo)
        }
    }

    impl Gateway for Echo {
        fn handlers(h: &mut GatewayHandlers<Self>) {
            h.path("/echo");
            h.on_message("echo", |_, msg| {
                msg.connection().send(msg.data().clone());
                Ok(())
            });
        }
    }

    trait Store: Send + Sync {
        fn kind(&self) -> &'static str;
    }

    struct MemoryStore;

    impl Injectable for MemoryStore {
        fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
            Ok(MemoryStore)
        }
    }

    impl Store for MemoryStore {
        fn kind(&self) -> &'static str {
            "memory"
        }
    }

    fn memory_store(store: Arc<MemoryStore>) -> Arc<dyn Store> {
        store
    }

    struct Parts {
        container: Container,
        router: Router,
        middleware: MiddlewareRegistry,
        gateways: GatewayRegistry,
    }

    impl Parts {
        fn new() -> Self {
            Self {
                container: Container::new(),
                router: Router::new(),
                middleware: MiddlewareRegistry::new(),
                gateways: GatewayRegistry::new(),
            }
        }

        fn register(&mut self, registry: &mut ModuleRegistry, module: &Module) -> usize {
            let mut ctx = ModuleContext {
                container: &mut self.container,
                router: &mut self.router,
                middleware: &mut self.middleware,
                gateways: &mut self.gateways,
            };
            registry.register(module, &mut ctx).unwrap()
        }
    }

    #[test]
    fn test_prefixes_nest_through_imports() {
        let users = Module::new("users").controller::<Users>();
        let v1 = Module::new("v1").prefix("/v1").import(users);
        let root = Module::new("root")
            .prefix("/api")
            .controller::<Health>()
            .import(v1);

        let mut parts = Parts::new();
        let mut registry = ModuleRegistry::new();
        assert_eq!(parts.register(&mut registry, &root), 2);

        assert!(parts.router.find_route(&Method::GET, "/api/health").is_some());
        assert!(parts.router.find_route(&Method::GET, "/api/v1/users").is_some());
        assert_eq!(registry.get("users").unwrap().prefix, "/api/v1");
        assert_eq!(registry.imports("root"), &["v1".to_string()]);
        assert!(parts.container.has(&ServiceId::of::<Users>()));
    }

    #[test]
    fn test_shared_import_registered_once() {
        let shared = Module::new("shared").controller::<Health>();
        let a = Module::new("a").import(shared.clone());
        let b = Module::new("b").import(shared);
        let root = Module::new("root").import(a).import(b);

        let mut parts = Parts::new();
        let mut registry = ModuleRegistry::new();
        assert_eq!(parts.register(&mut registry, &root), 1);
        let names: Vec<&str> = registry.modules().iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["root", "a", "shared", "b"]);
        assert_eq!(parts.router.routes().len(), 1);
    }

    #[test]
    fn test_interface_binding_and_exports() {
        let storage = Module::new("storage")
            .bind_interface::<dyn Store, MemoryStore, _>(memory_store)
            .export::<dyn Store>();

        let mut parts = Parts::new();
        let mut registry = ModuleRegistry::new();
        parts.register(&mut registry, &storage);

        let store = parts.container.resolve_interface::<dyn Store>().unwrap();
        assert_eq!(store.kind(), "memory");
        assert_eq!(registry.exports("storage"), &[ServiceId::of::<dyn Store>()]);
        assert!(registry.exports("unknown").is_empty());
    }

    #[test]
    fn test_gateways_ignore_module_prefix() {
        let root = Module::new("realtime")
            .prefix("/api")
            .gateway::<Echo>()
            .controller::<Health>();

        let mut parts = Parts::new();
        let mut registry = ModuleRegistry::new();
        assert_eq!(parts.register(&mut registry, &root), 1);

        assert!(parts.gateways.by_path("/ws/echo").is_some());
        assert!(parts.gateways.by_path("/api/ws/echo").is_none());
        assert!(parts.container.has(&ServiceId::of::<Echo>()));
        assert_eq!(
            registry.get("realtime").unwrap().gateways,
            vec![ServiceId::of::<Echo>()]
        );
    }
}
