use std::collections::HashMap;
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use super::Middleware;
use crate::container::{Container, ContainerError, Injectable, ServiceId};

type Resolver =
    Arc<dyn Fn(&Container) -> Result<Arc<dyn Middleware>, ContainerError> + Send + Sync>;

/// A middleware id could not be turned into a live middleware.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MiddlewareError {
    #[error("middleware {0} is not registered")]
    Unknown(ServiceId),

    #[error("failed to initialize middleware {id}: {source}")]
    Initialization {
        id: ServiceId,
        #[source]
        source: ContainerError,
    },
}

/// Maps middleware ids (and config aliases) to container-backed resolvers.
///
/// Routes and configuration refer to middleware by [`ServiceId`] or alias; the registry
/// knows how to turn those into `Arc<dyn Middleware>`. Resolution goes through the
/// container, so each middleware is a singleton.
#[derive(Default, Clone)]
pub struct MiddlewareRegistry {
    resolvers: HashMap<ServiceId, Resolver>,
    aliases: HashMap<String, ServiceId>,
}

impl MiddlewareRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `M` resolvable by `ServiceId::of::<M>()`.
    ///
    /// `M` itself must also be registered in the container.
    pub fn register<M: Middleware + Injectable>(&mut self) -> &mut Self {
        let id = ServiceId::of::<M>();
        let resolver: Resolver = Arc::new(|container: &Container| {
            container
                .resolve::<M>()
                .map(|middleware| middleware as Arc<dyn Middleware>)
        });
        debug!(middleware = %id, "Middleware registered");
        self.resolvers.insert(id, resolver);
        self
    }

    /// Register an already-built middleware under `id`.
    pub fn register_shared(&mut self, id: ServiceId, middleware: Arc<dyn Middleware>) -> &mut Self {
        let resolver: Resolver = Arc::new(move |_: &Container| Ok(Arc::clone(&middleware)));
        self.resolvers.insert(id, resolver);
        self
    }

    /// Let configuration refer to `id` by a short name.
    pub fn alias(&mut self, alias: &str, id: ServiceId) -> &mut Self {
        self.aliases.insert(alias.to_string(), id);
        self
    }

    /// Turn an alias or a full id string into a registered id.
    #[must_use]
    pub fn lookup(&self, name: &str) -> Option<ServiceId> {
        if let Some(id) = self.aliases.get(name) {
            return Some(id.clone());
        }
        let id = ServiceId::named(name);
        self.resolvers.contains_key(&id).then_some(id)
    }

    #[must_use]
    pub fn contains(&self, id: &ServiceId) -> bool {
        self.resolvers.contains_key(id)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.resolvers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resolvers.is_empty()
    }

    /// Resolve one middleware.
    ///
    /// # Errors
    ///
    /// [`MiddlewareError::Unknown`] for unregistered ids and
    /// [`MiddlewareError::Initialization`] when the container cannot build it.
    pub fn resolve(
        &self,
        id: &ServiceId,
        container: &Container,
    ) -> Result<Arc<dyn Middleware>, MiddlewareError> {
        let resolver = self
            .resolvers
            .get(id)
            .ok_or_else(|| MiddlewareError::Unknown(id.clone()))?;
        resolver(container).map_err(|source| MiddlewareError::Initialization {
            id: id.clone(),
            source,
        })
    }

    /// Resolve a list, skipping (and logging) entries that fail.
    ///
    /// A broken middleware degrades the chain instead of failing the request.
    #[must_use]
    pub fn resolve_all(&self, ids: &[ServiceId], container: &Container) -> Vec<Arc<dyn Middleware>> {
        ids.iter()
            .filter_map(|id| match self.resolve(id, container) {
                Ok(middleware) => Some(middleware),
                Err(error) => {
                    warn!(
                        middleware = %id,
                        error = %error,
                        "Middleware initialization failed, skipping"
                    );
                    None
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for MiddlewareRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MiddlewareRegistry")
            .field("middleware", &self.resolvers.keys().collect::<Vec<_>>())
            .field("aliases", &self.aliases)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::container::Arguments;
    use crate::error::DispatchError;
    use crate::http::{RequestContext, Response};
    use crate::middleware::RequestHandler;

    struct Noop;

    impl Injectable for Noop {
        fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
            Ok(Noop)
        }
    }

    impl Middleware for Noop {
        fn process(
            &self,
            request: RequestContext,
            next: &mut dyn RequestHandler,
        ) -> Result<Response, DispatchError> {
            next.handle(request)
        }
    }

    #[test]
    fn test_resolve_through_container_and_alias() {
        let mut container = Container::new();
        container.register::<Noop>();
        let mut registry = MiddlewareRegistry::new();
        registry.register::<Noop>().alias("noop", ServiceId::of::<Noop>());

        let id = registry.lookup("noop").unwrap();
        let first = registry.resolve(&id, &container).unwrap();
        let second = registry.resolve(&id, &container).unwrap();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_failures_are_skipped() {
        let container = Container::new();
        let mut registry = MiddlewareRegistry::new();
        // Registered with the registry but not with the container.
        registry.register::<Noop>();

        let err = registry
            .resolve(&ServiceId::of::<Noop>(), &container)
            .err()
            .unwrap();
        assert!(matches!(err, MiddlewareError::Initialization { .. }));

        let resolved = registry.resolve_all(
            &[ServiceId::named("Missing"), ServiceId::of::<Noop>()],
            &container,
        );
        assert!(resolved.is_empty());
    }

    #[test]
    fn test_shared_instance() {
        let container = Container::new();
        let mut registry = MiddlewareRegistry::new();
        let shared: Arc<dyn Middleware> = Arc::new(Noop);
        registry.register_shared(ServiceId::named("shared"), Arc::clone(&shared));
        let resolved = registry.resolve_all(&[ServiceId::named("shared")], &container);
        assert_eq!(resolved.len(), 1);
        assert!(Arc::ptr_eq(&resolved[0], &shared));
        assert_eq!(registry.lookup("shared"), Some(ServiceId::named("shared")));
    }
}
