use std::marker::PhantomData;

use http::Method;

use super::{build_path, HandlerRef, RouteDefinition, RouteError};
use crate::container::{Injectable, ServiceId};
use crate::error::DispatchError;
use crate::handler::{Action, Args, HandlerResult, ParamKind, ParamSpec};
use crate::validation::Dto;

/// A type whose methods handle routes.
///
/// `routes` declares the class-level prefix and middleware and one entry per action,
/// the same information a route attribute would carry:
///
/// ```rust,ignore
/// impl Controller for UserController {
///     fn routes(r: &mut ControllerRoutes<Self>) {
///         r.prefix("/users").middleware::<AuthMiddleware>();
///         r.get("/{id}", "show")
///             .int("id")
///             .to(|c, args| c.show(args.int("id")?));
///         r.post("/", "create")
///             .dto::<CreateUser>("body")
///             .to(|c, args| c.create(args.dto("body")?));
///     }
/// }
/// ```
pub trait Controller: Injectable {
    fn routes(routes: &mut ControllerRoutes<Self>);
}

pub(crate) struct DeclaredAction {
    method: Method,
    path: String,
    middleware: Vec<ServiceId>,
    action: Action,
}

/// Route declarations collected from one [`Controller`].
pub struct ControllerRoutes<C> {
    prefix: String,
    middleware: Vec<ServiceId>,
    pooled: bool,
    actions: Vec<DeclaredAction>,
    _controller: PhantomData<fn() -> C>,
}

impl<C: Controller> ControllerRoutes<C> {
    pub(crate) fn new() -> Self {
        Self {
            prefix: String::new(),
            middleware: Vec::new(),
            pooled: true,
            actions: Vec::new(),
            _controller: PhantomData,
        }
    }

    /// Class-level path prefix, placed after the mount prefix.
    pub fn prefix(&mut self, prefix: &str) -> &mut Self {
        self.prefix = prefix.to_string();
        self
    }

    /// Class-level middleware, applied to every action before method-level middleware.
    pub fn middleware<M: ?Sized + 'static>(&mut self) -> &mut Self {
        self.middleware_id(ServiceId::of::<M>())
    }

    pub fn middleware_id(&mut self, id: ServiceId) -> &mut Self {
        self.middleware.push(id);
        self
    }

    /// Mark the controller as carrying per-request state.
    ///
    /// Stateful controllers are built fresh for every request instead of being pooled.
    pub fn stateful(&mut self) -> &mut Self {
        self.pooled = false;
        self
    }

    pub fn route(&mut self, method: Method, path: &str, name: &'static str) -> ActionBuilder<'_, C> {
        ActionBuilder {
            routes: self,
            method,
            path: path.to_string(),
            name,
            params: Vec::new(),
            middleware: Vec::new(),
        }
    }

    pub fn get(&mut self, path: &str, name: &'static str) -> ActionBuilder<'_, C> {
        self.route(Method::GET, path, name)
    }

    pub fn post(&mut self, path: &str, name: &'static str) -> ActionBuilder<'_, C> {
        self.route(Method::POST, path, name)
    }

    pub fn put(&mut self, path: &str, name: &'static str) -> ActionBuilder<'_, C> {
        self.route(Method::PUT, path, name)
    }

    pub fn patch(&mut self, path: &str, name: &'static str) -> ActionBuilder<'_, C> {
        self.route(Method::PATCH, path, name)
    }

    pub fn delete(&mut self, path: &str, name: &'static str) -> ActionBuilder<'_, C> {
        self.route(Method::DELETE, path, name)
    }

    pub fn options(&mut self, path: &str, name: &'static str) -> ActionBuilder<'_, C> {
        self.route(Method::OPTIONS, path, name)
    }

    /// Turn the declarations into route definitions mounted under `mount`.
    ///
    /// Either every action compiles or none is returned.
    pub(crate) fn into_definitions(self, mount: &str) -> Result<Vec<RouteDefinition>, RouteError> {
        let controller = ServiceId::of::<C>();
        let base = build_path(mount, &self.prefix);
        self.actions
            .into_iter()
            .map(|declared| {
                let path = build_path(&base, &declared.path);
                let middleware = merge_middleware(&self.middleware, &declared.middleware);
                RouteDefinition::new(
                    declared.method,
                    &path,
                    HandlerRef {
                        controller: controller.clone(),
                        action: declared.action.name(),
                        pooled: self.pooled,
                    },
                    middleware,
                    declared.action,
                )
            })
            .collect()
    }
}

/// Class-level entries first, then method-level, dropping repeats.
#[must_use]
pub fn merge_middleware(class_level: &[ServiceId], method_level: &[ServiceId]) -> Vec<ServiceId> {
    let mut merged: Vec<ServiceId> = Vec::with_capacity(class_level.len() + method_level.len());
    for id in class_level.iter().chain(method_level) {
        if !merged.contains(id) {
            merged.push(id.clone());
        }
    }
    merged
}

/// One action under construction. Nothing is registered until [`to`](Self::to) is called.
#[must_use = "an action is only registered once `.to(...)` is called"]
pub struct ActionBuilder<'r, C> {
    routes: &'r mut ControllerRoutes<C>,
    method: Method,
    path: String,
    name: &'static str,
    params: Vec<ParamSpec>,
    middleware: Vec<ServiceId>,
}

impl<C: Controller> ActionBuilder<'_, C> {
    pub fn param(mut self, spec: ParamSpec) -> Self {
        self.params.push(spec);
        self
    }

    pub fn int(self, name: &'static str) -> Self {
        self.param(ParamSpec::new(name, ParamKind::Int))
    }

    pub fn float(self, name: &'static str) -> Self {
        self.param(ParamSpec::new(name, ParamKind::Float))
    }

    pub fn bool(self, name: &'static str) -> Self {
        self.param(ParamSpec::new(name, ParamKind::Bool))
    }

    pub fn string(self, name: &'static str) -> Self {
        self.param(ParamSpec::new(name, ParamKind::Str))
    }

    /// Inject the current request.
    pub fn request(self, name: &'static str) -> Self {
        self.param(ParamSpec::new(name, ParamKind::Request))
    }

    /// Bind and validate the request body as `D`.
    pub fn dto<D: Dto>(self, name: &'static str) -> Self {
        self.param(ParamSpec::dto::<D>(name))
    }

    /// Resolve `S` (a concrete type or a `dyn Trait`) from the container.
    pub fn service<S: ?Sized + 'static>(self, name: &'static str) -> Self {
        self.param(ParamSpec::service::<S>(name))
    }

    /// A parameter with no declared type; dispatching this action always fails.
    pub fn untyped(self, name: &'static str) -> Self {
        self.param(ParamSpec::new(name, ParamKind::Untyped))
    }

    /// Method-level middleware, run after the class-level list.
    pub fn middleware<M: ?Sized + 'static>(mut self) -> Self {
        self.middleware.push(ServiceId::of::<M>());
        self
    }

    pub fn middleware_id(mut self, id: ServiceId) -> Self {
        self.middleware.push(id);
        self
    }

    /// Finish the declaration with the handler closure.
    pub fn to<F>(self, handler: F)
    where
        F: Fn(&C, &mut Args) -> Result<HandlerResult, DispatchError> + Send + Sync + 'static,
    {
        let action = Action::for_controller::<C, F>(self.name, self.params, handler);
        self.routes.actions.push(DeclaredAction {
            method: self.method,
            path: self.path,
            middleware: self.middleware,
            action,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_middleware_preserves_first_occurrence() {
        let a = ServiceId::named("A");
        let b = ServiceId::named("B");
        let c = ServiceId::named("C");
        let merged = merge_middleware(&[a.clone(), b.clone()], &[b.clone(), c.clone(), a.clone()]);
        assert_eq!(merged, vec![a, b, c]);
    }
}
