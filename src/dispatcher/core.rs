use std::sync::Arc;
use std::time::Instant;

use dashmap::DashMap;
use serde_json::Value;
use tracing::{debug, info};

use crate::container::{Container, ContainerError, Instance, ServiceId};
use crate::error::DispatchError;
use crate::handler::{ArgValue, Args, ParamKind, ParamSpec};
use crate::http::{ParamVec, RequestContext, Response};
use crate::middleware::{handler_fn, MiddlewarePipeline, MiddlewareRegistry, RequestHandler};
use crate::router::{HandlerRef, OptionsRoute, RouteDefinition};

/// Dispatcher counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatcherStats {
    pub pooled_controllers: usize,
}

/// Invokes controller actions.
///
/// Holds one pooled instance per controller type so that repeated requests skip
/// construction. Pooling assumes controllers are stateless; controllers that declared
/// themselves `stateful()` are built fresh per request.
#[derive(Default)]
pub struct Dispatcher {
    pool: DashMap<ServiceId, Instance>,
}

impl Dispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `route`'s action for `request`.
    ///
    /// # Arguments
    ///
    /// * `container` - Source of controllers and service parameters
    /// * `route` - The matched route
    /// * `request` - The request as seen by the innermost middleware
    ///
    /// # Errors
    ///
    /// Controller construction, parameter resolution and handler failures.
    pub fn dispatch(
        &self,
        container: &Container,
        route: &RouteDefinition,
        request: RequestContext,
    ) -> Result<Response, DispatchError> {
        let start = Instant::now();
        let handler = route.handler();
        let controller = self.controller_for(container, handler)?;
        let params = route.extract_parameters(request.path());
        let mut args = self.resolve_arguments(container, route, &params, &request)?;

        let result = route.action().invoke(&controller, &mut args)?;
        let response = result.into_response();

        debug!(
            handler = %handler.display_name(),
            route_pattern = %route.path(),
            status = response.status,
            duration_us = start.elapsed().as_micros(),
            "Handler dispatched"
        );
        Ok(response)
    }

    /// The synthetic answer to `OPTIONS`: `204` with an `Allow` header.
    #[must_use]
    pub fn options_response(options: &OptionsRoute) -> Response {
        Response::empty(204).with_header("Allow", options.allow_header())
    }

    /// Pooled (or, for stateful controllers, fresh) controller instance.
    ///
    /// # Errors
    ///
    /// Container errors while building the controller.
    pub fn controller_for(
        &self,
        container: &Container,
        handler: &HandlerRef,
    ) -> Result<Instance, DispatchError> {
        if !handler.pooled {
            return Ok(container.build_fresh(&handler.controller)?);
        }
        if let Some(instance) = self.pool.get(&handler.controller) {
            return Ok(Arc::clone(instance.value()));
        }
        let instance = container.resolve_id(&handler.controller)?;
        let pooled = Arc::clone(
            self.pool
                .entry(handler.controller.clone())
                .or_insert(instance)
                .value(),
        );
        info!(controller = %handler.controller, "Controller pooled");
        Ok(pooled)
    }

    /// Walk the parameter ladder for every declared parameter of the route's action.
    ///
    /// # Errors
    ///
    /// `UnresolvableParameter`, `BadParameter`, `Validation` or container errors.
    pub fn resolve_arguments(
        &self,
        container: &Container,
        route: &RouteDefinition,
        params: &ParamVec,
        request: &RequestContext,
    ) -> Result<Args, DispatchError> {
        let mut args = Args::new();
        for spec in route.action().params() {
            let value = match &spec.kind {
                ParamKind::Int | ParamKind::Float | ParamKind::Bool | ParamKind::Str => {
                    let from_route = params
                        .iter()
                        .rfind(|(name, _)| name.as_ref() == spec.name)
                        .map(|(_, raw)| raw.as_str());
                    if let Some(raw) = from_route {
                        convert_raw(spec, raw)?
                    } else if let Some(attribute) = request.attribute(spec.name) {
                        convert_attribute(spec, attribute)?
                    } else {
                        return Err(unresolvable(
                            spec,
                            route,
                            "no route parameter or request attribute with this name",
                        ));
                    }
                }
                ParamKind::Request => ArgValue::Request(request.clone()),
                ParamKind::Dto(binder) => {
                    let dto = binder.bind(request.body()).map_err(|errors| {
                        debug!(
                            parameter = spec.name,
                            dto = binder.type_name(),
                            fields = errors.len(),
                            "DTO validation failed"
                        );
                        DispatchError::Validation(errors)
                    })?;
                    ArgValue::Dto(dto)
                }
                ParamKind::Service(id) => match container.resolve_id(id) {
                    Ok(instance) => ArgValue::Service(instance),
                    Err(
                        error @ (ContainerError::ClassNotFound(_)
                        | ContainerError::NotInstantiable { .. }),
                    ) => return Err(unresolvable(spec, route, &error.to_string())),
                    Err(error) => return Err(error.into()),
                },
                ParamKind::Untyped => {
                    return Err(unresolvable(spec, route, "parameter has no declared type"))
                }
            };
            args.push(spec.name, value);
        }
        Ok(args)
    }

    #[must_use]
    pub fn stats(&self) -> DispatcherStats {
        DispatcherStats {
            pooled_controllers: self.pool.len(),
        }
    }

    /// Drop every pooled controller.
    pub fn clear_pool(&self) {
        self.pool.clear();
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pooled_controllers", &self.pool.len())
            .finish()
    }
}

/// Convert a raw route segment to the declared scalar type.
///
/// Booleans are permissive: `1`, `true`, `on` and `yes` (any case) are true, anything
/// else is false.
///
/// # Errors
///
/// `BadParameter` when an `int` or `float` does not parse.
pub fn convert_raw(spec: &ParamSpec, raw: &str) -> Result<ArgValue, DispatchError> {
    let bad = |expected: &'static str| DispatchError::BadParameter {
        parameter: spec.name.to_string(),
        expected,
        value: raw.to_string(),
    };
    Ok(match spec.kind {
        ParamKind::Int => ArgValue::Int(raw.trim().parse().map_err(|_| bad("integer"))?),
        ParamKind::Float => ArgValue::Float(raw.trim().parse().map_err(|_| bad("float"))?),
        ParamKind::Bool => ArgValue::Bool(is_truthy(raw)),
        _ => ArgValue::Str(raw.to_string()),
    })
}

fn convert_attribute(spec: &ParamSpec, value: &Value) -> Result<ArgValue, DispatchError> {
    match (&spec.kind, value) {
        (_, Value::String(raw)) => convert_raw(spec, raw),
        (ParamKind::Int, Value::Number(n)) if n.as_i64().is_some() => {
            Ok(ArgValue::Int(n.as_i64().unwrap_or_default()))
        }
        (ParamKind::Float, Value::Number(n)) => Ok(ArgValue::Float(n.as_f64().unwrap_or_default())),
        (ParamKind::Bool, Value::Bool(b)) => Ok(ArgValue::Bool(*b)),
        (ParamKind::Bool, Value::Number(n)) => Ok(ArgValue::Bool(n.as_f64().is_some_and(|f| f != 0.0))),
        (ParamKind::Str, other) => Ok(ArgValue::Str(other.to_string())),
        (kind, other) => Err(DispatchError::BadParameter {
            parameter: spec.name.to_string(),
            expected: kind.label(),
            value: other.to_string(),
        }),
    }
}

fn is_truthy(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "on" | "yes"
    )
}

fn unresolvable(spec: &ParamSpec, route: &RouteDefinition, reason: &str) -> DispatchError {
    DispatchError::UnresolvableParameter {
        parameter: spec.name.to_string(),
        controller: route.handler().controller.to_string(),
        action: route.handler().action.to_string(),
        reason: reason.to_string(),
    }
}

/// Terminal handler of the global pipeline for one matched route.
///
/// Runs the route middleware in an inner pipeline around [`Dispatcher::dispatch`].
pub struct RouteHandler<'a> {
    dispatcher: &'a Dispatcher,
    container: &'a Container,
    registry: &'a MiddlewareRegistry,
    route: Arc<RouteDefinition>,
}

impl<'a> RouteHandler<'a> {
    #[must_use]
    pub fn new(
        dispatcher: &'a Dispatcher,
        container: &'a Container,
        registry: &'a MiddlewareRegistry,
        route: Arc<RouteDefinition>,
    ) -> Self {
        Self {
            dispatcher,
            container,
            registry,
            route,
        }
    }
}

impl RequestHandler for RouteHandler<'_> {
    fn handle(&mut self, request: RequestContext) -> Result<Response, DispatchError> {
        let middleware = self
            .registry
            .resolve_all(self.route.middleware(), self.container);
        let dispatcher = self.dispatcher;
        let container = self.container;
        let route = Arc::clone(&self.route);
        let mut pipeline = MiddlewarePipeline::with_middleware(
            middleware,
            handler_fn(move |request| dispatcher.dispatch(container, &route, request)),
        );
        pipeline.handle(request)
    }
}
