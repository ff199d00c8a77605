//! # Handler Module
//!
//! Typed adapters between routes and controller methods.
//!
//! Each controller action is registered once, at bootstrap, as an [`Action`]: an ordered
//! list of declared parameters ([`ParamSpec`]) plus a closure that receives the controller
//! instance and the resolved [`Args`]. The dispatcher walks the parameter list per request,
//! fills an `Args` bag and invokes the closure; there is no reflection on the hot path.
//!
//! Handlers return a [`HandlerResult`], which the dispatcher normalizes into a
//! [`Response`](crate::http::Response).

use std::any::{type_name, Any};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::container::{Instance, ServiceId};
use crate::error::DispatchError;
use crate::http::{RequestContext, Response};
use crate::validation::{Dto, DtoBinder};

/// Declared type of a handler parameter.
#[derive(Debug, Clone)]
pub enum ParamKind {
    Int,
    Float,
    Bool,
    Str,
    /// The current [`RequestContext`].
    Request,
    /// A body-bound value object.
    Dto(DtoBinder),
    /// Anything else: resolved through the container.
    Service(ServiceId),
    /// No declared type. Always fails to resolve.
    Untyped,
}

impl ParamKind {
    /// Scalar kinds are filled from route parameters and request attributes.
    #[inline]
    #[must_use]
    pub fn is_primitive(&self) -> bool {
        matches!(self, Self::Int | Self::Float | Self::Bool | Self::Str)
    }

    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
            Self::Str => "string",
            Self::Request => "request",
            Self::Dto(binder) => binder.type_name(),
            Self::Service(_) => "service",
            Self::Untyped => "untyped",
        }
    }
}

/// One declared handler parameter.
#[derive(Debug, Clone)]
pub struct ParamSpec {
    pub name: &'static str,
    pub kind: ParamKind,
}

impl ParamSpec {
    #[must_use]
    pub fn new(name: &'static str, kind: ParamKind) -> Self {
        Self { name, kind }
    }

    #[must_use]
    pub fn dto<D: Dto>(name: &'static str) -> Self {
        Self::new(name, ParamKind::Dto(DtoBinder::of::<D>()))
    }

    #[must_use]
    pub fn service<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self::new(name, ParamKind::Service(ServiceId::of::<T>()))
    }
}

/// A resolved argument value.
pub enum ArgValue {
    Int(i64),
    Float(f64),
    Bool(bool),
    Str(String),
    Request(RequestContext),
    Dto(Box<dyn Any + Send>),
    Service(Instance),
}

impl Debug for ArgValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(v) => write!(f, "Int({v})"),
            Self::Float(v) => write!(f, "Float({v})"),
            Self::Bool(v) => write!(f, "Bool({v})"),
            Self::Str(v) => write!(f, "Str({v:?})"),
            Self::Request(req) => write!(f, "Request({} {})", req.method(), req.path()),
            Self::Dto(_) => f.write_str("Dto(..)"),
            Self::Service(_) => f.write_str("Service(..)"),
        }
    }
}

/// Arguments resolved for one handler invocation, in declaration order.
///
/// Accessors look values up by parameter name and fail with
/// [`DispatchError::ArgumentMismatch`] when the name is unknown or bound to another kind.
#[derive(Debug, Default)]
pub struct Args {
    values: Vec<(&'static str, ArgValue)>,
}

impl Args {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, name: &'static str, value: ArgValue) {
        self.values.push((name, value));
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ArgValue> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| v)
    }

    /// # Errors
    ///
    /// `ArgumentMismatch` if `name` is not an integer argument.
    pub fn int(&self, name: &str) -> Result<i64, DispatchError> {
        match self.get(name) {
            Some(ArgValue::Int(v)) => Ok(*v),
            _ => Err(mismatch(name, "int")),
        }
    }

    /// # Errors
    ///
    /// `ArgumentMismatch` if `name` is not a float argument.
    pub fn float(&self, name: &str) -> Result<f64, DispatchError> {
        match self.get(name) {
            Some(ArgValue::Float(v)) => Ok(*v),
            _ => Err(mismatch(name, "float")),
        }
    }

    /// # Errors
    ///
    /// `ArgumentMismatch` if `name` is not a bool argument.
    pub fn bool(&self, name: &str) -> Result<bool, DispatchError> {
        match self.get(name) {
            Some(ArgValue::Bool(v)) => Ok(*v),
            _ => Err(mismatch(name, "bool")),
        }
    }

    /// # Errors
    ///
    /// `ArgumentMismatch` if `name` is not a string argument.
    pub fn str(&self, name: &str) -> Result<&str, DispatchError> {
        match self.get(name) {
            Some(ArgValue::Str(v)) => Ok(v.as_str()),
            _ => Err(mismatch(name, "string")),
        }
    }

    /// The injected request (the first `Request` parameter).
    ///
    /// # Errors
    ///
    /// `ArgumentMismatch` if the action declared no request parameter.
    pub fn request(&self) -> Result<&RequestContext, DispatchError> {
        self.values
            .iter()
            .find_map(|(_, v)| match v {
                ArgValue::Request(req) => Some(req),
                _ => None,
            })
            .ok_or_else(|| mismatch("request", "request"))
    }

    /// Take ownership of a bound DTO.
    ///
    /// # Errors
    ///
    /// `ArgumentMismatch` if `name` is not a DTO of type `D` (or was already taken).
    pub fn dto<D: Dto>(&mut self, name: &str) -> Result<D, DispatchError> {
        let position = self
            .values
            .iter()
            .position(|(n, v)| *n == name && matches!(v, ArgValue::Dto(b) if (**b).is::<D>()))
            .ok_or_else(|| mismatch(name, type_name::<D>()))?;
        match self.values.remove(position).1 {
            ArgValue::Dto(boxed) => boxed
                .downcast::<D>()
                .map(|dto| *dto)
                .map_err(|_| mismatch(name, type_name::<D>())),
            _ => Err(mismatch(name, type_name::<D>())),
        }
    }

    /// A container-resolved concrete service.
    ///
    /// # Errors
    ///
    /// `ArgumentMismatch` if `name` is not a service of type `T`.
    pub fn service<T: Send + Sync + 'static>(&self, name: &str) -> Result<Arc<T>, DispatchError> {
        match self.get(name) {
            Some(ArgValue::Service(instance)) => Arc::clone(instance)
                .downcast::<T>()
                .map_err(|_| mismatch(name, type_name::<T>())),
            _ => Err(mismatch(name, type_name::<T>())),
        }
    }

    /// A container-resolved interface (`dyn Trait`).
    ///
    /// # Errors
    ///
    /// `ArgumentMismatch` if `name` is not bound to an `Arc<I>`.
    pub fn interface<I: ?Sized + Send + Sync + 'static>(
        &self,
        name: &str,
    ) -> Result<Arc<I>, DispatchError> {
        match self.get(name) {
            Some(ArgValue::Service(instance)) => Arc::clone(instance)
                .downcast::<Arc<I>>()
                .map(|wrapped| Arc::clone(&*wrapped))
                .map_err(|_| mismatch(name, type_name::<I>())),
            _ => Err(mismatch(name, type_name::<I>())),
        }
    }
}

fn mismatch(name: &str, expected: &'static str) -> DispatchError {
    DispatchError::ArgumentMismatch {
        name: name.to_string(),
        expected,
    }
}

/// What a controller action returns.
#[derive(Debug, Clone, PartialEq)]
pub enum HandlerResult {
    /// Passed through unchanged.
    Response(Response),
    /// Serialized as a 200 `application/json` response.
    Json(Value),
    /// Sent as a 200 `text/plain` response.
    Text(String),
}

impl HandlerResult {
    /// Serialize any `Serialize` value into a JSON result.
    ///
    /// # Errors
    ///
    /// `DispatchError::Handler` if serialization fails.
    pub fn json<T: Serialize>(value: &T) -> Result<Self, DispatchError> {
        serde_json::to_value(value)
            .map(Self::Json)
            .map_err(|e| DispatchError::handler(format!("response serialization failed: {e}")))
    }

    /// Normalize into a response.
    #[must_use]
    pub fn into_response(self) -> Response {
        match self {
            Self::Response(response) => response,
            Self::Json(value) => Response::json(200, &value),
            Self::Text(text) => Response::text(200, text),
        }
    }
}

impl From<Response> for HandlerResult {
    fn from(response: Response) -> Self {
        Self::Response(response)
    }
}

impl From<Value> for HandlerResult {
    fn from(value: Value) -> Self {
        Self::Json(value)
    }
}

impl From<String> for HandlerResult {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl From<&str> for HandlerResult {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

type ActionFn =
    Arc<dyn Fn(&Instance, &mut Args) -> Result<HandlerResult, DispatchError> + Send + Sync>;

/// A controller method captured at registration time.
#[derive(Clone)]
pub struct Action {
    name: &'static str,
    params: Vec<ParamSpec>,
    invoke: ActionFn,
}

impl Action {
    /// Wrap a closure over controller type `C`.
    #[must_use]
    pub fn for_controller<C, F>(name: &'static str, params: Vec<ParamSpec>, f: F) -> Self
    where
        C: Send + Sync + 'static,
        F: Fn(&C, &mut Args) -> Result<HandlerResult, DispatchError> + Send + Sync + 'static,
    {
        let invoke: ActionFn = Arc::new(move |instance: &Instance, args: &mut Args| {
            let controller = (**instance).downcast_ref::<C>().ok_or_else(|| {
                DispatchError::handler(format!(
                    "controller instance is not a {}",
                    type_name::<C>()
                ))
            })?;
            f(controller, args)
        });
        Self {
            name,
            params,
            invoke,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[inline]
    #[must_use]
    pub fn params(&self) -> &[ParamSpec] {
        &self.params
    }

    /// Run the action against a controller instance.
    ///
    /// # Errors
    ///
    /// Whatever the handler returns, or `Handler` if `controller` has the wrong type.
    pub fn invoke(
        &self,
        controller: &Instance,
        args: &mut Args,
    ) -> Result<HandlerResult, DispatchError> {
        (self.invoke)(controller, args)
    }
}

impl Debug for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Action")
            .field("name", &self.name)
            .field("params", &self.params)
            .finish_non_exhaustive()
    }
}
