use std::sync::Arc;

use http::Method;
use thiserror::Error;

use super::RoutePattern;
use crate::container::ServiceId;
use crate::handler::Action;
use crate::http::ParamVec;

/// Route registration failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("invalid route pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// Which controller method a route targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerRef {
    pub controller: ServiceId,
    pub action: &'static str,
    /// `false` when the controller keeps per-request state and must not be pooled.
    pub pooled: bool,
}

impl HandlerRef {
    /// `Controller::action`, using the short controller name.
    #[must_use]
    pub fn display_name(&self) -> String {
        format!("{}::{}", self.controller.short_name(), self.action)
    }
}

/// One registered route: method, pattern, target and middleware.
///
/// Immutable once created; the pattern is compiled exactly once, here.
#[derive(Debug, Clone)]
pub struct RouteDefinition {
    method: Method,
    pattern: RoutePattern,
    handler: HandlerRef,
    middleware: Vec<ServiceId>,
    action: Arc<Action>,
}

impl RouteDefinition {
    /// Build a route and compile its pattern.
    ///
    /// # Errors
    ///
    /// [`RouteError::InvalidPattern`] if `path` does not compile.
    pub fn new(
        method: Method,
        path: &str,
        handler: HandlerRef,
        middleware: Vec<ServiceId>,
        action: Action,
    ) -> Result<Self, RouteError> {
        Ok(Self {
            method,
            pattern: RoutePattern::compile(path)?,
            handler,
            middleware,
            action: Arc::new(action),
        })
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The path pattern as registered (e.g. `/users/{id}`).
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        self.pattern.as_str()
    }

    #[must_use]
    pub fn pattern(&self) -> &RoutePattern {
        &self.pattern
    }

    #[must_use]
    pub fn handler(&self) -> &HandlerRef {
        &self.handler
    }

    /// Route middleware ids, class-level first, de-duplicated.
    #[must_use]
    pub fn middleware(&self) -> &[ServiceId] {
        &self.middleware
    }

    #[must_use]
    pub fn action(&self) -> &Arc<Action> {
        &self.action
    }

    #[inline]
    #[must_use]
    pub fn has_parameters(&self) -> bool {
        !self.pattern.is_static()
    }

    #[inline]
    #[must_use]
    pub fn matches(&self, method: &Method, path: &str) -> bool {
        &self.method == method && self.pattern.is_match(path)
    }

    /// Path parameters of `path` under this route's pattern; empty when it does not match.
    #[must_use]
    pub fn extract_parameters(&self, path: &str) -> ParamVec {
        self.pattern.extract(path)
    }
}

/// Synthetic answer to an `OPTIONS` request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsRoute {
    pub path: String,
    /// Registered methods for the path, in registration order.
    pub allowed_methods: Vec<Method>,
}

impl OptionsRoute {
    /// `GET, POST` style value for the `Allow` header.
    #[must_use]
    pub fn allow_header(&self) -> String {
        self.allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// Result of [`Router::find_route`](super::Router::find_route).
#[derive(Debug, Clone)]
pub enum RouteMatch {
    Handler(Arc<RouteDefinition>),
    Options(OptionsRoute),
}

impl RouteMatch {
    #[must_use]
    pub fn as_handler(&self) -> Option<&Arc<RouteDefinition>> {
        match self {
            Self::Handler(route) => Some(route),
            Self::Options(_) => None,
        }
    }

    #[must_use]
    pub fn as_options(&self) -> Option<&OptionsRoute> {
        match self {
            Self::Options(options) => Some(options),
            Self::Handler(_) => None,
        }
    }
}
