//! Crate-level error taxonomy.
//!
//! Each subsystem owns its error enum ([`ContainerError`], [`RouteError`],
//! [`ConfigError`]); this module adds the request-time [`DispatchError`] that flows through
//! middleware and handlers, and the bootstrap-time [`BootError`].

use thiserror::Error;

use crate::config::ConfigError;
use crate::container::ContainerError;
use crate::router::RouteError;
use crate::validation::ValidationErrors;

/// Anything that can go wrong while dispatching one request.
///
/// The application maps variants to responses: `Validation` → 422, `BadParameter` → 400,
/// `Http` → its own status, everything else → 500.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// Building the controller or a service parameter failed.
    #[error(transparent)]
    Container(#[from] ContainerError),

    /// A DTO parameter failed validation.
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// No step of the parameter ladder could supply this handler parameter.
    #[error("Unable to resolve parameter `{parameter}` of {controller}::{action}: {reason}")]
    UnresolvableParameter {
        parameter: String,
        controller: String,
        action: String,
        reason: String,
    },

    /// A route parameter or attribute could not be converted to the declared type.
    #[error("Invalid value `{value}` for parameter `{parameter}`: expected {expected}")]
    BadParameter {
        parameter: String,
        expected: &'static str,
        value: String,
    },

    /// Handler code asked [`Args`](crate::handler::Args) for a value that was not bound
    /// with that name or type.
    #[error("Argument `{name}` is not available as {expected}")]
    ArgumentMismatch { name: String, expected: &'static str },

    /// Deliberate HTTP error raised by a handler or middleware.
    #[error("{message}")]
    Http { status: u16, message: String },

    /// Free-form handler failure.
    #[error("{0}")]
    Handler(String),
}

impl DispatchError {
    #[must_use]
    pub fn http(status: u16, message: impl Into<String>) -> Self {
        Self::Http {
            status,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn handler(message: impl Into<String>) -> Self {
        Self::Handler(message.into())
    }

    /// Status code this error maps to at the request boundary.
    #[must_use]
    pub fn status(&self) -> u16 {
        match self {
            Self::Validation(_) => 422,
            Self::BadParameter { .. } => 400,
            Self::Http { status, .. } => *status,
            _ => 500,
        }
    }
}

impl From<ValidationErrors> for DispatchError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Validation(errors)
    }
}

/// Failures while wiring the application together.
#[derive(Debug, Error)]
pub enum BootError {
    #[error("route registration failed: {0}")]
    Route(#[from] RouteError),

    #[error("service registration failed: {0}")]
    Container(#[from] ContainerError),

    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
}
