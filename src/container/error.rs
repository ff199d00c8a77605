use thiserror::Error;

use super::ServiceId;

/// Failures raised while building an object graph.
///
/// All variants are local and synchronous: they describe a broken dependency graph and are
/// never worth retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ContainerError {
    /// Nothing is registered, bound or cached under this id.
    #[error("Class not found: {0}")]
    ClassNotFound(ServiceId),

    /// The id is known but cannot be constructed (abstract without binding).
    #[error("Cannot instantiate {id}: {reason}")]
    NotInstantiable { id: ServiceId, reason: String },

    /// `id` was requested while it was already being constructed.
    #[error("Circular dependency detected while resolving {id}: {path}")]
    CircularDependency { id: ServiceId, path: String },

    /// A constructor parameter has no injectable type.
    #[error("Cannot resolve parameter `{parameter}` of {owner}: {detail}")]
    UnresolvableParameter {
        parameter: String,
        owner: ServiceId,
        detail: String,
    },

    /// The cached instance is not of the requested Rust type.
    #[error("Service {id} is not a `{expected}`")]
    TypeMismatch {
        id: ServiceId,
        expected: &'static str,
    },

    /// A constructor returned an error of its own.
    #[error("Failed to construct {id}: {message}")]
    Construction { id: ServiceId, message: String },
}

impl ContainerError {
    /// The service id the error is about.
    #[must_use]
    pub fn service_id(&self) -> &ServiceId {
        match self {
            Self::ClassNotFound(id)
            | Self::NotInstantiable { id, .. }
            | Self::CircularDependency { id, .. }
            | Self::TypeMismatch { id, .. }
            | Self::Construction { id, .. } => id,
            Self::UnresolvableParameter { owner, .. } => owner,
        }
    }
}
