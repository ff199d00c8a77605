use std::any::type_name;
use std::collections::VecDeque;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

use super::{ContainerError, Instance};

/// Identifier of a service in the [`Container`](super::Container).
///
/// Typed ids come from the Rust type name (`ServiceId::of::<UserRepo>()`, or
/// `ServiceId::of::<dyn Mailer>()` for an interface). Free-form ids made with
/// [`ServiceId::named`] are allowed for factories and aliases.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServiceId(Arc<str>);

impl ServiceId {
    #[must_use]
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self(Arc::from(type_name::<T>()))
    }

    #[must_use]
    pub fn named(name: &str) -> Self {
        Self(Arc::from(name))
    }

    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last path segment of the id (`app::users::UserController` → `UserController`).
    #[must_use]
    pub fn short_name(&self) -> &str {
        let base = self.0.split('<').next().unwrap_or(&self.0);
        base.rsplit("::").next().unwrap_or(base)
    }
}

impl Display for ServiceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl Debug for ServiceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "ServiceId({})", self.0)
    }
}

impl From<&str> for ServiceId {
    fn from(name: &str) -> Self {
        Self::named(name)
    }
}

/// Declared type of a constructor parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParamType {
    /// Another service the container can build.
    Service(ServiceId),
    /// A scalar/built-in type (`int`, `String`, ...). The container cannot guess these.
    Builtin(&'static str),
    /// No type at all.
    Untyped,
}

/// One constructor parameter: its name and declared type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dependency {
    pub name: &'static str,
    pub ty: ParamType,
}

impl Dependency {
    /// A parameter of service type `T`.
    #[must_use]
    pub fn service<T: ?Sized + 'static>(name: &'static str) -> Self {
        Self {
            name,
            ty: ParamType::Service(ServiceId::of::<T>()),
        }
    }

    /// A parameter resolved through an explicit id.
    #[must_use]
    pub fn id(name: &'static str, id: ServiceId) -> Self {
        Self {
            name,
            ty: ParamType::Service(id),
        }
    }

    #[must_use]
    pub fn builtin(name: &'static str, type_label: &'static str) -> Self {
        Self {
            name,
            ty: ParamType::Builtin(type_label),
        }
    }

    #[must_use]
    pub fn untyped(name: &'static str) -> Self {
        Self {
            name,
            ty: ParamType::Untyped,
        }
    }
}

/// A type the container knows how to construct.
///
/// `dependencies` is the ordered constructor parameter list; the default (empty) means a
/// no-argument constructor. `construct` receives the resolved parameters in that order.
pub trait Injectable: Send + Sync + Sized + 'static {
    fn dependencies() -> Vec<Dependency> {
        Vec::new()
    }

    /// Build the instance from resolved dependencies.
    ///
    /// # Errors
    ///
    /// Whatever the constructor considers fatal; use [`Arguments::fail`] for custom errors.
    fn construct(args: &mut Arguments) -> Result<Self, ContainerError>;
}

/// Resolved constructor arguments, consumed in declaration order.
pub struct Arguments {
    owner: ServiceId,
    values: VecDeque<(Dependency, Instance)>,
}

impl Arguments {
    pub(crate) fn new(owner: ServiceId, values: Vec<(Dependency, Instance)>) -> Self {
        Self {
            owner,
            values: values.into(),
        }
    }

    /// The id being constructed.
    #[must_use]
    pub fn owner(&self) -> &ServiceId {
        &self.owner
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Take the next argument as a concrete service.
    ///
    /// # Errors
    ///
    /// `UnresolvableParameter` when the list is exhausted, `TypeMismatch` when the instance
    /// is not a `T`.
    pub fn next<T: Send + Sync + 'static>(&mut self) -> Result<Arc<T>, ContainerError> {
        let (dependency, instance) = self.pop()?;
        downcast_instance::<T>(&dependency, instance)
    }

    /// Take the next argument as an interface (`dyn Trait`) bound with
    /// [`Container::bind_interface`](super::Container::bind_interface).
    ///
    /// # Errors
    ///
    /// Same as [`next`](Self::next).
    pub fn next_interface<I: ?Sized + Send + Sync + 'static>(
        &mut self,
    ) -> Result<Arc<I>, ContainerError> {
        let (dependency, instance) = self.pop()?;
        let wrapped = downcast_instance::<Arc<I>>(&dependency, instance)?;
        Ok(Arc::clone(&*wrapped))
    }

    /// Build a [`ContainerError::Construction`] attributed to the owner.
    #[must_use]
    pub fn fail(&self, message: impl Into<String>) -> ContainerError {
        ContainerError::Construction {
            id: self.owner.clone(),
            message: message.into(),
        }
    }

    fn pop(&mut self) -> Result<(Dependency, Instance), ContainerError> {
        self.values
            .pop_front()
            .ok_or_else(|| ContainerError::UnresolvableParameter {
                parameter: "<missing>".to_string(),
                owner: self.owner.clone(),
                detail: "constructor requested more arguments than it declared".to_string(),
            })
    }
}

fn downcast_instance<T: Send + Sync + 'static>(
    dependency: &Dependency,
    instance: Instance,
) -> Result<Arc<T>, ContainerError> {
    instance
        .downcast::<T>()
        .map_err(|_| ContainerError::TypeMismatch {
            id: match &dependency.ty {
                ParamType::Service(id) => id.clone(),
                _ => ServiceId::named(dependency.name),
            },
            expected: type_name::<T>(),
        })
}
