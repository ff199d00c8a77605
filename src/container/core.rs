use std::any::{type_name, Any};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info, warn};

use super::{Arguments, ContainerError, Dependency, Injectable, ParamType, ServiceId};

/// A live, shared service instance.
pub type Instance = Arc<dyn Any + Send + Sync>;

type Factory = Arc<dyn Fn(&mut Arguments) -> Result<Instance, ContainerError> + Send + Sync>;
type Caster = Arc<dyn Fn(Instance) -> Result<Instance, ContainerError> + Send + Sync>;

/// How to build one concrete id.
#[derive(Clone)]
struct Descriptor {
    dependencies: Vec<Dependency>,
    factory: Factory,
}

/// Dependency injection container with a process-lifetime instance cache.
///
/// Registration (`register*`, `bind*`, `interface`) needs `&mut self` and happens during
/// bootstrap. Resolution only needs `&self`: the instance cache sits behind a
/// `parking_lot::RwLock` and the resolution stack lives on the caller's stack, so a
/// container can be shared across worker threads once bootstrap is finished.
///
/// If two threads construct the same id concurrently, the first cached instance wins and
/// both callers receive it.
#[derive(Default)]
pub struct Container {
    descriptors: HashMap<ServiceId, Descriptor>,
    abstracts: HashSet<ServiceId>,
    bindings: HashMap<ServiceId, ServiceId>,
    casters: HashMap<ServiceId, Caster>,
    instances: RwLock<HashMap<ServiceId, Instance>>,
}

/// Ids currently under construction within one top-level resolve.
#[derive(Default)]
struct ResolutionStack(Vec<ServiceId>);

impl ResolutionStack {
    fn contains(&self, id: &ServiceId) -> bool {
        self.0.contains(id)
    }

    /// Render the chain that closes on `id`, e.g. `A -> B -> A`.
    fn cycle_path(&self, id: &ServiceId) -> String {
        let start = self.0.iter().position(|entry| entry == id).unwrap_or(0);
        self.0[start..]
            .iter()
            .chain(std::iter::once(id))
            .map(ServiceId::short_name)
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

impl Container {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an [`Injectable`] type under `ServiceId::of::<T>()`.
    pub fn register<T: Injectable>(&mut self) -> &mut Self {
        let factory: Factory = Arc::new(|args: &mut Arguments| {
            T::construct(args).map(|value| Arc::new(value) as Instance)
        });
        self.insert_descriptor(
            ServiceId::of::<T>(),
            Descriptor {
                dependencies: T::dependencies(),
                factory,
            },
        );
        self
    }

    /// Register a closure-built service under an arbitrary id.
    pub fn register_factory<T, F>(
        &mut self,
        id: ServiceId,
        dependencies: Vec<Dependency>,
        factory: F,
    ) -> &mut Self
    where
        T: Send + Sync + 'static,
        F: Fn(&mut Arguments) -> Result<T, ContainerError> + Send + Sync + 'static,
    {
        let factory: Factory =
            Arc::new(move |args: &mut Arguments| factory(args).map(|v| Arc::new(v) as Instance));
        self.insert_descriptor(
            id,
            Descriptor {
                dependencies,
                factory,
            },
        );
        self
    }

    /// Place a ready-made value straight into the instance cache.
    pub fn register_instance<T: Send + Sync + 'static>(&mut self, value: T) -> &mut Self {
        let id = ServiceId::of::<T>();
        debug!(service = %id, "Registered prebuilt instance");
        self.instances.write().insert(id, Arc::new(value));
        self
    }

    /// Declare `I` as abstract: resolving it without a binding is `NotInstantiable`.
    pub fn interface<I: ?Sized + 'static>(&mut self) -> &mut Self {
        self.abstracts.insert(ServiceId::of::<I>());
        self
    }

    /// Record that `abstract_id` resolves to `concrete`. Last write wins.
    ///
    /// Instances already cached are not touched.
    pub fn bind(&mut self, abstract_id: ServiceId, concrete: ServiceId) -> &mut Self {
        debug!(abstract_id = %abstract_id, concrete = %concrete, "Binding registered");
        self.bindings.insert(abstract_id, concrete);
        self
    }

    /// Bind the interface `I` to the concrete `C`.
    ///
    /// `upcast` converts the concrete instance into the trait object, so that
    /// [`resolve_interface::<I>`](Self::resolve_interface) and
    /// [`Arguments::next_interface`] hand out `Arc<I>`.
    pub fn bind_interface<I, C, F>(&mut self, upcast: F) -> &mut Self
    where
        I: ?Sized + Send + Sync + 'static,
        C: Send + Sync + 'static,
        F: Fn(Arc<C>) -> Arc<I> + Send + Sync + 'static,
    {
        let abstract_id = ServiceId::of::<I>();
        let caster: Caster = Arc::new(move |instance: Instance| {
            let concrete = instance
                .downcast::<C>()
                .map_err(|_| ContainerError::TypeMismatch {
                    id: ServiceId::of::<C>(),
                    expected: type_name::<C>(),
                })?;
            Ok(Arc::new(upcast(concrete)) as Instance)
        });
        self.abstracts.insert(abstract_id.clone());
        self.casters.insert(abstract_id.clone(), caster);
        self.bind(abstract_id, ServiceId::of::<C>())
    }

    /// Bind (when `concrete` differs from `abstract_id`) and resolve eagerly.
    ///
    /// # Errors
    ///
    /// Any resolution error of the eager build.
    pub fn singleton(
        &mut self,
        abstract_id: ServiceId,
        concrete: Option<ServiceId>,
    ) -> Result<Instance, ContainerError> {
        if let Some(concrete) = concrete {
            if concrete != abstract_id {
                self.bind(abstract_id.clone(), concrete);
            }
        }
        let instance = self.resolve_id(&abstract_id)?;
        info!(service = %abstract_id, "Singleton constructed eagerly");
        Ok(instance)
    }

    /// Resolve `id` into its cached or freshly built instance.
    ///
    /// # Errors
    ///
    /// See [`ContainerError`].
    pub fn resolve_id(&self, id: &ServiceId) -> Result<Instance, ContainerError> {
        let mut stack = ResolutionStack::default();
        self.resolve_with(id, &mut stack)
    }

    /// Resolve the concrete type `T`.
    ///
    /// # Errors
    ///
    /// Resolution errors, or `TypeMismatch` if the id holds something other than `T`.
    pub fn resolve<T: Send + Sync + 'static>(&self) -> Result<Arc<T>, ContainerError> {
        let id = ServiceId::of::<T>();
        let instance = self.resolve_id(&id)?;
        instance
            .downcast::<T>()
            .map_err(|_| ContainerError::TypeMismatch {
                id,
                expected: type_name::<T>(),
            })
    }

    /// Resolve an interface bound with [`bind_interface`](Self::bind_interface).
    ///
    /// # Errors
    ///
    /// Resolution errors, or `TypeMismatch` if the binding carries no upcast.
    pub fn resolve_interface<I: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Arc<I>, ContainerError> {
        let id = ServiceId::of::<I>();
        let instance = self.resolve_id(&id)?;
        let wrapped = instance
            .downcast::<Arc<I>>()
            .map_err(|_| ContainerError::TypeMismatch {
                id,
                expected: type_name::<Arc<I>>(),
            })?;
        Ok(Arc::clone(&*wrapped))
    }

    /// Build a new instance that bypasses (and does not populate) the cache.
    ///
    /// Bindings are followed; the constructor's own dependencies still come from the cache.
    ///
    /// # Errors
    ///
    /// Same as [`resolve_id`](Self::resolve_id).
    pub fn build_fresh(&self, id: &ServiceId) -> Result<Instance, ContainerError> {
        let mut concrete = id;
        let mut hops = 0;
        while let Some(next) = self.bindings.get(concrete) {
            concrete = next;
            hops += 1;
            if hops > self.bindings.len() {
                return Err(ContainerError::CircularDependency {
                    id: id.clone(),
                    path: format!("{} -> ... -> {}", id.short_name(), id.short_name()),
                });
            }
        }
        let descriptor = self.descriptor_for(concrete)?;
        let mut stack = ResolutionStack::default();
        stack.0.push(concrete.clone());
        let result = self.construct(concrete, &descriptor, &mut stack);
        stack.0.pop();
        result
    }

    /// `true` if `id` is registered, bound, declared abstract or already cached.
    #[must_use]
    pub fn has(&self, id: &ServiceId) -> bool {
        self.descriptors.contains_key(id)
            || self.bindings.contains_key(id)
            || self.abstracts.contains(id)
            || self.instances.read().contains_key(id)
    }

    #[must_use]
    pub fn is_resolved(&self, id: &ServiceId) -> bool {
        self.instances.read().contains_key(id)
    }

    #[must_use]
    pub fn resolved_count(&self) -> usize {
        self.instances.read().len()
    }

    /// The concrete id an abstract id is bound to, if any.
    #[must_use]
    pub fn binding(&self, abstract_id: &ServiceId) -> Option<&ServiceId> {
        self.bindings.get(abstract_id)
    }

    fn insert_descriptor(&mut self, id: ServiceId, descriptor: Descriptor) {
        debug!(
            service = %id,
            dependencies = descriptor.dependencies.len(),
            "Service registered"
        );
        self.descriptors.insert(id, descriptor);
    }

    fn descriptor_for(&self, id: &ServiceId) -> Result<Descriptor, ContainerError> {
        if let Some(descriptor) = self.descriptors.get(id) {
            return Ok(descriptor.clone());
        }
        if self.abstracts.contains(id) {
            return Err(ContainerError::NotInstantiable {
                id: id.clone(),
                reason: "abstract identifier has no binding".to_string(),
            });
        }
        Err(ContainerError::ClassNotFound(id.clone()))
    }

    fn cached(&self, id: &ServiceId) -> Option<Instance> {
        self.instances.read().get(id).map(Arc::clone)
    }

    fn resolve_with(
        &self,
        id: &ServiceId,
        stack: &mut ResolutionStack,
    ) -> Result<Instance, ContainerError> {
        if let Some(instance) = self.cached(id) {
            debug!(service = %id, "Resolved from cache");
            return Ok(instance);
        }

        if stack.contains(id) {
            let path = stack.cycle_path(id);
            warn!(service = %id, path = %path, "Circular dependency detected");
            return Err(ContainerError::CircularDependency {
                id: id.clone(),
                path,
            });
        }

        stack.0.push(id.clone());
        let built = self.build(id, stack);
        stack.0.pop();
        let instance = built?;

        let mut instances = self.instances.write();
        let winner = Arc::clone(instances.entry(id.clone()).or_insert(instance));
        debug!(service = %id, "Resolved and cached");
        Ok(winner)
    }

    fn build(&self, id: &ServiceId, stack: &mut ResolutionStack) -> Result<Instance, ContainerError> {
        if let Some(concrete) = self.bindings.get(id) {
            let instance = self.resolve_with(concrete, stack)?;
            return match self.casters.get(id) {
                Some(caster) => caster(instance),
                None => Ok(instance),
            };
        }
        let descriptor = self.descriptor_for(id)?;
        self.construct(id, &descriptor, stack)
    }

    fn construct(
        &self,
        id: &ServiceId,
        descriptor: &Descriptor,
        stack: &mut ResolutionStack,
    ) -> Result<Instance, ContainerError> {
        let mut values = Vec::with_capacity(descriptor.dependencies.len());
        for dependency in &descriptor.dependencies {
            let instance = match &dependency.ty {
                ParamType::Service(dep_id) => self.resolve_with(dep_id, stack)?,
                ParamType::Builtin(type_label) => {
                    return Err(ContainerError::UnresolvableParameter {
                        parameter: dependency.name.to_string(),
                        owner: id.clone(),
                        detail: format!("built-in type `{type_label}` cannot be injected"),
                    })
                }
                ParamType::Untyped => {
                    return Err(ContainerError::UnresolvableParameter {
                        parameter: dependency.name.to_string(),
                        owner: id.clone(),
                        detail: "parameter has no declared type".to_string(),
                    })
                }
            };
            values.push((dependency.clone(), instance));
        }
        let mut args = Arguments::new(id.clone(), values);
        (descriptor.factory)(&mut args)
    }
}

impl std::fmt::Debug for Container {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Container")
            .field("registered", &self.descriptors.len())
            .field("bindings", &self.bindings.len())
            .field("resolved", &self.resolved_count())
            .finish()
    }
}
