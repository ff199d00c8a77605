use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use super::{Arguments, Container, ContainerError, Dependency, Injectable, ServiceId};

static LOGGER_BUILDS: AtomicUsize = AtomicUsize::new(0);

struct Logger;

impl Injectable for Logger {
    fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
        LOGGER_BUILDS.fetch_add(1, Ordering::SeqCst);
        Ok(Logger)
    }
}

struct Repo {
    logger: Arc<Logger>,
}

impl Injectable for Repo {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::service::<Logger>("logger")]
    }

    fn construct(args: &mut Arguments) -> Result<Self, ContainerError> {
        Ok(Repo {
            logger: args.next()?,
        })
    }
}

struct Left;
struct Right;

impl Injectable for Left {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::service::<Right>("right")]
    }
    fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
        Ok(Left)
    }
}

impl Injectable for Right {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::service::<Left>("left")]
    }
    fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
        Ok(Right)
    }
}

struct NeedsPort;

impl Injectable for NeedsPort {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::builtin("port", "u16")]
    }
    fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
        Ok(NeedsPort)
    }
}

trait Greeter: Send + Sync {
    fn greet(&self) -> &'static str;
}

struct English;

impl Greeter for English {
    fn greet(&self) -> &'static str {
        "hello"
    }
}

impl Injectable for English {
    fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
        Ok(English)
    }
}

struct Welcome {
    greeter: Arc<dyn Greeter>,
}

impl Injectable for Welcome {
    fn dependencies() -> Vec<Dependency> {
        vec![Dependency::service::<dyn Greeter>("greeter")]
    }
    fn construct(args: &mut Arguments) -> Result<Self, ContainerError> {
        Ok(Welcome {
            greeter: args.next_interface::<dyn Greeter>()?,
        })
    }
}

fn english_greeter(english: Arc<English>) -> Arc<dyn Greeter> {
    english
}

#[test]
fn test_resolve_is_idempotent() {
    let mut container = Container::new();
    container.register::<Logger>().register::<Repo>();

    let first = container.resolve::<Repo>().unwrap();
    let second = container.resolve::<Repo>().unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let logger = container.resolve::<Logger>().unwrap();
    assert!(Arc::ptr_eq(&first.logger, &logger));
}

#[test]
fn test_cycle_is_reported_and_stack_is_clean_afterwards() {
    let mut container = Container::new();
    container
        .register::<Left>()
        .register::<Right>()
        .register::<Logger>();

    let err = container.resolve::<Left>().err().unwrap();
    match err {
        ContainerError::CircularDependency { id, path } => {
            assert_eq!(id, ServiceId::of::<Left>());
            assert_eq!(path, "Left -> Right -> Left");
        }
        other => panic!("unexpected error: {other:?}"),
    }
    assert!(!container.is_resolved(&ServiceId::of::<Left>()));
    assert!(!container.is_resolved(&ServiceId::of::<Right>()));

    // A later unrelated resolution still succeeds.
    assert!(container.resolve::<Logger>().is_ok());
    // And the cycle is still reported, not masked by stale state.
    assert!(matches!(
        container.resolve::<Right>(),
        Err(ContainerError::CircularDependency { .. })
    ));
}

#[test]
fn test_builtin_parameter_is_unresolvable() {
    let mut container = Container::new();
    container.register::<NeedsPort>();
    let err = container.resolve::<NeedsPort>().err().unwrap();
    match err {
        ContainerError::UnresolvableParameter {
            parameter, owner, ..
        } => {
            assert_eq!(parameter, "port");
            assert_eq!(owner, ServiceId::of::<NeedsPort>());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[test]
fn test_untyped_factory_parameter_is_unresolvable() {
    let mut container = Container::new();
    container.register_factory(
        ServiceId::named("mailer"),
        vec![Dependency::untyped("transport")],
        |_args| Ok(String::from("mailer")),
    );
    assert!(matches!(
        container.resolve_id(&ServiceId::named("mailer")),
        Err(ContainerError::UnresolvableParameter { .. })
    ));
}

#[test]
fn test_unknown_id_is_class_not_found() {
    let container = Container::new();
    assert_eq!(
        container.resolve_id(&ServiceId::named("Missing")).err(),
        Some(ContainerError::ClassNotFound(ServiceId::named("Missing")))
    );
}

#[test]
fn test_abstract_without_binding_is_not_instantiable() {
    let mut container = Container::new();
    container.interface::<dyn Greeter>();
    assert!(matches!(
        container.resolve_interface::<dyn Greeter>(),
        Err(ContainerError::NotInstantiable { .. })
    ));
}

#[test]
fn test_interface_binding_injects_trait_object() {
    let mut container = Container::new();
    container
        .register::<English>()
        .register::<Welcome>()
        .bind_interface::<dyn Greeter, English, _>(english_greeter);

    let welcome = container.resolve::<Welcome>().unwrap();
    assert_eq!(welcome.greeter.greet(), "hello");

    let a = container.resolve_interface::<dyn Greeter>().unwrap();
    let b = container.resolve_interface::<dyn Greeter>().unwrap();
    assert!(Arc::ptr_eq(&a, &b));
}

#[test]
fn test_plain_binding_shares_identity_with_concrete() {
    let mut container = Container::new();
    container
        .register::<Logger>()
        .bind(ServiceId::named("log"), ServiceId::of::<Logger>());

    let via_alias = container.resolve_id(&ServiceId::named("log")).unwrap();
    let direct = container.resolve_id(&ServiceId::of::<Logger>()).unwrap();
    assert!(Arc::ptr_eq(&via_alias, &direct));
}

#[test]
fn test_binding_cycle_is_detected() {
    let mut container = Container::new();
    container
        .bind(ServiceId::named("a"), ServiceId::named("b"))
        .bind(ServiceId::named("b"), ServiceId::named("a"));
    assert!(matches!(
        container.resolve_id(&ServiceId::named("a")),
        Err(ContainerError::CircularDependency { .. })
    ));
}

#[test]
fn test_singleton_resolves_eagerly() {
    let mut container = Container::new();
    container.register::<Logger>();
    let id = ServiceId::of::<Logger>();
    assert!(!container.is_resolved(&id));
    container.singleton(id.clone(), Some(id.clone())).unwrap();
    assert!(container.is_resolved(&id));
    assert!(container.binding(&id).is_none());
}

#[test]
fn test_build_fresh_skips_cache() {
    let mut container = Container::new();
    container.register::<Logger>().register::<Repo>();

    let cached = container.resolve::<Repo>().unwrap();
    let fresh = container
        .build_fresh(&ServiceId::of::<Repo>())
        .unwrap()
        .downcast::<Repo>()
        .unwrap();
    assert!(!Arc::ptr_eq(&cached, &fresh));
    assert!(Arc::ptr_eq(&cached.logger, &fresh.logger));
    assert_eq!(container.resolved_count(), 2);
}

#[test]
fn test_register_instance_prefills_cache() {
    let mut container = Container::new();
    container.register_instance(String::from("config"));
    assert!(container.is_resolved(&ServiceId::of::<String>()));
    assert_eq!(container.resolve::<String>().unwrap().as_str(), "config");
}

#[test]
fn test_constructor_failure_is_reported() {
    let mut container = Container::new();
    container.register_factory::<String, _>(ServiceId::named("broken"), Vec::new(), |args| {
        Err(args.fail("database offline"))
    });
    let err = container.resolve_id(&ServiceId::named("broken")).err().unwrap();
    assert_eq!(
        err.to_string(),
        "Failed to construct broken: database offline"
    );
}
