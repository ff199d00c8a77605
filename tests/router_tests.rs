use std::sync::Arc;

use http::Method;
use hyperdrive::handler::Action;
use hyperdrive::router::{build_path, HandlerRef, RoutePattern};
use hyperdrive::{RouteDefinition, RouteMatch, Router, ServiceId};
use proptest::prelude::*;

fn route(method: Method, path: &str, action: &'static str) -> RouteDefinition {
    RouteDefinition::new(
        method,
        path,
        HandlerRef {
            controller: ServiceId::named("Routes"),
            action,
            pooled: true,
        },
        Vec::new(),
        Action::for_controller::<(), _>(action, Vec::new(), |_, _| Ok("".into())),
    )
    .unwrap()
}

fn action_for(router: &Router, method: Method, path: &str) -> Option<&'static str> {
    match router.find_route(&method, path) {
        Some(RouteMatch::Handler(route)) => Some(route.handler().action),
        _ => None,
    }
}

#[test]
fn test_static_route_wins_regardless_of_order() {
    let mut router = Router::new();
    router.add_route(route(Method::GET, "/users/{id}", "show"));
    router.add_route(route(Method::GET, "/users/profile", "profile"));
    assert_eq!(action_for(&router, Method::GET, "/users/profile"), Some("profile"));
    assert_eq!(action_for(&router, Method::GET, "/users/123"), Some("show"));
}

#[test]
fn test_extracts_multiple_parameters() {
    let mut router = Router::new();
    router.add_route(route(Method::GET, "/teams/{team}/members/{member}", "member"));
    let Some(RouteMatch::Handler(found)) = router.find_route(&Method::GET, "/teams/core/members/ada")
    else {
        panic!("route not found");
    };
    let params = found.extract_parameters("/teams/core/members/ada");
    let pairs: Vec<(&str, &str)> = params.iter().map(|(k, v)| (k.as_ref(), v.as_str())).collect();
    assert_eq!(pairs, vec![("team", "core"), ("member", "ada")]);
}

#[test]
fn test_placeholder_does_not_cross_segments() {
    let mut router = Router::new();
    router.add_route(route(Method::GET, "/files/{name}", "file"));
    assert!(router.find_route(&Method::GET, "/files/a/b").is_none());
    assert!(router.find_route(&Method::GET, "/files/").is_none());
}

#[test]
fn test_literal_regex_characters_are_escaped() {
    let mut router = Router::new();
    router.add_route(route(Method::GET, "/v1.0/status", "status"));
    assert_eq!(action_for(&router, Method::GET, "/v1.0/status"), Some("status"));
    assert!(router.find_route(&Method::GET, "/v1x0/status").is_none());
}

#[test]
fn test_options_lists_methods_in_registration_order() {
    let mut router = Router::new();
    router.add_route(route(Method::POST, "/orders", "create"));
    router.add_route(route(Method::GET, "/orders", "list"));
    router.add_route(route(Method::DELETE, "/orders/{id}", "delete"));

    let Some(RouteMatch::Options(options)) = router.find_route(&Method::OPTIONS, "/orders") else {
        panic!("expected options");
    };
    assert_eq!(options.allow_header(), "POST, GET");

    let Some(RouteMatch::Options(options)) = router.find_route(&Method::OPTIONS, "/orders/{id}")
    else {
        panic!("expected options");
    };
    assert_eq!(options.allowed_methods, vec![Method::DELETE]);

    // A concrete path is not a registered pattern.
    assert!(router.find_route(&Method::OPTIONS, "/orders/9").is_none());
    assert_eq!(router.matching_methods("/orders/9"), vec![Method::DELETE]);
}

#[test]
fn test_build_path_normalization() {
    assert_eq!(build_path("", ""), "/");
    assert_eq!(build_path("/api/", "/users/"), "/api/users");
    assert_eq!(build_path("api//v1", "//users"), "/api/v1/users");
}

#[test]
fn test_router_shared_across_threads_after_registration() {
    let mut router = Router::new();
    router.add_route(route(Method::GET, "/ping", "ping"));
    router.add_route(route(Method::GET, "/items/{id}", "item"));
    let router = Arc::new(router);

    let handles: Vec<_> = (0..4)
        .map(|i| {
            let router = Arc::clone(&router);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    assert_eq!(action_for(&router, Method::GET, "/ping"), Some("ping"));
                    assert_eq!(
                        action_for(&router, Method::GET, &format!("/items/{i}")),
                        Some("item")
                    );
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }
    assert!(router.stats().index_built);
}

proptest! {
    /// Substituting values into a pattern and matching the result yields those values back.
    #[test]
    fn prop_parameters_round_trip(
        first in "[A-Za-z0-9_.~-]{1,12}",
        second in "[A-Za-z0-9_.~-]{1,12}",
    ) {
        let pattern = RoutePattern::compile("/users/{user}/posts/{post}").unwrap();
        let values: Vec<(Arc<str>, String)> = vec![
            (Arc::from("user"), first.clone()),
            (Arc::from("post"), second.clone()),
        ];
        let path = pattern.substitute(&values).unwrap();
        prop_assert!(pattern.is_match(&path));

        let extracted = pattern.extract(&path);
        let extracted: Vec<(String, String)> = extracted
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        prop_assert_eq!(
            extracted,
            vec![("user".to_string(), first), ("post".to_string(), second)]
        );
    }
}
