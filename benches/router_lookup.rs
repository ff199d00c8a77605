use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use http::Method;
use hyperdrive::handler::Action;
use hyperdrive::router::HandlerRef;
use hyperdrive::{RouteDefinition, Router, ServiceId};

const ROUTES: &[(&str, &str, &str)] = &[
    ("GET", "/", "root"),
    ("GET", "/zoo/animals", "list_animals"),
    ("POST", "/zoo/animals", "create_animal"),
    ("GET", "/zoo/animals/{id}", "get_animal"),
    ("PUT", "/zoo/animals/{id}", "update_animal"),
    ("DELETE", "/zoo/animals/{id}", "delete_animal"),
    ("GET", "/zoo/animals/{id}/toys/{toy_id}", "animal_toy"),
    (
        "GET",
        "/zoo/{category}/animals/{id}/habitats/{habitat_id}/sections/{section_id}",
        "habitat_section",
    ),
    (
        "POST",
        "/inventory/{warehouse_id}/feeds/{feed_id}/items/{item_id}/batches/{batch_id}",
        "post_item_batch",
    ),
    ("GET", "/complex/{a}/{b}/{c}/{d}/{e}/{f}/{g}/{h}/{i}", "complex_many_params"),
    ("GET", "/zoo/health", "health_check"),
];

fn zoo_router() -> Router {
    let mut router = Router::new();
    for (method, path, action) in ROUTES {
        let method: Method = method.parse().expect("valid method");
        let route = RouteDefinition::new(
            method,
            path,
            HandlerRef {
                controller: ServiceId::named("Zoo"),
                action: *action,
                pooled: true,
            },
            Vec::new(),
            Action::for_controller::<(), _>(*action, Vec::new(), |_, _| Ok("".into())),
        )
        .expect("valid route");
        router.add_route(route);
    }
    router
}

fn bench_static_lookup(c: &mut Criterion) {
    let router = zoo_router();
    c.bench_function("route_match_static", |b| {
        b.iter(|| {
            black_box(router.find_route(&Method::GET, black_box("/zoo/animals")));
            black_box(router.find_route(&Method::GET, black_box("/zoo/health")));
        })
    });
}

fn bench_parameterized_lookup(c: &mut Criterion) {
    let router = zoo_router();
    let test_paths = [
        (Method::GET, "/zoo/animals/123"),
        (Method::GET, "/zoo/animals/123/toys/456"),
        (Method::GET, "/zoo/cats/animals/123/habitats/88/sections/5"),
        (Method::POST, "/inventory/1/feeds/2/items/3/batches/4"),
        (Method::GET, "/complex/1/2/3/4/5/6/7/8/9"),
    ];
    c.bench_function("route_match_parameterized", |b| {
        b.iter(|| {
            for (method, path) in &test_paths {
                black_box(router.find_route(method, path));
            }
        })
    });
}

fn bench_options_lookup(c: &mut Criterion) {
    let router = zoo_router();
    c.bench_function("route_match_options", |b| {
        b.iter(|| black_box(router.find_route(&Method::OPTIONS, black_box("/zoo/animals/{id}"))))
    });
}

criterion_group!(
    benches,
    bench_static_lookup,
    bench_parameterized_lookup,
    bench_options_lookup
);
criterion_main!(benches);
