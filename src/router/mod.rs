//! # Router Module
//!
//! The router module registers controller routes and resolves incoming
//! `(method, path)` pairs to route definitions.
//!
//! ## Overview
//!
//! The router is responsible for:
//! - Building route definitions from controller declarations ([`Controller`])
//! - Normalizing paths (`prefix + class prefix + action path`)
//! - Matching incoming requests, static routes first
//! - Extracting path parameters from matched routes
//! - Answering `OPTIONS` with the methods registered for a path
//!
//! ## Architecture
//!
//! 1. **Compilation**: at registration, paths such as `/users/{id}` are compiled once into
//!    anchored regexes ([`RoutePattern`]).
//!
//! 2. **Matching**: a lazily rebuilt exact-match index serves placeholder-free routes in
//!    O(1); anything else falls back to a registration-order scan of the compiled
//!    patterns, first match wins. A static `/users/profile` therefore always beats
//!    `/users/{id}`.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hyperdrive::router::{Router, RouteMatch};
//! use http::Method;
//!
//! let mut router = Router::new();
//! router.register_controller::<UserController>("/api")?;
//!
//! if let Some(RouteMatch::Handler(route)) = router.find_route(&Method::GET, "/api/users/42") {
//!     let params = route.extract_parameters("/api/users/42");
//!     assert_eq!(params[0].1, "42");
//! }
//! ```

mod controller;
mod core;
mod path;
mod pattern;
mod route;

pub use controller::{merge_middleware, ActionBuilder, Controller, ControllerRoutes};
pub use core::{RouteMapStats, Router};
pub use path::{build_path, join_paths};
pub use pattern::RoutePattern;
pub use route::{HandlerRef, OptionsRoute, RouteDefinition, RouteError, RouteMatch};
