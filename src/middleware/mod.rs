//! # Middleware Module
//!
//! Chain-of-responsibility composition of interceptors around a terminal handler.
//!
//! ## Overview
//!
//! A [`Middleware`] receives the request and the *next* handler. It may:
//! - call `next` and return (or decorate) its response,
//! - call `next` with a new [`RequestContext`](crate::http::RequestContext) carrying extra
//!   attributes, which every later stage observes,
//! - return its own response without calling `next`, which short-circuits the chain.
//!
//! [`MiddlewarePipeline`] drives the chain with a cursor. Pipelines nest: the application
//! runs global middleware in an outer pipeline whose terminal is the route handler, which
//! runs the route's own middleware in an inner pipeline around the controller call. Global
//! middleware therefore always sees the request first and the response last.
//!
//! ## Built-in middleware
//!
//! - [`TracingMiddleware`] - request span with latency and status
//! - [`CorsMiddleware`] - `Access-Control-Allow-*` response headers
//! - [`MetricsMiddleware`] - lock-free request, latency and error counters

mod core;
mod cors;
mod metrics;
mod registry;
mod tracing;

pub use core::{handler_fn, Middleware, MiddlewarePipeline, MiddlewareStack, RequestHandler};
pub use cors::CorsMiddleware;
pub use metrics::MetricsMiddleware;
pub use registry::{MiddlewareError, MiddlewareRegistry};
pub use tracing::TracingMiddleware;
