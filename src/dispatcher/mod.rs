//! # Dispatcher Module
//!
//! Turns a matched route and a request into a response by materializing the controller
//! and the exact argument list its action declared.
//!
//! ## Overview
//!
//! For each request the dispatcher:
//! - takes the controller instance from its pool (or builds a fresh one for stateful
//!   controllers),
//! - resolves every declared parameter through the parameter ladder,
//! - invokes the action and normalizes its [`HandlerResult`](crate::handler::HandlerResult).
//!
//! ## Parameter Ladder
//!
//! | Declared kind | Source, in order |
//! |---|---|
//! | `int` / `float` / `bool` / `string` | route parameter, then request attribute |
//! | request | the current [`RequestContext`](crate::http::RequestContext) |
//! | DTO | request body, validated ([`DispatchError::Validation`](crate::DispatchError) on failure) |
//! | service | the container |
//! | untyped | always fails |
//!
//! Any parameter the ladder cannot fill fails the request with
//! [`DispatchError::UnresolvableParameter`](crate::DispatchError), naming the parameter,
//! the action and the controller.
//!
//! ## Request Flow
//!
//! [`RouteHandler`] is the terminal handler of the global pipeline. It resolves the
//! route's own middleware (skipping any that fail to initialize) and runs them in an inner
//! pipeline that ends in [`Dispatcher::dispatch`].

mod core;

pub use core::{convert_raw, Dispatcher, DispatcherStats, RouteHandler};
