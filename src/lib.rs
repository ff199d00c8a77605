//! # Hyperdrive
//!
//! **Hyperdrive** is the request-dispatch core of a web application runtime: a dependency
//! injection container, a two-tier router, a cursor-driven middleware pipeline and a
//! dispatcher that materializes each controller action's arguments.
//!
//! ## Overview
//!
//! The core is transport-agnostic and performs no I/O. A driver parses the wire request into
//! a [`RequestContext`], hands it to [`Application::dispatch_from_driver`] and writes the
//! returned [`Response`] back out.
//!
//! ## Architecture
//!
//! - **[`container`]** - Services, bindings, singleton cache and cycle detection
//! - **[`router`]** - Controller route declarations, pattern compilation and lookup
//! - **[`middleware`]** - Middleware traits, the cursor pipeline and built-in middleware
//! - **[`dispatcher`]** - Controller pooling and the parameter resolution ladder
//! - **[`handler`]** - Declared parameters, argument bag and handler results
//! - **[`validation`]** - Field rules and DTO binding
//! - **[`gateway`]** - WebSocket gateway declarations and message dispatch
//! - **[`module`]** - Declarative modules feeding the container, router and gateways
//! - **[`app`]** - The application kernel and error-to-response mapping
//! - **[`config`]** / **[`telemetry`]** - Configuration and tracing setup
//!
//! ### Request Flow
//!
//! ```mermaid
//! sequenceDiagram
//!     participant Driver
//!     participant App as Application
//!     participant Router
//!     participant Global as Global middleware
//!     participant Route as Route middleware
//!     participant Dispatcher
//!     participant Container
//!     participant Handler
//!
//!     Driver->>App: dispatch_from_driver(request)
//!     App->>Router: find_route(method, path)
//!     alt no route
//!         Router-->>App: None
//!         App-->>Driver: 404 Not Found
//!     else OPTIONS
//!         Router-->>App: Options(allowed methods)
//!         App->>Global: run
//!         Global-->>App: 204 + Allow
//!     else handler
//!         Router-->>App: Handler(route)
//!         App->>Global: run
//!         Global->>Route: next.handle(request)
//!         Route->>Dispatcher: dispatch(route, request)
//!         Dispatcher->>Container: controller + service parameters
//!         Dispatcher->>Handler: invoke(args)
//!         Handler-->>Dispatcher: HandlerResult
//!         Dispatcher-->>Route: Response
//!         Route-->>Global: Response
//!         Global-->>App: Response
//!     end
//!     App-->>Driver: Response
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use hyperdrive::{AppConfig, Application, Controller, ControllerRoutes, Module};
//!
//! struct Hello;
//!
//! impl hyperdrive::Injectable for Hello {
//!     fn construct(_: &mut hyperdrive::Arguments) -> Result<Self, hyperdrive::ContainerError> {
//!         Ok(Hello)
//!     }
//! }
//!
//! impl Controller for Hello {
//!     fn routes(r: &mut ControllerRoutes<Self>) {
//!         r.get("/hello/{name}", "greet")
//!             .string("name")
//!             .to(|_, args| Ok(format!("Hello, {}", args.str("name")?).into()));
//!     }
//! }
//!
//! let mut app = Application::new(AppConfig::from_env()?);
//! app.register_module(&Module::new("root").controller::<Hello>())?;
//! app.boot()?;
//! ```

pub mod app;
pub mod config;
pub mod container;
pub mod dispatcher;
pub mod error;
pub mod gateway;
pub mod handler;
pub mod http;
pub mod middleware;
pub mod module;
pub mod router;
pub mod telemetry;
pub mod validation;

pub use app::Application;
pub use config::{AppConfig, ConfigError, Environment, LoggingConfig, MiddlewareConfig};
pub use container::{
    Arguments, Container, ContainerError, Dependency, Injectable, Instance, ParamType, ServiceId,
};
pub use dispatcher::{Dispatcher, RouteHandler};
pub use error::{BootError, DispatchError};
pub use gateway::{
    Connection, Gateway, GatewayDispatcher, GatewayHandlers, GatewayRegistry, Message,
};
pub use handler::{Action, Args, HandlerResult, ParamKind, ParamSpec};
pub use crate::http::{CookieOptions, RequestContext, RequestId, Response, SameSite};
pub use middleware::{Middleware, MiddlewarePipeline, MiddlewareRegistry, RequestHandler};
pub use module::{Module, ModuleRegistry};
pub use router::{Controller, ControllerRoutes, RouteDefinition, RouteMatch, Router};
pub use validation::{Dto, FieldRules, ValidationErrors};
