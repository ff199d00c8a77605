//! # Container Module
//!
//! Dependency injection for controllers, services and middleware.
//!
//! ## Overview
//!
//! The container turns a [`ServiceId`] into a live instance by constructing its whole
//! dependency graph. Every resolved instance is cached for the lifetime of the container,
//! so resolving the same id twice yields the identical `Arc`.
//!
//! Rust has no constructor reflection, so each type declares its constructor parameter
//! list explicitly through [`Injectable::dependencies`] and builds itself from the
//! resolved [`Arguments`] in [`Injectable::construct`].
//!
//! ## Resolution
//!
//! 1. Cached instance → returned immediately.
//! 2. Id already on the resolution stack → [`ContainerError::CircularDependency`].
//! 3. Bound abstract id → the bound concrete id is resolved (still cycle-checked).
//! 4. Otherwise each declared parameter is resolved in order and the constructor runs.
//!    Built-in or untyped parameters fail with [`ContainerError::UnresolvableParameter`].
//!
//! The resolution stack is local to one top-level call and is popped on every exit path,
//! so a failed resolution never poisons later ones.
//!
//! ## Example
//!
//! ```rust,ignore
//! use hyperdrive::container::{Arguments, Container, ContainerError, Dependency, Injectable};
//!
//! struct Db;
//! impl Injectable for Db {
//!     fn construct(_: &mut Arguments) -> Result<Self, ContainerError> { Ok(Db) }
//! }
//!
//! struct UserRepo { db: std::sync::Arc<Db> }
//! impl Injectable for UserRepo {
//!     fn dependencies() -> Vec<Dependency> { vec![Dependency::service::<Db>("db")] }
//!     fn construct(args: &mut Arguments) -> Result<Self, ContainerError> {
//!         Ok(UserRepo { db: args.next()? })
//!     }
//! }
//!
//! let mut container = Container::new();
//! container.register::<Db>();
//! container.register::<UserRepo>();
//! let repo = container.resolve::<UserRepo>()?;
//! ```

mod core;
mod error;
mod injectable;
#[cfg(test)]
mod tests;

pub use core::{Container, Instance};
pub use error::ContainerError;
pub use injectable::{Arguments, Dependency, Injectable, ParamType, ServiceId};
