//! # Validation Module
//!
//! Request-body binding and validation for DTO (data transfer object) parameters.
//!
//! A handler parameter declared as a DTO is built from the parsed request body in three
//! steps:
//!
//! 1. **Rules**: every [`Rule`] attached through [`Dto::rules`] runs against the raw JSON
//!    field value (a missing field is checked as `null`).
//! 2. **Hydration**: the body is deserialized into the DTO type with `serde`.
//! 3. **Custom checks**: [`Dto::validate`] sees the hydrated value and may add more errors.
//!
//! The first step that produces errors stops the binding and the collected
//! [`ValidationErrors`] propagate as [`DispatchError::Validation`](crate::DispatchError),
//! which the application turns into:
//!
//! ```json
//! { "error": "Validation failed", "errors": { "name": ["Cannot be empty"] } }
//! ```
//!
//! with status 422. The handler body never runs.

mod dto;
mod errors;
mod rules;

pub use dto::{Dto, DtoBinder, FieldRules};
pub use errors::{ValidationErrors, BODY_FIELD};
pub use rules::{IsArray, IsEmail, IsInt, IsString, ItemType, MinLength, MinValue, NotEmpty, Rule};
