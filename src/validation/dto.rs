use std::any::{type_name, Any};
use std::fmt::{Debug, Formatter};

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use super::{Rule, ValidationErrors, BODY_FIELD};

/// Per-field rule lists attached to a DTO.
#[derive(Default)]
pub struct FieldRules {
    fields: Vec<(&'static str, Vec<Box<dyn Rule>>)>,
}

impl FieldRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `rule` to `field`. Rules run in the order they were attached.
    #[must_use]
    pub fn field(mut self, field: &'static str, rule: impl Rule + 'static) -> Self {
        match self.fields.iter_mut().find(|(name, _)| *name == field) {
            Some((_, rules)) => rules.push(Box::new(rule)),
            None => self.fields.push((field, vec![Box::new(rule)])),
        }
        self
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Run every rule against the raw body and collect the failures.
    #[must_use]
    pub fn check(&self, body: &Value) -> ValidationErrors {
        let mut errors = ValidationErrors::new();
        for (field, rules) in &self.fields {
            let value = body.get(*field);
            for rule in rules {
                if !rule.check(value) {
                    errors.add(*field, rule.message());
                }
            }
        }
        errors
    }
}

/// A value object bound from the request body.
///
/// ```rust,ignore
/// #[derive(Deserialize)]
/// struct CreateUser { name: String, email: String }
///
/// impl Dto for CreateUser {
///     fn rules() -> FieldRules {
///         FieldRules::new()
///             .field("name", NotEmpty)
///             .field("email", IsEmail)
///     }
/// }
/// ```
pub trait Dto: DeserializeOwned + Send + 'static {
    fn rules() -> FieldRules {
        FieldRules::new()
    }

    /// Checks that need the hydrated value (cross-field rules, reserved names, ...).
    fn validate(&self, _errors: &mut ValidationErrors) {}

    /// Rules, then hydration, then [`validate`](Self::validate).
    ///
    /// A `null` body is treated as an empty object.
    ///
    /// # Errors
    ///
    /// The errors of the first stage that reported any.
    fn from_body(body: &Value) -> Result<Self, ValidationErrors> {
        let empty;
        let body = if body.is_null() {
            empty = Value::Object(Map::new());
            &empty
        } else {
            body
        };

        Self::rules().check(body).into_result()?;

        let dto: Self = serde_json::from_value(body.clone()).map_err(|e| {
            let mut errors = ValidationErrors::new();
            errors.add(BODY_FIELD, e.to_string());
            errors
        })?;

        let mut errors = ValidationErrors::new();
        dto.validate(&mut errors);
        errors.into_result()?;
        Ok(dto)
    }
}

/// Type-erased DTO constructor stored in a handler parameter declaration.
#[derive(Clone, Copy)]
pub struct DtoBinder {
    type_name: &'static str,
    bind: fn(&Value) -> Result<Box<dyn Any + Send>, ValidationErrors>,
}

impl DtoBinder {
    #[must_use]
    pub fn of<D: Dto>() -> Self {
        Self {
            type_name: type_name::<D>(),
            bind: bind_boxed::<D>,
        }
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Bind and validate the body.
    ///
    /// # Errors
    ///
    /// See [`Dto::from_body`].
    pub fn bind(&self, body: &Value) -> Result<Box<dyn Any + Send>, ValidationErrors> {
        (self.bind)(body)
    }
}

impl Debug for DtoBinder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("DtoBinder").field(&self.type_name).finish()
    }
}

fn bind_boxed<D: Dto>(body: &Value) -> Result<Box<dyn Any + Send>, ValidationErrors> {
    D::from_body(body).map(|dto| Box::new(dto) as Box<dyn Any + Send>)
}
