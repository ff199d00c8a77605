use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

/// A single field check.
///
/// `value` is `None` when the field is absent from the body; rules treat that like `null`.
pub trait Rule: Send + Sync {
    fn check(&self, value: Option<&Value>) -> bool;
    fn message(&self) -> String;
}

/// Value must be present and non-empty.
///
/// Empty means `null`, `false`, `0`, `0.0`, `""`, `"0"`, `[]` or `{}`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotEmpty;

impl Rule for NotEmpty {
    fn check(&self, value: Option<&Value>) -> bool {
        match value {
            None | Some(Value::Null) => false,
            Some(Value::Bool(b)) => *b,
            Some(Value::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(Value::String(s)) => !(s.is_empty() || s == "0"),
            Some(Value::Array(items)) => !items.is_empty(),
            Some(Value::Object(map)) => !map.is_empty(),
        }
    }

    fn message(&self) -> String {
        "Cannot be empty".to_string()
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct IsString;

impl Rule for IsString {
    fn check(&self, value: Option<&Value>) -> bool {
        matches!(value, Some(Value::String(_)))
    }

    fn message(&self) -> String {
        "Must be a string".to_string()
    }
}

/// Value must be an integral JSON number (`3` passes, `3.0` and `"3"` do not).
#[derive(Debug, Clone, Copy, Default)]
pub struct IsInt;

impl Rule for IsInt {
    fn check(&self, value: Option<&Value>) -> bool {
        matches!(value, Some(Value::Number(n)) if n.is_i64() || n.is_u64())
    }

    fn message(&self) -> String {
        "Must be an integer".to_string()
    }
}

static EMAIL: Lazy<Option<Regex>> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9.!#$%&'*+/=?^_`{|}~-]+@[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9-]{0,61}[A-Za-z0-9])?)+$").ok()
});

#[derive(Debug, Clone, Copy, Default)]
pub struct IsEmail;

impl Rule for IsEmail {
    fn check(&self, value: Option<&Value>) -> bool {
        let Some(Value::String(s)) = value else {
            return false;
        };
        if s.starts_with('.') || s.contains("..") || s.contains(".@") {
            return false;
        }
        EMAIL.as_ref().is_some_and(|re| re.is_match(s))
    }

    fn message(&self) -> String {
        "Must be a valid email address".to_string()
    }
}

/// Integer value of at least `min`.
#[derive(Debug, Clone, Copy)]
pub struct MinValue(pub i64);

impl Rule for MinValue {
    fn check(&self, value: Option<&Value>) -> bool {
        matches!(value, Some(Value::Number(n)) if n.as_i64().is_some_and(|v| v >= self.0))
    }

    fn message(&self) -> String {
        format!("Must be at least {}", self.0)
    }
}

/// String value of at least `n` characters.
#[derive(Debug, Clone, Copy)]
pub struct MinLength(pub usize);

impl Rule for MinLength {
    fn check(&self, value: Option<&Value>) -> bool {
        matches!(value, Some(Value::String(s)) if s.chars().count() >= self.0)
    }

    fn message(&self) -> String {
        format!("Must be at least {} characters", self.0)
    }
}

/// Element type accepted by [`IsArray`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemType {
    String,
    Integer,
    Double,
    Boolean,
    Array,
    Object,
}

impl ItemType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Integer => value.is_i64() || value.is_u64(),
            Self::Double => value.is_f64(),
            Self::Boolean => value.is_boolean(),
            Self::Array => value.is_array(),
            Self::Object => value.is_object(),
        }
    }

    fn label(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Double => "double",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
        }
    }
}

/// Value must be an array, optionally with typed items drawn from an allowed set.
#[derive(Debug, Clone, Default)]
pub struct IsArray {
    pub item_type: Option<ItemType>,
    pub allowed: Option<Vec<Value>>,
}

impl IsArray {
    #[must_use]
    pub fn any() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn of(item_type: ItemType) -> Self {
        Self {
            item_type: Some(item_type),
            allowed: None,
        }
    }

    #[must_use]
    pub fn with_values_in(mut self, allowed: Vec<Value>) -> Self {
        self.allowed = Some(allowed);
        self
    }
}

impl Rule for IsArray {
    fn check(&self, value: Option<&Value>) -> bool {
        let Some(Value::Array(items)) = value else {
            return false;
        };
        if let Some(item_type) = self.item_type {
            if !items.iter().all(|item| item_type.matches(item)) {
                return false;
            }
        }
        if let Some(allowed) = &self.allowed {
            if !items.iter().all(|item| allowed.contains(item)) {
                return false;
            }
        }
        true
    }

    fn message(&self) -> String {
        let mut message = String::from("Must be an array");
        if let Some(item_type) = self.item_type {
            message.push_str(" of ");
            message.push_str(item_type.label());
            message.push('s');
        }
        if let Some(allowed) = self.allowed.as_ref().filter(|a| !a.is_empty()) {
            let rendered: Vec<String> = allowed
                .iter()
                .map(|v| match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                })
                .collect();
            message.push_str(" with values in: ");
            message.push_str(&rendered.join(", "));
        }
        message
    }
}
