use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};

use super::HeaderVec;

/// Normalized response value handed back to the transport driver.
///
/// The driver serializes `status`, `headers` and `body` onto the wire; the core never
/// writes to a socket. Header names keep the case they were set with and lookup is
/// case-insensitive.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// HTTP status code (e.g., 200, 404, 500)
    pub status: u16,
    /// Response headers. Setting an existing name replaces its value; `Set-Cookie` lines are
    /// kept one per cookie.
    pub headers: HeaderVec,
    /// Serialized response body
    pub body: String,
}

impl Response {
    /// Build a response with an explicit status and no headers.
    #[must_use]
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: HeaderVec::new(),
            body: body.into(),
        }
    }

    /// Plain-text response (`text/plain; charset=utf-8`).
    #[must_use]
    pub fn text(status: u16, body: impl Into<String>) -> Self {
        Self::new(status, body).with_header("Content-Type", "text/plain; charset=utf-8")
    }

    /// JSON response (`application/json`).
    #[must_use]
    pub fn json(status: u16, body: &Value) -> Self {
        Self::new(status, body.to_string()).with_header("Content-Type", "application/json")
    }

    /// Body-less response, e.g. 204 No Content.
    #[must_use]
    pub fn empty(status: u16) -> Self {
        Self::new(status, String::new())
    }

    /// JSON error response: `{"error": message}`.
    #[must_use]
    pub fn error(status: u16, message: &str) -> Self {
        Self::json(status, &json!({ "error": message }))
    }

    /// 200 with a JSON body.
    #[must_use]
    pub fn ok(body: &Value) -> Self {
        Self::json(200, body)
    }

    #[must_use]
    pub fn created(body: &Value) -> Self {
        Self::json(201, body)
    }

    #[must_use]
    pub fn accepted(body: &Value) -> Self {
        Self::json(202, body)
    }

    #[must_use]
    pub fn no_content() -> Self {
        Self::empty(204)
    }

    #[must_use]
    pub fn bad_request(message: &str) -> Self {
        Self::error(400, message)
    }

    #[must_use]
    pub fn unauthorized(message: &str) -> Self {
        Self::error(401, message)
    }

    #[must_use]
    pub fn forbidden(message: &str) -> Self {
        Self::error(403, message)
    }

    #[must_use]
    pub fn not_found(message: &str) -> Self {
        Self::error(404, message)
    }

    #[must_use]
    pub fn conflict(message: &str) -> Self {
        Self::error(409, message)
    }

    #[must_use]
    pub fn unprocessable_entity(message: &str) -> Self {
        Self::error(422, message)
    }

    #[must_use]
    pub fn server_error(message: &str) -> Self {
        Self::error(500, message)
    }

    /// JSON response that also sets a cookie.
    #[must_use]
    pub fn json_with_cookie(
        status: u16,
        body: &Value,
        name: &str,
        value: &str,
        options: &CookieOptions,
    ) -> Self {
        Self::json(status, body).with_cookie(name, value, options)
    }

    /// Builder-style variant of [`set_cookie`](Self::set_cookie).
    #[must_use]
    pub fn with_cookie(mut self, name: &str, value: &str, options: &CookieOptions) -> Self {
        self.set_cookie(name, value, options);
        self
    }

    /// Expire cookie `name` on the client (`Max-Age=0`).
    #[must_use]
    pub fn remove_cookie(self, name: &str) -> Self {
        let options = CookieOptions {
            max_age: Some(0),
            ..CookieOptions::default()
        };
        self.with_cookie(name, "", &options)
    }

    /// Add a `Set-Cookie` header. A cookie already set under `name` is replaced; other
    /// cookies are kept.
    pub fn set_cookie(&mut self, name: &str, value: &str, options: &CookieOptions) {
        let prefix = format!("{name}=");
        self.headers
            .retain(|(k, v)| !(k.eq_ignore_ascii_case("Set-Cookie") && v.starts_with(&prefix)));
        self.append_header("Set-Cookie", options.header_value(name, value));
    }

    /// Add a header without touching existing values of the same name.
    pub fn append_header(&mut self, name: &str, value: impl Into<String>) {
        self.headers.push((Arc::from(name), value.into()));
    }

    /// Every value of header `name` (case-insensitive), in insertion order.
    #[must_use]
    pub fn header_values(&self, name: &str) -> Vec<&str> {
        self.headers
            .iter()
            .filter(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
            .collect()
    }

    /// Builder-style variant of [`set_header`](Self::set_header).
    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Set a header, replacing any existing value with the same (case-insensitive) name.
    pub fn set_header(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        if let Some(slot) = self
            .headers
            .iter_mut()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
        {
            slot.1 = value;
        } else {
            self.headers.push((Arc::from(name), value));
        }
    }

    /// Get a header value by name (case-insensitive).
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// `true` for 2xx statuses.
    #[inline]
    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Parse the body as JSON. Mostly useful in tests and JSON-speaking drivers.
    ///
    /// # Errors
    ///
    /// Returns the `serde_json` error when the body is not valid JSON.
    pub fn json_body(&self) -> Result<Value, serde_json::Error> {
        serde_json::from_str(&self.body)
    }
}

/// `SameSite` cookie attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSite {
    #[default]
    Strict,
    Lax,
    None,
}

impl fmt::Display for SameSite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        })
    }
}

/// Attributes written after `name=value` in a `Set-Cookie` header.
///
/// The default is a one-hour, host-only, `Secure; HttpOnly; SameSite=Strict` cookie on `/`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    /// Lifetime in seconds; `None` makes a session cookie.
    pub max_age: Option<i64>,
    pub path: Option<String>,
    pub domain: Option<String>,
    pub secure: bool,
    pub http_only: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            max_age: Some(3600),
            path: Some("/".to_string()),
            domain: None,
            secure: true,
            http_only: true,
            same_site: Some(SameSite::Strict),
        }
    }
}

impl CookieOptions {
    /// Format the full header value. The cookie value is percent-encoded.
    #[must_use]
    pub fn header_value(&self, name: &str, value: &str) -> String {
        let mut out = format!("{name}={}", urlencoding::encode(value));
        if let Some(max_age) = self.max_age {
            out.push_str(&format!("; Max-Age={max_age}"));
        }
        if let Some(path) = &self.path {
            out.push_str(&format!("; Path={path}"));
        }
        if let Some(domain) = &self.domain {
            out.push_str(&format!("; Domain={domain}"));
        }
        if self.secure {
            out.push_str("; Secure");
        }
        if self.http_only {
            out.push_str("; HttpOnly");
        }
        if let Some(same_site) = self.same_site {
            out.push_str(&format!("; SameSite={same_site}"));
        }
        out
    }
}
