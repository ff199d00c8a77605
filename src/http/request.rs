use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;
use std::sync::Arc;

use http::Method;
use serde_json::{Map, Value};
use smallvec::SmallVec;

use super::{MAX_INLINE_HEADERS, MAX_INLINE_PARAMS};

/// Stack-allocated parameter storage (`name → raw value`).
///
/// Names are `Arc<str>` because path parameter names come from compiled route patterns and
/// are shared by every request hitting that route; values are per-request.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Stack-allocated header/cookie storage.
pub type HeaderVec = SmallVec<[(Arc<str>, String); MAX_INLINE_HEADERS]>;

/// Request identifier backed by a ULID, used to correlate log lines of one request.
#[derive(Clone, Copy, Eq, PartialEq, Hash, Debug)]
pub struct RequestId(ulid::Ulid);

impl RequestId {
    #[must_use]
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }

    /// Reuse an inbound `x-request-id` when it is a valid ULID, otherwise mint a new one.
    #[must_use]
    pub fn from_header_or_new(header_value: Option<&str>) -> Self {
        header_value
            .and_then(|s| s.parse::<RequestId>().ok())
            .unwrap_or_default()
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RequestId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RequestId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ulid::Ulid::from_string(s).map(RequestId)
    }
}

/// Normalized, immutable view of one inbound request.
///
/// A `RequestContext` is created by the transport driver and handed to
/// [`Application::dispatch_from_driver`](crate::app::Application::dispatch_from_driver).
/// It never changes after construction: middleware that wants to pass data downstream
/// calls [`with_attribute`](Self::with_attribute), which returns a *new* context. Stages
/// upstream of that middleware keep seeing their own copy, so attributes never propagate
/// backwards through the pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    request_id: RequestId,
    method: Method,
    path: String,
    query: ParamVec,
    headers: HeaderVec,
    cookies: HeaderVec,
    body: Value,
    attributes: HashMap<String, Value>,
}

impl RequestContext {
    /// Start building a context for `method` and a request target such as `/users/42?page=2`.
    ///
    /// The query string is split off the path and percent-decoded.
    #[must_use]
    pub fn builder(method: Method, uri: &str) -> RequestContextBuilder {
        RequestContextBuilder::new(method, uri)
    }

    /// Shorthand for a body-less request with no headers.
    #[must_use]
    pub fn new(method: Method, uri: &str) -> Self {
        Self::builder(method, uri).build()
    }

    #[inline]
    #[must_use]
    pub fn request_id(&self) -> RequestId {
        self.request_id
    }

    #[inline]
    #[must_use]
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Request path without the query string.
    #[inline]
    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Get a query parameter by name ("last write wins" for repeated keys).
    #[inline]
    #[must_use]
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.query
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn query_params(&self) -> &ParamVec {
        &self.query
    }

    /// Get a header by name (case-insensitive per RFC 7230).
    #[inline]
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn headers(&self) -> &HeaderVec {
        &self.headers
    }

    #[inline]
    #[must_use]
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.cookies
            .iter()
            .find(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn content_type(&self) -> Option<&str> {
        self.header("content-type")
    }

    /// Parsed request body. `Value::Null` when the request carried none.
    #[must_use]
    pub fn body(&self) -> &Value {
        &self.body
    }

    /// The body as a JSON object, if it is one.
    #[must_use]
    pub fn body_object(&self) -> Option<&Map<String, Value>> {
        self.body.as_object()
    }

    /// Read an attribute attached by earlier middleware.
    #[must_use]
    pub fn attribute(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    #[must_use]
    pub fn attributes(&self) -> &HashMap<String, Value> {
        &self.attributes
    }

    /// Return a copy of this context with `key` set to `value`.
    ///
    /// `self` is left untouched.
    #[must_use]
    pub fn with_attribute(&self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        let mut next = self.clone();
        next.attributes.insert(key.into(), value.into());
        next
    }
}

/// Builder for [`RequestContext`], used by drivers and tests.
#[derive(Debug)]
pub struct RequestContextBuilder {
    method: Method,
    path: String,
    query: ParamVec,
    headers: HeaderVec,
    cookies: HeaderVec,
    body: Value,
    attributes: HashMap<String, Value>,
}

impl RequestContextBuilder {
    fn new(method: Method, uri: &str) -> Self {
        let (path, query) = match uri.split_once('?') {
            Some((path, query)) => (path, parse_query(query)),
            None => (uri, ParamVec::new()),
        };
        let path = if path.is_empty() { "/" } else { path };

        Self {
            method,
            path: path.to_string(),
            query,
            headers: HeaderVec::new(),
            cookies: HeaderVec::new(),
            body: Value::Null,
            attributes: HashMap::new(),
        }
    }

    /// Add a header. A `Cookie` header is also split into individual cookies.
    #[must_use]
    pub fn header(mut self, name: &str, value: impl Into<String>) -> Self {
        let value = value.into();
        if name.eq_ignore_ascii_case("cookie") {
            self.cookies.extend(parse_cookies(&value));
        }
        self.headers.push((Arc::from(name), value));
        self
    }

    #[must_use]
    pub fn cookie(mut self, name: &str, value: impl Into<String>) -> Self {
        self.cookies.push((Arc::from(name), value.into()));
        self
    }

    /// Set an already-parsed JSON body and mark the request as `application/json`.
    #[must_use]
    pub fn json_body(mut self, body: Value) -> Self {
        if !self
            .headers
            .iter()
            .any(|(k, _)| k.eq_ignore_ascii_case("content-type"))
        {
            self.headers
                .push((Arc::from("content-type"), "application/json".to_string()));
        }
        self.body = body;
        self
    }

    /// Set a form body from decoded `name=value` pairs.
    #[must_use]
    pub fn form_body<'a, I>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        let map: Map<String, Value> = fields
            .into_iter()
            .map(|(k, v)| (k.to_string(), Value::String(v.to_string())))
            .collect();
        self.body = Value::Object(map);
        self
    }

    /// Set a raw body. JSON content is parsed when the content type says so; an unparsable
    /// JSON body becomes an empty object, the same as a missing one.
    #[must_use]
    pub fn raw_body(self, content_type: &str, content: &str) -> Self {
        if content_type.contains("application/json") {
            let body = serde_json::from_str(content).unwrap_or_else(|_| Value::Object(Map::new()));
            self.header("content-type", content_type).json_body(body)
        } else if content_type.contains("application/x-www-form-urlencoded") {
            let pairs: Vec<(String, String)> = parse_query(content)
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect();
            self.header("content-type", content_type)
                .form_body(pairs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
        } else {
            let mut builder = self.header("content-type", content_type);
            builder.body = Value::String(content.to_string());
            builder
        }
    }

    /// Pre-seed an attribute (drivers rarely need this; middleware uses `with_attribute`).
    #[must_use]
    pub fn attribute(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attributes.insert(key.into(), value.into());
        self
    }

    #[must_use]
    pub fn build(self) -> RequestContext {
        let request_id = RequestId::from_header_or_new(
            self.headers
                .iter()
                .find(|(k, _)| k.eq_ignore_ascii_case("x-request-id"))
                .map(|(_, v)| v.as_str()),
        );
        RequestContext {
            request_id,
            method: self.method,
            path: self.path,
            query: self.query,
            headers: self.headers,
            cookies: self.cookies,
            body: self.body,
            attributes: self.attributes,
        }
    }
}

fn parse_query(query: &str) -> ParamVec {
    query
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (Arc::from(decode_component(name).as_str()), decode_component(value))
        })
        .collect()
}

fn decode_component(raw: &str) -> String {
    let spaced = raw.replace('+', " ");
    urlencoding::decode(&spaced)
        .map(|decoded| decoded.into_owned())
        .unwrap_or(spaced)
}

fn parse_cookies(header: &str) -> HeaderVec {
    header
        .split(';')
        .filter_map(|pair| {
            let mut parts = pair.trim().splitn(2, '=');
            let name = parts.next()?.trim();
            if name.is_empty() {
                return None;
            }
            let value = parts.next().unwrap_or("").trim().to_string();
            Some((Arc::from(name), value))
        })
        .collect()
}
