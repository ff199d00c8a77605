use http::Method;

use super::{Middleware, RequestHandler};
use crate::container::{Arguments, ContainerError, Injectable};
use crate::error::DispatchError;
use crate::http::{RequestContext, Response};

/// CORS (Cross-Origin Resource Sharing) middleware
///
/// Adds `Access-Control-Allow-*` headers to every successful response, including the
/// synthetic `204` answer to `OPTIONS` preflight requests, which therefore needs no
/// special handling here.
#[derive(Debug, Clone)]
pub struct CorsMiddleware {
    allowed_origins: Vec<String>,
    allowed_headers: Vec<String>,
    allowed_methods: Vec<Method>,
}

impl CorsMiddleware {
    /// Create a new CORS middleware with specific configuration
    ///
    /// # Arguments
    ///
    /// * `allowed_origins` - List of allowed origins (e.g., `["https://example.com"]`), or `["*"]`
    /// * `allowed_headers` - List of allowed request headers
    /// * `allowed_methods` - List of allowed HTTP methods
    #[must_use]
    pub fn new(
        allowed_origins: Vec<String>,
        allowed_headers: Vec<String>,
        allowed_methods: Vec<Method>,
    ) -> Self {
        Self {
            allowed_origins,
            allowed_headers,
            allowed_methods,
        }
    }

    /// The `Access-Control-Allow-Origin` value for a request `Origin`, if any applies.
    ///
    /// A wildcard policy answers `*`. Otherwise a listed origin is echoed back and an
    /// unlisted one gets no header. Requests without `Origin` get the first listed origin.
    fn allow_origin(&self, origin: Option<&str>) -> Option<String> {
        if self.allowed_origins.iter().any(|o| o == "*") {
            return Some("*".to_string());
        }
        match origin {
            Some(origin) => self
                .allowed_origins
                .iter()
                .find(|allowed| allowed.as_str() == origin)
                .cloned(),
            None => self.allowed_origins.first().cloned(),
        }
    }
}

/// Permissive policy: any origin, `Content-Type`/`Authorization`, common methods.
impl Default for CorsMiddleware {
    fn default() -> Self {
        Self {
            allowed_origins: vec!["*".into()],
            allowed_headers: vec!["Content-Type".into(), "Authorization".into()],
            allowed_methods: vec![
                Method::GET,
                Method::POST,
                Method::PUT,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ],
        }
    }
}

impl Injectable for CorsMiddleware {
    fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
        Ok(Self::default())
    }
}

impl Middleware for CorsMiddleware {
    fn process(
        &self,
        request: RequestContext,
        next: &mut dyn RequestHandler,
    ) -> Result<Response, DispatchError> {
        let allow_origin = self.allow_origin(request.header("origin"));
        let mut response = next.handle(request)?;

        if let Some(origin) = allow_origin {
            if origin != "*" {
                response.set_header("Vary", "Origin");
            }
            response.set_header("Access-Control-Allow-Origin", origin);
        }
        response.set_header(
            "Access-Control-Allow-Headers",
            self.allowed_headers.join(", "),
        );
        let methods = self
            .allowed_methods
            .iter()
            .map(Method::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        response.set_header("Access-Control-Allow-Methods", methods);
        Ok(response)
    }
}
