use std::time::Instant;

use tracing::{info, info_span, warn};

use super::{Middleware, RequestHandler};
use crate::container::{Arguments, ContainerError, Injectable};
use crate::error::DispatchError;
use crate::http::{RequestContext, Response};

/// Opens a `request` span around the rest of the chain and logs the outcome.
///
/// Span fields: `request_id`, `method`, `path`. The completion event carries `status`
/// and `duration_us`; failures are logged at `warn` with the error message.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingMiddleware;

impl Injectable for TracingMiddleware {
    fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
        Ok(Self)
    }
}

impl Middleware for TracingMiddleware {
    fn process(
        &self,
        request: RequestContext,
        next: &mut dyn RequestHandler,
    ) -> Result<Response, DispatchError> {
        let span = info_span!(
            "request",
            request_id = %request.request_id(),
            method = %request.method(),
            path = %request.path(),
        );
        let _entered = span.enter();
        let start = Instant::now();

        let result = next.handle(request);
        let duration_us = start.elapsed().as_micros();

        match &result {
            Ok(response) => info!(
                status = response.status,
                duration_us = duration_us,
                "Request completed"
            ),
            Err(error) => warn!(
                status = error.status(),
                duration_us = duration_us,
                error = %error,
                "Request failed"
            ),
        }
        result
    }
}
