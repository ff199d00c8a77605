use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use super::{Middleware, RequestHandler};
use crate::container::{Arguments, ContainerError, Injectable};
use crate::error::DispatchError;
use crate::http::{RequestContext, Response};

/// Middleware for collecting request metrics
///
/// Tracks request counts, latency and failures. All counters use atomic operations for
/// thread-safe updates without locks.
///
/// Metrics collected:
/// - Total request count
/// - Average latency (request processing time)
/// - Client errors (4xx responses)
/// - Server errors (5xx responses and errors raised down the chain)
#[derive(Debug, Default)]
pub struct MetricsMiddleware {
    request_count: AtomicUsize,
    total_latency_ns: AtomicU64,
    client_errors: AtomicUsize,
    server_errors: AtomicUsize,
}

impl MetricsMiddleware {
    /// Create a new metrics middleware with all counters initialized to zero
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the total number of requests processed
    #[must_use]
    pub fn request_count(&self) -> usize {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Calculate the average request latency
    ///
    /// Returns zero duration if no requests have been processed yet.
    #[must_use]
    pub fn average_latency(&self) -> Duration {
        let count = self.request_count.load(Ordering::Relaxed) as u64;
        if count == 0 {
            Duration::from_nanos(0)
        } else {
            Duration::from_nanos(self.total_latency_ns.load(Ordering::Relaxed) / count)
        }
    }

    #[must_use]
    pub fn client_errors(&self) -> usize {
        self.client_errors.load(Ordering::Relaxed)
    }

    /// Responses with a 5xx status plus errors that propagated past this middleware.
    #[must_use]
    pub fn server_errors(&self) -> usize {
        self.server_errors.load(Ordering::Relaxed)
    }

    fn record(&self, status: u16, latency: Duration) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
        let nanos = u64::try_from(latency.as_nanos()).unwrap_or(u64::MAX);
        self.total_latency_ns.fetch_add(nanos, Ordering::Relaxed);
        match status {
            400..=499 => {
                self.client_errors.fetch_add(1, Ordering::Relaxed);
            }
            500..=599 => {
                self.server_errors.fetch_add(1, Ordering::Relaxed);
            }
            _ => {}
        }
    }
}

impl Injectable for MetricsMiddleware {
    fn construct(_: &mut Arguments) -> Result<Self, ContainerError> {
        Ok(Self::new())
    }
}

/// Passive: never blocks a request, only observes it. Errors are counted with the status
/// they will be mapped to.
impl Middleware for MetricsMiddleware {
    fn process(
        &self,
        request: RequestContext,
        next: &mut dyn RequestHandler,
    ) -> Result<Response, DispatchError> {
        let start = Instant::now();
        let result = next.handle(request);
        let status = match &result {
            Ok(response) => response.status,
            Err(error) => error.status(),
        };
        self.record(status, start.elapsed());
        result
    }
}
