use std::sync::Arc;

use crate::error::DispatchError;
use crate::http::{RequestContext, Response};

/// Anything that turns a request into a response.
pub trait RequestHandler {
    fn handle(&mut self, request: RequestContext) -> Result<Response, DispatchError>;
}

impl<F> RequestHandler for F
where
    F: FnMut(RequestContext) -> Result<Response, DispatchError>,
{
    fn handle(&mut self, request: RequestContext) -> Result<Response, DispatchError> {
        self(request)
    }
}

/// Pin a closure to the [`RequestHandler`] signature.
///
/// Closures passed straight to `impl RequestHandler` parameters cannot have their error
/// type inferred; wrapping them here fixes the signature.
pub fn handler_fn<F>(f: F) -> F
where
    F: FnMut(RequestContext) -> Result<Response, DispatchError>,
{
    f
}

/// An interceptor in a [`MiddlewarePipeline`].
///
/// Implementations are shared between requests (`&self`), so per-request state belongs in
/// the request attributes, not in the middleware.
pub trait Middleware: Send + Sync {
    /// Handle `request`, delegating to `next` to continue the chain.
    ///
    /// # Errors
    ///
    /// Errors from `next` propagate unless the middleware turns them into a response.
    fn process(
        &self,
        request: RequestContext,
        next: &mut dyn RequestHandler,
    ) -> Result<Response, DispatchError>;
}

/// Ordered middleware around a terminal handler, driven by a cursor.
///
/// `handle` runs the middleware at the cursor, advancing the cursor *before* delegating
/// and passing the pipeline itself as `next`. Once the cursor passes the last middleware
/// the terminal handler runs. The cursor is per-invocation state: call
/// [`reset`](Self::reset) (or use [`run`](Self::run)) before reusing a pipeline.
pub struct MiddlewarePipeline<'t> {
    middleware: Vec<Arc<dyn Middleware>>,
    cursor: usize,
    terminal: Box<dyn RequestHandler + 't>,
}

impl<'t> MiddlewarePipeline<'t> {
    #[must_use]
    pub fn new(terminal: impl RequestHandler + 't) -> Self {
        Self::with_middleware(Vec::new(), terminal)
    }

    #[must_use]
    pub fn with_middleware(
        middleware: Vec<Arc<dyn Middleware>>,
        terminal: impl RequestHandler + 't,
    ) -> Self {
        Self {
            middleware,
            cursor: 0,
            terminal: Box::new(terminal),
        }
    }

    /// Append a middleware to the end of the chain.
    pub fn pipe(&mut self, middleware: Arc<dyn Middleware>) -> &mut Self {
        self.middleware.push(middleware);
        self
    }

    /// Rewind the cursor so the pipeline can serve another request.
    pub fn reset(&mut self) {
        self.cursor = 0;
    }

    /// [`reset`](Self::reset), then [`handle`](RequestHandler::handle).
    ///
    /// # Errors
    ///
    /// Whatever the chain returns.
    pub fn run(&mut self, request: RequestContext) -> Result<Response, DispatchError> {
        self.reset();
        let result = self.handle(request);
        self.reset();
        result
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.middleware.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.middleware.is_empty()
    }

    #[must_use]
    pub fn cursor(&self) -> usize {
        self.cursor
    }
}

impl RequestHandler for MiddlewarePipeline<'_> {
    fn handle(&mut self, request: RequestContext) -> Result<Response, DispatchError> {
        let Some(middleware) = self.middleware.get(self.cursor).map(Arc::clone) else {
            return self.terminal.handle(request);
        };
        self.cursor += 1;
        middleware.process(request, self)
    }
}

/// An immutable, shareable middleware list that builds fresh pipelines.
///
/// Each call to [`pipeline`](Self::pipeline) gets its own cursor, so one stack can serve
/// concurrent requests.
#[derive(Clone, Default)]
pub struct MiddlewareStack {
    layers: Arc<Vec<Arc<dyn Middleware>>>,
}

impl MiddlewareStack {
    #[must_use]
    pub fn new(layers: Vec<Arc<dyn Middleware>>) -> Self {
        Self {
            layers: Arc::new(layers),
        }
    }

    pub fn push(&mut self, middleware: Arc<dyn Middleware>) {
        Arc::make_mut(&mut self.layers).push(middleware);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    #[must_use]
    pub fn pipeline<'t>(&self, terminal: impl RequestHandler + 't) -> MiddlewarePipeline<'t> {
        MiddlewarePipeline::with_middleware(self.layers.as_ref().clone(), terminal)
    }

    /// Run `request` through the stack into `terminal`.
    ///
    /// # Errors
    ///
    /// Whatever the chain returns.
    pub fn handle<'t>(
        &self,
        request: RequestContext,
        terminal: impl RequestHandler + 't,
    ) -> Result<Response, DispatchError> {
        self.pipeline(terminal).handle(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::Method;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Record {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Middleware for Record {
        fn process(
            &self,
            request: RequestContext,
            next: &mut dyn RequestHandler,
        ) -> Result<Response, DispatchError> {
            self.log.lock().push(format!("{}:in", self.name));
            let response = next.handle(request);
            self.log.lock().push(format!("{}:out", self.name));
            response
        }
    }

    struct Count(Arc<AtomicUsize>);

    impl Middleware for Count {
        fn process(
            &self,
            request: RequestContext,
            next: &mut dyn RequestHandler,
        ) -> Result<Response, DispatchError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            next.handle(request)
        }
    }

    struct Deny;

    impl Middleware for Deny {
        fn process(
            &self,
            _request: RequestContext,
            _next: &mut dyn RequestHandler,
        ) -> Result<Response, DispatchError> {
            Ok(Response::text(403, "denied"))
        }
    }

    struct Tag;

    impl Middleware for Tag {
        fn process(
            &self,
            request: RequestContext,
            next: &mut dyn RequestHandler,
        ) -> Result<Response, DispatchError> {
            let response = next.handle(request.with_attribute("user_id", 7))?;
            // The original request is unchanged upstream.
            assert!(request.attribute("user_id").is_none());
            Ok(response)
        }
    }

    fn request() -> RequestContext {
        RequestContext::new(Method::GET, "/")
    }

    #[test]
    fn test_empty_pipeline_calls_terminal() {
        let mut pipeline = MiddlewarePipeline::new(handler_fn(|_| Ok(Response::text(200, "t"))));
        assert_eq!(pipeline.handle(request()).unwrap().body, "t");
    }

    #[test]
    fn test_order_and_reverse_unwind() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let terminal_log = Arc::clone(&log);
        let mut pipeline = MiddlewarePipeline::new(handler_fn(move |_| {
            terminal_log.lock().push("handler".to_string());
            Ok(Response::empty(200))
        }));
        pipeline
            .pipe(Arc::new(Record { name: "A", log: Arc::clone(&log) }))
            .pipe(Arc::new(Record { name: "B", log: Arc::clone(&log) }));
        pipeline.handle(request()).unwrap();
        assert_eq!(
            *log.lock(),
            vec!["A:in", "B:in", "handler", "B:out", "A:out"]
        );
    }

    #[test]
    fn test_short_circuit_skips_rest() {
        let before = Arc::new(AtomicUsize::new(0));
        let after = Arc::new(AtomicUsize::new(0));
        let terminal_calls = Arc::new(AtomicUsize::new(0));
        let terminal_counter = Arc::clone(&terminal_calls);

        let layers: Vec<Arc<dyn Middleware>> = vec![
            Arc::new(Count(Arc::clone(&before))),
            Arc::new(Deny),
            Arc::new(Count(Arc::clone(&after))),
        ];
        let mut pipeline = MiddlewarePipeline::with_middleware(
            layers,
            handler_fn(move |_| {
                terminal_counter.fetch_add(1, Ordering::SeqCst);
                Ok(Response::empty(200))
            }),
        );
        let response = pipeline.handle(request()).unwrap();
        assert_eq!(response.status, 403);
        assert_eq!(before.load(Ordering::SeqCst), 1);
        assert_eq!(after.load(Ordering::SeqCst), 0);
        assert_eq!(terminal_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_attribute_reaches_terminal() {
        let layers: Vec<Arc<dyn Middleware>> = vec![Arc::new(Tag)];
        let mut pipeline = MiddlewarePipeline::with_middleware(
            layers,
            handler_fn(|req| {
                let id = req.attribute("user_id").and_then(|v| v.as_i64()).unwrap_or(0);
                Ok(Response::text(200, id.to_string()))
            }),
        );
        assert_eq!(pipeline.handle(request()).unwrap().body, "7");
    }

    #[test]
    fn test_reset_allows_reuse() {
        let hits = Arc::new(AtomicUsize::new(0));
        let layers: Vec<Arc<dyn Middleware>> = vec![Arc::new(Count(Arc::clone(&hits)))];
        let mut pipeline =
            MiddlewarePipeline::with_middleware(layers, handler_fn(|_| Ok(Response::empty(200))));
        pipeline.handle(request()).unwrap();
        assert_eq!(pipeline.cursor(), 1);
        // Without a reset the middleware is skipped.
        pipeline.handle(request()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 1);

        pipeline.reset();
        pipeline.handle(request()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 2);

        pipeline.run(request()).unwrap();
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(pipeline.cursor(), 0);
    }

    #[test]
    fn test_stack_hands_out_independent_pipelines() {
        let hits = Arc::new(AtomicUsize::new(0));
        let layers: Vec<Arc<dyn Middleware>> = vec![Arc::new(Count(Arc::clone(&hits)))];
        let stack = MiddlewareStack::new(layers);
        for _ in 0..3 {
            stack
                .handle(request(), handler_fn(|_| Ok(Response::empty(204))))
                .unwrap();
        }
        assert_eq!(hits.load(Ordering::SeqCst), 3);
        assert_eq!(stack.len(), 1);
    }
}
