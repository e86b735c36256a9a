//! Middleware layer.
//!
//! Middleware intercepts outgoing requests and incoming responses and is the
//! right place for cross-cutting client concerns: authentication headers,
//! request validation, response status checks, structured tracing.
//!
//! A middleware is a decorator. Given the next [`Handler`] in the pipeline it
//! returns a new handler that wraps it:
//!
//! ```text
//! wrap(next) → handler
//!                ├─ pre-logic (may mutate the request, may short-circuit)
//!                ├─ next.handle(ctx, req).await
//!                └─ post-logic (may inspect or replace the outcome)
//! ```
//!
//! Three ways to write one:
//! - implement [`Middleware`] on your own type,
//! - pass a closure to [`middleware_fn`],
//! - use one of the restricted shapes in [`processor`]:
//!   [`RequestProcessor`] (mutate or reject the request) and
//!   [`ResponseProcessor`] (observe or replace the outcome).
//!
//! Built-in middleware:
//! - [`trace::Trace`] — per-request span with method, uri, status, latency

use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler};

pub mod processor;
pub mod trace;

pub use processor::{RequestProcessor, ResponseProcessor};

/// A type-erased middleware as stored in a [`Chain`](crate::Chain).
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Decorates a handler with additional behavior.
///
/// The returned handler must, on every path that does not short-circuit,
/// call `next` with the context and a request. A handler that returns
/// without calling `next` ends the forward pass: nothing further inside it
/// runs, so it has to produce the response or error itself.
pub trait Middleware: Send + Sync + 'static {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler;
}

impl<M: Middleware + ?Sized> Middleware for Arc<M> {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        (**self).wrap(next)
    }
}

/// Adapts a closure `Fn(BoxedHandler) -> BoxedHandler` into a [`Middleware`].
///
/// ```rust
/// use std::sync::Arc;
/// use layerwise::{BoxedHandler, Context, Handler, Request, handler_fn, middleware_fn};
///
/// let add_header = middleware_fn(|next: BoxedHandler| {
///     Arc::new(handler_fn(move |ctx: Context, mut req: Request| {
///         req.headers_mut().insert("x-client", "layerwise".parse().unwrap());
///         next.handle(ctx, req)
///     })) as BoxedHandler
/// });
/// # let _ = add_header;
/// ```
pub fn middleware_fn<F>(f: F) -> MiddlewareFn<F>
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    MiddlewareFn(f)
}

/// Newtype returned by [`middleware_fn`].
#[derive(Clone, Copy)]
pub struct MiddlewareFn<F>(F);

impl<F> Middleware for MiddlewareFn<F>
where
    F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        (self.0)(next)
    }
}

/// Shorthand for erasing a concrete handler.
pub(crate) fn boxed(handler: impl Handler) -> BoxedHandler {
    Arc::new(handler)
}
