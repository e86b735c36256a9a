//! Handler trait and type erasure.
//!
//! # How handlers are stored
//!
//! A chain is a stack of middleware of *different* concrete types, each
//! wrapping the handler below it. Rust cannot nest arbitrary types without
//! naming them, so every stage is erased to the same trait object
//! ([`BoxedHandler`]) and each middleware receives and returns that.
//!
//! The path from user code to vtable call is:
//!
//! ```text
//! handler_fn(|ctx, req| async { … })     ← user writes this
//!        ↓ chain.compile(terminal)
//! Arc::new(terminal)                     ← BoxedHandler = Arc<dyn Handler>
//!        ↓ middleware.wrap(next)          ← once per middleware, innermost first
//! handler.handle(ctx, req)  per call     ← one vtable dispatch per stage
//!        ↓
//! Box::pin(async { … })                  ← BoxFuture
//! ```
//!
//! Per request the cost is one virtual call and one boxed future per stage,
//! negligible next to a network round-trip.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::{Request, Response};

/// A heap-allocated, type-erased future that resolves to a handler outcome.
///
/// `Send + 'static` so the caller may `tokio::spawn` a compiled chain.
pub type BoxFuture = Pin<Box<dyn Future<Output = Result<Response, Error>> + Send + 'static>>;

/// A type-erased handler, shared between every compiled chain that uses it.
pub type BoxedHandler = Arc<dyn Handler>;

/// The unit of work: take a context and a request, produce a response or fail.
///
/// The terminal handler (the one that actually talks to the network)
/// implements this, and so does every compiled [`Chain`](crate::Chain).
/// Closures become handlers through [`handler_fn`].
pub trait Handler: Send + Sync + 'static {
    fn handle(&self, ctx: Context, req: Request) -> BoxFuture;
}

impl<H: Handler + ?Sized> Handler for Arc<H> {
    fn handle(&self, ctx: Context, req: Request) -> BoxFuture {
        (**self).handle(ctx, req)
    }
}

impl<H: Handler + ?Sized> Handler for Box<H> {
    fn handle(&self, ctx: Context, req: Request) -> BoxFuture {
        (**self).handle(ctx, req)
    }
}

/// Adapts an async closure into a [`Handler`].
///
/// ```rust
/// use layerwise::{Context, Request, handler_fn};
///
/// let echo = handler_fn(|_ctx: Context, req: Request| async move {
///     Ok(http::Response::new(req.into_body()))
/// });
/// # let _ = echo;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> HandlerFn<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    HandlerFn(f)
}

/// Newtype returned by [`handler_fn`], bridging a closure to the trait.
#[derive(Clone, Copy)]
pub struct HandlerFn<F>(F);

impl<F, Fut> Handler for HandlerFn<F>
where
    F: Fn(Context, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<Response, Error>> + Send + 'static,
{
    fn handle(&self, ctx: Context, req: Request) -> BoxFuture {
        Box::pin((self.0)(ctx, req))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use bytes::Bytes;

    use super::*;

    #[tokio::test]
    async fn handler_fn_calls_the_closure() {
        let called = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&called);
        let handler = handler_fn(move |_ctx, _req| {
            flag.store(true, Ordering::SeqCst);
            async { Ok(http::Response::new(Bytes::new())) }
        });

        let resp = handler.handle(Context::background(), Request::new(Bytes::new())).await;
        assert!(resp.is_ok());
        assert!(called.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn boxed_handlers_forward() {
        let inner: BoxedHandler = Arc::new(handler_fn(|_ctx, req: Request| async move {
            Ok(http::Response::new(req.into_body()))
        }));
        let outer: Box<dyn Handler> = Box::new(Arc::clone(&inner));

        let resp = outer
            .handle(Context::background(), Request::new(Bytes::from_static(b"hi")))
            .await
            .unwrap();
        assert_eq!(resp.body(), &Bytes::from_static(b"hi"));
    }
}
