//! Restricted middleware shapes.
//!
//! Most client middleware only ever touches one side of the exchange. These
//! two adapters cover that without hand-writing a [`Middleware`]:
//!
//! | Adapter | Runs | Can |
//! |---|---|---|
//! | [`RequestProcessor`] | before `next` | mutate the request, or reject it |
//! | [`ResponseProcessor`] | after `next` | observe the outcome, or replace it with an error |

use std::sync::Arc;

use crate::context::Context;
use crate::error::Error;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::middleware::Middleware;
use crate::{Request, Response};

/// Runs a function against every outgoing request before it goes further in.
///
/// If the function returns `Err`, that error is the outcome: `next`, every
/// middleware inside this one and the terminal handler are all skipped.
/// If it returns `Ok(())`, the (possibly mutated) request is passed on and
/// whatever comes back is returned as is.
///
/// ```rust
/// use layerwise::{Error, Request, RequestProcessor};
///
/// let auth = RequestProcessor::new(|req: &mut Request| {
///     req.headers_mut().insert("authorization", "Bearer token".parse().map_err(Error::new)?);
///     Ok(())
/// });
/// # let _ = auth;
/// ```
pub struct RequestProcessor<F> {
    process: Arc<F>,
}

impl<F> RequestProcessor<F>
where
    F: Fn(&mut Request) -> Result<(), Error> + Send + Sync + 'static,
{
    pub fn new(process: F) -> Self {
        Self { process: Arc::new(process) }
    }
}

impl<F> Middleware for RequestProcessor<F>
where
    F: Fn(&mut Request) -> Result<(), Error> + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(RequestStage { process: Arc::clone(&self.process), next })
    }
}

struct RequestStage<F> {
    process: Arc<F>,
    next: BoxedHandler,
}

impl<F> Handler for RequestStage<F>
where
    F: Fn(&mut Request) -> Result<(), Error> + Send + Sync + 'static,
{
    fn handle(&self, ctx: Context, mut req: Request) -> BoxFuture {
        let process = Arc::clone(&self.process);
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            process(&mut req)?;
            next.handle(ctx, req).await
        })
    }
}

/// Runs a function against every outcome on its way back out.
///
/// `next` is always called first, so the function sees the real result of
/// everything downstream, failures included. If it returns `Ok(())` the
/// outcome passes through unchanged. If it returns `Err(e)`, `e` becomes the
/// outcome; a response that had been received is attached to `e` and stays
/// reachable through [`Error::response`]. That includes a response an inner
/// processor had already attached to the error it returned.
///
/// ```rust
/// use layerwise::{Error, Response, ResponseProcessor};
///
/// let require_success = ResponseProcessor::new(|outcome: Result<&Response, &Error>| {
///     match outcome {
///         Ok(resp) if !resp.status().is_success() => {
///             Err(Error::new(format!("unexpected status {}", resp.status())))
///         }
///         _ => Ok(()),
///     }
/// });
/// # let _ = require_success;
/// ```
pub struct ResponseProcessor<F> {
    process: Arc<F>,
}

impl<F> ResponseProcessor<F>
where
    F: Fn(Result<&Response, &Error>) -> Result<(), Error> + Send + Sync + 'static,
{
    pub fn new(process: F) -> Self {
        Self { process: Arc::new(process) }
    }
}

impl<F> Middleware for ResponseProcessor<F>
where
    F: Fn(Result<&Response, &Error>) -> Result<(), Error> + Send + Sync + 'static,
{
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(ResponseStage { process: Arc::clone(&self.process), next })
    }
}

struct ResponseStage<F> {
    process: Arc<F>,
    next: BoxedHandler,
}

impl<F> Handler for ResponseStage<F>
where
    F: Fn(Result<&Response, &Error>) -> Result<(), Error> + Send + Sync + 'static,
{
    fn handle(&self, ctx: Context, req: Request) -> BoxFuture {
        let process = Arc::clone(&self.process);
        let next = Arc::clone(&self.next);
        Box::pin(async move {
            let outcome = next.handle(ctx, req).await;
            match process(outcome.as_ref()) {
                Ok(()) => outcome,
                Err(err) => match outcome {
                    Ok(resp) => Err(err.with_response(resp)),
                    Err(mut prev) => match prev.take_response() {
                        Some(resp) if err.response().is_none() => Err(err.with_response(resp)),
                        _ => Err(err),
                    },
                },
            }
        })
    }
}
