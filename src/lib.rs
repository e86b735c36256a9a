//! # layerwise
//!
//! Composable middleware chains for HTTP clients.
//! Nothing more. Nothing less.
//!
//! ## The contract
//!
//! Your HTTP client sends requests. layerwise does not. It takes the function
//! that sends a request (the *terminal handler*) and wraps it in an ordered
//! stack of middleware, each of which may touch the request on the way in,
//! the outcome on the way out, or stop the request before it leaves.
//!
//! What is left to the caller, on purpose:
//!
//! - **Transport** — hyper, reqwest, a test double: anything that implements [`Handler`]
//! - **Request building** — URLs, headers, bodies are plain [`http`] types
//! - **Retries and timeouts** — write them as middleware, or use [`Context`] deadlines
//!
//! What layerwise owns:
//!
//! - [`Chain`] — ordered middleware, parent/child inheritance, compilation
//! - [`Middleware`] and its two restricted shapes, [`RequestProcessor`] and [`ResponseProcessor`]
//! - Short-circuit on the way in, observe-and-replace on the way out
//!
//! ## Quick start
//!
//! ```rust
//! use layerwise::{Chain, Context, Error, Handler, Request, Response, handler_fn};
//!
//! #[derive(Debug, thiserror::Error)]
//! #[error("missing user-agent")]
//! struct MissingUserAgent;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let mut chain = Chain::new();
//! chain
//!     .push_request(|req: &mut Request| {
//!         if req.headers().contains_key("user-agent") {
//!             Ok(())
//!         } else {
//!             Err(Error::new(MissingUserAgent))
//!         }
//!     })
//!     .push_response(|outcome: Result<&Response, &Error>| {
//!         if let Err(e) = outcome {
//!             eprintln!("request failed: {e}");
//!         }
//!         Ok(())
//!     });
//!
//! // The terminal handler. In a real client this performs the network call.
//! let send = handler_fn(|_ctx: Context, req: Request| async move {
//!     Ok(http::Response::new(req.into_body()))
//! });
//!
//! let client = chain.compile(send);
//! let err = client
//!     .handle(Context::background(), Request::new("hello".into()))
//!     .await
//!     .unwrap_err();
//! assert!(err.is::<MissingUserAgent>());
//! # }
//! ```

mod chain;
mod context;
mod error;
mod handler;

pub mod middleware;

pub use chain::Chain;
pub use context::{Context, ContextError};
pub use error::{BoxError, Error};
pub use handler::{BoxFuture, BoxedHandler, Handler, HandlerFn, handler_fn};
pub use middleware::{
    BoxedMiddleware, Middleware, MiddlewareFn, RequestProcessor, ResponseProcessor, middleware_fn,
};

/// An outgoing request, as seen by every stage of a chain.
pub type Request = http::Request<bytes::Bytes>;

/// An incoming response, as produced by the terminal handler.
pub type Response = http::Response<bytes::Bytes>;
