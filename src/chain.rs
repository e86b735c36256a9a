//! Middleware chains and their compilation into a single handler.
//!
//! # Order
//!
//! Insertion order is execution order, outermost first. For a chain holding
//! `[M1, M2, M3]` compiled around terminal `T`:
//!
//! ```text
//! M1 (pre)
//!   → M2 (pre)
//!     → M3 (pre)
//!       → T
//!     ← M3 (post)
//!   ← M2 (post)
//! ← M1 (post)
//! ```
//!
//! # Inheritance
//!
//! A chain derived with [`Chain::child`] keeps a reference to its parent.
//! The parent's middleware always wraps the child's:
//!
//! ```text
//! parent [A, B]  +  child [C]   →   effective [A, B, C]
//! ```
//!
//! The parent is shared through an [`Arc`], which makes it immutable for as
//! long as any child holds it. Appending to a parent afterwards goes through
//! [`Arc::make_mut`], which clones it; existing children keep the snapshot
//! they were derived from.

use std::fmt;
use std::sync::Arc;

use tracing::trace;

use crate::error::Error;
use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{
    BoxedMiddleware, Middleware, RequestProcessor, ResponseProcessor, boxed, middleware_fn,
};
use crate::{Request, Response};

/// An ordered list of middleware plus an optional parent chain.
///
/// # Example
///
/// ```rust
/// use std::sync::Arc;
/// use layerwise::{Chain, Context, Error, Handler, Request, handler_fn};
/// use layerwise::middleware::trace::Trace;
///
/// # async fn run() -> Result<(), Error> {
/// let base = Arc::new(Chain::new().with(Trace::new().name("api")));
///
/// let mut authed = base.child([]);
/// authed.push_request(|req: &mut Request| {
///     req.headers_mut().insert("authorization", "Bearer t0k3n".parse().map_err(Error::new)?);
///     Ok(())
/// });
///
/// let send = handler_fn(|_ctx: Context, req: Request| async move {
///     Ok(http::Response::new(req.into_body()))
/// });
///
/// let client = authed.compile(send);
/// let resp = client.handle(Context::background(), Request::new("ping".into())).await?;
/// assert_eq!(resp.body(), "ping");
/// # Ok(())
/// # }
/// ```
#[derive(Clone, Default)]
pub struct Chain {
    middlewares: Vec<BoxedMiddleware>,
    parent: Option<Arc<Chain>>,
}

impl Chain {
    /// An empty root chain.
    pub fn new() -> Self {
        Self::default()
    }

    /// A root chain pre-seeded with `middlewares`, in order.
    pub fn from_middlewares(middlewares: impl IntoIterator<Item = BoxedMiddleware>) -> Self {
        Self { middlewares: middlewares.into_iter().collect(), parent: None }
    }

    /// Derives a child chain whose parent is `self`, seeded with `middlewares`
    /// as its own list.
    pub fn child(
        self: &Arc<Self>,
        middlewares: impl IntoIterator<Item = BoxedMiddleware>,
    ) -> Chain {
        Chain {
            middlewares: middlewares.into_iter().collect(),
            parent: Some(Arc::clone(self)),
        }
    }

    /// The parent chain, or `None` for a root chain.
    pub fn parent(&self) -> Option<&Arc<Chain>> {
        self.parent.as_ref()
    }

    /// This chain's own middleware, not including any inherited from the parent.
    pub fn middlewares(&self) -> &[BoxedMiddleware] {
        &self.middlewares
    }

    pub fn len(&self) -> usize {
        self.middlewares.len()
    }

    pub fn is_empty(&self) -> bool {
        self.middlewares.is_empty()
    }

    /// Inherited middleware followed by this chain's own, outermost first.
    pub fn effective_middlewares(&self) -> Vec<BoxedMiddleware> {
        let mut out = match &self.parent {
            Some(parent) => parent.effective_middlewares(),
            None => Vec::with_capacity(self.middlewares.len()),
        };
        out.extend(self.middlewares.iter().cloned());
        out
    }

    /// Appends a middleware. Returns `self` for chaining.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        self.push(middleware);
        self
    }

    /// Appends a middleware.
    pub fn push(&mut self, middleware: impl Middleware) -> &mut Self {
        self.middlewares.push(Arc::new(middleware));
        self
    }

    /// Appends already-erased middleware, in order.
    pub fn extend(&mut self, middlewares: impl IntoIterator<Item = BoxedMiddleware>) -> &mut Self {
        self.middlewares.extend(middlewares);
        self
    }

    /// Appends a closure as middleware. See [`middleware_fn`].
    pub fn push_fn<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(BoxedHandler) -> BoxedHandler + Send + Sync + 'static,
    {
        self.push(middleware_fn(f))
    }

    /// Appends a [`RequestProcessor`].
    pub fn push_request<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&mut Request) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.push(RequestProcessor::new(f))
    }

    /// Appends a [`ResponseProcessor`].
    pub fn push_response<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(Result<&Response, &Error>) -> Result<(), Error> + Send + Sync + 'static,
    {
        self.push(ResponseProcessor::new(f))
    }

    /// Folds the effective middleware around `terminal` into one handler.
    ///
    /// The fold runs right to left: the last middleware wraps `terminal`
    /// first and the first middleware ends up outermost. Nothing is cached;
    /// each call builds a fresh handler from the chain's current contents.
    pub fn compile(&self, terminal: impl Handler) -> BoxedHandler {
        self.compile_boxed(boxed(terminal))
    }

    fn compile_boxed(&self, terminal: BoxedHandler) -> BoxedHandler {
        let middlewares = self.effective_middlewares();
        trace!(depth = middlewares.len(), "compiling middleware chain");
        middlewares
            .iter()
            .rev()
            .fold(terminal, |next, middleware| middleware.wrap(next))
    }
}

/// A chain is itself a middleware: wrapping `next` compiles the chain
/// around it. This lets one chain be pushed into another as a single stage.
impl Middleware for Chain {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        self.compile_boxed(next)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Chain")
            .field("middlewares", &self.middlewares.len())
            .field("parent", &self.parent)
            .finish()
    }
}
