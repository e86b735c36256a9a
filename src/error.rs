//! Unified error type.

use std::fmt;

use crate::Response;

/// A boxed, thread-safe error, the payload of every [`Error`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// The error half of every handler outcome.
///
/// The chain itself never produces one of these. They come from the terminal
/// handler (transport failures), from middleware that short-circuits, or from
/// request and response processors. Whatever goes in comes out the other end
/// untouched: match on it with [`Error::downcast_ref`] or [`Error::is`].
///
/// An `Error` may carry the [`Response`] that was received before something
/// further out rejected it. [`ResponseProcessor`](crate::ResponseProcessor)
/// attaches it so a rejected response is never silently dropped.
#[derive(Debug)]
pub struct Error {
    inner: BoxError,
    response: Option<Box<Response>>,
}

impl Error {
    /// Wraps any error value.
    pub fn new(err: impl Into<BoxError>) -> Self {
        Self { inner: err.into(), response: None }
    }

    /// Returns a reference to the wrapped error if it is of type `E`.
    pub fn downcast_ref<E: std::error::Error + 'static>(&self) -> Option<&E> {
        self.inner.downcast_ref::<E>()
    }

    /// `true` if the wrapped error is of type `E`.
    pub fn is<E: std::error::Error + 'static>(&self) -> bool {
        self.inner.is::<E>()
    }

    /// The response received downstream before this error replaced it, if any.
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// Takes the attached response out of the error.
    pub fn take_response(&mut self) -> Option<Response> {
        self.response.take().map(|r| *r)
    }

    /// Unwraps into the underlying boxed error, dropping any attached response.
    pub fn into_inner(self) -> BoxError {
        self.inner
    }

    /// Attaches the response this error is replacing, so callers further
    /// out can still reach it.
    ///
    /// ```rust
    /// use bytes::Bytes;
    /// use layerwise::Error;
    ///
    /// let resp = http::Response::builder().status(429).body(Bytes::new()).unwrap();
    /// let err = Error::new("rate limited").with_response(resp);
    /// assert_eq!(err.response().map(|r| r.status().as_u16()), Some(429));
    /// ```
    pub fn with_response(mut self, response: Response) -> Self {
        self.response = Some(Box::new(response));
        self
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.inner.source()
    }
}

impl From<BoxError> for Error {
    fn from(e: BoxError) -> Self {
        Self { inner: e, response: None }
    }
}

impl From<crate::context::ContextError> for Error {
    fn from(e: crate::context::ContextError) -> Self {
        Self::new(e)
    }
}

impl From<http::Error> for Error {
    fn from(e: http::Error) -> Self {
        Self::new(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::ContextError;

    #[test]
    fn display_is_the_wrapped_error() {
        let err = Error::from(ContextError::Cancelled);
        assert_eq!(err.to_string(), ContextError::Cancelled.to_string());
        assert!(err.is::<ContextError>());
        assert_eq!(err.downcast_ref::<ContextError>(), Some(&ContextError::Cancelled));
    }

    #[test]
    fn attached_response_can_be_taken() {
        let resp = http::Response::builder().status(502).body(bytes::Bytes::new()).unwrap();
        let mut err = Error::new("bad gateway").with_response(resp);
        assert_eq!(err.response().map(|r| r.status().as_u16()), Some(502));
        assert!(err.take_response().is_some());
        assert!(err.response().is_none());
    }
}
