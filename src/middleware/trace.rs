//! Per-request tracing.
//!
//! Opens an `info`-level `request` span around everything inside it and
//! records the outcome when the exchange finishes:
//!
//! ```text
//! request{service="github" method=GET uri=https://api.github.com/user}
//!   DEBUG response status=200 latency_ms=41
//!   WARN  request failed error=connection refused latency_ms=3
//! ```
//!
//! Put it first in the chain to time the whole pipeline, or right before the
//! terminal handler to time the network call alone.

use std::sync::Arc;
use std::time::Instant;

use tracing::{Instrument, debug, info_span, warn};

use crate::context::Context;
use crate::handler::{BoxFuture, BoxedHandler, Handler};
use crate::middleware::Middleware;
use crate::Request;

/// Tracing middleware. See the [module docs](self).
#[derive(Clone, Debug)]
pub struct Trace {
    name: Option<Arc<str>>,
    record_errors: bool,
}

impl Trace {
    /// Anonymous trace middleware that also logs failures at `warn`.
    pub fn new() -> Self {
        Self { name: None, record_errors: true }
    }

    /// Tags every span with `name`, typically the upstream service.
    pub fn name(mut self, name: impl Into<Arc<str>>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Whether failures are logged. Turn off when a middleware further out
    /// already reports them.
    pub fn record_errors(mut self, enabled: bool) -> Self {
        self.record_errors = enabled;
        self
    }
}

impl Default for Trace {
    fn default() -> Self {
        Self::new()
    }
}

impl Middleware for Trace {
    fn wrap(&self, next: BoxedHandler) -> BoxedHandler {
        Arc::new(TraceStage { config: self.clone(), next })
    }
}

struct TraceStage {
    config: Trace,
    next: BoxedHandler,
}

impl Handler for TraceStage {
    fn handle(&self, ctx: Context, req: Request) -> BoxFuture {
        let span = info_span!(
            "request",
            service = self.config.name.as_deref().unwrap_or(""),
            method = %req.method(),
            uri = %req.uri(),
        );
        let record_errors = self.config.record_errors;
        let next = Arc::clone(&self.next);

        Box::pin(
            async move {
                let start = Instant::now();
                let outcome = next.handle(ctx, req).await;
                let latency_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                match &outcome {
                    Ok(resp) => debug!(status = resp.status().as_u16(), latency_ms, "response"),
                    Err(e) if record_errors => warn!(error = %e, latency_ms, "request failed"),
                    Err(_) => {}
                }
                outcome
            }
            .instrument(span),
        )
    }
}

#[cfg(test)]
mod tests {
    use std::fmt;
    use std::sync::Mutex;

    use bytes::Bytes;
    use tracing::Level;
    use tracing::field::{Field, Visit};
    use tracing::span::{Attributes, Id};
    use tracing_subscriber::layer::{self, Layer, SubscriberExt};
    use tracing_subscriber::registry::{LookupSpan, Registry};

    use super::*;
    use crate::middleware::boxed;
    use crate::{Error, handler_fn};

    #[derive(Default)]
    struct Fields(Vec<(&'static str, String)>);

    impl Fields {
        fn get(&self, name: &str) -> Option<&str> {
            self.0.iter().find(|(n, _)| *n == name).map(|(_, v)| v.as_str())
        }
    }

    impl Visit for Fields {
        fn record_str(&mut self, field: &Field, value: &str) {
            self.0.push((field.name(), value.to_owned()));
        }

        fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
            self.0.push((field.name(), format!("{value:?}")));
        }
    }

    struct Captured {
        level: Level,
        span: Option<&'static str>,
        fields: Fields,
    }

    #[derive(Clone, Default)]
    struct Capture {
        spans: Arc<Mutex<Vec<(&'static str, Fields)>>>,
        events: Arc<Mutex<Vec<Captured>>>,
    }

    impl<S> Layer<S> for Capture
    where
        S: tracing::Subscriber + for<'a> LookupSpan<'a>,
    {
        fn on_new_span(&self, attrs: &Attributes<'_>, _id: &Id, _ctx: layer::Context<'_, S>) {
            let mut fields = Fields::default();
            attrs.record(&mut fields);
            self.spans.lock().unwrap().push((attrs.metadata().name(), fields));
        }

        fn on_event(&self, event: &tracing::Event<'_>, ctx: layer::Context<'_, S>) {
            let mut fields = Fields::default();
            event.record(&mut fields);
            self.events.lock().unwrap().push(Captured {
                level: *event.metadata().level(),
                span: ctx.event_span(event).map(|s| s.name()),
                fields,
            });
        }
    }

    fn capture() -> (Capture, tracing::subscriber::DefaultGuard) {
        let capture = Capture::default();
        let guard = tracing::subscriber::set_default(Registry::default().with(capture.clone()));
        (capture, guard)
    }

    fn echo() -> BoxedHandler {
        boxed(handler_fn(|_ctx, req: Request| async move {
            Ok(http::Response::new(req.into_body()))
        }))
    }

    fn refused() -> BoxedHandler {
        boxed(handler_fn(|_ctx, _req| async { Err(Error::new("refused")) }))
    }

    #[tokio::test]
    async fn passes_outcomes_through() {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();

        let resp = Trace::new()
            .name("echo")
            .wrap(echo())
            .handle(Context::background(), Request::new(Bytes::from_static(b"x")))
            .await
            .unwrap();
        assert_eq!(resp.body(), &Bytes::from_static(b"x"));

        let err = Trace::new()
            .record_errors(false)
            .wrap(refused())
            .handle(Context::background(), Request::new(Bytes::new()))
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "refused");
    }

    #[tokio::test]
    async fn success_is_logged_inside_the_request_span() {
        let (capture, _guard) = capture();

        let mut req = Request::new(Bytes::new());
        *req.uri_mut() = "http://localhost/users".parse().unwrap();
        Trace::new()
            .name("users")
            .wrap(echo())
            .handle(Context::background(), req)
            .await
            .unwrap();

        let spans = capture.spans.lock().unwrap();
        let (name, fields) = spans.iter().find(|(n, _)| *n == "request").unwrap();
        assert_eq!(*name, "request");
        assert_eq!(fields.get("service"), Some("users"));
        assert_eq!(fields.get("method"), Some("GET"));
        assert_eq!(fields.get("uri"), Some("http://localhost/users"));

        let events = capture.events.lock().unwrap();
        let response = events
            .iter()
            .find(|e| e.fields.get("message") == Some("response"))
            .unwrap();
        assert_eq!(response.level, Level::DEBUG);
        assert_eq!(response.span, Some("request"));
        assert_eq!(response.fields.get("status"), Some("200"));
        assert!(response.fields.get("latency_ms").is_some());
        assert!(events.iter().all(|e| e.level != Level::WARN));
    }

    #[tokio::test]
    async fn failure_is_logged_at_warn() {
        let (capture, _guard) = capture();

        let _ = Trace::new()
            .wrap(refused())
            .handle(Context::background(), Request::new(Bytes::new()))
            .await
            .unwrap_err();

        let events = capture.events.lock().unwrap();
        let failed = events.iter().find(|e| e.level == Level::WARN).unwrap();
        assert_eq!(failed.fields.get("message"), Some("request failed"));
        assert_eq!(failed.fields.get("error"), Some("refused"));
        assert_eq!(failed.span, Some("request"));
    }

    #[tokio::test]
    async fn record_errors_off_suppresses_the_warning() {
        let (capture, _guard) = capture();

        let _ = Trace::new()
            .record_errors(false)
            .wrap(refused())
            .handle(Context::background(), Request::new(Bytes::new()))
            .await
            .unwrap_err();

        assert!(capture.spans.lock().unwrap().iter().any(|(n, _)| *n == "request"));
        assert!(capture.events.lock().unwrap().iter().all(|e| e.level != Level::WARN));
    }
}
