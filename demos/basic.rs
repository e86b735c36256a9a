//! Minimal layerwise example — a shared base chain, a derived chain for
//! authenticated calls, and a fake transport standing in for the network.
//!
//! Run with:
//!   cargo run --example basic

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use layerwise::middleware::trace::Trace;
use layerwise::{Chain, Context, Error, Handler, Request, Response, handler_fn};

#[derive(Debug, thiserror::Error)]
#[error("unexpected status {0}")]
struct UnexpectedStatus(http::StatusCode);

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    // Every call: traced, user-agent set, non-2xx turned into an error.
    let mut base = Chain::new().with(Trace::new().name("demo-api"));
    base.push_request(|req: &mut Request| {
        req.headers_mut()
            .insert("user-agent", http::HeaderValue::from_static("layerwise-demo/0.1"));
        Ok(())
    })
    .push_response(|outcome: Result<&Response, &Error>| match outcome {
        Ok(resp) if !resp.status().is_success() => Err(Error::new(UnexpectedStatus(resp.status()))),
        _ => Ok(()),
    });
    let base = Arc::new(base);

    // Authenticated calls add a bearer token inside the base middleware.
    let mut authed = base.child([]);
    authed.push_request(|req: &mut Request| {
        req.headers_mut()
            .insert("authorization", http::HeaderValue::from_static("Bearer demo-token"));
        Ok(())
    });

    let public = base.compile(fake_transport());
    let private = authed.compile(fake_transport());

    let ctx = Context::with_timeout(Duration::from_secs(5));

    match public.handle(ctx.clone(), get("/users/42")).await {
        Ok(resp) => println!("public:  {} {}", resp.status(), String::from_utf8_lossy(resp.body())),
        Err(e) => println!("public:  error: {e}"),
    }

    match private.handle(ctx.clone(), get("/me")).await {
        Ok(resp) => println!("private: {} {}", resp.status(), String::from_utf8_lossy(resp.body())),
        Err(e) => println!("private: error: {e}"),
    }

    match public.handle(ctx, get("/me")).await {
        Ok(resp) => println!("public:  {}", resp.status()),
        Err(e) => {
            let status = e.response().map(|r| r.status());
            println!("public:  error: {e} (response kept: {status:?})");
        }
    }
}

fn get(path: &str) -> Request {
    let mut req = Request::new(Bytes::new());
    *req.uri_mut() = format!("http://localhost:3000{path}").parse().expect("valid uri");
    req
}

// Stand-in for a real HTTP client: /me needs a token, everything else echoes
// the path back.
fn fake_transport() -> impl Handler {
    handler_fn(fake_send)
}

async fn fake_send(ctx: Context, req: Request) -> Result<Response, Error> {
    ctx.check()?;
    tokio::time::sleep(Duration::from_millis(10)).await;

    if req.uri().path() == "/me" && !req.headers().contains_key("authorization") {
        return Ok(http::Response::builder()
            .status(http::StatusCode::UNAUTHORIZED)
            .body(Bytes::new())?);
    }

    let body = format!(r#"{{"path":"{}"}}"#, req.uri().path());
    Ok(http::Response::new(Bytes::from(body)))
}
