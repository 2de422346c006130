//! Minimal reqlog example: a few JSON endpoints behind the request logger.
//!
//! Run with:
//!   RUST_LOG=info cargo run --example basic
//!
//! Try:
//!   curl http://localhost:3000/users/42
//!   curl -H 'x-request-id: abc123' -H 'x-real-ip: 1.2.3.4' http://localhost:3000/users/42
//!   curl -X POST http://localhost:3000/users -d '{"name":"alice"}'
//!   curl http://localhost:3000/healthz        ← excluded, nothing logged

use std::sync::Arc;

use http::{Method, StatusCode};
use reqlog::{Chain, LogContext, Request, RequestLogger, Response, Server, TracingSink};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), reqlog::Error> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut logger = RequestLogger::custom(Arc::new(TracingSink), tracing::Level::INFO, "users");
    logger.exclude_url("/healthz")?;
    logger.exclude_url("/readyz")?;

    // Add the response size to the completed event.
    logger.set_after(|ctx: LogContext, res: &Response, took, name: &str| {
        reqlog::default_after(ctx, res, took, name)
            .with("bytes", res.body().len() as u64)
    });

    let app = Chain::new(route).with(logger);

    Server::bind("0.0.0.0:3000").serve(app).await
}

async fn route(req: Request) -> Response {
    let path = req.path().to_owned();
    let method = req.method().clone();

    if path == "/healthz" || path == "/readyz" {
        return Response::text("ok");
    }
    if method == Method::POST && path == "/users" {
        return create_user(req);
    }
    match path.strip_prefix("/users/") {
        Some(id) if method == Method::GET => {
            Response::json(format!(r#"{{"id":"{id}","name":"alice"}}"#))
        }
        Some(_) if method == Method::DELETE => Response::status(StatusCode::NO_CONTENT),
        _ => Response::status(StatusCode::NOT_FOUND),
    }
}

// req.body() is &[u8]; parse with serde_json::from_slice or similar.
fn create_user(req: Request) -> Response {
    if req.body().is_empty() {
        return Response::status(StatusCode::BAD_REQUEST);
    }

    Response::builder()
        .status(StatusCode::CREATED)
        .header("location", "/users/99")
        .json(r#"{"id":"99","name":"new_user"}"#)
}
