//! # reqlog
//!
//! Request-logging middleware for hyper services.
//!
//! Every request that passes through a [`RequestLogger`] produces two
//! structured events: one when handling starts and one when it completes,
//! carrying method, request URI, remote address, request id, status and
//! latency. Health checks and other noisy paths can be excluded, and both
//! field sets are replaceable through `before` / `after` hooks.
//!
//! What the logger reads from each request:
//!
//! - **`X-Real-IP`**: preferred over the socket peer address when set
//! - **`X-Request-Id`**: attached as `request_id` when set
//!
//! Events go to a [`Sink`]. [`TracingSink`] forwards them to `tracing`, so
//! whatever subscriber the binary installs decides how they are rendered.
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use reqlog::{Chain, Request, RequestLogger, Response, Server, TracingSink};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), reqlog::Error> {
//!     tracing_subscriber::fmt::init();
//!
//!     let mut logger = RequestLogger::custom(Arc::new(TracingSink), tracing::Level::INFO, "orders");
//!     logger.exclude_url("/healthz")?;
//!
//!     let app = Chain::new(orders).with(logger);
//!     Server::bind("0.0.0.0:3000").serve(app).await
//! }
//!
//! async fn orders(req: Request) -> Response {
//!     if req.path() == "/healthz" {
//!         return Response::text("ok");
//!     }
//!     Response::json(br#"{"orders":[]}"#.to_vec())
//! }
//! ```

mod chain;
mod clock;
mod error;
mod handler;
mod log;
mod request;
mod response;
mod server;

pub mod middleware;

pub use chain::Chain;
pub use clock::{Clock, SystemClock};
pub use error::{Error, UrlError};
pub use handler::{BoxFuture, Handler};
pub use log::{Event, LogContext, Logfmt, Sink, TracingSink, Value};
pub use middleware::{default_after, default_before, AfterHook, BeforeHook, RequestLogger};
pub use request::Request;
pub use response::{IntoResponse, Response, ResponseBuilder};
pub use server::Server;
