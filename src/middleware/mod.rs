//! Middleware layer.
//!
//! Middleware intercepts a request on its way to the handler and the response
//! on its way back. It is the place for cross-cutting concerns; the one
//! shipped here is [`RequestLogger`].
//!
//! A middleware receives the request and a [`Next`]. Calling
//! [`Next::run`] hands the request to the rest of the chain and resolves to
//! its response. `run` consumes `Next`, so the rest of the chain executes at
//! most once per request.
//!
//! ```rust
//! use http::StatusCode;
//! use reqlog::middleware::{Middleware, Next};
//! use reqlog::{BoxFuture, Request, Response};
//!
//! struct RequireAuth;
//!
//! impl Middleware for RequireAuth {
//!     fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
//!         Box::pin(async move {
//!             if req.header("authorization").is_none() {
//!                 return Response::status(StatusCode::UNAUTHORIZED);
//!             }
//!             next.run(req).await
//!         })
//!     }
//! }
//! ```

mod request_logger;

use std::sync::Arc;

use crate::handler::{BoxFuture, BoxedHandler};
use crate::request::Request;
use crate::response::Response;

pub use request_logger::{
    default_after, default_before, AfterHook, BeforeHook, RequestLogger,
};

/// A request/response interceptor installed in a [`Chain`](crate::Chain).
pub trait Middleware: Send + Sync + 'static {
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a>;
}

/// The remainder of a chain, from the current middleware's point of view.
pub struct Next {
    stack: Arc<[Arc<dyn Middleware>]>,
    index: usize,
    endpoint: BoxedHandler,
}

impl Next {
    pub(crate) fn new(stack: Arc<[Arc<dyn Middleware>]>, endpoint: BoxedHandler) -> Self {
        Self { stack, index: 0, endpoint }
    }

    /// Passes `req` to the next middleware, or to the handler once the stack
    /// is exhausted.
    pub async fn run(self, req: Request) -> Response {
        match self.stack.get(self.index).cloned() {
            Some(middleware) => {
                let next = Self { index: self.index + 1, ..self };
                middleware.handle(req, next).await
            }
            None => self.endpoint.call(req).await,
        }
    }
}
