//! An ordered middleware stack in front of one handler.
//!
//! ```text
//! request ─▶ RequestLogger ─▶ RequireAuth ─▶ handler
//! response ◀──────────────────────────────────┘
//! ```
//!
//! The first middleware added with [`Chain::with`] is the outermost: it sees
//! the request first and the response last. Put the request logger first so
//! its latency covers everything behind it.

use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler};
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

/// Build once at startup; pass it to [`Server::serve`](crate::Server::serve)
/// or drive it yourself with [`Chain::call`].
pub struct Chain {
    stack: Arc<[Arc<dyn Middleware>]>,
    endpoint: BoxedHandler,
}

impl Chain {
    pub fn new(handler: impl Handler) -> Self {
        Self { stack: Arc::from(Vec::new()), endpoint: handler.into_boxed_handler() }
    }

    /// Appends `middleware` inside everything added so far. Returns `self`
    /// for chaining.
    pub fn with(mut self, middleware: impl Middleware) -> Self {
        let mut stack = self.stack.to_vec();
        stack.push(Arc::new(middleware));
        self.stack = stack.into();
        self
    }

    pub fn len(&self) -> usize {
        self.stack.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stack.is_empty()
    }

    /// Runs `req` through every middleware and the handler.
    pub async fn call(&self, req: Request) -> Response {
        Next::new(Arc::clone(&self.stack), Arc::clone(&self.endpoint))
            .run(req)
            .await
    }
}
