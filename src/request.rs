//! Incoming HTTP request type.

use bytes::Bytes;
use http::{HeaderMap, Method, Uri};

/// An incoming HTTP request with its body already read and the address of
/// the peer that sent it.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: Method,
    pub(crate) uri: Uri,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) remote_addr: String,
}

impl Request {
    /// Bridges an [`http::Request`] into the pipeline.
    ///
    /// `remote_addr` is whatever the connection reports for its peer,
    /// usually `ip:port`. The [`Server`](crate::Server) fills it in for you.
    ///
    /// ```rust
    /// use bytes::Bytes;
    /// use reqlog::Request;
    ///
    /// let req = http::Request::builder()
    ///     .uri("/orders?page=2")
    ///     .header("x-request-id", "abc123")
    ///     .body(Bytes::new())
    ///     .unwrap();
    /// let req = Request::from_http(req, "10.0.0.7:51234");
    /// assert_eq!(req.path(), "/orders");
    /// assert_eq!(req.request_uri(), "/orders?page=2");
    /// ```
    pub fn from_http(req: http::Request<Bytes>, remote_addr: impl Into<String>) -> Self {
        let (parts, body) = req.into_parts();
        Self {
            method: parts.method,
            uri: parts.uri,
            headers: parts.headers,
            body,
            remote_addr: remote_addr.into(),
        }
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn uri(&self) -> &Uri { &self.uri }
    pub fn path(&self) -> &str { self.uri.path() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The peer address reported by the connection. Proxies put the client
    /// somewhere else, usually `X-Real-IP`.
    pub fn remote_addr(&self) -> &str { &self.remote_addr }

    /// The request target as sent: path plus query string.
    pub fn request_uri(&self) -> &str {
        self.uri
            .path_and_query()
            .map_or_else(|| self.uri.path(), |pq| pq.as_str())
    }

    /// Case-insensitive header lookup. Returns the first value, or `None`
    /// when it is missing or not valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}
