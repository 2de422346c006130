//! Per-request "started" / "completed" logging.
//!
//! For every request whose path is not excluded, [`RequestLogger`] emits:
//!
//! ```text
//! INFO started handling request   component=reqlog request_id=abc123 request=/orders method=GET remote=1.2.3.4
//! INFO completed handling request component=reqlog request_id=abc123 status=404 text_status="Not Found" took=250ms measure#web.latency=250000000
//! ```
//!
//! The fields come from two hooks. `before` decorates the started event;
//! `after` decorates the completed one. Both are pure `ctx -> ctx`
//! functions; the logger decides when to emit.
//!
//! Note that `after` starts from the context as it was *before* the `before`
//! hook ran. Fields added by `before` do not appear on the completed event
//! unless `after` adds them again.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tracing::level_filters::LevelFilter;
use url::Url;

use crate::clock::{Clock, SystemClock};
use crate::error::{Error, UrlError};
use crate::handler::BoxFuture;
use crate::log::{LogContext, Sink};
use crate::middleware::{Middleware, Next};
use crate::request::Request;
use crate::response::Response;

type BeforeFn = dyn Fn(LogContext, &Request, &str) -> LogContext + Send + Sync;
type AfterFn = dyn Fn(LogContext, &Response, Duration, &str) -> LogContext + Send + Sync;

/// Decorates the started event: `(ctx, request, remote_addr) -> ctx`.
pub type BeforeHook = Arc<BeforeFn>;

/// Decorates the completed event: `(ctx, response, latency, name) -> ctx`.
pub type AfterHook = Arc<AfterFn>;

const PLACEHOLDER_BASE: &str = "http://localhost/";

/// Logs each request as it goes in and its response as it comes out.
///
/// Configure it with the setters, then install it in a
/// [`Chain`](crate::Chain). Once installed it sits behind an `Arc` and can no
/// longer be changed, so concurrent requests always read a settled
/// configuration.
///
/// ```rust
/// use std::sync::Arc;
/// use reqlog::{Chain, Request, RequestLogger, Response, TracingSink};
///
/// # async fn orders(_: Request) -> Response { Response::text("") }
/// let mut logger = RequestLogger::new(Arc::new(TracingSink));
/// logger.exclude_url("/healthz").unwrap();
/// logger.set_log_starting(false);
///
/// let app = Chain::new(orders).with(logger);
/// ```
pub struct RequestLogger {
    base: LogContext,
    name: String,
    before: Option<BeforeHook>,
    after: Option<AfterHook>,
    log_starting: bool,
    log_completed: bool,
    clock: Arc<dyn Clock>,
    exclude_urls: Vec<String>,
}

impl RequestLogger {
    /// Level `INFO`, name `"web"`, both events on, default hooks.
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self::custom(sink, LevelFilter::INFO, "web")
    }

    /// Like [`new`](Self::new) with an explicit minimum level and application
    /// name. The name prefixes the latency field: `measure#<name>.latency`.
    pub fn custom(sink: Arc<dyn Sink>, level: impl Into<LevelFilter>, name: impl Into<String>) -> Self {
        Self::from_context(LogContext::new(sink).level(level), name)
    }

    /// Builds on an existing context, keeping its level and fields.
    pub fn from_context(ctx: LogContext, name: impl Into<String>) -> Self {
        Self {
            base: ctx.with("component", "reqlog"),
            name: name.into(),
            before: Some(Arc::new(default_before)),
            after: Some(Arc::new(default_after)),
            log_starting: true,
            log_completed: true,
            clock: Arc::new(SystemClock),
            exclude_urls: Vec::new(),
        }
    }

    /// Toggles the "started handling request" event.
    pub fn set_log_starting(&mut self, enabled: bool) {
        self.log_starting = enabled;
    }

    /// Toggles the "completed handling request" event.
    pub fn set_log_completed(&mut self, enabled: bool) {
        self.log_completed = enabled;
    }

    pub fn set_before<F>(&mut self, hook: F)
    where
        F: Fn(LogContext, &Request, &str) -> LogContext + Send + Sync + 'static,
    {
        self.before = Some(Arc::new(hook));
    }

    pub fn set_after<F>(&mut self, hook: F)
    where
        F: Fn(LogContext, &Response, Duration, &str) -> LogContext + Send + Sync + 'static,
    {
        self.after = Some(Arc::new(hook));
    }

    /// Removes the `before` hook; [`default_before`] is used in its place.
    pub fn clear_before(&mut self) {
        self.before = None;
    }

    /// Removes the `after` hook; [`default_after`] is used in its place.
    pub fn clear_after(&mut self) {
        self.after = None;
    }

    /// Replaces the latency clock. Meant for tests that need a fixed `took`.
    pub fn set_clock(&mut self, clock: impl Clock) {
        self.clock = Arc::new(clock);
    }

    /// Skips logging for requests whose path equals `url` exactly.
    ///
    /// `url` must parse as a URL, absolute or relative; plain paths such as
    /// `/healthz` are fine. On error the exclusion list is left unchanged.
    pub fn exclude_url(&mut self, url: &str) -> Result<(), Error> {
        parse_url(url).map_err(|source| Error::MalformedUrl { url: url.to_owned(), source })?;
        self.exclude_urls.push(url.to_owned());
        Ok(())
    }

    pub fn excluded_urls(&self) -> &[String] {
        &self.exclude_urls
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn min_level(&self) -> LevelFilter {
        self.base.min_level()
    }

    pub fn log_starting(&self) -> bool {
        self.log_starting
    }

    pub fn log_completed(&self) -> bool {
        self.log_completed
    }

    /// Runs `next` for `req` with logging around it.
    ///
    /// This is what the [`Middleware`] impl calls; use it directly to put the
    /// logger in front of anything shaped like `FnOnce(Request) -> Future`.
    /// `next` is called exactly once.
    pub async fn wrap<F, Fut>(&self, req: Request, next: F) -> Response
    where
        F: FnOnce(Request) -> Fut,
        Fut: Future<Output = Response>,
    {
        let before: &BeforeFn = match &self.before {
            Some(hook) => hook.as_ref(),
            None => &default_before,
        };
        let after: &AfterFn = match &self.after {
            Some(hook) => hook.as_ref(),
            None => &default_after,
        };

        if self.exclude_urls.iter().any(|u| u == req.path()) {
            return next(req).await;
        }

        let start = self.clock.now();

        let remote_addr = req
            .header("x-real-ip")
            .filter(|ip| !ip.is_empty())
            .unwrap_or(req.remote_addr());

        let mut ctx = self.base.clone();
        if let Some(id) = req.header("x-request-id").filter(|id| !id.is_empty()) {
            ctx = ctx.with("request_id", id);
        }

        let started = before(ctx.clone(), &req, remote_addr);
        if self.log_starting {
            started.info("started handling request");
        }

        let res = next(req).await;
        let latency = self.clock.since(start);

        if self.log_completed {
            after(ctx, &res, latency, &self.name).info("completed handling request");
        }

        res
    }
}

impl Middleware for RequestLogger {
    fn handle<'a>(&'a self, req: Request, next: Next) -> BoxFuture<'a> {
        Box::pin(self.wrap(req, move |req| next.run(req)))
    }
}

/// Attaches `request` (request URI), `method` and `remote`.
pub fn default_before(ctx: LogContext, req: &Request, remote_addr: &str) -> LogContext {
    ctx.with("request", req.request_uri())
        .with("method", req.method().as_str())
        .with("remote", remote_addr)
}

/// Attaches `status`, `text_status`, `took` and `measure#<name>.latency`
/// (nanoseconds).
pub fn default_after(ctx: LogContext, res: &Response, latency: Duration, name: &str) -> LogContext {
    let status = res.status_code();
    let nanos = i64::try_from(latency.as_nanos()).unwrap_or(i64::MAX);
    ctx.with("status", status.as_u16())
        .with("text_status", status.canonical_reason().unwrap_or(""))
        .with("took", latency)
        .with(format!("measure#{name}.latency"), nanos)
}

/// Accepts absolute URLs and relative references (`/healthz`, `healthz`),
/// rejecting what `net/url`-style parsers reject: control characters,
/// surrounding whitespace, bad `%` escapes and a colon before the first `/`.
fn parse_url(url: &str) -> Result<Url, UrlError> {
    if let Some(c) = url.chars().find(|c| c.is_control()) {
        return Err(UrlError::ControlCharacter(c));
    }
    if url.trim() != url {
        return Err(UrlError::SurroundingWhitespace);
    }
    check_escapes(url)?;

    match Url::parse(url) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            if url.starts_with(':') {
                return Err(UrlError::MissingScheme);
            }
            let first_segment = url.split(['/', '?', '#']).next().unwrap_or("");
            if first_segment.contains(':') {
                return Err(UrlError::ColonInFirstSegment);
            }
            Ok(Url::parse(PLACEHOLDER_BASE)?.join(url)?)
        }
        parsed => Ok(parsed?),
    }
}

/// Every `%` must be followed by two hex digits.
fn check_escapes(url: &str) -> Result<(), UrlError> {
    let bytes = url.as_bytes();
    for (i, _) in url.match_indices('%') {
        let valid = bytes
            .get(i + 1..i + 3)
            .is_some_and(|hex| hex.iter().all(u8::is_ascii_hexdigit));
        if !valid {
            let escape = url.get(i..i + 3).unwrap_or(&url[i..]);
            return Err(UrlError::InvalidEscape(escape.to_owned()));
        }
    }
    Ok(())
}
