//! Structured log contexts and the sinks that receive their events.
//!
//! A [`LogContext`] is an immutable, field-accumulating handle. Each call to
//! [`LogContext::with`] consumes the context and hands back a new one with one
//! more field, so hooks compose as plain `ctx -> ctx` functions:
//!
//! ```rust
//! use std::sync::Arc;
//! use reqlog::{LogContext, TracingSink};
//!
//! let ctx = LogContext::new(Arc::new(TracingSink))
//!     .with("method", "GET")
//!     .with("status", 200_i64);
//! ctx.info("completed handling request");
//! ```
//!
//! Field names are runtime strings. `tracing` only accepts field names known
//! at compile time, which rules out keys such as `measure#svc.latency`; that
//! is why events travel through the [`Sink`] trait instead of straight into a
//! `tracing` macro. [`TracingSink`] is the bridge back.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::Level;
use tracing::level_filters::LevelFilter;

// ── Value ─────────────────────────────────────────────────────────────────────

/// A field value.
#[derive(Clone, Debug, PartialEq)]
pub enum Value {
    Str(String),
    Int(i64),
    Uint(u64),
    Bool(bool),
    Duration(Duration),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) if needs_quotes(s) => write!(f, "{s:?}"),
            Self::Str(s) => f.write_str(s),
            Self::Int(n) => write!(f, "{n}"),
            Self::Uint(n) => write!(f, "{n}"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Duration(d) => write!(f, "{d:?}"),
        }
    }
}

fn needs_quotes(s: &str) -> bool {
    s.is_empty() || s.chars().any(|c| c.is_whitespace() || c == '"' || c == '=')
}

impl From<&str> for Value {
    fn from(s: &str) -> Self { Self::Str(s.to_owned()) }
}

impl From<String> for Value {
    fn from(s: String) -> Self { Self::Str(s) }
}

impl From<&String> for Value {
    fn from(s: &String) -> Self { Self::Str(s.clone()) }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self { Self::Int(n) }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self { Self::Int(n.into()) }
}

impl From<u64> for Value {
    fn from(n: u64) -> Self { Self::Uint(n) }
}

impl From<u16> for Value {
    fn from(n: u16) -> Self { Self::Int(n.into()) }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self { Self::Bool(b) }
}

impl From<Duration> for Value {
    fn from(d: Duration) -> Self { Self::Duration(d) }
}

// ── Event / Sink ──────────────────────────────────────────────────────────────

/// One structured log event, borrowed from the context that emitted it.
#[derive(Clone, Copy, Debug)]
pub struct Event<'a> {
    pub level: Level,
    pub message: &'a str,
    pub fields: &'a [(String, Value)],
}

/// Destination for log events.
///
/// A sink owns its own failure handling: write errors are dropped, buffered
/// or reported by the sink, never surfaced to the request pipeline.
pub trait Sink: Send + Sync + 'static {
    fn emit(&self, event: &Event<'_>);
}

/// Forwards events to the `tracing` dispatcher under target `reqlog`.
///
/// Fields are rendered logfmt-style into a single `fields` value:
///
/// ```text
/// INFO reqlog: completed handling request fields=component=reqlog status=404 text_status="Not Found" took=250ms
/// ```
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingSink;

impl Sink for TracingSink {
    fn emit(&self, event: &Event<'_>) {
        let fields = Logfmt(event.fields);
        match event.level {
            Level::ERROR => tracing::error!(target: "reqlog", fields = %fields, "{}", event.message),
            Level::WARN  => tracing::warn!(target: "reqlog", fields = %fields, "{}", event.message),
            Level::INFO  => tracing::info!(target: "reqlog", fields = %fields, "{}", event.message),
            Level::DEBUG => tracing::debug!(target: "reqlog", fields = %fields, "{}", event.message),
            _            => tracing::trace!(target: "reqlog", fields = %fields, "{}", event.message),
        }
    }
}

/// `key=value key=value …` in insertion order.
pub struct Logfmt<'a>(pub &'a [(String, Value)]);

impl fmt::Display for Logfmt<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, (key, value)) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{key}={value}")?;
        }
        Ok(())
    }
}

// ── LogContext ────────────────────────────────────────────────────────────────

/// An immutable, field-accumulating logging handle bound to a [`Sink`].
#[derive(Clone)]
pub struct LogContext {
    sink: Arc<dyn Sink>,
    level: LevelFilter,
    fields: Vec<(String, Value)>,
}

impl LogContext {
    /// A context with no fields that delivers every event at `INFO` or above.
    pub fn new(sink: Arc<dyn Sink>) -> Self {
        Self { sink, level: LevelFilter::INFO, fields: Vec::new() }
    }

    /// Replace the minimum level. Events below it are discarded.
    pub fn level(mut self, level: impl Into<LevelFilter>) -> Self {
        self.level = level.into();
        self
    }

    /// Attach one field. Repeated keys are kept; [`get`](Self::get) sees the last.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.push((key.into(), value.into()));
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn fields(&self) -> &[(String, Value)] {
        &self.fields
    }

    pub fn min_level(&self) -> LevelFilter {
        self.level
    }

    pub fn enabled(&self, level: Level) -> bool {
        self.level >= level
    }

    /// Emit `message` at `level` with every attached field.
    pub fn log(&self, level: Level, message: &str) {
        if !self.enabled(level) {
            return;
        }
        self.sink.emit(&Event { level, message, fields: &self.fields });
    }

    pub fn info(&self, message: &str) {
        self.log(Level::INFO, message);
    }
}

impl fmt::Debug for LogContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LogContext")
            .field("level", &self.level)
            .field("fields", &self.fields)
            .finish_non_exhaustive()
    }
}
