//! Shared helpers for the integration tests.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use bytes::Bytes;
use reqlog::{Clock, Event, Request, Sink, Value};

/// An emitted event, owned.
#[derive(Clone, Debug)]
pub struct Captured {
    pub message: String,
    pub fields: Vec<(String, Value)>,
}

impl Captured {
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.iter().rev().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }
}

/// Records every event it receives.
#[derive(Default)]
pub struct CaptureSink {
    events: Mutex<Vec<Captured>>,
}

impl CaptureSink {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn events(&self) -> Vec<Captured> {
        self.events.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn messages(&self) -> Vec<String> {
        self.events().into_iter().map(|e| e.message).collect()
    }
}

impl Sink for CaptureSink {
    fn emit(&self, event: &Event<'_>) {
        self.events.lock().unwrap().push(Captured {
            message: event.message.to_owned(),
            fields: event.fields.to_vec(),
        });
    }
}

/// `now()` returns a fixed instant; `since()` a fixed duration.
pub struct FakeClock {
    pub start: Instant,
    pub elapsed: Duration,
}

impl FakeClock {
    pub fn new(elapsed: Duration) -> Self {
        Self { start: Instant::now(), elapsed }
    }
}

impl Clock for FakeClock {
    fn now(&self) -> Instant {
        self.start
    }

    fn since(&self, start: Instant) -> Duration {
        assert_eq!(start, self.start, "since() must receive the instant now() returned");
        self.elapsed
    }
}

#[allow(dead_code)]
pub fn request(method: &str, uri: &str, headers: &[(&str, &str)], remote_addr: &str) -> Request {
    let mut builder = http::Request::builder().method(method).uri(uri);
    for (name, value) in headers {
        builder = builder.header(*name, *value);
    }
    Request::from_http(builder.body(Bytes::new()).unwrap(), remote_addr)
}
