mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use reqlog::{Chain, LogContext, Request, RequestLogger, Response, Value};

use common::{request, CaptureSink, FakeClock};

const STARTED: &str = "started handling request";
const COMPLETED: &str = "completed handling request";

fn logger(sink: &Arc<CaptureSink>) -> RequestLogger {
    let mut logger = RequestLogger::new(sink.clone());
    logger.set_clock(FakeClock::new(Duration::from_millis(250)));
    logger
}

fn get(uri: &str) -> Request {
    request("GET", uri, &[], "5.6.7.8:4000")
}

#[tokio::test]
async fn excluded_path_is_not_logged_but_still_handled() {
    let sink = CaptureSink::new();
    let mut logger = logger(&sink);
    logger.exclude_url("/healthz").unwrap();

    let calls = AtomicUsize::new(0);
    let res = logger
        .wrap(get("/healthz"), |_| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Response::text("ok")
        })
        .await;

    assert_eq!(res.status_code(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn exclusion_is_exact_match_only() {
    let sink = CaptureSink::new();
    let mut logger = logger(&sink);
    logger.exclude_url("/healthz").unwrap();

    logger.wrap(get("/healthz/deep"), |_| async { Response::text("") }).await;
    logger.wrap(get("/health"), |_| async { Response::text("") }).await;

    assert_eq!(sink.events().len(), 4);
}

#[tokio::test]
async fn started_is_emitted_once_before_next_runs() {
    let sink = CaptureSink::new();
    let mut logger = logger(&sink);
    logger.set_log_completed(false);

    let sink_in_next = Arc::clone(&sink);
    logger
        .wrap(get("/orders"), |_| async move {
            assert_eq!(sink_in_next.messages(), [STARTED]);
            Response::text("ok")
        })
        .await;

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, STARTED);
}

#[tokio::test]
async fn completed_is_emitted_once_after_next_returns() {
    let sink = CaptureSink::new();
    let mut logger = logger(&sink);
    logger.set_log_starting(false);

    let sink_in_next = Arc::clone(&sink);
    logger
        .wrap(get("/orders"), |_| async move {
            assert!(sink_in_next.events().is_empty(), "completed logged before next returned");
            Response::text("ok")
        })
        .await;

    let events = sink.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].message, COMPLETED);
    assert_eq!(events[0].get("took"), Some(&Value::Duration(Duration::from_millis(250))));
}

#[tokio::test]
async fn both_flags_off_emits_nothing() {
    let sink = CaptureSink::new();
    let mut logger = logger(&sink);
    logger.set_log_starting(false);
    logger.set_log_completed(false);

    let calls = AtomicUsize::new(0);
    logger
        .wrap(get("/orders"), |_| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Response::text("ok")
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(sink.events().is_empty());
}

#[tokio::test]
async fn request_id_header_is_attached() {
    let sink = CaptureSink::new();
    let logger = logger(&sink);

    let req = request("GET", "/orders", &[("X-Request-Id", "abc123")], "5.6.7.8:4000");
    logger.wrap(req, |_| async { Response::text("ok") }).await;

    let events = sink.events();
    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.str("request_id"), Some("abc123"), "{}", event.message);
    }
}

#[tokio::test]
async fn missing_or_empty_request_id_is_absent() {
    let sink = CaptureSink::new();
    let logger = logger(&sink);

    logger.wrap(get("/orders"), |_| async { Response::text("ok") }).await;
    let req = request("GET", "/orders", &[("X-Request-Id", "")], "5.6.7.8:4000");
    logger.wrap(req, |_| async { Response::text("ok") }).await;

    assert!(sink.events().iter().all(|e| e.get("request_id").is_none()));
}

#[tokio::test]
async fn real_ip_header_wins_over_peer_address() {
    let sink = CaptureSink::new();
    let logger = logger(&sink);

    let req = request("GET", "/orders", &[("X-Real-IP", "1.2.3.4")], "5.6.7.8");
    logger.wrap(req, |_| async { Response::text("ok") }).await;

    assert_eq!(sink.events()[0].str("remote"), Some("1.2.3.4"));
}

#[tokio::test]
async fn peer_address_is_used_without_real_ip() {
    let sink = CaptureSink::new();
    let logger = logger(&sink);

    let req = request("GET", "/orders", &[("X-Real-IP", "")], "5.6.7.8");
    logger.wrap(req, |_| async { Response::text("ok") }).await;

    assert_eq!(sink.events()[0].str("remote"), Some("5.6.7.8"));
}

#[test]
fn exclude_url_validation() {
    let sink = CaptureSink::new();
    let mut logger = logger(&sink);

    logger.exclude_url("http://ok.test/path").unwrap();
    assert!(logger.exclude_url("http://[::1]:namedport").is_err());

    assert_eq!(logger.excluded_urls(), ["http://ok.test/path"]);
}

#[tokio::test]
async fn end_to_end_completed_event() {
    let sink = CaptureSink::new();
    let mut logger = RequestLogger::custom(sink.clone(), tracing::Level::INFO, "svc");
    logger.set_clock(FakeClock::new(Duration::from_millis(250)));

    async fn orders(_req: Request) -> StatusCode {
        StatusCode::NOT_FOUND
    }
    let chain = Chain::new(orders).with(logger);

    let res = chain.call(get("/orders")).await;
    assert_eq!(res.status_code(), StatusCode::NOT_FOUND);

    let events = sink.events();
    assert_eq!(events.len(), 2);
    let started = &events[0];
    assert_eq!(started.message, STARTED);
    assert_eq!(started.str("method"), Some("GET"));
    assert_eq!(started.str("request"), Some("/orders"));
    assert_eq!(started.str("remote"), Some("5.6.7.8:4000"));

    let completed = &events[1];
    assert_eq!(completed.message, COMPLETED);
    assert_eq!(completed.str("component"), Some("reqlog"));
    assert_eq!(completed.get("status"), Some(&Value::Int(404)));
    assert_eq!(completed.str("text_status"), Some("Not Found"));
    assert_eq!(completed.get("took"), Some(&Value::Duration(Duration::from_millis(250))));
    assert_eq!(completed.get("measure#svc.latency"), Some(&Value::Int(250_000_000)));
}

// The after hook starts from the context as it was before the before hook
// ran. Pinned here so a change to that is a deliberate one.
#[tokio::test]
async fn completed_event_does_not_carry_before_hook_fields() {
    let sink = CaptureSink::new();
    let logger = logger(&sink);

    let req = request("GET", "/orders", &[("X-Request-Id", "abc123")], "5.6.7.8");
    logger.wrap(req, |_| async { Response::text("ok") }).await;

    let events = sink.events();
    let completed = &events[1];
    assert_eq!(completed.str("request_id"), Some("abc123"));
    assert!(completed.get("method").is_none());
    assert!(completed.get("request").is_none());
    assert!(completed.get("remote").is_none());
}

#[tokio::test]
async fn custom_hooks_replace_default_fields() {
    let sink = CaptureSink::new();
    let mut logger = logger(&sink);
    logger.set_before(|ctx: LogContext, req: &Request, _remote: &str| ctx.with("path", req.path()));
    logger.set_after(|ctx: LogContext, res: &Response, _took: Duration, name: &str| {
        ctx.with("code", res.status_code().as_u16()).with("app", name)
    });

    logger
        .wrap(get("/orders?page=2"), |_| async { Response::status(StatusCode::CREATED) })
        .await;

    let events = sink.events();
    assert_eq!(events[0].str("path"), Some("/orders"));
    assert!(events[0].get("method").is_none());
    assert_eq!(events[1].get("code"), Some(&Value::Int(201)));
    assert_eq!(events[1].str("app"), Some("web"));
    assert!(events[1].get("took").is_none());
}

#[tokio::test]
async fn cleared_hooks_heal_to_defaults() {
    let sink = CaptureSink::new();
    let mut logger = logger(&sink);
    logger.set_before(|ctx: LogContext, _: &Request, _: &str| ctx);
    logger.clear_before();
    logger.clear_after();

    logger.wrap(get("/orders"), |_| async { Response::text("ok") }).await;

    let events = sink.events();
    assert_eq!(events[0].str("method"), Some("GET"));
    assert_eq!(events[1].get("status"), Some(&Value::Int(200)));
    assert!(events[1].get("measure#web.latency").is_some());
}

#[tokio::test]
async fn from_context_keeps_level_and_fields() {
    let sink = CaptureSink::new();
    let ctx = LogContext::new(sink.clone())
        .level(tracing::Level::DEBUG)
        .with("service", "orders");
    let mut logger = RequestLogger::from_context(ctx, "orders");
    logger.set_clock(FakeClock::new(Duration::from_millis(250)));
    assert_eq!(logger.min_level(), tracing::Level::DEBUG);
    assert_eq!(logger.name(), "orders");

    logger.wrap(get("/orders"), |_| async { Response::text("ok") }).await;

    let events = sink.events();
    assert_eq!(events.len(), 2);
    for event in &events {
        assert_eq!(event.str("service"), Some("orders"));
        assert_eq!(event.str("component"), Some("reqlog"));
    }
    assert!(events[1].get("measure#orders.latency").is_some());
}

#[tokio::test]
async fn level_above_info_silences_both_events() {
    let sink = CaptureSink::new();
    let logger = RequestLogger::custom(sink.clone(), tracing::Level::WARN, "web");

    let calls = AtomicUsize::new(0);
    logger
        .wrap(get("/orders"), |_| async {
            calls.fetch_add(1, Ordering::SeqCst);
            Response::text("ok")
        })
        .await;

    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(sink.events().is_empty());
}
