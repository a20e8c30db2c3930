//! Integration test verifying that `#[instrument]` annotations produce
//! the expected spans on provider operations, and that each refresh attempt
//! logs the metrics summary.

#![allow(clippy::expect_used)]

use std::sync::{Arc, Mutex};

use paykey_keys::{KeyError, SystemClock, testutil::scenario_document};
use paykey_provider::{
    TransportResponse,
    testutil::{StaticTransport, provider_with},
};
use tracing::Subscriber;
use tracing_subscriber::{layer::SubscriberExt, registry::LookupSpan};

// ---------------------------------------------------------------------------
// Collecting layer: records span names and event messages
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
struct SpanCollector {
    spans: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<String>>>,
}

struct MessageVisitor(Option<String>);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{value:?}"));
        }
    }
}

impl<S> tracing_subscriber::Layer<S> for SpanCollector
where
    S: Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_new_span(
        &self,
        _attrs: &tracing::span::Attributes<'_>,
        id: &tracing::span::Id,
        ctx: tracing_subscriber::layer::Context<'_, S>,
    ) {
        if let Some(span) = ctx.span(id) {
            self.spans.lock().expect("lock poisoned").push(span.name().to_owned());
        }
    }

    fn on_event(&self, event: &tracing::Event<'_>, _ctx: tracing_subscriber::layer::Context<'_, S>) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.events.lock().expect("lock poisoned").push(message);
        }
    }
}

fn collect() -> (Arc<Mutex<Vec<String>>>, tracing::subscriber::DefaultGuard) {
    let (spans, _, guard) = collect_all();
    (spans, guard)
}

fn collect_all()
-> (Arc<Mutex<Vec<String>>>, Arc<Mutex<Vec<String>>>, tracing::subscriber::DefaultGuard) {
    let collector = SpanCollector::default();
    let spans = Arc::clone(&collector.spans);
    let events = Arc::clone(&collector.events);
    let subscriber = tracing_subscriber::registry().with(collector);
    (spans, events, tracing::subscriber::set_default(subscriber))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[tokio::test]
async fn get_public_keys_creates_refresh_spans() {
    let (spans, _guard) = collect();

    let provider =
        provider_with(Arc::new(StaticTransport::ok(scenario_document())), Arc::new(SystemClock));
    provider.get_public_keys("ECv2").await.expect("lookup should succeed");

    let recorded = spans.lock().expect("lock poisoned");
    for expected in ["get_public_keys", "ensure_fresh", "refresh", "fetch"] {
        assert!(
            recorded.iter().any(|s| s == expected),
            "expected a '{expected}' span, got: {recorded:?}"
        );
    }
}

#[tokio::test]
async fn prefetch_keys_creates_span_even_on_failure() {
    let (spans, _guard) = collect();

    let provider = provider_with(
        Arc::new(StaticTransport::failing(KeyError::transport("unreachable"))),
        Arc::new(SystemClock),
    );
    let _ = provider.prefetch_keys().await;

    let recorded = spans.lock().expect("lock poisoned");
    assert!(
        recorded.iter().any(|s| s == "prefetch_keys"),
        "expected a 'prefetch_keys' span, got: {recorded:?}"
    );
}

#[tokio::test]
async fn invalidate_creates_span() {
    let (spans, _guard) = collect();

    let provider =
        provider_with(Arc::new(StaticTransport::ok(scenario_document())), Arc::new(SystemClock));
    provider.invalidate();

    let recorded = spans.lock().expect("lock poisoned");
    assert!(
        recorded.iter().any(|s| s == "invalidate"),
        "expected an 'invalidate' span, got: {recorded:?}"
    );
}

#[tokio::test]
async fn each_refresh_attempt_logs_metrics() {
    let (_, events, _guard) = collect_all();

    let transport = Arc::new(StaticTransport::failing(KeyError::transport("unreachable")));
    let provider = provider_with(transport.clone(), Arc::new(SystemClock));
    let _ = provider.prefetch_keys().await;

    transport.set_response(Ok(TransportResponse::new(200, scenario_document())));
    provider.prefetch_keys().await.expect("second refresh should succeed");

    let recorded = events.lock().expect("lock poisoned");
    let summaries = recorded.iter().filter(|m| *m == "key provider metrics").count();
    assert_eq!(summaries, 2, "expected one metrics summary per attempt, got: {recorded:?}");
}
