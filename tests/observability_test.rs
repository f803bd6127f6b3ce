use axum::{http::StatusCode, routing::post, Router};
use chatline::main_helper::ProxyConfig;
use chatline::proxy::CompletionProxy;
use chatline::types::*;
use std::sync::{Arc, Mutex};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Fields recorded on spans after creation, in order.
#[derive(Clone, Default)]
struct RecordedFields {
    statuses: Arc<Mutex<Vec<u64>>>,
    outcomes: Arc<Mutex<Vec<String>>>,
}

struct FieldCaptureLayer {
    fields: RecordedFields,
}

impl<S> Layer<S> for FieldCaptureLayer
where
    S: tracing::Subscriber,
{
    fn on_record(
        &self,
        _id: &tracing::span::Id,
        values: &tracing::span::Record<'_>,
        _ctx: Context<'_, S>,
    ) {
        let mut visitor = FieldVisitor {
            fields: &self.fields,
        };
        values.record(&mut visitor);
    }
}

struct FieldVisitor<'a> {
    fields: &'a RecordedFields,
}

impl<'a> tracing::field::Visit for FieldVisitor<'a> {
    fn record_u64(&mut self, field: &tracing::field::Field, value: u64) {
        if field.name() == "http.status" {
            if let Ok(mut statuses) = self.fields.statuses.lock() {
                statuses.push(value);
            }
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "proxy.outcome" {
            if let Ok(mut outcomes) = self.fields.outcomes.lock() {
                outcomes.push(value.to_string());
            }
        }
    }

    fn record_debug(&mut self, _field: &tracing::field::Field, _value: &dyn std::fmt::Debug) {}
}

fn capture() -> (RecordedFields, tracing::subscriber::DefaultGuard) {
    let fields = RecordedFields::default();
    let subscriber = tracing_subscriber::registry().with(FieldCaptureLayer {
        fields: fields.clone(),
    });
    (fields, tracing::subscriber::set_default(subscriber))
}

fn proxy_for(url: &str) -> CompletionProxy {
    CompletionProxy::new(
        reqwest::Client::new(),
        ProxyConfig {
            api_key: Some("sk-test".to_string()),
            completions_url: url.to_string(),
            ..ProxyConfig::default()
        },
    )
}

fn history() -> Vec<InboundTurn> {
    vec![InboundTurn::from(&Turn::user("Hello"))]
}

#[tokio::test]
async fn test_network_fault_records_no_http_status() {
    let (fields, _guard) = capture();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let proxy = proxy_for(&format!("http://{}/v1/chat/completions", addr));
    let err = match proxy.complete(&history()).await {
        Ok(t) => panic!("Expected Err, got Ok: {:?}", t),
        Err(e) => e,
    };
    assert!(matches!(err.inner, ChatError::Network(_)));

    assert_eq!(*fields.outcomes.lock().unwrap(), vec!["upstream_error".to_string()]);
    assert!(fields.statuses.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_upstream_error_records_received_status() {
    let (fields, _guard) = capture();

    let app = Router::new().route(
        "/v1/chat/completions",
        post(|| async { (StatusCode::TOO_MANY_REQUESTS, r#"{"error":{"message":"rate limited"}}"#) }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    let proxy = proxy_for(&format!("http://{}/v1/chat/completions", addr));
    let err = match proxy.complete(&history()).await {
        Ok(t) => panic!("Expected Err, got Ok: {:?}", t),
        Err(e) => e,
    };
    assert_eq!(err.status(), StatusCode::TOO_MANY_REQUESTS);

    assert_eq!(*fields.statuses.lock().unwrap(), vec![429]);
    assert_eq!(*fields.outcomes.lock().unwrap(), vec!["upstream_error".to_string()]);
}
