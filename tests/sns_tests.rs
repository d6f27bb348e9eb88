use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use lambda_adapters::worker::sns::SnsAdapter;
use lambda_adapters::{
    AdapterError, EventAdapter, InvocationContext, LambdaContext, NormalizedRequest,
    NormalizedResponse, RouteOverride, Router, Trigger,
};
use serde_json::{Value, json};

fn sns_event(message: &str) -> Value {
    json!({
        "Records": [{
            "EventVersion": "1.0",
            "EventSubscriptionArn": "arn:aws:sns:us-east-1:123456789012:ExampleTopic:uuid",
            "EventSource": "aws:sns",
            "Sns": {
                "SignatureVersion": "1",
                "Timestamp": "2025-11-28T12:00:00.000Z",
                "Signature": "signature-string",
                "MessageId": "95df01b4-ee98-5cb9-9903-4c221d41eb5e",
                "Message": message,
                "MessageAttributes": {"TestAttribute": {}},
                "Type": "Notification",
                "TopicArn": "arn:aws:sns:us-east-1:123456789012:ExampleTopic",
                "Subject": "An Example Subject",
            },
        }]
    })
}

#[test]
fn test_invoke() {
    let created: Arc<Mutex<Vec<Value>>> = Arc::default();
    let store = Arc::clone(&created);
    let router = Router::new()
        .route(
            "POST",
            "/create",
            move |request: &NormalizedRequest| -> anyhow::Result<NormalizedResponse> {
                store.lock().unwrap().push(request.json_body()?);
                Ok(NormalizedResponse::empty())
            },
        )
        .unwrap();
    let app = LambdaContext::new(
        Trigger::Sns(RouteOverride::new(Some("create"), Some("post"))),
        router,
    );

    let message = json!({"name": "Bob", "email": "bob@example.com"}).to_string();
    let reply = app
        .invoke(&sns_event(&message), &InvocationContext::default())
        .unwrap();

    // SNS discards the reply, so check what the handler saw.
    assert_eq!(reply, json!({}));
    let created = created.lock().unwrap();
    assert_eq!(created.len(), 1);
    assert_eq!(created[0]["email"], "bob@example.com");
}

#[test]
fn test_non_json_message_fails_before_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let app = LambdaContext::new(
        Trigger::Sns(RouteOverride::default()),
        move |_request: &NormalizedRequest| -> anyhow::Result<NormalizedResponse> {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(NormalizedResponse::empty())
        },
    );

    let err = app
        .invoke(&sns_event("plain text"), &InvocationContext::default())
        .unwrap_err();

    assert!(err.is_client_error());
    assert!(err.to_string().contains("only accepts serialized JSON"));
    assert_eq!(calls.load(Ordering::SeqCst), 0);
}

#[test]
fn test_missing_record_is_a_client_error() {
    let err = SnsAdapter::from_event(&json!({"Records": []}), &InvocationContext::default(), &RouteOverride::default())
        .unwrap_err();
    assert!(matches!(err, AdapterError::ClientError(_)));
}

#[test]
fn test_request_normalization() {
    let adapter = SnsAdapter::from_event(
        &sns_event(r#"{"id": 5}"#),
        &InvocationContext::default(),
        &RouteOverride::default(),
    )
    .unwrap();
    let request = adapter.request();

    assert_eq!(request.method.as_deref(), Some("POST"));
    assert_eq!(request.path, None);
    assert_eq!(request.protocol, "sns");
    assert_eq!(request.client_ip, "127.0.0.1");
    assert_eq!(request.json_body::<Value>().unwrap(), json!({"id": 5}));
    assert_eq!(adapter.message(), &json!({"id": 5}));
    assert_eq!(adapter.message_id(), Some("95df01b4-ee98-5cb9-9903-4c221d41eb5e"));
    assert_eq!(
        request.context_specific("topic_arn"),
        Some(&json!("arn:aws:sns:us-east-1:123456789012:ExampleTopic"))
    );
    assert_eq!(request.context_specific("subject"), Some(&json!("An Example Subject")));
    assert_eq!(
        request.context_specific("timestamp"),
        Some(&json!("2025-11-28T12:00:00.000Z"))
    );
}

#[test]
fn test_empty_message_has_no_body() {
    let adapter = SnsAdapter::from_event(
        &sns_event("{}"),
        &InvocationContext::default(),
        &RouteOverride::default(),
    )
    .unwrap();
    assert!(!adapter.request().has_body());
}
