use std::sync::{Arc, Mutex};

use lambda_adapters::api::websocket::WebSocketAdapter;
use lambda_adapters::{
    EventAdapter, InvocationContext, LambdaContext, NormalizedRequest, NormalizedResponse, Trigger,
};
use serde_json::{Value, json};

#[test]
fn test_invoke() {
    let seen: Arc<Mutex<Vec<Value>>> = Arc::default();
    let recorder = Arc::clone(&seen);
    let app = LambdaContext::new(
        Trigger::WebSocket,
        move |request: &NormalizedRequest| -> anyhow::Result<NormalizedResponse> {
            recorder.lock().unwrap().push(request.json_body()?);
            Ok(NormalizedResponse::json(json!({"ignored": true})))
        },
    );

    let reply = app
        .invoke(
            &json!({
                "body": json!({"name": "Bob", "email": "bob@example.com"}).to_string(),
                "isBase64Encoded": false,
            }),
            &InvocationContext::default(),
        )
        .unwrap();

    // Only the status code goes back to API Gateway.
    assert_eq!(reply, json!({"statusCode": 200}));
    let seen = seen.lock().unwrap();
    assert_eq!(seen.len(), 1);
    assert_eq!(seen[0]["email"], "bob@example.com");
}

#[test]
fn test_request_normalization() {
    let event = json!({
        "requestContext": {
            "routeKey": "sendMessage",
            "connectionId": "conn-1",
            "eventType": "MESSAGE",
            "stage": "prod",
            "requestId": "req-9",
            "apiId": "ws-api",
            "domainName": "ws.example.com",
            "connectedAt": 1700000000000_u64,
            "identity": {"sourceIp": "203.0.113.50"},
        },
        "headers": {"Sec-WebSocket-Protocol": "chat"},
        "queryStringParameters": {"token": "t"},
        "body": "not json",
    });
    let adapter = WebSocketAdapter::from_event(&event, &InvocationContext::default()).unwrap();
    let request = adapter.request();

    assert_eq!(request.method.as_deref(), Some("SENDMESSAGE"));
    assert_eq!(request.path, None);
    assert_eq!(request.body, b"not json".to_vec());
    assert_eq!(request.client_ip, "203.0.113.50");
    assert_eq!(request.protocol, "wss");
    assert_eq!(request.headers.get("sec-websocket-protocol"), Some("chat"));
    assert_eq!(request.query_parameter("token"), Some("t"));
    assert_eq!(request.context_specific("connection_id"), Some(&json!("conn-1")));
    assert_eq!(request.context_specific("route_key"), Some(&json!("sendMessage")));
    assert_eq!(request.context_specific("event_type"), Some(&json!("MESSAGE")));
    assert_eq!(
        request.context_specific("connected_at"),
        Some(&json!(1_700_000_000_000_u64))
    );
}

#[test]
fn test_missing_route_key_has_no_method() {
    let adapter = WebSocketAdapter::from_event(&json!({}), &InvocationContext::default()).unwrap();
    assert_eq!(adapter.request().method, None);
    assert_eq!(adapter.request().client_ip, "127.0.0.1");
    assert_eq!(
        adapter
            .respond(NormalizedResponse::empty().with_status(403))
            .unwrap(),
        json!({"statusCode": 403})
    );
}

#[test]
fn test_scalar_header_values_are_stringified() {
    let event = json!({
        "requestContext": {"routeKey": "$connect"},
        "headers": {"Content-Length": 0, "X-Retry": 2},
    });
    let adapter = WebSocketAdapter::from_event(&event, &InvocationContext::default()).unwrap();
    assert_eq!(adapter.request().headers.get("content-length"), Some("0"));
    assert_eq!(adapter.request().headers.get("x-retry"), Some("2"));
}
