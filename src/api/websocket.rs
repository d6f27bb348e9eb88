use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;

use super::helpers;
use super::parsing::{
    lenient_headers, lenient_map, merge_headers, merge_query, parse_event, resolve_client_ip,
    v_owned,
};
use crate::adapter::{EventAdapter, base_specifics};
use crate::core::invocation::InvocationContext;
use crate::core::models::{NormalizedRequest, NormalizedResponse};
use crate::errors::AdapterError;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebSocketEvent {
    #[serde(default)]
    request_context: Option<WebSocketRequestContext>,
    #[serde(default, deserialize_with = "lenient_map")]
    query_string_parameters: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_headers")]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WebSocketRequestContext {
    #[serde(default)]
    route_key: Option<String>,
    #[serde(default)]
    connection_id: Option<String>,
    #[serde(default)]
    identity: Option<Identity>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Identity {
    #[serde(default)]
    source_ip: Option<String>,
}

/// Adapter for WebSocket API Gateway route events.
///
/// The route key (`$connect`, `$default`, a custom action) stands in for the
/// method; there is no path. Replies carry only a status code.
#[derive(Debug, Clone)]
pub struct WebSocketAdapter {
    request: NormalizedRequest,
}

impl WebSocketAdapter {
    /// # Errors
    ///
    /// Returns `MalformedEvent` when the payload is not a WebSocket event.
    pub fn from_event(event: &Value, context: &InvocationContext) -> Result<Self, AdapterError> {
        let parsed: WebSocketEvent = parse_event(event, "ApiGateway WebSocket")?;
        let request_context = parsed.request_context.unwrap_or_default();

        let route_key = request_context.route_key.unwrap_or_default();
        let connection_id = request_context.connection_id.unwrap_or_default();
        let headers = merge_headers(&parsed.headers, &BTreeMap::new());
        let client_ip = resolve_client_ip(
            request_context
                .identity
                .and_then(|identity| identity.source_ip)
                .as_deref(),
            &headers,
        );

        let mut specifics = base_specifics(event, context);
        specifics.insert("connection_id", Value::String(connection_id));
        specifics.insert("route_key", Value::String(route_key.clone()));
        for (name, key) in [
            ("stage", "stage"),
            ("request_id", "requestId"),
            ("api_id", "apiId"),
            ("domain_name", "domainName"),
            ("event_type", "eventType"),
            ("connected_at", "connectedAt"),
        ] {
            specifics.insert(name, v_owned(event, &["requestContext", key]));
        }

        Ok(Self {
            request: NormalizedRequest {
                method: Some(route_key.to_ascii_uppercase()).filter(|m| !m.is_empty()),
                path: None,
                query_parameters: merge_query(&parsed.query_string_parameters, &BTreeMap::new()),
                path_parameters: BTreeMap::new(),
                headers,
                body: parsed.body.map(String::into_bytes).unwrap_or_default(),
                client_ip,
                protocol: "wss".to_string(),
                context_specifics: specifics,
            },
        })
    }
}

impl EventAdapter for WebSocketAdapter {
    fn request(&self) -> &NormalizedRequest {
        &self.request
    }

    fn respond(&self, response: NormalizedResponse) -> Result<Value, AdapterError> {
        Ok(helpers::status_only(response.status_code))
    }
}
