use std::collections::BTreeMap;

use percent_encoding::percent_decode_str;
use serde::Deserialize;
use serde_json::Value;
use tracing::warn;

use super::helpers;
use super::parsing::{
    decode_body, lenient_headers, lenient_map, merge_headers, parse_event, resolve_client_ip, v_owned,
};
use crate::adapter::{EventAdapter, base_specifics};
use crate::core::invocation::InvocationContext;
use crate::core::models::{NormalizedRequest, NormalizedResponse, QueryValue};
use crate::errors::AdapterError;

/// Verbs an ALB target group forwards to Lambda.
pub const ALLOWED_METHODS: [&str; 7] = ["DELETE", "GET", "HEAD", "OPTIONS", "PATCH", "POST", "PUT"];

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct AlbEvent {
    http_method: String,
    path: String,
    #[serde(default, deserialize_with = "lenient_map")]
    query_string_parameters: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_headers")]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    is_base64_encoded: Option<bool>,
}

/// ALB leaves query strings exactly as the client sent them.
fn decode_query_component(raw: &str) -> String {
    percent_decode_str(&raw.replace('+', " "))
        .decode_utf8_lossy()
        .into_owned()
}

/// Adapter for Application Load Balancer target group events.
#[derive(Debug, Clone)]
pub struct AlbAdapter {
    request: NormalizedRequest,
}

impl AlbAdapter {
    /// # Errors
    ///
    /// Returns `MalformedEvent` for a payload that is not an ALB event and
    /// `UnsupportedMethod` for a verb outside [`ALLOWED_METHODS`].
    pub fn from_event(event: &Value, context: &InvocationContext) -> Result<Self, AdapterError> {
        let parsed: AlbEvent = parse_event(event, "ALB")?;

        let method = parsed.http_method.to_ascii_uppercase();
        if !ALLOWED_METHODS.contains(&method.as_str()) {
            warn!(method = %method, "Rejecting ALB request with unsupported method");
            return Err(AdapterError::UnsupportedMethod(method));
        }

        let headers = merge_headers(&parsed.headers, &BTreeMap::new());
        let query_parameters = parsed
            .query_string_parameters
            .iter()
            .map(|(k, v)| {
                (
                    decode_query_component(k),
                    QueryValue::Single(decode_query_component(v)),
                )
            })
            .collect();
        let client_ip = resolve_client_ip(None, &headers);
        let protocol = headers
            .get("x-forwarded-proto")
            .map_or_else(|| "https".to_string(), str::to_ascii_lowercase);
        let body = decode_body(parsed.body.as_deref(), parsed.is_base64_encoded.unwrap_or(false))?;

        let mut specifics = base_specifics(event, context);
        specifics.insert(
            "target_group_arn",
            v_owned(event, &["requestContext", "elb", "targetGroupArn"]),
        );

        Ok(Self {
            request: NormalizedRequest {
                method: Some(method),
                path: Some(parsed.path),
                query_parameters,
                path_parameters: BTreeMap::new(),
                headers,
                body,
                client_ip,
                protocol,
                context_specifics: specifics,
            },
        })
    }
}

impl EventAdapter for AlbAdapter {
    fn request(&self) -> &NormalizedRequest {
        &self.request
    }

    fn respond(&self, response: NormalizedResponse) -> Result<Value, AdapterError> {
        Ok(helpers::http_envelope(response))
    }
}
