//! API Gateway proxy integrations, REST (payload 1.0) and HTTP (payload 2.0).

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::helpers;
use super::parsing::{
    decode_body, lenient_headers, lenient_map, lenient_multi_headers, merge_headers, merge_query,
    parse_event, resolve_client_ip, v_owned,
};
use crate::adapter::{EventAdapter, base_specifics, opt_value};
use crate::core::invocation::InvocationContext;
use crate::core::models::{NormalizedRequest, NormalizedResponse};
use crate::errors::AdapterError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApiVersion {
    V1,
    V2,
}

impl ApiVersion {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ApiVersion::V1 => "1.0",
            ApiVersion::V2 => "2.0",
        }
    }
}

/// Payload 2.0 declares its version; older test payloads omit it but still
/// carry `requestContext.http`.
#[must_use]
pub fn detect_version(event: &Value) -> ApiVersion {
    let declared_v2 = event.get("version").and_then(Value::as_str) == Some("2.0");
    let has_http_context = event
        .get("requestContext")
        .and_then(|rc| rc.get("http"))
        .is_some_and(Value::is_object);
    if declared_v2 || has_http_context {
        ApiVersion::V2
    } else {
        ApiVersion::V1
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V1Event {
    #[serde(default)]
    http_method: Option<String>,
    #[serde(default)]
    resource: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default, deserialize_with = "lenient_map")]
    query_string_parameters: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_map")]
    multi_value_query_string_parameters: BTreeMap<String, Vec<String>>,
    #[serde(default, deserialize_with = "lenient_map")]
    path_parameters: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_headers")]
    headers: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_multi_headers")]
    multi_value_headers: BTreeMap<String, Vec<String>>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    is_base64_encoded: Option<bool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2Event {
    #[serde(default)]
    raw_path: Option<String>,
    #[serde(default)]
    request_context: Option<V2RequestContext>,
    #[serde(default)]
    cookies: Option<Vec<String>>,
    #[serde(default, deserialize_with = "lenient_map")]
    query_string_parameters: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_map")]
    path_parameters: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_headers")]
    headers: BTreeMap<String, String>,
    #[serde(default)]
    body: Option<String>,
    #[serde(default)]
    is_base64_encoded: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2RequestContext {
    #[serde(default)]
    http: Option<V2Http>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct V2Http {
    #[serde(default)]
    method: Option<String>,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    protocol: Option<String>,
    #[serde(default)]
    source_ip: Option<String>,
}

/// Adapter for API Gateway proxy events of either payload version.
#[derive(Debug, Clone)]
pub struct ApiGatewayAdapter {
    version: ApiVersion,
    request: NormalizedRequest,
}

impl ApiGatewayAdapter {
    /// Builds an adapter for whichever payload version `event` is.
    ///
    /// # Errors
    ///
    /// Returns `MalformedEvent` when the payload does not have the expected shape.
    pub fn from_event(event: &Value, context: &InvocationContext) -> Result<Self, AdapterError> {
        match detect_version(event) {
            ApiVersion::V1 => Self::v1(event, context),
            ApiVersion::V2 => Self::v2(event, context),
        }
    }

    /// # Errors
    ///
    /// Returns `MalformedEvent` when the payload is not a REST proxy event.
    pub fn v1(event: &Value, context: &InvocationContext) -> Result<Self, AdapterError> {
        let parsed: V1Event = parse_event(event, "ApiGateway")?;

        let method = parsed
            .http_method
            .as_deref()
            .unwrap_or("GET")
            .to_ascii_uppercase();
        let path = parsed.path.clone().unwrap_or_else(|| "/".to_string());
        let resource = parsed.resource.clone().unwrap_or_default();
        let headers = merge_headers(&parsed.headers, &parsed.multi_value_headers);
        let client_ip = resolve_client_ip(
            event
                .pointer("/requestContext/identity/sourceIp")
                .and_then(Value::as_str),
            &headers,
        );
        let body = decode_body(parsed.body.as_deref(), parsed.is_base64_encoded.unwrap_or(false))?;

        let mut specifics = base_specifics(event, context);
        specifics.insert("resource", Value::String(resource));
        specifics.insert("path", Value::String(path.clone()));
        specifics.insert("stage", v_owned(event, &["requestContext", "stage"]));
        specifics.insert("request_id", v_owned(event, &["requestContext", "requestId"]));
        specifics.insert("api_id", v_owned(event, &["requestContext", "apiId"]));
        specifics.insert("api_version", Value::from(ApiVersion::V1.as_str()));

        debug!(method = %method, path = %path, "Parsed API Gateway v1 event");

        Ok(Self {
            version: ApiVersion::V1,
            request: NormalizedRequest {
                method: Some(method),
                path: Some(path),
                query_parameters: merge_query(
                    &parsed.query_string_parameters,
                    &parsed.multi_value_query_string_parameters,
                ),
                path_parameters: parsed.path_parameters,
                headers,
                body,
                client_ip,
                protocol: "https".to_string(),
                context_specifics: specifics,
            },
        })
    }

    /// # Errors
    ///
    /// Returns `MalformedEvent` when the payload is not an HTTP API event.
    pub fn v2(event: &Value, context: &InvocationContext) -> Result<Self, AdapterError> {
        let parsed: V2Event = parse_event(event, "ApiGateway v2")?;
        let http = parsed
            .request_context
            .unwrap_or_default()
            .http
            .unwrap_or_default();

        let method = http.method.as_deref().unwrap_or("GET").to_ascii_uppercase();
        let path = http
            .path
            .or(parsed.raw_path)
            .unwrap_or_else(|| "/".to_string());

        let mut headers = merge_headers(&parsed.headers, &BTreeMap::new());
        // Payload 2.0 lifts cookies out of the headers.
        if let Some(cookies) = parsed.cookies.filter(|c| !c.is_empty())
            && !headers.contains("cookie")
        {
            headers.insert("cookie", cookies.join("; "));
        }

        let client_ip = resolve_client_ip(http.source_ip.as_deref(), &headers);
        let protocol = if http
            .protocol
            .as_deref()
            .is_some_and(|p| p.to_ascii_uppercase().starts_with("HTTPS"))
        {
            "https"
        } else {
            "http"
        };
        let body = decode_body(parsed.body.as_deref(), parsed.is_base64_encoded.unwrap_or(false))?;

        let mut specifics = base_specifics(event, context);
        specifics.insert("resource", Value::String(String::new()));
        specifics.insert("path", Value::String(path.clone()));
        specifics.insert("stage", v_owned(event, &["requestContext", "stage"]));
        specifics.insert("request_id", v_owned(event, &["requestContext", "requestId"]));
        specifics.insert("api_id", v_owned(event, &["requestContext", "apiId"]));
        specifics.insert(
            "domain_name",
            v_owned(event, &["requestContext", "domainName"]),
        );
        specifics.insert("protocol", opt_value(http.protocol.as_deref()));
        specifics.insert(
            "user_agent",
            v_owned(event, &["requestContext", "http", "userAgent"]),
        );
        specifics.insert("api_version", Value::from(ApiVersion::V2.as_str()));

        debug!(method = %method, path = %path, "Parsed API Gateway v2 event");

        Ok(Self {
            version: ApiVersion::V2,
            request: NormalizedRequest {
                method: Some(method),
                path: Some(path),
                query_parameters: merge_query(&parsed.query_string_parameters, &BTreeMap::new()),
                path_parameters: parsed.path_parameters,
                headers,
                body,
                client_ip,
                protocol: protocol.to_string(),
                context_specifics: specifics,
            },
        })
    }

    #[must_use]
    pub fn version(&self) -> ApiVersion {
        self.version
    }
}

impl EventAdapter for ApiGatewayAdapter {
    fn request(&self) -> &NormalizedRequest {
        &self.request
    }

    fn respond(&self, response: NormalizedResponse) -> Result<Value, AdapterError> {
        Ok(helpers::http_envelope(response))
    }
}
