use std::collections::BTreeMap;
use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::AdapterError;

/// Loopback placeholder used when a trigger carries no client address.
pub const LOOPBACK_IP: &str = "127.0.0.1";

/// Request headers keyed by lower-cased name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: impl Into<String>) {
        self.0.insert(name.to_ascii_lowercase(), value.into());
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0.get(&name.to_ascii_lowercase()).map(String::as_str)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(&name.to_ascii_lowercase())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Renders the headers as a JSON object for reply envelopes.
    #[must_use]
    pub fn to_value(&self) -> Value {
        Value::Object(
            self.0
                .iter()
                .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                .collect(),
        )
    }
}

impl<K: AsRef<str>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (name, value) in iter {
            headers.insert(name.as_ref(), value);
        }
        headers
    }
}

/// A query string value, either as sent once or as a repeated key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    Single(String),
    Multi(Vec<String>),
}

impl QueryValue {
    #[must_use]
    pub fn first(&self) -> Option<&str> {
        match self {
            QueryValue::Single(value) => Some(value.as_str()),
            QueryValue::Multi(values) => values.first().map(String::as_str),
        }
    }

    #[must_use]
    pub fn all(&self) -> Vec<&str> {
        match self {
            QueryValue::Single(value) => vec![value.as_str()],
            QueryValue::Multi(values) => values.iter().map(String::as_str).collect(),
        }
    }
}

/// Named values a trigger exposes to the handler beyond the request itself.
///
/// Values are reference counted so one large payload (a whole SQS batch) can
/// back every request built from it without being copied.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextSpecifics(BTreeMap<String, Arc<Value>>);

impl ContextSpecifics {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: &str, value: Value) {
        self.0.insert(name.to_string(), Arc::new(value));
    }

    pub fn insert_shared(&mut self, name: &str, value: Arc<Value>) {
        self.0.insert(name.to_string(), value);
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Value> {
        self.0.get(name).map(AsRef::as_ref)
    }

    /// The shared handle behind `name`.
    #[must_use]
    pub fn shared(&self, name: &str) -> Option<&Arc<Value>> {
        self.0.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_ref()))
    }
}

/// The trigger-agnostic view of one inbound call.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedRequest {
    /// Upper-cased verb, a synthetic marker, or `None` when the trigger has no
    /// notion of a method.
    pub method: Option<String>,
    pub path: Option<String>,
    pub query_parameters: BTreeMap<String, QueryValue>,
    pub path_parameters: BTreeMap<String, String>,
    pub headers: Headers,
    pub body: Vec<u8>,
    pub client_ip: String,
    pub protocol: String,
    /// Trigger-specific values exposed to the handler; never read by adapters.
    pub context_specifics: ContextSpecifics,
}

impl Default for NormalizedRequest {
    fn default() -> Self {
        Self {
            method: None,
            path: None,
            query_parameters: BTreeMap::new(),
            path_parameters: BTreeMap::new(),
            headers: Headers::new(),
            body: Vec::new(),
            client_ip: LOOPBACK_IP.to_string(),
            protocol: String::new(),
            context_specifics: ContextSpecifics::new(),
        }
    }
}

impl NormalizedRequest {
    #[must_use]
    pub fn has_body(&self) -> bool {
        !self.body.is_empty()
    }

    /// # Errors
    ///
    /// Returns a client error if the body is not UTF-8.
    pub fn body_text(&self) -> Result<&str, AdapterError> {
        std::str::from_utf8(&self.body)
            .map_err(|e| AdapterError::ClientError(format!("Request body was not valid UTF-8: {e}")))
    }

    /// # Errors
    ///
    /// Returns a client error if the body does not deserialize into `T`.
    pub fn json_body<T: DeserializeOwned>(&self) -> Result<T, AdapterError> {
        serde_json::from_slice(&self.body)
            .map_err(|e| AdapterError::ClientError(format!("Request body was not valid JSON: {e}")))
    }

    #[must_use]
    pub fn query_parameter(&self, name: &str) -> Option<&str> {
        self.query_parameters.get(name).and_then(QueryValue::first)
    }

    #[must_use]
    pub fn context_specific(&self, name: &str) -> Option<&Value> {
        self.context_specifics.get(name)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub enum ResponseBody {
    #[default]
    Empty,
    Text(String),
    Bytes(Vec<u8>),
    Json(Value),
}

impl ResponseBody {
    /// Collapses the body into a JSON value; bytes must be valid UTF-8 text.
    ///
    /// # Errors
    ///
    /// Returns `ResponseEncoding` when a byte body is not UTF-8.
    pub fn into_value(self) -> Result<Value, AdapterError> {
        match self {
            ResponseBody::Empty => Ok(Value::Null),
            ResponseBody::Text(text) => Ok(Value::String(text)),
            ResponseBody::Bytes(bytes) => String::from_utf8(bytes)
                .map(Value::String)
                .map_err(|e| AdapterError::ResponseEncoding(format!("body is not UTF-8: {e}"))),
            ResponseBody::Json(value) => Ok(value),
        }
    }
}

/// What a handler hands back to be encoded into the trigger's reply.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedResponse {
    pub status_code: u16,
    pub headers: Headers,
    pub body: ResponseBody,
}

impl Default for NormalizedResponse {
    fn default() -> Self {
        Self {
            status_code: 200,
            headers: Headers::new(),
            body: ResponseBody::Empty,
        }
    }
}

impl NormalizedResponse {
    #[must_use]
    pub fn new(status_code: u16, body: ResponseBody) -> Self {
        Self {
            status_code,
            headers: Headers::new(),
            body,
        }
    }

    #[must_use]
    pub fn json(value: Value) -> Self {
        Self::new(200, ResponseBody::Json(value))
    }

    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(200, ResponseBody::Text(text.into()))
    }

    #[must_use]
    pub fn bytes(bytes: Vec<u8>) -> Self {
        Self::new(200, ResponseBody::Bytes(bytes))
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_status(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    #[must_use]
    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn headers_are_case_insensitive() {
        let headers: Headers = [("Content-Type", "application/json")].into_iter().collect();
        assert_eq!(headers.get("CONTENT-TYPE"), Some("application/json"));
        assert!(headers.contains("content-type"));
        assert_eq!(headers.iter().next(), Some(("content-type", "application/json")));
    }

    #[test]
    fn json_body_rejects_non_json_as_client_error() {
        let request = NormalizedRequest {
            body: b"not json".to_vec(),
            ..Default::default()
        };
        let err = request.json_body::<Value>().unwrap_err();
        assert!(err.is_client_error());
    }

    #[test]
    fn bytes_collapse_to_text() {
        let body = ResponseBody::Bytes(b"binary data".to_vec());
        assert_eq!(body.into_value().unwrap(), json!("binary data"));
    }

    #[test]
    fn non_utf8_bytes_are_not_replaced() {
        let err = ResponseBody::Bytes(vec![0x66, 0xff, 0xfe]).into_value().unwrap_err();
        assert!(matches!(err, AdapterError::ResponseEncoding(_)));
    }

    #[test]
    fn context_specifics_share_inserted_handles() {
        let payload = Arc::new(json!({"Records": []}));
        let mut first = ContextSpecifics::new();
        first.insert_shared("event", Arc::clone(&payload));
        let second = first.clone();
        assert!(Arc::ptr_eq(
            first.shared("event").unwrap(),
            second.shared("event").unwrap()
        ));
        assert_eq!(second.get("event"), Some(&json!({"Records": []})));
    }
}
