//! SNS topic notifications.

use std::collections::BTreeMap;

use serde_json::Value;

use super::RouteOverride;
use crate::adapter::{EventAdapter, base_specifics};
use crate::api::helpers;
use crate::api::parsing::v_owned;
use crate::core::models::{Headers, LOOPBACK_IP, NormalizedRequest, NormalizedResponse};
use crate::core::invocation::InvocationContext;
use crate::errors::AdapterError;

const NOT_AN_SNS_JSON_EVENT: &str = "The message from AWS was not a valid SNS event with serialized JSON. \
     The SNS adapter only accepts serialized JSON.";

/// Empty containers, empty strings, zero, `false` and `null` all count as
/// "no message".
fn is_present(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Adapter for SNS-triggered functions. The topic message must be serialized
/// JSON; it becomes the request body.
#[derive(Debug, Clone)]
pub struct SnsAdapter {
    message: Value,
    request: NormalizedRequest,
}

impl SnsAdapter {
    /// # Errors
    ///
    /// Returns `ClientError` when the event has no SNS record or the message is
    /// not JSON; the fault lies with the publisher, not this function.
    pub fn from_event(
        event: &Value,
        context: &InvocationContext,
        route: &RouteOverride,
    ) -> Result<Self, AdapterError> {
        let raw_message = event
            .pointer("/Records/0/Sns/Message")
            .and_then(Value::as_str)
            .ok_or_else(|| AdapterError::ClientError(NOT_AN_SNS_JSON_EVENT.to_string()))?;
        let message: Value = serde_json::from_str(raw_message)
            .map_err(|_| AdapterError::ClientError(NOT_AN_SNS_JSON_EVENT.to_string()))?;

        let body = if is_present(&message) {
            message.to_string().into_bytes()
        } else {
            Vec::new()
        };

        let mut specifics = base_specifics(event, context);
        for (name, key) in [
            ("message_id", "MessageId"),
            ("topic_arn", "TopicArn"),
            ("subject", "Subject"),
            ("timestamp", "Timestamp"),
        ] {
            let value = event
                .pointer("/Records/0/Sns")
                .map_or(Value::Null, |sns| v_owned(sns, &[key]));
            specifics.insert(name, value);
        }

        Ok(Self {
            message,
            request: NormalizedRequest {
                method: Some(route.method_or("POST")),
                path: route.url(),
                query_parameters: BTreeMap::new(),
                path_parameters: BTreeMap::new(),
                headers: Headers::new(),
                body,
                client_ip: LOOPBACK_IP.to_string(),
                protocol: "sns".to_string(),
                context_specifics: specifics,
            },
        })
    }

    /// The decoded topic message.
    #[must_use]
    pub fn message(&self) -> &Value {
        &self.message
    }

    /// The SNS message id, for logging failures.
    #[must_use]
    pub fn message_id(&self) -> Option<&str> {
        self.request
            .context_specific("message_id")
            .and_then(Value::as_str)
    }
}

impl EventAdapter for SnsAdapter {
    fn request(&self) -> &NormalizedRequest {
        &self.request
    }

    // SNS discards whatever the function returns.
    fn respond(&self, _response: NormalizedResponse) -> Result<Value, AdapterError> {
        Ok(helpers::ok_empty())
    }
}
