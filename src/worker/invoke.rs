//! Direct `aws lambda invoke` calls: the event *is* the request body and the
//! handler's body is returned as-is.

use std::collections::BTreeMap;

use serde_json::Value;

use super::RouteOverride;
use crate::adapter::{EventAdapter, base_specifics};
use crate::core::invocation::InvocationContext;
use crate::core::models::{Headers, LOOPBACK_IP, NormalizedRequest, NormalizedResponse};
use crate::errors::AdapterError;

/// Encodes an invocation payload as a request body. JSON strings are passed
/// through raw rather than re-quoted.
pub(crate) fn payload_body(event: &Value) -> Vec<u8> {
    match event {
        Value::String(s) => s.clone().into_bytes(),
        other => other.to_string().into_bytes(),
    }
}

/// Request shared by payload-as-body triggers (direct invoke, Step Functions).
pub(crate) fn payload_request(
    event: &Value,
    context: &InvocationContext,
    route: &RouteOverride,
    protocol: &str,
    invocation_type: &str,
) -> NormalizedRequest {
    let mut specifics = base_specifics(event, context);
    specifics.insert("invocation_type", Value::from(invocation_type));
    specifics.insert(
        "function_name",
        Value::String(context.function_name.clone()),
    );
    specifics.insert(
        "function_version",
        Value::String(context.function_version.clone()),
    );
    specifics.insert("request_id", Value::String(context.request_id.clone()));

    NormalizedRequest {
        method: route.method_upper(),
        path: route.url(),
        query_parameters: BTreeMap::new(),
        path_parameters: BTreeMap::new(),
        headers: Headers::new(),
        body: payload_body(event),
        client_ip: LOOPBACK_IP.to_string(),
        protocol: protocol.to_string(),
        context_specifics: specifics,
    }
}

#[derive(Debug, Clone)]
pub struct InvokeAdapter {
    request: NormalizedRequest,
}

impl InvokeAdapter {
    #[must_use]
    pub fn new(event: &Value, context: &InvocationContext, route: &RouteOverride) -> Self {
        Self {
            request: payload_request(event, context, route, "lambda-invoke", "direct"),
        }
    }
}

impl EventAdapter for InvokeAdapter {
    fn request(&self) -> &NormalizedRequest {
        &self.request
    }

    fn respond(&self, response: NormalizedResponse) -> Result<Value, AdapterError> {
        response.body.into_value()
    }
}
