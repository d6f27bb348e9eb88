//! SQS standard queue: per-record adapter and the partial-batch dispatcher.
//!
//! Every record in the batch is handled independently. Records whose handler
//! fails are reported back in a `batchItemFailures` envelope so the queue
//! redelivers only those; everything else is deleted from the queue.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

use super::RouteOverride;
use crate::adapter::{EventAdapter, Handler, base_specifics, opt_value};
use crate::api::helpers;
use crate::api::parsing::{lenient_map, parse_event};
use crate::core::invocation::InvocationContext;
use crate::core::models::{
    ContextSpecifics, Headers, LOOPBACK_IP, NormalizedRequest, NormalizedResponse,
};
use crate::errors::AdapterError;

#[derive(Debug, Deserialize)]
struct SqsEvent {
    #[serde(rename = "Records")]
    records: Vec<Value>,
}

/// One message inside an SQS batch.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchRecord {
    pub message_id: String,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub receipt_handle: Option<String>,
    #[serde(default, rename = "eventSourceARN")]
    pub event_source_arn: Option<String>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub attributes: BTreeMap<String, String>,
    #[serde(default, deserialize_with = "lenient_map")]
    pub message_attributes: BTreeMap<String, Value>,
    #[serde(skip)]
    raw: Arc<Value>,
}

impl BatchRecord {
    /// # Errors
    ///
    /// Returns `MalformedEvent` when the record has no message id.
    pub fn from_value(raw: &Value) -> Result<Self, AdapterError> {
        Self::from_owned(raw.clone())
    }

    fn from_owned(raw: Value) -> Result<Self, AdapterError> {
        let mut record: BatchRecord = parse_event(&raw, "SQS record")?;
        record.raw = Arc::new(raw);
        Ok(record)
    }

    #[must_use]
    pub fn body(&self) -> &str {
        self.body.as_deref().unwrap_or_default()
    }
}

/// Splits an SQS event into its records, preserving delivery order.
///
/// # Errors
///
/// Returns `MalformedEvent` when the payload has no `Records` list or any
/// record cannot be identified.
pub fn parse_batch(event: &Value) -> Result<Vec<BatchRecord>, AdapterError> {
    let parsed: SqsEvent = parse_event(event, "SQS")?;
    parsed.records.into_iter().map(BatchRecord::from_owned).collect()
}

/// Adapter scoped to a single SQS record. The body is handed over verbatim;
/// decoding it is up to the handler.
#[derive(Debug, Clone)]
pub struct SqsRecordAdapter {
    request: NormalizedRequest,
}

impl SqsRecordAdapter {
    /// `base` carries the batch-wide `event` and `context` entries; they are
    /// shared with every record, not copied.
    #[must_use]
    pub fn new(record: &BatchRecord, base: &ContextSpecifics, route: &RouteOverride) -> Self {
        let mut specifics = base.clone();
        specifics.insert("sqs_message_id", Value::String(record.message_id.clone()));
        specifics.insert(
            "sqs_receipt_handle",
            opt_value(record.receipt_handle.as_deref()),
        );
        specifics.insert(
            "sqs_source_arn",
            opt_value(record.event_source_arn.as_deref()),
        );
        specifics.insert(
            "sqs_sent_timestamp",
            opt_value(record.attributes.get("SentTimestamp").map(String::as_str)),
        );
        specifics.insert(
            "sqs_approximate_receive_count",
            opt_value(
                record
                    .attributes
                    .get("ApproximateReceiveCount")
                    .map(String::as_str),
            ),
        );
        specifics.insert(
            "sqs_message_attributes",
            Value::Object(record.message_attributes.clone().into_iter().collect()),
        );
        specifics.insert_shared("sqs_record", Arc::clone(&record.raw));

        Self {
            request: NormalizedRequest {
                method: Some(route.method_or("POST")),
                path: route.url(),
                query_parameters: BTreeMap::new(),
                path_parameters: BTreeMap::new(),
                headers: Headers::new(),
                body: record.body().as_bytes().to_vec(),
                client_ip: LOOPBACK_IP.to_string(),
                protocol: "sqs".to_string(),
                context_specifics: specifics,
            },
        }
    }
}

impl EventAdapter for SqsRecordAdapter {
    fn request(&self) -> &NormalizedRequest {
        &self.request
    }

    fn respond(&self, _response: NormalizedResponse) -> Result<Value, AdapterError> {
        Ok(helpers::ok_empty())
    }
}

#[derive(Debug, Serialize)]
struct BatchItemFailure<'a> {
    #[serde(rename = "itemIdentifier")]
    item_identifier: &'a str,
}

#[derive(Debug, Serialize)]
struct BatchResponse<'a> {
    #[serde(rename = "batchItemFailures")]
    batch_item_failures: Vec<BatchItemFailure<'a>>,
}

/// Message ids whose handling failed, in delivery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchResult {
    failed: Vec<String>,
}

impl BatchResult {
    #[must_use]
    pub fn failed_ids(&self) -> &[String] {
        &self.failed
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    /// `{}` when every record succeeded, otherwise the partial-batch-failure
    /// envelope.
    #[must_use]
    pub fn to_reply(&self) -> Value {
        if self.failed.is_empty() {
            return helpers::ok_empty();
        }
        let response = BatchResponse {
            batch_item_failures: self
                .failed
                .iter()
                .map(|id| BatchItemFailure { item_identifier: id })
                .collect(),
        };
        serde_json::to_value(response).unwrap_or_else(|_| json!({}))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}

/// Runs `handler` once per record, in order, and collects the ids of the
/// records it failed on. A failing (or panicking) record never stops the
/// records after it.
///
/// # Errors
///
/// Returns `MalformedEvent` only when the payload cannot be split into records.
#[tracing::instrument(level = "info", skip_all)]
pub fn dispatch_batch<H: Handler + ?Sized>(
    event: &Value,
    context: &InvocationContext,
    route: &RouteOverride,
    handler: &H,
) -> Result<BatchResult, AdapterError> {
    let records = parse_batch(event)?;
    info!(records = records.len(), "Dispatching SQS batch");

    let base = base_specifics(event, context);
    let mut result = BatchResult::default();
    for record in &records {
        let adapter = SqsRecordAdapter::new(record, &base, route);
        let outcome = catch_unwind(AssertUnwindSafe(|| handler.handle(adapter.request())));
        let failure = match outcome {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };
        if let Some(reason) = failure {
            error!(message_id = %record.message_id, error = %reason, "Failed to process SQS record");
            result.failed.push(record.message_id.clone());
        }
    }

    info!(
        failed = result.failed.len(),
        succeeded = records.len() - result.failed.len(),
        "Finished SQS batch"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_failure_list_is_a_plain_ack() {
        assert_eq!(BatchResult::default().to_reply(), json!({}));
    }

    #[test]
    fn record_without_message_id_is_fatal() {
        let err = parse_batch(&json!({"Records": [{"body": "x"}]})).unwrap_err();
        assert!(matches!(err, AdapterError::MalformedEvent(_)));
    }

    #[test]
    fn missing_records_is_fatal() {
        assert!(parse_batch(&json!({"records": []})).is_err());
    }
}
