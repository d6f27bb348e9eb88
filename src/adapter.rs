//! The capability contract every trigger adapter implements, and the handler
//! contract adapters call into.

use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use crate::core::invocation::InvocationContext;
use crate::core::models::{ContextSpecifics, NormalizedRequest, NormalizedResponse};
use crate::errors::AdapterError;

/// One trigger payload in, one normalized request out; one normalized response
/// in, one trigger-shaped reply out.
pub trait EventAdapter {
    fn request(&self) -> &NormalizedRequest;

    /// # Errors
    ///
    /// Returns `ResponseEncoding` when the response cannot be expressed in the
    /// trigger's reply shape.
    fn respond(&self, response: NormalizedResponse) -> Result<Value, AdapterError>;
}

/// The application endpoint invoked once per normalized request.
pub trait Handler {
    /// # Errors
    ///
    /// Any error the application raises; adapters propagate it, the batch
    /// dispatcher records it against the failing message.
    fn handle(&self, request: &NormalizedRequest) -> anyhow::Result<NormalizedResponse>;
}

impl<F> Handler for F
where
    F: Fn(&NormalizedRequest) -> anyhow::Result<NormalizedResponse>,
{
    fn handle(&self, request: &NormalizedRequest) -> anyhow::Result<NormalizedResponse> {
        self(request)
    }
}

/// Runs `handler` against the adapter's request and encodes its reply.
///
/// # Errors
///
/// Returns `AdapterError::Handler` when the handler fails and
/// `ResponseEncoding` when its response does not fit the reply.
pub fn execute<A, H>(adapter: &A, handler: &H) -> Result<Value, AdapterError>
where
    A: EventAdapter + ?Sized,
    H: Handler + ?Sized,
{
    let response = handler.handle(adapter.request()).map_err(|e| {
        error!(error = %e, "Handler returned an error");
        AdapterError::Handler(e)
    })?;
    adapter.respond(response)
}

/// Context specifics every trigger exposes: the raw event and invocation context.
pub(crate) fn base_specifics(event: &Value, context: &InvocationContext) -> ContextSpecifics {
    shared_specifics(Arc::new(event.clone()), Arc::new(context.to_value()))
}

/// Same as [`base_specifics`] over handles the caller already holds, so many
/// requests can point at one event.
pub(crate) fn shared_specifics(event: Arc<Value>, context: Arc<Value>) -> ContextSpecifics {
    let mut specifics = ContextSpecifics::new();
    specifics.insert_shared("event", event);
    specifics.insert_shared("context", context);
    specifics
}

pub(crate) fn opt_value(value: Option<&str>) -> Value {
    value.map_or(Value::Null, |v| Value::String(v.to_string()))
}
