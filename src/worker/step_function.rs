//! Step Functions task invocations.
//!
//! Besides the usual payload-as-body handling, a state machine can pass
//! configuration through its state (for example values set with `Assign`).
//! [`EnvironmentKeys`] describes which of those values to lift out of the
//! event; the result is an [`EnvironmentOverlay`] the caller merges into its
//! own configuration. The adapter itself never touches process state.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::{debug, error};

use super::RouteOverride;
use super::invoke::payload_request;
use crate::adapter::EventAdapter;
use crate::core::invocation::InvocationContext;
use crate::core::models::{NormalizedRequest, NormalizedResponse};
use crate::errors::AdapterError;

pub type EnvironmentOverlay = BTreeMap<String, Value>;

/// Looks up a collaborator value by name for computed extractors.
pub type Resolver<'a> = &'a dyn Fn(&str) -> Option<Value>;

pub type ExtractorFn = dyn Fn(&Value, Resolver<'_>) -> Value + Send + Sync;

/// Which event values become environment entries.
#[derive(Clone)]
pub enum EnvironmentKeys {
    /// `event[K]` becomes entry `K`.
    Keys(Vec<String>),
    /// `event[from]` becomes entry `to`.
    Mapping(Vec<(String, String)>),
    /// Arbitrary extraction; must return a JSON object.
    Computed(Arc<ExtractorFn>),
}

impl EnvironmentKeys {
    pub fn keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        EnvironmentKeys::Keys(keys.into_iter().map(Into::into).collect())
    }

    pub fn mapping<I, A, B>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (A, B)>,
        A: Into<String>,
        B: Into<String>,
    {
        EnvironmentKeys::Mapping(
            pairs
                .into_iter()
                .map(|(from, to)| (from.into(), to.into()))
                .collect(),
        )
    }

    pub fn computed<F>(extractor: F) -> Self
    where
        F: Fn(&Value, Resolver<'_>) -> Value + Send + Sync + 'static,
    {
        EnvironmentKeys::Computed(Arc::new(extractor))
    }
}

impl fmt::Debug for EnvironmentKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EnvironmentKeys::Keys(keys) => f.debug_tuple("Keys").field(keys).finish(),
            EnvironmentKeys::Mapping(pairs) => f.debug_tuple("Mapping").field(pairs).finish(),
            EnvironmentKeys::Computed(_) => f.write_str("Computed(..)"),
        }
    }
}

/// How extracted values are represented in the overlay.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValueMode {
    /// Values keep their JSON type.
    #[default]
    Preserve,
    /// Scalars are rendered as strings, containers as JSON text, nulls dropped.
    Stringify,
}

/// When the overlay is computed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExtractionTiming {
    /// At construction, so misconfiguration fails before any handler runs.
    #[default]
    Eager,
    /// On the first call to [`StepFunctionAdapter::resolve_environment`].
    Lazy,
}

#[derive(Debug, Clone, Default)]
pub struct StepFunctionOptions {
    pub route: RouteOverride,
    pub environment_keys: Option<EnvironmentKeys>,
    pub value_mode: ValueMode,
    pub timing: ExtractionTiming,
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

fn stringify(value: Value) -> Option<Value> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(Value::String(s)),
        Value::Bool(b) => Some(Value::String(b.to_string())),
        Value::Number(n) => Some(Value::String(n.to_string())),
        other => Some(Value::String(other.to_string())),
    }
}

fn lookup<'a>(event: &'a Value, key: &str) -> Result<&'a Value, AdapterError> {
    event
        .get(key)
        .ok_or_else(|| AdapterError::MissingKey(key.to_string()))
}

/// Computes the overlay `keys` describes for `event`.
///
/// # Errors
///
/// `MissingKey` when a listed or mapped key is absent from the event;
/// `InvalidExtractor` when a computed extractor returns something other than
/// an object.
pub fn extract_environment(
    event: &Value,
    keys: &EnvironmentKeys,
    mode: ValueMode,
    resolver: Resolver<'_>,
) -> Result<EnvironmentOverlay, AdapterError> {
    let extracted: Map<String, Value> = match keys {
        EnvironmentKeys::Keys(keys) => {
            let mut out = Map::new();
            for key in keys {
                out.insert(key.clone(), lookup(event, key)?.clone());
            }
            out
        }
        EnvironmentKeys::Mapping(pairs) => {
            let mut out = Map::new();
            for (from, to) in pairs {
                out.insert(to.clone(), lookup(event, from)?.clone());
            }
            out
        }
        EnvironmentKeys::Computed(extractor) => match extractor(event, resolver) {
            Value::Object(map) => map,
            other => {
                return Err(AdapterError::InvalidExtractor(
                    json_type_name(&other).to_string(),
                ));
            }
        },
    };

    Ok(match mode {
        ValueMode::Preserve => extracted.into_iter().collect(),
        ValueMode::Stringify => extracted
            .into_iter()
            .filter_map(|(k, v)| stringify(v).map(|v| (k, v)))
            .collect(),
    })
}

/// Resolver that knows no collaborators.
pub fn no_resolver(_name: &str) -> Option<Value> {
    None
}

#[derive(Debug, Clone)]
pub struct StepFunctionAdapter {
    event: Value,
    environment_keys: Option<EnvironmentKeys>,
    value_mode: ValueMode,
    overlay: Option<EnvironmentOverlay>,
    request: NormalizedRequest,
}

impl StepFunctionAdapter {
    /// # Errors
    ///
    /// With [`ExtractionTiming::Eager`], any extraction error.
    pub fn new(
        event: &Value,
        context: &InvocationContext,
        options: &StepFunctionOptions,
        resolver: Resolver<'_>,
    ) -> Result<Self, AdapterError> {
        let mut request = payload_request(
            event,
            context,
            &options.route,
            "step-functions",
            "step-functions",
        );
        let states_context = event
            .get("$states")
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));
        request
            .context_specifics
            .insert("states_context", states_context);

        let mut adapter = Self {
            event: event.clone(),
            environment_keys: options.environment_keys.clone(),
            value_mode: options.value_mode,
            overlay: None,
            request,
        };
        if options.timing == ExtractionTiming::Eager {
            adapter.resolve_environment(resolver)?;
        }
        Ok(adapter)
    }

    /// Computes the overlay if it has not been computed yet and exposes it to
    /// the handler as the `extracted_environment` context specific.
    ///
    /// # Errors
    ///
    /// Any extraction error; nothing is cached in that case.
    pub fn resolve_environment(
        &mut self,
        resolver: Resolver<'_>,
    ) -> Result<&EnvironmentOverlay, AdapterError> {
        if self.overlay.is_none() {
            let overlay = match &self.environment_keys {
                None => EnvironmentOverlay::new(),
                Some(keys) => {
                    let overlay = extract_environment(&self.event, keys, self.value_mode, resolver)
                        .inspect_err(|e| error!(error = %e, "Step Functions environment extraction failed"))?;
                    self.request.context_specifics.insert(
                        "extracted_environment",
                        Value::Object(overlay.clone().into_iter().collect()),
                    );
                    overlay
                }
            };
            debug!(entries = overlay.len(), "Resolved Step Functions environment");
            self.overlay = Some(overlay);
        }
        Ok(&*self.overlay.get_or_insert_with(EnvironmentOverlay::new))
    }

    /// The overlay, once resolved.
    #[must_use]
    pub fn environment_overlay(&self) -> Option<&EnvironmentOverlay> {
        self.overlay.as_ref()
    }
}

impl EventAdapter for StepFunctionAdapter {
    fn request(&self) -> &NormalizedRequest {
        &self.request
    }

    fn respond(&self, response: NormalizedResponse) -> Result<Value, AdapterError> {
        response.body.into_value()
    }
}
