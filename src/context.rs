//! Entry point that wires one trigger's adapter to an application handler.
//!
//! ```no_run
//! use lambda_adapters::{LambdaContext, NormalizedRequest, NormalizedResponse, Trigger};
//! use lambda_adapters::core::invocation::InvocationContext;
//!
//! let app = LambdaContext::new(
//!     Trigger::ApiGateway,
//!     |request: &NormalizedRequest| -> anyhow::Result<NormalizedResponse> {
//!         Ok(NormalizedResponse::text(format!("hello from {:?}", request.path)))
//!     },
//! );
//! let event = serde_json::json!({"httpMethod": "GET", "path": "/"});
//! let reply = app.invoke(&event, &InvocationContext::default()).unwrap();
//! assert_eq!(reply["statusCode"], 200);
//! ```

use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tracing::error;

use crate::adapter::{Handler, execute};
use crate::api::alb::AlbAdapter;
use crate::api::api_gateway::ApiGatewayAdapter;
use crate::api::websocket::WebSocketAdapter;
use crate::core::invocation::InvocationContext;
use crate::errors::AdapterError;
use crate::worker::RouteOverride;
use crate::worker::invoke::InvokeAdapter;
use crate::worker::sns::SnsAdapter;
use crate::worker::sqs::dispatch_batch;
use crate::worker::step_function::{EnvironmentOverlay, StepFunctionAdapter, StepFunctionOptions};

/// The AWS service invoking the function, with its per-trigger settings.
#[derive(Debug, Clone)]
pub enum Trigger {
    /// API Gateway, payload version detected per event.
    ApiGateway,
    ApiGatewayV1,
    ApiGatewayV2,
    Alb,
    WebSocket,
    Sns(RouteOverride),
    /// SQS standard queue with partial batch failure reporting.
    Sqs(RouteOverride),
    StepFunction(StepFunctionOptions),
    Invoke(RouteOverride),
}

impl Trigger {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Trigger::ApiGateway => "api-gateway",
            Trigger::ApiGatewayV1 => "api-gateway-v1",
            Trigger::ApiGatewayV2 => "api-gateway-v2",
            Trigger::Alb => "alb",
            Trigger::WebSocket => "websocket",
            Trigger::Sns(_) => "sns",
            Trigger::Sqs(_) => "sqs",
            Trigger::StepFunction(_) => "step-functions",
            Trigger::Invoke(_) => "invoke",
        }
    }
}

type SharedResolver = Arc<dyn Fn(&str) -> Option<Value> + Send + Sync>;
type EnvironmentSink = Arc<dyn Fn(&EnvironmentOverlay) + Send + Sync>;

pub struct LambdaContext<H> {
    trigger: Trigger,
    handler: H,
    resolver: Option<SharedResolver>,
    environment_sink: Option<EnvironmentSink>,
}

impl<H> fmt::Debug for LambdaContext<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LambdaContext")
            .field("trigger", &self.trigger)
            .finish_non_exhaustive()
    }
}

impl<H: Handler> LambdaContext<H> {
    pub fn new(trigger: Trigger, handler: H) -> Self {
        Self {
            trigger,
            handler,
            resolver: None,
            environment_sink: None,
        }
    }

    /// Collaborators offered to computed Step Functions extractors.
    #[must_use]
    pub fn with_resolver<F>(mut self, resolver: F) -> Self
    where
        F: Fn(&str) -> Option<Value> + Send + Sync + 'static,
    {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Receives each Step Functions environment overlay before the handler
    /// runs, so the caller can merge it into its own configuration.
    #[must_use]
    pub fn with_environment_sink<F>(mut self, sink: F) -> Self
    where
        F: Fn(&EnvironmentOverlay) + Send + Sync + 'static,
    {
        self.environment_sink = Some(Arc::new(sink));
        self
    }

    #[must_use]
    pub fn trigger(&self) -> &Trigger {
        &self.trigger
    }

    #[must_use]
    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Handles one invocation and returns the trigger-shaped reply.
    ///
    /// # Errors
    ///
    /// Adapter construction failures and, except for SQS batches, handler
    /// failures.
    #[tracing::instrument(level = "info", skip_all, fields(trigger = self.trigger.name(), request_id = %context.request_id))]
    pub fn invoke(&self, event: &Value, context: &InvocationContext) -> Result<Value, AdapterError> {
        match &self.trigger {
            Trigger::ApiGateway => execute(&ApiGatewayAdapter::from_event(event, context)?, &self.handler),
            Trigger::ApiGatewayV1 => execute(&ApiGatewayAdapter::v1(event, context)?, &self.handler),
            Trigger::ApiGatewayV2 => execute(&ApiGatewayAdapter::v2(event, context)?, &self.handler),
            Trigger::Alb => execute(&AlbAdapter::from_event(event, context)?, &self.handler),
            Trigger::WebSocket => execute(&WebSocketAdapter::from_event(event, context)?, &self.handler),
            Trigger::Sns(route) => self.invoke_sns(event, context, route),
            Trigger::Sqs(route) => Ok(dispatch_batch(event, context, route, &self.handler)?.to_reply()),
            Trigger::StepFunction(options) => self.invoke_step_function(event, context, options),
            Trigger::Invoke(route) => execute(&InvokeAdapter::new(event, context, route), &self.handler),
        }
    }

    fn invoke_sns(
        &self,
        event: &Value,
        context: &InvocationContext,
        route: &RouteOverride,
    ) -> Result<Value, AdapterError> {
        let adapter = SnsAdapter::from_event(event, context, route).inspect_err(|e| {
            error!(error = %e, "Rejected SNS event");
        })?;
        execute(&adapter, &self.handler).inspect_err(|e| {
            error!(
                message_id = adapter.message_id().unwrap_or_default(),
                error = %e,
                "Failed SNS message"
            );
        })
    }

    fn invoke_step_function(
        &self,
        event: &Value,
        context: &InvocationContext,
        options: &StepFunctionOptions,
    ) -> Result<Value, AdapterError> {
        let resolve = |name: &str| self.resolver.as_ref().and_then(|resolver| resolver(name));
        let mut adapter = StepFunctionAdapter::new(event, context, options, &resolve)?;
        let overlay = adapter.resolve_environment(&resolve)?;
        if let Some(sink) = &self.environment_sink {
            sink(overlay);
        }
        execute(&adapter, &self.handler)
    }
}
