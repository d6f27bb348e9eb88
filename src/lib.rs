/// Lambda Adapters - normalize AWS trigger events into one request shape.
///
/// One application handler, written against [`NormalizedRequest`] and
/// [`NormalizedResponse`], can be deployed behind any of the supported
/// triggers without knowing which one is calling it:
///
/// - API Gateway REST (payload v1) and HTTP (payload v2) APIs
/// - Application Load Balancer target groups
/// - API Gateway WebSocket routes
/// - SNS topics, SQS queues with partial batch failure reporting
/// - Step Functions tasks, with environment extraction from state
/// - direct `lambda invoke` calls
///
/// # Example
///
/// ```no_run
/// use lambda_adapters::core::config::AppConfig;
/// use lambda_adapters::core::invocation::InvocationContext;
/// use lambda_adapters::{LambdaContext, NormalizedRequest, NormalizedResponse, Router};
///
/// fn main() -> Result<(), Box<dyn std::error::Error>> {
///     // Set up structured logging
///     lambda_adapters::setup_logging();
///
///     let router = Router::new().route(
///         "POST",
///         "/create",
///         |request: &NormalizedRequest| -> anyhow::Result<NormalizedResponse> {
///             let body: serde_json::Value = request.json_body()?;
///             Ok(NormalizedResponse::json(body).with_status(201))
///         },
///     )?;
///
///     let config = AppConfig::from_env()?;
///     let app = LambdaContext::new(config.trigger(), router);
///
///     let event = serde_json::json!({"httpMethod": "POST", "path": "/create", "body": "{}"});
///     let reply = app.invoke(&event, &InvocationContext::default())?;
///     println!("{reply}");
///     Ok(())
/// }
/// ```
// Module declarations
pub mod adapter;
pub mod api;
pub mod context;
pub mod core;
pub mod errors;
pub mod routing;
pub mod worker;

pub use adapter::{EventAdapter, Handler, execute};
pub use context::{LambdaContext, Trigger};
pub use crate::core::invocation::InvocationContext;
pub use crate::core::models::{
    ContextSpecifics, Headers, NormalizedRequest, NormalizedResponse, QueryValue, ResponseBody,
};
pub use errors::AdapterError;
pub use routing::Router;
pub use worker::RouteOverride;
pub use worker::step_function::{
    EnvironmentKeys, EnvironmentOverlay, ExtractionTiming, StepFunctionOptions, ValueMode,
};

/// Configure structured logging with JSON format for AWS Lambda environments.
///
/// Output goes to stdout for `CloudWatch` Logs. The level comes from
/// `RUST_LOG` and defaults to `info`. Calling it again once a subscriber is
/// installed is a no-op.
///
/// # Example
///
/// ```
/// lambda_adapters::setup_logging();
/// ```
pub fn setup_logging() {
    use tracing_subscriber::EnvFilter;
    use tracing_subscriber::prelude::*;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer().json().with_target(true);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}
