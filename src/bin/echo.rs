#![allow(clippy::missing_errors_doc)]

use std::sync::Arc;

use lambda_adapters::core::config::AppConfig;
use lambda_adapters::{InvocationContext, LambdaContext, NormalizedRequest, NormalizedResponse};
use lambda_runtime::{Error, LambdaEvent, service_fn};
use serde_json::{Value, json};
use tracing::{error, info};

/// Replies with a summary of what the handler was given, whichever trigger
/// delivered it.
fn echo(request: &NormalizedRequest) -> anyhow::Result<NormalizedResponse> {
    let body = match request.json_body::<Value>() {
        Ok(value) => value,
        Err(_) => Value::String(String::from_utf8_lossy(&request.body).into_owned()),
    };
    Ok(NormalizedResponse::json(json!({
        "method": request.method,
        "path": request.path,
        "query": request.query_parameters,
        "path_parameters": request.path_parameters,
        "headers": request.headers.to_value(),
        "client_ip": request.client_ip,
        "protocol": request.protocol,
        "body": body,
    })))
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    lambda_adapters::setup_logging();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Config error: {}", e);
        Error::from(e)
    })?;
    info!(trigger = ?config.trigger, "Starting lambda-echo");

    let app = Arc::new(LambdaContext::new(config.trigger(), echo));
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let app = Arc::clone(&app);
        async move {
            let context = InvocationContext::from(&event.context);
            app.invoke(&event.payload, &context).map_err(Error::from)
        }
    }))
    .await
}
