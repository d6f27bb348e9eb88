use std::env;
use std::str::FromStr;

use crate::context::Trigger;
use crate::worker::RouteOverride;
use crate::worker::step_function::{
    EnvironmentKeys, ExtractionTiming, StepFunctionOptions, ValueMode,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerKind {
    ApiGateway,
    ApiGatewayV1,
    ApiGatewayV2,
    Alb,
    WebSocket,
    Sns,
    Sqs,
    StepFunction,
    Invoke,
}

impl FromStr for TriggerKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api-gateway" | "apigateway" => Ok(TriggerKind::ApiGateway),
            "api-gateway-v1" => Ok(TriggerKind::ApiGatewayV1),
            "api-gateway-v2" => Ok(TriggerKind::ApiGatewayV2),
            "alb" => Ok(TriggerKind::Alb),
            "websocket" | "web-socket" => Ok(TriggerKind::WebSocket),
            "sns" => Ok(TriggerKind::Sns),
            "sqs" => Ok(TriggerKind::Sqs),
            "step-functions" | "step-function" => Ok(TriggerKind::StepFunction),
            "invoke" => Ok(TriggerKind::Invoke),
            other => Err(format!("unknown trigger `{other}`")),
        }
    }
}

/// Function settings read from the Lambda environment.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub trigger: TriggerKind,
    pub route_url: Option<String>,
    pub request_method: Option<String>,
    pub environment_keys: Option<EnvironmentKeys>,
    pub value_mode: ValueMode,
    pub timing: ExtractionTiming,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Builds the config from any name → value source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, String>
    where
        F: Fn(&str) -> Option<String>,
    {
        let trigger = lookup("LAMBDA_TRIGGER")
            .ok_or_else(|| "LAMBDA_TRIGGER: environment variable not found".to_string())?
            .parse()
            .map_err(|e| format!("LAMBDA_TRIGGER: {}", e))?;

        let value_mode = match lookup("LAMBDA_ENVIRONMENT_VALUES").as_deref() {
            None | Some("preserve") => ValueMode::Preserve,
            Some("stringify") => ValueMode::Stringify,
            Some(other) => {
                return Err(format!(
                    "LAMBDA_ENVIRONMENT_VALUES: expected `preserve` or `stringify`, got `{}`",
                    other
                ));
            }
        };
        let timing = match lookup("LAMBDA_ENVIRONMENT_TIMING").as_deref() {
            None | Some("eager") => ExtractionTiming::Eager,
            Some("lazy") => ExtractionTiming::Lazy,
            Some(other) => {
                return Err(format!(
                    "LAMBDA_ENVIRONMENT_TIMING: expected `eager` or `lazy`, got `{}`",
                    other
                ));
            }
        };

        Ok(Self {
            trigger,
            route_url: lookup("LAMBDA_ROUTE_URL").filter(|v| !v.is_empty()),
            request_method: lookup("LAMBDA_REQUEST_METHOD").filter(|v| !v.is_empty()),
            environment_keys: lookup("LAMBDA_ENVIRONMENT_KEYS")
                .as_deref()
                .and_then(parse_environment_keys),
            value_mode,
            timing,
        })
    }

    #[must_use]
    pub fn route(&self) -> RouteOverride {
        RouteOverride {
            url: self.route_url.clone(),
            method: self.request_method.clone(),
        }
    }

    #[must_use]
    pub fn trigger(&self) -> Trigger {
        match self.trigger {
            TriggerKind::ApiGateway => Trigger::ApiGateway,
            TriggerKind::ApiGatewayV1 => Trigger::ApiGatewayV1,
            TriggerKind::ApiGatewayV2 => Trigger::ApiGatewayV2,
            TriggerKind::Alb => Trigger::Alb,
            TriggerKind::WebSocket => Trigger::WebSocket,
            TriggerKind::Sns => Trigger::Sns(self.route()),
            TriggerKind::Sqs => Trigger::Sqs(self.route()),
            TriggerKind::StepFunction => Trigger::StepFunction(StepFunctionOptions {
                route: self.route(),
                environment_keys: self.environment_keys.clone(),
                value_mode: self.value_mode,
                timing: self.timing,
            }),
            TriggerKind::Invoke => Trigger::Invoke(self.route()),
        }
    }
}

/// `A,B` lists keys; `A=X,B` maps `A` to `X` and keeps `B` as-is.
pub fn parse_environment_keys(raw: &str) -> Option<EnvironmentKeys> {
    let entries: Vec<&str> = raw
        .split(',')
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .collect();
    if entries.is_empty() {
        return None;
    }
    if !entries.iter().any(|e| e.contains('=')) {
        return Some(EnvironmentKeys::keys(entries));
    }
    Some(EnvironmentKeys::mapping(entries.into_iter().map(|entry| {
        match entry.split_once('=') {
            Some((from, to)) => (from.trim(), to.trim()),
            None => (entry, entry),
        }
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |name: &str| map.get(name).cloned()
    }

    #[test]
    fn trigger_is_required() {
        let err = AppConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(err.starts_with("LAMBDA_TRIGGER"));
    }

    #[test]
    fn reads_route_and_extraction_settings() {
        let config = AppConfig::from_lookup(lookup(&[
            ("LAMBDA_TRIGGER", "step-functions"),
            ("LAMBDA_ROUTE_URL", "/jobs"),
            ("LAMBDA_REQUEST_METHOD", "post"),
            ("LAMBDA_ENVIRONMENT_KEYS", "BUSINESS_NAME=COMPANY_NAME, API_KEY"),
            ("LAMBDA_ENVIRONMENT_VALUES", "stringify"),
            ("LAMBDA_ENVIRONMENT_TIMING", "lazy"),
        ]))
        .unwrap();

        assert_eq!(config.trigger, TriggerKind::StepFunction);
        assert_eq!(config.route_url.as_deref(), Some("/jobs"));
        assert_eq!(config.value_mode, ValueMode::Stringify);
        assert_eq!(config.timing, ExtractionTiming::Lazy);
        match config.environment_keys {
            Some(EnvironmentKeys::Mapping(pairs)) => assert_eq!(
                pairs,
                vec![
                    ("BUSINESS_NAME".to_string(), "COMPANY_NAME".to_string()),
                    ("API_KEY".to_string(), "API_KEY".to_string()),
                ]
            ),
            other => panic!("unexpected keys: {other:?}"),
        }
    }

    #[test]
    fn rejects_unknown_value_mode() {
        let err = AppConfig::from_lookup(lookup(&[
            ("LAMBDA_TRIGGER", "sqs"),
            ("LAMBDA_ENVIRONMENT_VALUES", "loud"),
        ]))
        .unwrap_err();
        assert!(err.contains("LAMBDA_ENVIRONMENT_VALUES"));
    }

    #[test]
    fn plain_key_list() {
        match parse_environment_keys("A, B") {
            Some(EnvironmentKeys::Keys(keys)) => assert_eq!(keys, vec!["A", "B"]),
            other => panic!("unexpected keys: {other:?}"),
        }
        assert!(parse_environment_keys(" , ").is_none());
    }
}
