//! Adapters for triggers that are not HTTP requests: queues, topics, state
//! machines and direct invocation.

pub mod invoke;
pub mod sns;
pub mod sqs;
pub mod step_function;

/// Method and URL a non-HTTP trigger should present to the handler, chosen by
/// whoever wires the function up rather than by the event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteOverride {
    pub url: Option<String>,
    pub method: Option<String>,
}

impl RouteOverride {
    #[must_use]
    pub fn new(url: Option<&str>, method: Option<&str>) -> Self {
        Self {
            url: url.map(ToString::to_string),
            method: method.map(ToString::to_string),
        }
    }

    pub(crate) fn method_or(&self, default: &str) -> String {
        self.method
            .as_deref()
            .filter(|m| !m.is_empty())
            .unwrap_or(default)
            .to_ascii_uppercase()
    }

    pub(crate) fn method_upper(&self) -> Option<String> {
        self.method
            .as_deref()
            .filter(|m| !m.is_empty())
            .map(str::to_ascii_uppercase)
    }

    pub(crate) fn url(&self) -> Option<String> {
        self.url.clone().filter(|u| !u.is_empty())
    }
}
