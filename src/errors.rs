use thiserror::Error;

#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("Failed to parse trigger event: {0}")]
    MalformedEvent(String),

    #[error("Unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    #[error("Invalid request content: {0}")]
    ClientError(String),

    #[error("environment_keys requested a key called `{0}` but this was not found in the event")]
    MissingKey(String),

    #[error("The environment extractor must return an object, but returned {0}")]
    InvalidExtractor(String),

    #[error("Failed to encode handler response: {0}")]
    ResponseEncoding(String),

    #[error("Invalid adapter configuration: {0}")]
    Config(String),

    #[error("Handler failed: {0}")]
    Handler(anyhow::Error),
}

impl AdapterError {
    /// True when the failure is attributable to whoever sent the event rather
    /// than to this function or its configuration.
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, AdapterError::ClientError(_))
    }
}

impl From<anyhow::Error> for AdapterError {
    fn from(error: anyhow::Error) -> Self {
        AdapterError::Handler(error)
    }
}

impl From<serde_json::Error> for AdapterError {
    fn from(error: serde_json::Error) -> Self {
        AdapterError::MalformedEvent(error.to_string())
    }
}

impl From<base64::DecodeError> for AdapterError {
    fn from(error: base64::DecodeError) -> Self {
        AdapterError::MalformedEvent(format!("body is not valid base64: {error}"))
    }
}
