//! Reply builders shared by the trigger adapters.
//!
//! HTTP-shaped triggers (API Gateway v1/v2, ALB) all answer with the same
//! proxy envelope; the other triggers answer with fixed minimal shapes.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde_json::{Value, json};

use crate::core::models::{NormalizedResponse, ResponseBody};

pub const JSON_CONTENT_TYPE: &str = "application/json; charset=UTF-8";
pub const TEXT_CONTENT_TYPE: &str = "text/plain; charset=UTF-8";
pub const BINARY_CONTENT_TYPE: &str = "application/octet-stream";

// ============================================================================
// Response Builders
// ============================================================================

/// Encodes a response into the `{statusCode, headers, body, isBase64Encoded}`
/// proxy envelope.
#[must_use]
pub fn http_envelope(response: NormalizedResponse) -> Value {
    let NormalizedResponse {
        status_code,
        mut headers,
        body,
    } = response;

    let (body, is_base64_encoded, default_type) = match body {
        ResponseBody::Empty => (String::new(), false, None),
        ResponseBody::Text(text) => (text, false, Some(TEXT_CONTENT_TYPE)),
        ResponseBody::Json(value) => (value.to_string(), false, Some(JSON_CONTENT_TYPE)),
        ResponseBody::Bytes(bytes) => (STANDARD.encode(bytes), true, Some(BINARY_CONTENT_TYPE)),
    };
    if let Some(content_type) = default_type
        && !headers.contains("content-type")
    {
        headers.insert("content-type", content_type);
    }

    json!({
        "statusCode": status_code,
        "headers": headers.to_value(),
        "body": body,
        "isBase64Encoded": is_base64_encoded,
    })
}

/// Returns the bare `{statusCode}` acknowledgment WebSocket routes expect.
#[must_use]
pub fn status_only(status_code: u16) -> Value {
    json!({ "statusCode": status_code })
}

/// Returns the empty reply for triggers that ignore responses.
#[must_use]
pub fn ok_empty() -> Value {
    json!({})
}

/// Returns an error response with the given status code and message.
#[must_use]
pub fn err_response(status_code: u16, message: &str) -> NormalizedResponse {
    NormalizedResponse::json(json!({ "status": "client_error", "error": message }))
        .with_status(status_code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_bodies_get_a_default_content_type() {
        let reply = http_envelope(NormalizedResponse::json(json!({"some": "data"})));
        assert_eq!(reply["statusCode"], 200);
        assert_eq!(reply["body"], r#"{"some":"data"}"#);
        assert_eq!(reply["isBase64Encoded"], false);
        assert_eq!(reply["headers"]["content-type"], JSON_CONTENT_TYPE);
    }

    #[test]
    fn handler_content_type_is_kept() {
        let response = NormalizedResponse::text("<p>hi</p>").with_header("Content-Type", "text/html");
        let reply = http_envelope(response);
        assert_eq!(reply["headers"]["content-type"], "text/html");
    }

    #[test]
    fn byte_bodies_are_base64_encoded() {
        let reply = http_envelope(NormalizedResponse::bytes(vec![0xff, 0x00, 0x10]));
        assert_eq!(reply["isBase64Encoded"], true);
        assert_eq!(reply["body"], "/wAQ");
    }

    #[test]
    fn empty_bodies_have_no_content_type() {
        let reply = http_envelope(NormalizedResponse::empty().with_status(204));
        assert_eq!(reply["statusCode"], 204);
        assert_eq!(reply["body"], "");
        assert!(reply["headers"].get("content-type").is_none());
    }
}
