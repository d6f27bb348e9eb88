use std::collections::BTreeMap;

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

use crate::core::models::{Headers, LOOPBACK_IP, QueryValue};
use crate::errors::AdapterError;

pub fn v_path<'a>(root: &'a Value, path: &[&str]) -> Option<&'a Value> {
    let mut cur = root;
    for key in path {
        cur = cur.get(*key)?;
    }
    Some(cur)
}

/// Owned copy of the value at `path`, `Null` when any segment is missing.
pub fn v_owned(root: &Value, path: &[&str]) -> Value {
    v_path(root, path).cloned().unwrap_or(Value::Null)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum MapOrList<V> {
    Map(BTreeMap<String, V>),
    List(Vec<Value>),
}

/// Accepts an object, `null`, or an empty list where AWS documents an object.
///
/// API Gateway test consoles send `[]` for empty `pathParameters` and
/// `stageVariables`; a non-empty list is still rejected.
pub fn lenient_map<'de, D, V>(deserializer: D) -> Result<BTreeMap<String, V>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    match Option::<MapOrList<V>>::deserialize(deserializer)? {
        None => Ok(BTreeMap::new()),
        Some(MapOrList::Map(map)) => Ok(map),
        Some(MapOrList::List(list)) if list.is_empty() => Ok(BTreeMap::new()),
        Some(MapOrList::List(_)) => Err(D::Error::custom("expected an object, found a list")),
    }
}

fn header_text(value: Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => Some(s),
        other => Some(other.to_string()),
    }
}

/// Like [`lenient_map`], but coerces non-string header values to text.
///
/// Hand-built test events often carry `"Content-Length": 12`; `null` values are dropped.
pub fn lenient_headers<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Value> = lenient_map(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(name, value)| header_text(value).map(|v| (name, v)))
        .collect())
}

/// Multi-value form of [`lenient_headers`]; a scalar becomes a one-element list.
pub fn lenient_multi_headers<'de, D>(
    deserializer: D,
) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: BTreeMap<String, Value> = lenient_map(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(name, value)| {
            let values = match value {
                Value::Array(items) => items.into_iter().filter_map(header_text).collect(),
                other => header_text(other).into_iter().collect(),
            };
            (name, values)
        })
        .collect())
}

/// Parses `event` into `T`, reporting structural problems as `MalformedEvent`.
///
/// # Errors
///
/// Returns `MalformedEvent` carrying the serde error text.
pub fn parse_event<T: serde::de::DeserializeOwned>(
    event: &Value,
    source: &str,
) -> Result<T, AdapterError> {
    T::deserialize(event).map_err(|e| {
        AdapterError::MalformedEvent(format!("Failed to parse event from {source}: {e}"))
    })
}

/// # Errors
///
/// Returns `MalformedEvent` when a base64-flagged body does not decode.
pub fn decode_body(body: Option<&str>, is_base64_encoded: bool) -> Result<Vec<u8>, AdapterError> {
    let Some(body) = body else {
        return Ok(Vec::new());
    };
    if is_base64_encoded {
        Ok(STANDARD.decode(body)?)
    } else {
        Ok(body.as_bytes().to_vec())
    }
}

/// Lower-cases header names; a multi-value entry replaces the single-value
/// entry with the same name.
pub fn merge_headers(
    single: &BTreeMap<String, String>,
    multi: &BTreeMap<String, Vec<String>>,
) -> Headers {
    let mut headers = Headers::new();
    for (name, value) in single {
        headers.insert(name, value.clone());
    }
    for (name, values) in multi {
        headers.insert(name, values.join(", "));
    }
    headers
}

pub fn merge_query(
    single: &BTreeMap<String, String>,
    multi: &BTreeMap<String, Vec<String>>,
) -> BTreeMap<String, QueryValue> {
    let mut query: BTreeMap<String, QueryValue> = single
        .iter()
        .map(|(k, v)| (k.clone(), QueryValue::Single(v.clone())))
        .collect();
    for (key, values) in multi {
        query.insert(key.clone(), QueryValue::Multi(values.clone()));
    }
    query
}

/// Identity field first, then the first hop of `x-forwarded-for`, then loopback.
pub fn resolve_client_ip(identity_ip: Option<&str>, headers: &Headers) -> String {
    if let Some(ip) = identity_ip.filter(|ip| !ip.is_empty()) {
        return ip.to_string();
    }
    headers
        .get("x-forwarded-for")
        .and_then(|forwarded| forwarded.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
        .map_or_else(|| LOOPBACK_IP.to_string(), ToString::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Deserialize)]
    struct Holder {
        #[serde(default, deserialize_with = "lenient_map")]
        params: BTreeMap<String, String>,
    }

    #[test]
    fn lenient_map_accepts_null_and_empty_list() {
        let h: Holder = serde_json::from_value(json!({"params": null})).unwrap();
        assert!(h.params.is_empty());
        let h: Holder = serde_json::from_value(json!({"params": []})).unwrap();
        assert!(h.params.is_empty());
        let h: Holder = serde_json::from_value(json!({})).unwrap();
        assert!(h.params.is_empty());
        let h: Holder = serde_json::from_value(json!({"params": {"id": "1"}})).unwrap();
        assert_eq!(h.params.get("id").map(String::as_str), Some("1"));
        assert!(serde_json::from_value::<Holder>(json!({"params": ["x"]})).is_err());
    }

    #[derive(Deserialize)]
    struct HeaderHolder {
        #[serde(default, deserialize_with = "lenient_headers")]
        headers: BTreeMap<String, String>,
        #[serde(default, deserialize_with = "lenient_multi_headers")]
        multi: BTreeMap<String, Vec<String>>,
    }

    #[test]
    fn scalar_header_values_become_text() {
        let h: HeaderHolder = serde_json::from_value(json!({
            "headers": {"Content-Length": 12, "X-Debug": true, "X-Gone": null, "Host": "a"},
            "multi": {"X-Retry": [1, "2", null], "X-One": 3.5}
        }))
        .unwrap();
        assert_eq!(h.headers.get("Content-Length").map(String::as_str), Some("12"));
        assert_eq!(h.headers.get("X-Debug").map(String::as_str), Some("true"));
        assert_eq!(h.headers.get("Host").map(String::as_str), Some("a"));
        assert!(!h.headers.contains_key("X-Gone"));
        assert_eq!(h.multi["X-Retry"], vec!["1", "2"]);
        assert_eq!(h.multi["X-One"], vec!["3.5"]);
    }

    #[test]
    fn client_ip_prefers_identity_then_first_forwarded_hop() {
        let headers: Headers = [("X-Forwarded-For", "10.0.0.1, 10.0.0.2")].into_iter().collect();
        assert_eq!(resolve_client_ip(Some("1.2.3.4"), &headers), "1.2.3.4");
        assert_eq!(resolve_client_ip(None, &headers), "10.0.0.1");
        assert_eq!(resolve_client_ip(None, &Headers::new()), LOOPBACK_IP);
    }

    #[test]
    fn decode_body_reports_bad_base64_as_malformed() {
        let err = decode_body(Some("***"), true).unwrap_err();
        assert!(matches!(err, AdapterError::MalformedEvent(_)));
        assert_eq!(decode_body(Some("aGk="), true).unwrap(), b"hi".to_vec());
        assert_eq!(decode_body(None, true).unwrap(), Vec::<u8>::new());
    }
}
