//! JSON envelope handling
//!
//! Requests are sent as a one-element array of command objects and every
//! response wraps its payload in an item carrying a numeric status. This
//! module builds the former and classifies the latter into the
//! [`ApiError`] taxonomy.

use serde::Deserialize;
use serde_json::{json, Map, Value};

use crate::error::{ApiError, Result};

/// Build the request body for a command
pub fn request_body(command: &str, action: u8, params: Option<&Value>) -> Value {
    let mut item = Map::new();
    item.insert("cmd".to_string(), Value::String(command.to_string()));
    item.insert("action".to_string(), json!(action));
    if let Some(params) = params {
        item.insert("param".to_string(), params.clone());
    }
    Value::Array(vec![Value::Object(item)])
}

/// One item of a response envelope
#[derive(Debug, Clone, Deserialize)]
pub struct ResponseItem {
    #[serde(default)]
    pub cmd: Option<String>,
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub error: Option<ErrorDetail>,
}

/// The `error` object of a failed response item
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    #[serde(rename = "rspCode", default)]
    pub rsp_code: i64,
    #[serde(default)]
    pub detail: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Envelope {
    Batch(Vec<ResponseItem>),
    Single(ResponseItem),
}

/// Parse a raw body into its first response item
///
/// Accepts both the usual array form and a bare item object. Anything else,
/// including an empty array, is an unparseable response.
pub fn parse(command: &str, body: &[u8]) -> Result<ResponseItem> {
    let envelope: Envelope =
        serde_json::from_slice(body).map_err(|e| ApiError::unparseable(command, e))?;

    match envelope {
        Envelope::Single(item) => Ok(item),
        Envelope::Batch(items) => items
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::unparseable(command, "empty response envelope")),
    }
}

/// Map a response item to its payload or a classified error
pub fn classify(command: &str, item: ResponseItem) -> Result<Value> {
    if let Some(error) = item.error {
        let code = if error.rsp_code != 0 { error.rsp_code } else { item.code };
        return Err(ApiError::from_device_code(
            command,
            code,
            error.detail.as_deref(),
        ));
    }

    if item.code != 0 {
        return Err(ApiError::from_device_code(command, item.code, None));
    }

    Ok(item.value.unwrap_or_else(|| Value::Object(Map::new())))
}

/// Parse and classify in one step
pub fn decode(command: &str, body: &[u8]) -> Result<Value> {
    classify(command, parse(command, body)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::UNPARSEABLE_RESPONSE;

    #[test]
    fn test_request_body_with_params() {
        let body = request_body("GetMdState", 0, Some(&json!({"channel": 0})));
        assert_eq!(
            body,
            json!([{"cmd": "GetMdState", "action": 0, "param": {"channel": 0}}])
        );
    }

    #[test]
    fn test_request_body_without_params() {
        let body = request_body("Logout", 0, None);
        assert_eq!(body, json!([{"cmd": "Logout", "action": 0}]));
    }

    #[test]
    fn test_decode_success_value() {
        let body = br#"[{"cmd":"GetMdState","code":0,"value":{"channel":0,"state":1}}]"#;
        let value = decode("GetMdState", body).unwrap();
        assert_eq!(value["state"], 1);
    }

    #[test]
    fn test_decode_success_without_value() {
        let body = br#"[{"cmd":"SetIrLights","code":0}]"#;
        assert_eq!(decode("SetIrLights", body).unwrap(), json!({}));
    }

    #[test]
    fn test_decode_bare_object() {
        let body = br#"{"cmd":"GetTime","code":0,"value":{"Time":{"year":2026}}}"#;
        let value = decode("GetTime", body).unwrap();
        assert_eq!(value["Time"]["year"], 2026);
    }

    #[test]
    fn test_decode_error_object() {
        let body = br#"[{"cmd":"GetPtzPreset","code":0,"error":{"detail":"not support","rspCode":-9}}]"#;
        let err = decode("GetPtzPreset", body).unwrap_err();
        assert!(matches!(err, ApiError::Unsupported(_)));
    }

    #[test]
    fn test_decode_nonzero_code_without_error_object() {
        let body = br#"[{"cmd":"GetDevInfo","code":-6}]"#;
        let err = decode("GetDevInfo", body).unwrap_err();
        assert!(err.is_auth());
    }

    #[test]
    fn test_decode_html_is_unparseable() {
        let err = decode("GetDevInfo", b"<html>502 Bad Gateway</html>").unwrap_err();
        match err {
            ApiError::DeviceError { code, message, .. } => {
                assert_eq!(code, UNPARSEABLE_RESPONSE);
                assert!(message.starts_with("unparseable response"));
            }
            other => panic!("Expected DeviceError, got {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty_array_is_unparseable() {
        let err = decode("GetDevInfo", b"[]").unwrap_err();
        assert!(matches!(
            err,
            ApiError::DeviceError { code: UNPARSEABLE_RESPONSE, .. }
        ));
    }
}
