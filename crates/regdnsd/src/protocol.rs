//! Wire types of the stdio protocol
//!
//! One JSON object per line in each direction:
//!
//! ```text
//! -> {"id": 1, "method": "create", "params": {"type": "regdns:index:DnsRecord", "properties": {...}}}
//! <- {"id": 1, "result": {"id": "981", "properties": {...}}}
//! <- {"id": 2, "error": "API request failed with status 500: server error"}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Request methods understood by the daemon
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Method {
    Schema,
    Configure,
    Check,
    Diff,
    Create,
    Update,
    Delete,
    Read,
    /// Abort every in-flight resource operation
    Cancel,
}

#[derive(Debug, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Value,
    pub method: Method,
    #[serde(default)]
    pub params: Value,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct Response {
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Response {
    pub fn ok(id: Value, result: Value) -> Self {
        Self {
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Value, error: impl ToString) -> Self {
        Self {
            id,
            result: None,
            error: Some(error.to_string()),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigureParams {
    pub api_token: Option<String>,
    pub private_key: Option<String>,
    pub api_url: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CheckParams {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub news: Value,
}

#[derive(Debug, Deserialize)]
pub struct DiffParams {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub olds: Value,
    #[serde(default)]
    pub news: Value,
}

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub properties: Value,
}

#[derive(Debug, Deserialize)]
pub struct UpdateParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub olds: Value,
    #[serde(default)]
    pub news: Value,
}

/// Shared by `delete` and `read`
#[derive(Debug, Deserialize)]
pub struct InstanceParams {
    #[serde(rename = "type")]
    pub kind: String,
    pub id: String,
    #[serde(default)]
    pub properties: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_requests() {
        let request: Request = serde_json::from_str(
            r#"{"id": 4, "method": "update", "params": {"type": "t", "id": "r1", "news": {"ttl": 3600}}}"#,
        )
        .unwrap();
        assert_eq!(request.method, Method::Update);

        let params: UpdateParams = serde_json::from_value(request.params).unwrap();
        assert_eq!(params.id, "r1");
        assert!(params.olds.is_null());

        let bare: Request = serde_json::from_str(r#"{"method": "schema"}"#).unwrap();
        assert!(bare.id.is_null());
        assert!(serde_json::from_str::<Request>(r#"{"method": "explode"}"#).is_err());
    }

    #[test]
    fn responses_carry_result_or_error() {
        assert_eq!(
            serde_json::to_value(Response::ok(json!(1), json!({}))).unwrap(),
            json!({"id": 1, "result": {}})
        );
        assert_eq!(
            serde_json::to_value(Response::err(json!("a"), "boom")).unwrap(),
            json!({"id": "a", "error": "boom"})
        );
    }

    #[test]
    fn configure_params_use_camel_case() {
        let params: ConfigureParams =
            serde_json::from_value(json!({"privateKey": "ab", "apiUrl": "http://x"})).unwrap();
        assert_eq!(params.private_key.as_deref(), Some("ab"));
        assert_eq!(params.api_url.as_deref(), Some("http://x"));
        assert!(params.api_token.is_none());
    }
}
