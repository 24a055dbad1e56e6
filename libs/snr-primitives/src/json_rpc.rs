use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use std::str::FromStr;

use crate::error::map_json_rpc_error_code_to_str;

#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq, Hash)]
#[serde(untagged)]
pub enum JsonRpcId {
    String(String),
    Number(i64),
    None,
}

impl PartialEq<serde_json::Value> for JsonRpcId {
    fn eq(&self, value: &serde_json::Value) -> bool {
        match self {
            Self::String(s) => value == s,
            Self::Number(n) => value == n,
            Self::None => value == &serde_json::Value::Null,
        }
    }
}

impl PartialEq<&str> for JsonRpcId {
    fn eq(&self, value: &&str) -> bool {
        match self {
            Self::String(s) => s == value,
            Self::Number(_) => false,
            Self::None => false,
        }
    }
}

impl From<&str> for JsonRpcId {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl FromStr for JsonRpcId {
    type Err = anyhow::Error;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Ok(Self::String(value.to_string()))
    }
}

/// A request sent by the host. The host correlates the response
/// through the `id`; `params` may be positional or named.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JsonRpcRequest<I> {
    pub jsonrpc: String,
    pub id: JsonRpcId,
    pub method: String,
    pub params: I,
}

/// A fire-and-forget event from the host. No `id`, no response.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct JsonRpcNotification<I> {
    pub jsonrpc: String,
    pub method: String,
    pub params: I,
}

impl<I> JsonRpcNotification<I>
where
    I: Serialize,
{
    pub fn new(method: &str, params: I) -> Self {
        Self {
            jsonrpc: String::from("2.0"),
            method: method.to_string(),
            params,
        }
    }
}

/// Classification of a single inbound JSON document.
///
/// The host multiplexes requests and notifications over the same stream.
/// A document carrying a non-null `id` expects exactly one response;
/// a document without one must never be answered.
#[derive(Debug, Clone)]
pub enum InboundMessage {
    Request(JsonRpcRequest<serde_json::Value>),
    Notification(JsonRpcNotification<serde_json::Value>),
}

impl InboundMessage {
    pub fn classify(value: serde_json::Value) -> Result<InboundMessage> {
        let has_id = match value.get("id") {
            Some(serde_json::Value::Null) | None => false,
            Some(_) => true,
        };

        if value.get("method").is_none() {
            return Err(anyhow!("Inbound message has no 'method' field"));
        }

        if has_id {
            let request = serde_json::from_value::<JsonRpcRequest<serde_json::Value>>(value)?;
            Ok(InboundMessage::Request(request))
        } else {
            let notification =
                serde_json::from_value::<JsonRpcNotification<serde_json::Value>>(value)?;
            Ok(InboundMessage::Notification(notification))
        }
    }

    pub fn method(&self) -> &str {
        match self {
            InboundMessage::Request(r) => &r.method,
            InboundMessage::Notification(n) => &n.method,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponseSuccess<O> {
    pub id: JsonRpcId,
    pub result: O,
    pub jsonrpc: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponseFailure {
    pub id: JsonRpcId,
    pub error: ErrorData,
    pub jsonrpc: String,
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(untagged)]
pub enum JsonRpcResponse<O> {
    Error(JsonRpcResponseFailure),
    Ok(JsonRpcResponseSuccess<O>),
}

impl<O> JsonRpcResponse<O> {
    pub fn success(id: JsonRpcId, output: O) -> Self {
        JsonRpcResponse::Ok(JsonRpcResponseSuccess {
            id,
            result: output,
            jsonrpc: String::from("2.0"),
        })
    }

    pub fn error(id: JsonRpcId, error: ErrorData) -> Self {
        JsonRpcResponse::Error(JsonRpcResponseFailure {
            id,
            error,
            jsonrpc: String::from("2.0"),
        })
    }

    pub fn jsonrpc(&self) -> &str {
        match self {
            JsonRpcResponse::Ok(j) => &j.jsonrpc,
            JsonRpcResponse::Error(j) => &j.jsonrpc,
        }
    }

    pub fn id(&self) -> &JsonRpcId {
        match self {
            JsonRpcResponse::Ok(j) => &j.id,
            JsonRpcResponse::Error(j) => &j.id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorData {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl ErrorData {
    pub fn code_str(&self) -> &'static str {
        map_json_rpc_error_code_to_str(self.code)
    }

    pub fn parse_error(message: String) -> Self {
        Self {
            code: -32700,
            message,
            data: None,
        }
    }

    pub fn invalid_request(message: String) -> Self {
        Self {
            code: -32600,
            message,
            data: None,
        }
    }

    pub fn unknown_method(method: &str) -> Self {
        Self {
            code: -32601,
            message: format!("Unknown method '{}'", method),
            data: None,
        }
    }

    pub fn invalid_params(message: String) -> Self {
        Self {
            code: -32602,
            message,
            data: None,
        }
    }

    pub fn internal_error(message: String) -> Self {
        Self {
            code: -32603,
            message,
            data: None,
        }
    }

    /// A failure inside a registered method handler, as opposed to a
    /// violation of the protocol itself.
    pub fn method_error(message: String) -> Self {
        Self {
            code: -32000,
            message,
            data: None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn classify_request_with_string_id() {
        let value = serde_json::json!({
            "jsonrpc": "2.0",
            "id": "getmanifest",
            "method": "getmanifest",
            "params": []
        });

        match InboundMessage::classify(value).unwrap() {
            InboundMessage::Request(r) => {
                assert_eq!(r.id, JsonRpcId::String("getmanifest".to_string()));
                assert_eq!(r.method, "getmanifest");
            }
            InboundMessage::Notification(_) => panic!("A message with an id is a request"),
        }
    }

    #[test]
    fn classify_notification_without_id() {
        let value = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "sendpay_success",
            "params": {"sendpay_success": {}}
        });

        match InboundMessage::classify(value).unwrap() {
            InboundMessage::Notification(n) => assert_eq!(n.method, "sendpay_success"),
            InboundMessage::Request(_) => panic!("A message without an id is a notification"),
        }
    }

    #[test]
    fn classify_null_id_as_notification() {
        let value = serde_json::json!({
            "jsonrpc": "2.0",
            "id": null,
            "method": "shutdown",
            "params": {}
        });

        assert!(matches!(
            InboundMessage::classify(value).unwrap(),
            InboundMessage::Notification(_)
        ));
    }

    #[test]
    fn classify_rejects_missing_method() {
        let value = serde_json::json!({"jsonrpc": "2.0", "id": 1});
        assert!(InboundMessage::classify(value).is_err());
    }

    #[test]
    fn serialize_json_rpc_response_success() {
        let response: JsonRpcResponse<String> =
            JsonRpcResponse::success("abc".into(), String::from("result_data"));

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value.get("jsonrpc").unwrap(), "2.0");
        assert_eq!(value.get("id").unwrap(), "abc");
        assert_eq!(value.get("result").unwrap(), "result_data");
    }

    #[test]
    fn serialize_json_rpc_response_error() {
        let response: JsonRpcResponse<()> = JsonRpcResponse::error(
            "abc".into(),
            ErrorData::parse_error(String::from("Failed to parse data")),
        );

        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value.get("jsonrpc").unwrap(), "2.0");
        assert_eq!(value.get("id").unwrap(), "abc");
        assert_eq!(value.get("error").unwrap().get("code").unwrap(), -32700);
        assert_eq!(
            value.get("error").unwrap().get("message").unwrap(),
            "Failed to parse data"
        );
    }

    #[test]
    fn error_code_str() {
        let error = ErrorData::unknown_method("snr-typo");
        assert_eq!(error.code_str(), "method_not_found");
    }

    #[test]
    fn serialize_json_rpc_id() {
        let id_str = JsonRpcId::String("id_string".to_string());
        let id_i64 = JsonRpcId::Number(-12);
        let id_null = JsonRpcId::None;

        assert_eq!(serde_json::json!(id_str), serde_json::json!("id_string"));
        assert_eq!(serde_json::json!(id_i64), serde_json::json!(-12));
        assert_eq!(serde_json::json!(id_null), serde_json::json!(null))
    }
}
