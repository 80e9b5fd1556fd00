//! Wire types for the JSON-RPC 1.1 envelope and the credential files.
//!
//! # Design
//! The error payload is the one place the protocol is genuinely messy: the
//! service emits JSON-RPC 2.0-style `data` or 1.1-style `error` for the
//! same diagnostic field depending on its age. Both are accepted here and
//! reconciled into [`ServerError`] in one step, so the rest of the crate
//! only ever sees the merged shape.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ServerError;

/// Request envelope sent for every call.
#[derive(Debug, Clone, Serialize)]
pub struct RpcRequest {
    pub method: String,
    pub params: Vec<Value>,
    pub version: String,
    pub id: String,
}

/// Response envelope. A success carries `result`; a 500 carries `error`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct RpcResponse {
    pub result: Option<Value>,
    pub error: Option<RpcErrorPayload>,
}

/// Loosely-typed error object as it appears on the wire.
///
/// Every field is optional because old service builds omit some of them;
/// `into_server_error` supplies the `Unknown`/`0`/empty defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RpcErrorPayload {
    pub name: Option<String>,
    pub code: Option<i64>,
    pub message: Option<String>,
    pub data: Option<Value>,
    pub error: Option<Value>,
}

impl RpcErrorPayload {
    /// Reconcile the two wire shapes into a single [`ServerError`].
    /// `data` wins when both fields are present.
    pub fn into_server_error(self) -> ServerError {
        let data = self
            .data
            .or(self.error)
            .map(value_to_string)
            .unwrap_or_default();
        ServerError {
            name: self.name.unwrap_or_else(|| "Unknown".to_string()),
            code: self.code.unwrap_or(0),
            message: self.message.unwrap_or_default(),
            data,
        }
    }
}

/// Credentials read from an on-disk auth file (INI or flat JSON).
///
/// Only `token` and the `user_id`/`password` pair participate in
/// resolution; the remaining keys are part of the file format and are
/// preserved for callers that want them.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AuthData {
    pub user_id: Option<String>,
    pub token: Option<String>,
    pub client_secret: Option<String>,
    pub keyfile: Option<String>,
    pub keyfile_passphrase: Option<String>,
    pub password: Option<String>,
}

/// Success body of the goauth token exchange.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
}

fn value_to_string(value: Value) -> String {
    match value {
        Value::String(s) => s,
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_envelope_serializes_all_fields() {
        let request = RpcRequest {
            method: "ProbModelSEED.list_models".to_string(),
            params: vec![json!({"path": "/alice/models"})],
            version: "1.1".to_string(),
            id: "5488135039273248".to_string(),
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["method"], "ProbModelSEED.list_models");
        assert_eq!(value["params"][0]["path"], "/alice/models");
        assert_eq!(value["version"], "1.1");
        assert_eq!(value["id"], "5488135039273248");
    }

    #[test]
    fn error_payload_data_style() {
        let payload: RpcErrorPayload = serde_json::from_str(
            r#"{"name": "Bad", "code": 500, "message": "oops", "data": "trace"}"#,
        )
        .unwrap();
        let err = payload.into_server_error();
        assert_eq!(err.name, "Bad");
        assert_eq!(err.code, 500);
        assert_eq!(err.message, "oops");
        assert_eq!(err.data, "trace");
    }

    #[test]
    fn error_payload_error_style() {
        let payload: RpcErrorPayload = serde_json::from_str(
            r#"{"name": "Bad", "code": 500, "message": "oops", "error": "trace"}"#,
        )
        .unwrap();
        assert_eq!(payload.into_server_error().data, "trace");
    }

    #[test]
    fn error_payload_data_wins_over_error() {
        let payload: RpcErrorPayload = serde_json::from_str(
            r#"{"name": "Bad", "code": 1, "message": "m", "data": "new", "error": "old"}"#,
        )
        .unwrap();
        assert_eq!(payload.into_server_error().data, "new");
    }

    #[test]
    fn error_payload_missing_fields_get_defaults() {
        let payload: RpcErrorPayload = serde_json::from_str("{}").unwrap();
        let err = payload.into_server_error();
        assert_eq!(err.name, "Unknown");
        assert_eq!(err.code, 0);
        assert_eq!(err.message, "");
        assert_eq!(err.data, "");
    }

    #[test]
    fn error_payload_structured_data_is_stringified() {
        let payload: RpcErrorPayload =
            serde_json::from_str(r#"{"name": "Bad", "code": 1, "message": "m", "data": {"k": 1}}"#)
                .unwrap();
        assert_eq!(payload.into_server_error().data, r#"{"k":1}"#);
    }

    #[test]
    fn auth_data_deserializes_partial_json() {
        let data: AuthData = serde_json::from_str(r#"{"token": "T", "extra": "ignored"}"#).unwrap();
        assert_eq!(data.token.as_deref(), Some("T"));
        assert!(data.user_id.is_none());
        assert!(data.password.is_none());
    }

    #[test]
    fn response_envelope_defaults_when_fields_absent() {
        let response: RpcResponse = serde_json::from_str("{}").unwrap();
        assert!(response.result.is_none());
        assert!(response.error.is_none());
    }

    #[test]
    fn response_envelope_null_result_reads_as_absent() {
        let response: RpcResponse = serde_json::from_str(r#"{"result": null}"#).unwrap();
        assert!(response.result.is_none());
    }
}
