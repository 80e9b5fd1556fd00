//! Test double for the ProbModelSEED service: a JSON-RPC 1.1 endpoint plus
//! the goauth token-exchange endpoint, backed by an in-memory model map.
//!
//! Every success body wraps the return value in a single-element `result`
//! list, matching the live service's convention. Errors deliberately use
//! both historical payload shapes: protocol-level failures carry the
//! 1.1-style `error` field, while method-level failures carry the
//! 2.0-style `data` field, so clients must accept either.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::RwLock};

/// Credentials the token endpoint accepts.
pub const TEST_USER: &str = "pmsuser";
pub const TEST_PASSWORD: &str = "pmspass";

/// Token issued by the token endpoint and required on every RPC call.
pub const TEST_TOKEN: &str = "un=pmsuser|tokenid=mock|sig=deadbeef";

const METHOD_PREFIX: &str = "ProbModelSEED.";

/// A reconstructed metabolic model as the mock reports it.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelSummary {
    pub id: String,
    pub name: String,
    pub genome_ref: String,
    pub num_reactions: u64,
}

/// Incoming JSON-RPC 1.1 envelope.
#[derive(Debug, Deserialize)]
pub struct RpcEnvelope {
    pub method: String,
    #[serde(default)]
    pub params: Vec<Value>,
    pub version: String,
    #[serde(default)]
    pub id: String,
}

pub type Db = Arc<RwLock<HashMap<String, ModelSummary>>>;

pub fn app() -> Router {
    let db: Db = Arc::new(RwLock::new(HashMap::new()));
    Router::new()
        .route("/", post(rpc_call))
        .route("/goauth/token", get(issue_token))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

enum ErrorField {
    Data,
    Error,
}

fn rpc_result<T: Serialize>(id: &str, value: T) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({"id": id, "version": "1.1", "result": [value]})),
    )
}

fn rpc_error(name: &str, code: i64, message: &str, field: ErrorField) -> (StatusCode, Json<Value>) {
    let mut error = json!({"name": name, "code": code, "message": message});
    let diagnostic = json!(format!("mock traceback: {message}"));
    match field {
        ErrorField::Data => error["data"] = diagnostic,
        ErrorField::Error => error["error"] = diagnostic,
    }
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({"version": "1.1", "error": error})),
    )
}

async fn rpc_call(
    State(db): State<Db>,
    headers: HeaderMap,
    body: String,
) -> (StatusCode, Json<Value>) {
    let Ok(envelope) = serde_json::from_str::<RpcEnvelope>(&body) else {
        return rpc_error("JSONRPCError", -32700, "Parse error", ErrorField::Error);
    };
    if envelope.version != "1.1" {
        return rpc_error(
            "JSONRPCError",
            -32600,
            "Invalid request: unsupported version",
            ErrorField::Error,
        );
    }

    let authorized = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value == TEST_TOKEN);
    if !authorized {
        return rpc_error("InvalidToken", 401, "Authentication required", ErrorField::Error);
    }

    let Some(method) = envelope.method.strip_prefix(METHOD_PREFIX) else {
        return rpc_error(
            "JSONRPCError",
            -32601,
            &format!("Method {} not found", envelope.method),
            ErrorField::Error,
        );
    };
    let method = method.to_string();
    let id = envelope.id;
    let input = envelope.params.into_iter().next().unwrap_or(Value::Null);

    match method.as_str() {
        "ModelReconstruction" => {
            let Some(genome) = input.get("genome").and_then(Value::as_str) else {
                return rpc_error(
                    "JSONRPCError",
                    -32602,
                    "Invalid params: genome is required",
                    ErrorField::Data,
                );
            };
            let model_id = input
                .get("output_file")
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_else(|| format!("{genome}.fbamodel"));
            let model = ModelSummary {
                id: model_id.clone(),
                name: genome.to_string(),
                genome_ref: format!("{genome}/genome"),
                num_reactions: 1214,
            };
            db.write().await.insert(model_id, model.clone());
            rpc_result(&id, model)
        }
        "list_models" => {
            let models = db.read().await;
            let mut list: Vec<&ModelSummary> = models.values().collect();
            list.sort_by(|a, b| a.id.cmp(&b.id));
            rpc_result(&id, list)
        }
        "get_model" => {
            let Some(model_id) = input.get("model").and_then(Value::as_str) else {
                return rpc_error(
                    "JSONRPCError",
                    -32602,
                    "Invalid params: model is required",
                    ErrorField::Data,
                );
            };
            match db.read().await.get(model_id) {
                Some(model) => rpc_result(&id, model),
                None => rpc_error(
                    "ObjectNotFound",
                    -32500,
                    &format!("Model {model_id} not found"),
                    ErrorField::Data,
                ),
            }
        }
        "delete_model" => {
            let Some(model_id) = input.get("model").and_then(Value::as_str) else {
                return rpc_error(
                    "JSONRPCError",
                    -32602,
                    "Invalid params: model is required",
                    ErrorField::Data,
                );
            };
            match db.write().await.remove(model_id) {
                Some(model) => rpc_result(&id, model),
                None => rpc_error(
                    "ObjectNotFound",
                    -32500,
                    &format!("Model {model_id} not found"),
                    ErrorField::Data,
                ),
            }
        }
        "save_feature_function" => rpc_result(&id, Value::Null),
        other => rpc_error(
            "JSONRPCError",
            -32601,
            &format!("Method {METHOD_PREFIX}{other} not found"),
            ErrorField::Error,
        ),
    }
}

async fn issue_token(headers: HeaderMap) -> (StatusCode, Json<Value>) {
    let credentials = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Basic "))
        .and_then(|encoded| STANDARD.decode(encoded.trim()).ok())
        .and_then(|raw| String::from_utf8(raw).ok());

    match credentials.as_deref().and_then(|c| c.split_once(':')) {
        Some((user, password)) if user == TEST_USER && password == TEST_PASSWORD => (
            StatusCode::OK,
            Json(json!({"access_token": TEST_TOKEN, "token_type": "Bearer"})),
        ),
        _ => (
            StatusCode::FORBIDDEN,
            Json(json!({"message": "invalid user_id/password"})),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_summary_serializes_to_json() {
        let model = ModelSummary {
            id: "g1.fbamodel".to_string(),
            name: "g1".to_string(),
            genome_ref: "g1/genome".to_string(),
            num_reactions: 1214,
        };
        let json = serde_json::to_value(&model).unwrap();
        assert_eq!(json["id"], "g1.fbamodel");
        assert_eq!(json["genome_ref"], "g1/genome");
        assert_eq!(json["num_reactions"], 1214);
    }

    #[test]
    fn envelope_defaults_params_and_id() {
        let envelope: RpcEnvelope =
            serde_json::from_str(r#"{"method": "ProbModelSEED.list_models", "version": "1.1"}"#)
                .unwrap();
        assert!(envelope.params.is_empty());
        assert!(envelope.id.is_empty());
    }

    #[test]
    fn envelope_rejects_missing_version() {
        let result: Result<RpcEnvelope, _> =
            serde_json::from_str(r#"{"method": "ProbModelSEED.list_models"}"#);
        assert!(result.is_err());
    }
}
