//! Synchronous client for the ProbModelSEED service.
//!
//! # Overview
//! `ModelSeedClient` holds the endpoint, the resolved authorization header,
//! and a configured HTTP agent; all three are immutable after `build`.
//! Every call goes through one generic `invoke` primitive: build the
//! JSON-RPC 1.1 envelope, one blocking POST, map the response. The named
//! service methods are pass-throughs generated from the wire-method list.
//!
//! # Design
//! - Each call is split into `build_call` (produces an `HttpRequest`) and
//!   `parse_call` (consumes an `HttpResponse`), with `invoke` composing
//!   them through the blocking transport. The build/parse halves never
//!   touch the network, so envelope and error-mapping logic is testable
//!   without a server.
//! - Credential resolution runs exactly once, inside `build`.
//! - No retries and no connection pooling at this layer; callers needing
//!   parallelism use multiple client instances.

use std::path::PathBuf;
use std::time::Duration;

use serde_json::Value;

use crate::auth::{self, CredentialSources};
use crate::error::{ClientError, ServerError};
use crate::http::{self, HttpMethod, HttpRequest, HttpResponse};
use crate::types::{RpcRequest, RpcResponse};

/// Wire namespace prepended to every method name.
pub const SERVICE_NAME: &str = "ProbModelSEED";

const PROTOCOL_VERSION: &str = "1.1";
const DEFAULT_TIMEOUT_SECS: u64 = 1800;

/// Connection and credential configuration for [`ModelSeedClient`].
///
/// Environment-derived defaults (pre-issued token, config file locations)
/// are captured when the builder is created; every one of them can be
/// overridden before `build`.
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    url: String,
    timeout: Duration,
    accept_invalid_certs: bool,
    sources: CredentialSources,
}

impl ClientBuilder {
    pub fn new(url: impl Into<String>) -> Self {
        ClientBuilder {
            url: url.into(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            accept_invalid_certs: false,
            sources: CredentialSources::from_env(),
        }
    }

    /// Round-trip timeout in whole seconds. Values below 1 are rejected at
    /// `build` time.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }

    /// Use this token verbatim, skipping every other credential source.
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.sources.token = Some(token.into());
        self
    }

    /// Exchange this user_id/password pair for a token during `build`.
    pub fn credentials(
        mut self,
        user_id: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.sources.user_id = Some(user_id.into());
        self.sources.password = Some(password.into());
        self
    }

    /// Override the pre-issued token normally taken from `KB_AUTH_TOKEN`.
    pub fn env_token(mut self, token: Option<String>) -> Self {
        self.sources.env_token = token;
        self
    }

    /// Override the INI config file location, or disable it with `None`.
    pub fn ini_file(mut self, path: Option<PathBuf>) -> Self {
        self.sources.ini_file = path;
        self
    }

    /// Override the rc file location, or disable it with `None`.
    pub fn rc_file(mut self, path: Option<PathBuf>) -> Self {
        self.sources.rc_file = path;
        self
    }

    /// Skip both file-based credential sources.
    pub fn ignore_auth_files(mut self, ignore: bool) -> Self {
        self.sources.ignore_files = ignore;
        self
    }

    /// Override the token exchange endpoint.
    pub fn auth_service_url(mut self, url: impl Into<String>) -> Self {
        self.sources.auth_service_url = url.into();
        self
    }

    /// Disable TLS certificate verification for every request this client
    /// makes, including the token exchange.
    pub fn danger_accept_invalid_certs(mut self, accept: bool) -> Self {
        self.accept_invalid_certs = accept;
        self
    }

    /// Validate the connection config, resolve credentials (at most one
    /// token-exchange round trip), and produce an immutable client.
    pub fn build(self) -> Result<ModelSeedClient, ClientError> {
        validate_url(&self.url)?;
        if self.timeout < Duration::from_secs(1) {
            return Err(ClientError::Configuration(
                "timeout value must be at least 1 second".to_string(),
            ));
        }
        let agent = http::build_agent(self.timeout, self.accept_invalid_certs);
        let authorization = auth::resolve(&self.sources, &agent)?;
        Ok(ModelSeedClient {
            url: self.url,
            authorization,
            agent,
        })
    }
}

fn validate_url(url: &str) -> Result<(), ClientError> {
    match url.split_once("://") {
        Some((scheme, _))
            if scheme.eq_ignore_ascii_case("http") || scheme.eq_ignore_ascii_case("https") => {
            Ok(())
        }
        _ => Err(ClientError::Configuration(format!(
            "{url} isn't a valid http url"
        ))),
    }
}

/// Blocking client for the ProbModelSEED service. One instance, one
/// resolved authorization header, no shared mutable state.
#[derive(Clone)]
pub struct ModelSeedClient {
    url: String,
    authorization: Option<String>,
    agent: ureq::Agent,
}

impl std::fmt::Debug for ModelSeedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelSeedClient")
            .field("url", &self.url)
            .field("authenticated", &self.authorization.is_some())
            .finish_non_exhaustive()
    }
}

macro_rules! service_methods {
    ($($name:ident => $wire:literal),+ $(,)?) => {
        $(
            pub fn $name(&self, input: Value) -> Result<Value, ClientError> {
                let result = self.invoke($wire, vec![input])?;
                first_element(result)
            }
        )+
    };
}

impl ModelSeedClient {
    pub fn builder(url: impl Into<String>) -> ClientBuilder {
        ClientBuilder::new(url)
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// The resolved authorization header value, or `None` for an
    /// unauthenticated client.
    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    /// Call `method` (unqualified; the service namespace is added here)
    /// with an ordered parameter list and return the raw `result` value.
    pub fn invoke(&self, method: &str, params: Vec<Value>) -> Result<Value, ClientError> {
        let request = self.build_call(method, params)?;
        let response = http::execute(&self.agent, &request)?;
        self.parse_call(response)
    }

    /// Build the POST request for one call: fresh envelope, fresh id.
    pub fn build_call(&self, method: &str, params: Vec<Value>) -> Result<HttpRequest, ClientError> {
        let envelope = RpcRequest {
            method: format!("{SERVICE_NAME}.{method}"),
            params,
            version: PROTOCOL_VERSION.to_string(),
            id: request_id(),
        };
        let body = serde_json::to_string(&envelope)
            .map_err(|err| ClientError::Serialization(err.to_string()))?;

        let mut headers = vec![(
            "content-type".to_string(),
            "application/json".to_string(),
        )];
        if let Some(authorization) = &self.authorization {
            headers.push(("authorization".to_string(), authorization.clone()));
        }
        Ok(HttpRequest {
            method: HttpMethod::Post,
            url: self.url.clone(),
            headers,
            body: Some(body),
        })
    }

    /// Map a raw HTTP response onto the protocol's success/error contract.
    ///
    /// 500 with a parseable JSON `error` body becomes a structured
    /// [`ServerError`]; 500 without one becomes the `Unknown` variant with
    /// the raw body as message. Any other non-200 status is an HTTP-level
    /// failure. A 200 body missing the `result` field (or unparseable, or
    /// with `result: null`) is also the `Unknown` variant.
    pub fn parse_call(&self, response: HttpResponse) -> Result<Value, ClientError> {
        if response.status == 500 {
            let is_json = response
                .content_type()
                .is_some_and(|ct| ct.starts_with("application/json"));
            if is_json {
                if let Ok(RpcResponse {
                    error: Some(payload),
                    ..
                }) = serde_json::from_str::<RpcResponse>(&response.body)
                {
                    return Err(ClientError::Server(payload.into_server_error()));
                }
            }
            return Err(ClientError::Server(ServerError {
                name: "Unknown".to_string(),
                code: 0,
                message: response.body,
                data: String::new(),
            }));
        }
        if response.status != 200 {
            return Err(ClientError::Http {
                status: response.status,
                body: response.body,
            });
        }

        // A 200 body that is not valid JSON is handled like one without a
        // result field.
        let parsed: RpcResponse = serde_json::from_str(&response.body).unwrap_or_default();
        match parsed.result {
            Some(result) => Ok(result),
            None => Err(ClientError::Server(ServerError {
                name: "Unknown".to_string(),
                code: 0,
                message: "An unknown server error occurred".to_string(),
                data: String::new(),
            })),
        }
    }

    // Generated service surface. Each method wraps its single input object
    // in the params list and unwraps element 0 of the result list; wire
    // names keep the service's original casing.
    service_methods! {
        list_gapfill_solutions => "list_gapfill_solutions",
        manage_gapfill_solutions => "manage_gapfill_solutions",
        list_fba_studies => "list_fba_studies",
        delete_fba_studies => "delete_fba_studies",
        export_model => "export_model",
        export_media => "export_media",
        get_model => "get_model",
        delete_model => "delete_model",
        list_models => "list_models",
        copy_model => "copy_model",
        copy_genome => "copy_genome",
        list_model_edits => "list_model_edits",
        manage_model_edits => "manage_model_edits",
        get_feature => "get_feature",
        compare_regions => "compare_regions",
        plant_annotation_overview => "plant_annotation_overview",
        create_genome_from_shock => "create_genome_from_shock",
        plant_pipeline => "plant_pipeline",
        annotate_plant_genome => "annotate_plant_genome",
        create_featurevalues_from_shock => "create_featurevalues_from_shock",
        model_reconstruction => "ModelReconstruction",
        flux_balance_analysis => "FluxBalanceAnalysis",
        gapfill_model => "GapfillModel",
        merge_models => "MergeModels",
        import_kbase_model => "ImportKBaseModel",
        check_jobs => "CheckJobs",
    }

    /// Fire-and-forget update: performs the full call, including the
    /// result-presence check, but discards the payload.
    pub fn save_feature_function(&self, input: Value) -> Result<(), ClientError> {
        self.invoke("save_feature_function", vec![input])?;
        Ok(())
    }
}

/// Unwrap the server convention of returning every value inside a
/// single-element list.
fn first_element(result: Value) -> Result<Value, ClientError> {
    match result {
        Value::Array(mut items) if !items.is_empty() => Ok(items.remove(0)),
        _ => Err(ClientError::Server(ServerError {
            name: "Unknown".to_string(),
            code: 0,
            message: "server result was not a one-element list".to_string(),
            data: String::new(),
        })),
    }
}

/// Request id inherited from the service's other generated clients: the
/// decimal digits of a random fraction. Ids are decorative protocol
/// compliance only; there is no uniqueness or atomicity contract.
fn request_id() -> String {
    let fraction: f64 = rand::random();
    let formatted = fraction.to_string();
    match formatted.strip_prefix("0.") {
        Some(digits) => digits.to_string(),
        None => formatted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Builder with every ambient credential source disabled, so tests
    /// never depend on the host environment or home directory.
    fn hermetic(url: &str) -> ClientBuilder {
        ClientBuilder::new(url)
            .env_token(None)
            .ini_file(None)
            .rc_file(None)
            .ignore_auth_files(true)
    }

    fn client() -> ModelSeedClient {
        hermetic("https://p3.theseed.org/services/ProbModelSEED")
            .token("TOK")
            .build()
            .unwrap()
    }

    fn json_response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string(),
        }
    }

    // --- construction ---

    #[test]
    fn http_and_https_urls_are_accepted() {
        assert!(hermetic("http://localhost:3000").build().is_ok());
        assert!(hermetic("https://p3.theseed.org/services/ProbModelSEED").build().is_ok());
    }

    #[test]
    fn non_http_scheme_is_rejected() {
        let err = hermetic("ftp://example.org/rpc").build().unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn missing_scheme_is_rejected() {
        let err = hermetic("localhost:3000").build().unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let err = hermetic("http://localhost:3000").timeout_secs(0).build().unwrap_err();
        assert!(matches!(err, ClientError::Configuration(_)));
    }

    #[test]
    fn one_second_timeout_is_accepted() {
        assert!(hermetic("http://localhost:3000").timeout_secs(1).build().is_ok());
    }

    // --- credential precedence (no server is running in unit tests, so a
    // build that succeeds proves no exchange round trip was attempted) ---

    #[test]
    fn explicit_token_is_used_verbatim() {
        let client = hermetic("http://localhost:3000").token("TOK").build().unwrap();
        assert_eq!(client.authorization(), Some("TOK"));
    }

    #[test]
    fn explicit_token_wins_over_env_token() {
        let client = hermetic("http://localhost:3000")
            .token("TOK")
            .env_token(Some("ENVTOK".to_string()))
            .build()
            .unwrap();
        assert_eq!(client.authorization(), Some("TOK"));
    }

    #[test]
    fn env_token_used_when_no_explicit_credentials() {
        let client = hermetic("http://localhost:3000")
            .env_token(Some("ENVTOK".to_string()))
            .build()
            .unwrap();
        assert_eq!(client.authorization(), Some("ENVTOK"));
    }

    #[test]
    fn unauthenticated_client_builds_without_header() {
        let client = hermetic("http://localhost:3000").build().unwrap();
        assert!(client.authorization().is_none());
    }

    // --- envelope building ---

    #[test]
    fn build_call_produces_versioned_envelope() {
        let request = client()
            .build_call("list_models", vec![json!({"path": "/alice/models"})])
            .unwrap();
        assert_eq!(request.method, HttpMethod::Post);
        assert_eq!(request.url, "https://p3.theseed.org/services/ProbModelSEED");

        let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["method"], "ProbModelSEED.list_models");
        assert_eq!(body["version"], "1.1");
        assert_eq!(body["params"], json!([{"path": "/alice/models"}]));

        let id = body["id"].as_str().unwrap();
        assert!(!id.is_empty());
        assert!(id.chars().all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn build_call_sets_authorization_header() {
        let request = client().build_call("list_models", Vec::new()).unwrap();
        assert!(request
            .headers
            .contains(&("authorization".to_string(), "TOK".to_string())));
        assert!(request
            .headers
            .contains(&("content-type".to_string(), "application/json".to_string())));
    }

    #[test]
    fn build_call_without_credentials_has_no_authorization_header() {
        let client = hermetic("http://localhost:3000").build().unwrap();
        let request = client.build_call("list_models", Vec::new()).unwrap();
        assert!(request.headers.iter().all(|(name, _)| name != "authorization"));
    }

    #[test]
    fn sequential_calls_get_distinct_ids() {
        let client = client();
        let id_of = |request: HttpRequest| {
            let body: Value = serde_json::from_str(request.body.as_deref().unwrap()).unwrap();
            body["id"].as_str().unwrap().to_string()
        };
        let first = id_of(client.build_call("list_models", Vec::new()).unwrap());
        let second = id_of(client.build_call("list_models", Vec::new()).unwrap());
        assert_ne!(first, second);
    }

    // --- response mapping ---

    #[test]
    fn parse_call_unwraps_result() {
        let result = client()
            .parse_call(json_response(200, r#"{"result": ["X"]}"#))
            .unwrap();
        assert_eq!(result, json!(["X"]));
    }

    #[test]
    fn parse_call_missing_result_is_unknown_server_error() {
        let err = client()
            .parse_call(json_response(200, r#"{"id": "1"}"#))
            .unwrap_err();
        match err {
            ClientError::Server(server) => {
                assert_eq!(server.name, "Unknown");
                assert_eq!(server.code, 0);
            }
            other => panic!("expected Server, got {other:?}"),
        }
    }

    #[test]
    fn parse_call_null_result_is_unknown_server_error() {
        let err = client()
            .parse_call(json_response(200, r#"{"result": null}"#))
            .unwrap_err();
        assert!(matches!(err, ClientError::Server(_)));
    }

    #[test]
    fn parse_call_unparseable_200_is_unknown_server_error() {
        let err = client().parse_call(json_response(200, "not json")).unwrap_err();
        assert!(matches!(err, ClientError::Server(_)));
    }

    #[test]
    fn parse_call_500_with_structured_error() {
        let err = client()
            .parse_call(json_response(
                500,
                r#"{"error": {"name": "Bad", "code": 500, "message": "oops"}}"#,
            ))
            .unwrap_err();
        match err {
            ClientError::Server(server) => {
                assert_eq!(server.name, "Bad");
                assert_eq!(server.code, 500);
                assert_eq!(server.message, "oops");
            }
            other => panic!("expected Server, got {other:?}"),
        }
    }

    #[test]
    fn parse_call_500_json_without_error_field_keeps_raw_body() {
        let err = client()
            .parse_call(json_response(500, r#"{"oops": true}"#))
            .unwrap_err();
        match err {
            ClientError::Server(server) => {
                assert_eq!(server.name, "Unknown");
                assert_eq!(server.message, r#"{"oops": true}"#);
            }
            other => panic!("expected Server, got {other:?}"),
        }
    }

    #[test]
    fn parse_call_500_without_json_content_type_keeps_raw_body() {
        let response = HttpResponse {
            status: 500,
            headers: vec![("content-type".to_string(), "text/html".to_string())],
            body: "<h1>boom</h1>".to_string(),
        };
        let err = client().parse_call(response).unwrap_err();
        match err {
            ClientError::Server(server) => {
                assert_eq!(server.name, "Unknown");
                assert_eq!(server.message, "<h1>boom</h1>");
            }
            other => panic!("expected Server, got {other:?}"),
        }
    }

    #[test]
    fn parse_call_other_status_is_http_error() {
        let err = client().parse_call(json_response(404, "missing")).unwrap_err();
        match err {
            ClientError::Http { status, body } => {
                assert_eq!(status, 404);
                assert_eq!(body, "missing");
            }
            other => panic!("expected Http, got {other:?}"),
        }
    }

    // --- result unwrapping ---

    #[test]
    fn first_element_takes_index_zero() {
        let value = first_element(json!(["X", "ignored"])).unwrap();
        assert_eq!(value, json!("X"));
    }

    #[test]
    fn first_element_rejects_empty_list() {
        assert!(matches!(
            first_element(json!([])),
            Err(ClientError::Server(_))
        ));
    }

    #[test]
    fn first_element_rejects_non_list() {
        assert!(matches!(
            first_element(json!({"k": 1})),
            Err(ClientError::Server(_))
        ));
    }

    #[test]
    fn request_ids_are_digit_strings() {
        for _ in 0..32 {
            let id = request_id();
            assert!(id.chars().all(|c| c.is_ascii_digit()), "bad id: {id}");
        }
    }
}
