//! Credential resolution for client construction.
//!
//! # Design
//! Resolution is an ordered chain of sources; the first one that yields a
//! usable value wins and later sources are never consulted. All process
//! environment reads happen in [`CredentialSources::from_env`] so the chain
//! itself is a pure function of its inputs and tests never have to mutate
//! the environment. File problems (missing, unreadable, malformed) are
//! logged and treated as "this source yielded nothing" — they never fail
//! construction.

use std::env;
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use config::{Config, File, FileFormat};

use crate::error::ClientError;
use crate::http::{self, HttpMethod, HttpRequest, HttpResponse};
use crate::types::{AuthData, TokenResponse};

/// Token service used to exchange a user_id/password pair for a token.
pub const DEFAULT_AUTH_SERVICE_URL: &str =
    "https://nexus.api.globusonline.org/goauth/token?grant_type=client_credentials";

/// Environment variable holding a pre-issued token.
pub const ENV_AUTH_TOKEN: &str = "KB_AUTH_TOKEN";

/// Environment variable overriding the INI config file location.
pub const ENV_DEPLOYMENT_CONFIG: &str = "KB_DEPLOYMENT_CONFIG";

const INI_SECTION: &str = "authentication";

/// Inputs to credential resolution, in priority order.
///
/// `from_env` supplies the ambient defaults; every field can be overridden
/// through [`crate::ClientBuilder`] before resolution runs.
#[derive(Debug, Clone)]
pub struct CredentialSources {
    /// Explicit token; short-circuits everything else.
    pub token: Option<String>,
    /// Explicit user_id, exchanged together with `password`.
    pub user_id: Option<String>,
    pub password: Option<String>,
    /// Pre-issued token from the environment.
    pub env_token: Option<String>,
    /// INI config file, section `[authentication]`.
    pub ini_file: Option<PathBuf>,
    /// Flat-JSON rc file with the same key set.
    pub rc_file: Option<PathBuf>,
    /// Skip both file sources entirely.
    pub ignore_files: bool,
    /// Token exchange endpoint.
    pub auth_service_url: String,
}

impl CredentialSources {
    /// Defaults derived from the process environment: `KB_AUTH_TOKEN` for a
    /// pre-issued token, `KB_DEPLOYMENT_CONFIG` (else `$HOME/.kbase_config`)
    /// for the INI file, and `$HOME/.authrc` for the rc file.
    pub fn from_env() -> Self {
        CredentialSources {
            token: None,
            user_id: None,
            password: None,
            env_token: env::var(ENV_AUTH_TOKEN).ok(),
            ini_file: default_ini_path(),
            rc_file: default_rc_path(),
            ignore_files: false,
            auth_service_url: DEFAULT_AUTH_SERVICE_URL.to_string(),
        }
    }
}

/// Run the resolution chain, producing the authorization header value or
/// `None` for an unauthenticated client.
///
/// Only the token-exchange sources perform I/O, using the client's own
/// `agent` so the configured timeout and TLS behavior apply there too.
pub fn resolve(
    sources: &CredentialSources,
    agent: &ureq::Agent,
) -> Result<Option<String>, ClientError> {
    if let Some(token) = &sources.token {
        return Ok(Some(token.clone()));
    }
    if let (Some(user_id), Some(password)) = (&sources.user_id, &sources.password) {
        return exchange_token(agent, &sources.auth_service_url, user_id, password).map(Some);
    }
    if let Some(token) = &sources.env_token {
        return Ok(Some(token.clone()));
    }
    if sources.ignore_files {
        return Ok(None);
    }

    let data = sources
        .ini_file
        .as_deref()
        .and_then(read_ini_file)
        .or_else(|| sources.rc_file.as_deref().and_then(read_rc_file));
    let Some(data) = data else {
        return Ok(None);
    };

    if let Some(token) = data.token {
        return Ok(Some(token));
    }
    if let (Some(user_id), Some(password)) = (data.user_id, data.password) {
        return exchange_token(agent, &sources.auth_service_url, &user_id, &password).map(Some);
    }
    Ok(None)
}

/// Build the Basic-auth GET request for the token exchange.
pub(crate) fn build_token_request(
    auth_service_url: &str,
    user_id: &str,
    password: &str,
) -> HttpRequest {
    let encoded = STANDARD.encode(format!("{user_id}:{password}"));
    HttpRequest {
        method: HttpMethod::Get,
        url: auth_service_url.to_string(),
        headers: vec![("authorization".to_string(), format!("Basic {encoded}"))],
        body: None,
    }
}

/// Interpret the token service's answer.
///
/// 2xx → the body's `access_token`; 403 → authentication failure naming the
/// user; anything else → an HTTP error carrying the raw body.
pub(crate) fn parse_token_response(
    user_id: &str,
    response: HttpResponse,
) -> Result<String, ClientError> {
    if (200..300).contains(&response.status) {
        let parsed: TokenResponse = serde_json::from_str(&response.body).map_err(|err| {
            ClientError::Authentication(format!("token service returned a malformed body: {err}"))
        })?;
        return Ok(parsed.access_token);
    }
    if response.status == 403 {
        return Err(ClientError::Authentication(format!(
            "bad user_id/password combination for user {user_id}"
        )));
    }
    Err(ClientError::Http {
        status: response.status,
        body: response.body,
    })
}

fn exchange_token(
    agent: &ureq::Agent,
    auth_service_url: &str,
    user_id: &str,
    password: &str,
) -> Result<String, ClientError> {
    let request = build_token_request(auth_service_url, user_id, password);
    let response = http::execute(agent, &request)?;
    parse_token_response(user_id, response)
}

/// Read the INI config file. The `[authentication]` section must exist;
/// a file without it is treated the same as a missing file.
fn read_ini_file(path: &Path) -> Option<AuthData> {
    if !path.exists() {
        return None;
    }
    let Some(path_str) = path.to_str() else {
        tracing::warn!(path = %path.display(), "auth config path is not valid UTF-8, skipping");
        return None;
    };
    let parsed = match Config::builder()
        .add_source(File::new(path_str, FileFormat::Ini))
        .build()
    {
        Ok(parsed) => parsed,
        Err(err) => {
            tracing::warn!(path = path_str, error = %err, "error while reading INI file");
            return None;
        }
    };
    let section = match parsed.get_table(INI_SECTION) {
        Ok(section) => section,
        Err(err) => {
            tracing::warn!(path = path_str, error = %err, "error while reading INI file");
            return None;
        }
    };
    let get = |key: &str| {
        section
            .get(key)
            .and_then(|value| value.clone().into_string().ok())
    };
    Some(AuthData {
        user_id: get("user_id"),
        token: get("token"),
        client_secret: get("client_secret"),
        keyfile: get("keyfile"),
        keyfile_passphrase: get("keyfile_passphrase"),
        password: get("password"),
    })
}

/// Read the flat-JSON rc file. Unknown keys are ignored.
fn read_rc_file(path: &Path) -> Option<AuthData> {
    if !path.exists() {
        return None;
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "error while reading authrc file");
            return None;
        }
    };
    match serde_json::from_str(&raw) {
        Ok(data) => Some(data),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "error while reading authrc file");
            None
        }
    }
}

fn default_ini_path() -> Option<PathBuf> {
    if let Ok(path) = env::var(ENV_DEPLOYMENT_CONFIG) {
        return Some(PathBuf::from(path));
    }
    home_dir().map(|home| home.join(".kbase_config"))
}

fn default_rc_path() -> Option<PathBuf> {
    home_dir().map(|home| home.join(".authrc"))
}

fn home_dir() -> Option<PathBuf> {
    env::var_os("HOME").map(PathBuf::from)
}
