//! Synchronous client for the ProbModelSEED metabolic-modeling service.
//!
//! # Overview
//! The service speaks a JSON-RPC 1.1 envelope over HTTP POST. This crate
//! resolves an authorization token once at construction time, then exposes
//! a generic `invoke` primitive plus the named service methods, each a
//! pass-through that unwraps the server's single-element result list.
//!
//! # Design
//! - Credential resolution is an ordered source chain (explicit token,
//!   user/password exchange, environment token, INI config, rc file);
//!   first usable value wins, file failures are logged and skipped.
//! - Envelope building and response mapping are pure functions over plain
//!   request/response data; `http::execute` is the only place I/O happens.
//! - Blocking, single round trip per call, no retries, no pooling.
//!   Callers needing parallelism create multiple client instances.
//!
//! # Example
//! ```no_run
//! use modelseed_core::ModelSeedClient;
//! use serde_json::json;
//!
//! # fn main() -> Result<(), modelseed_core::ClientError> {
//! let client = ModelSeedClient::builder("https://p3.theseed.org/services/ProbModelSEED")
//!     .token("un=alice|tokenid=...")
//!     .build()?;
//! let models = client.list_models(json!({"path": "/alice/modelseed"}))?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod client;
pub mod error;
pub mod http;
pub mod types;

pub use auth::{CredentialSources, DEFAULT_AUTH_SERVICE_URL, ENV_AUTH_TOKEN, ENV_DEPLOYMENT_CONFIG};
pub use client::{ClientBuilder, ModelSeedClient, SERVICE_NAME};
pub use error::{ClientError, ServerError};
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use types::{AuthData, RpcErrorPayload, RpcRequest, RpcResponse};
