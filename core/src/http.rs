//! HTTP transport: plain-data request/response types plus the blocking
//! executor that runs them through `ureq`.
//!
//! # Design
//! Requests and responses are described as plain data so the envelope and
//! credential code can be exercised without touching the network. `execute`
//! is the single place real I/O happens; it disables ureq's
//! status-code-as-error behavior so 4xx/5xx responses come back as data and
//! status interpretation stays in one spot ([`crate::client`]).

use std::time::Duration;

use crate::error::ClientError;

/// HTTP method for a request. The service surface only ever needs POST for
/// RPC calls and GET for the token exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// The `content-type` header value, if the server sent one.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case("content-type"))
            .map(|(_, value)| value.as_str())
    }
}

/// Build the agent shared by every call a client instance makes.
///
/// `timeout` aborts the whole round trip, surfacing as a transport error.
/// `accept_invalid_certs` turns off TLS certificate verification.
pub(crate) fn build_agent(timeout: Duration, accept_invalid_certs: bool) -> ureq::Agent {
    let mut config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false);
    if accept_invalid_certs {
        config = config.tls_config(
            ureq::tls::TlsConfig::builder()
                .disable_verification(true)
                .build(),
        );
    }
    config.build().new_agent()
}

/// Execute an `HttpRequest` and return the corresponding `HttpResponse`.
///
/// Any failure below the HTTP status line (connect, TLS, timeout, body
/// read) maps to [`ClientError::Transport`].
pub(crate) fn execute(agent: &ureq::Agent, request: &HttpRequest) -> Result<HttpResponse, ClientError> {
    let mut response = match (&request.method, &request.body) {
        (HttpMethod::Get, _) => {
            let mut builder = agent.get(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.call()?
        }
        (HttpMethod::Post, Some(body)) => {
            let mut builder = agent.post(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.send(body.as_bytes())?
        }
        (HttpMethod::Post, None) => {
            let mut builder = agent.post(&request.url);
            for (name, value) in &request.headers {
                builder = builder.header(name.as_str(), value.as_str());
            }
            builder.send_empty()?
        }
    };

    let status = response.status().as_u16();
    let headers = response
        .headers()
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|v| (name.as_str().to_string(), v.to_string()))
        })
        .collect();
    let body = response.body_mut().read_to_string()?;

    Ok(HttpResponse { status, headers, body })
}
