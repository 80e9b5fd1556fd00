//! Error types for the ProbModelSEED client.
//!
//! # Design
//! `Server` gets a dedicated payload struct because callers frequently
//! inspect the remote service's `{name, code, message, data}` tuple, which
//! arrives in two historical shapes on the wire (see
//! [`crate::types::RpcErrorPayload`]). All other non-200/non-500 responses
//! land in `Http` with the raw status code and body for debugging.

use std::fmt;

/// Errors returned by [`crate::ModelSeedClient`] and its builder.
#[derive(Debug)]
pub enum ClientError {
    /// Construction-time rejection: non-http(s) endpoint scheme or a
    /// timeout below one second.
    Configuration(String),

    /// The token exchange refused the supplied user_id/password, or the
    /// token service returned a success body without an `access_token`.
    Authentication(String),

    /// A structured error surfaced by the remote service, or the
    /// synthesized `Unknown` variant when the server's error body did not
    /// parse.
    Server(ServerError),

    /// The server returned an unexpected status other than 200 or 500.
    Http { status: u16, body: String },

    /// The underlying HTTP layer failed (connect, TLS, timeout, read).
    Transport(ureq::Error),

    /// The request envelope could not be serialized to JSON.
    Serialization(String),
}

/// Structured error reported by the service inside a 500 response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerError {
    pub name: String,
    pub code: i64,
    pub message: String,
    /// Extra diagnostic payload, typically a server-side traceback. Empty
    /// when the service sent none.
    pub data: String,
}

impl fmt::Display for ServerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}. {}\n{}", self.name, self.code, self.message, self.data)
    }
}

impl std::error::Error for ServerError {}

impl fmt::Display for ClientError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClientError::Configuration(msg) => write!(f, "invalid configuration: {msg}"),
            ClientError::Authentication(msg) => write!(f, "authentication failed: {msg}"),
            ClientError::Server(err) => write!(f, "server error: {err}"),
            ClientError::Http { status, body } => write!(f, "HTTP {status}: {body}"),
            ClientError::Transport(err) => write!(f, "transport error: {err}"),
            ClientError::Serialization(msg) => write!(f, "serialization failed: {msg}"),
        }
    }
}

impl std::error::Error for ClientError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ClientError::Transport(err) => Some(err),
            ClientError::Server(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ureq::Error> for ClientError {
    fn from(err: ureq::Error) -> Self {
        ClientError::Transport(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_error_display_includes_all_fields() {
        let err = ServerError {
            name: "JSONRPCError".to_string(),
            code: -32601,
            message: "Method not found".to_string(),
            data: "trace".to_string(),
        };
        assert_eq!(err.to_string(), "JSONRPCError: -32601. Method not found\ntrace");
    }

    #[test]
    fn http_error_display_carries_status_and_body() {
        let err = ClientError::Http {
            status: 404,
            body: "nope".to_string(),
        };
        assert_eq!(err.to_string(), "HTTP 404: nope");
    }

    #[test]
    fn authentication_display_names_the_user() {
        let err = ClientError::Authentication(
            "bad user_id/password combination for user alice".to_string(),
        );
        assert!(err.to_string().contains("alice"));
    }
}
