//! Structured error shapes for provider endpoint responses.

use http::StatusCode;
use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Transport-level failure while talking to a remote endpoint.
#[derive(Debug, Error, Diagnostic)]
pub enum TransportError {
    /// The request could not be constructed.
    #[error("invalid request: {0}")]
    #[diagnostic(code(podauth_common::transport::invalid_request))]
    InvalidRequest(String),
    /// The underlying client failed to complete the exchange.
    #[error(transparent)]
    #[diagnostic(code(podauth_common::transport::io))]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl TransportError {
    /// Wrap an arbitrary client error.
    pub fn other(e: impl std::error::Error + Send + Sync + 'static) -> Self {
        TransportError::Other(Box::new(e))
    }
}

/// Structured error returned by an OIDC provider as a JSON body.
///
/// <https://datatracker.ietf.org/doc/html/rfc6749#section-5.2>
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Diagnostic)]
#[diagnostic(
    code(podauth_common::provider),
    help("inspect `error` and `error_description` returned by the provider")
)]
pub struct ProviderError {
    /// Machine-readable error code (e.g. `invalid_grant`).
    pub error: String,
    /// Optional human-readable description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_description: Option<String>,
    /// Optional URI with further details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_uri: Option<String>,
}

impl std::fmt::Display for ProviderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "provider error: {}", self.error)?;
        if let Some(desc) = &self.error_description {
            write!(f, ": {desc}")?;
        }
        if let Some(uri) = &self.error_uri {
            write!(f, " ({uri})")?;
        }
        Ok(())
    }
}

impl std::error::Error for ProviderError {}

/// Non-2xx response that did not carry the provider error shape.
#[derive(Debug, Clone, Error, Diagnostic)]
#[error("http status {status}: {body}")]
#[diagnostic(
    code(podauth_common::http_status),
    help("see the response body for details")
)]
pub struct HttpError {
    /// Response status code.
    pub status: StatusCode,
    /// Raw response body, lossily decoded.
    pub body: String,
}

/// Failure surfaced by a provider endpoint call.
#[derive(Debug, Error, Diagnostic)]
pub enum EndpointError {
    /// The provider answered with a structured JSON error body.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Provider(#[from] ProviderError),
    /// The provider answered non-2xx without the error shape.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Http(#[from] HttpError),
    /// The exchange itself failed.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),
}

impl EndpointError {
    /// Classify a non-success response body: a JSON `{error, ...}` shape
    /// becomes [`ProviderError`], anything else [`HttpError`].
    pub fn classify(status: StatusCode, body: &[u8]) -> EndpointError {
        match serde_json::from_slice::<ProviderError>(body) {
            Ok(provider) => EndpointError::Provider(provider),
            Err(_) => EndpointError::Http(HttpError {
                status,
                body: String::from_utf8_lossy(body).into_owned(),
            }),
        }
    }
}
