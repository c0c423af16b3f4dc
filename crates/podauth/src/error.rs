//! The error taxonomy of the authentication core.
//!
//! Everything here is fatal for the operation that raised it and propagates
//! to the caller, with two deliberate exceptions handled elsewhere: session
//! restoration failures degrade to "no session" inside
//! [`crate::session::SessionCoordinator::init`], and provider-side logout
//! failures are logged and suppressed during local cleanup.

use miette::Diagnostic;
use podauth_common::store::StoreError;
use podauth_common::{EndpointError, HttpError, ProviderError, TransportError};
use podauth_webid::ResolveError;
use thiserror::Error;
use url::Url;

use crate::jose::SigningError;
use crate::keys::CryptoError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Debug, Error, Diagnostic)]
pub enum AuthError {
    /// Key generation/parsing failure.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Crypto(#[from] CryptoError),

    /// Malformed key at sign time.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Signing(#[from] SigningError),

    /// The `state` returned by the provider differs from the one this flow
    /// issued. CSRF check; the flow must be abandoned.
    #[error("authorization response state does not match this flow")]
    #[diagnostic(
        code(podauth::state_mismatch),
        help("the response does not belong to this authentication attempt; do not retry it")
    )]
    StateMismatch,

    /// The asserting issuer is not declared in the identity's own profile.
    #[error("issuer {issuer} is not authorized for {web_id}")]
    #[diagnostic(
        code(podauth::issuer_not_authorized),
        help("the WebID profile must list the issuer as solid:oidcIssuer")
    )]
    IssuerNotAuthorized { web_id: Url, issuer: Url },

    /// No claim in the authentication result yields a WebID.
    #[error("no WebID found in the authentication result")]
    #[diagnostic(
        code(podauth::no_webid),
        help("checked the `webid` claim, the `sub` claim, and UserInfo `website`")
    )]
    NoWebIdFound,

    /// Structured error body from the provider.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Provider(#[from] ProviderError),

    /// Non-2xx without the provider error shape.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Http(#[from] HttpError),

    /// Transport-level failure.
    #[error(transparent)]
    #[diagnostic(transparent)]
    Transport(#[from] TransportError),

    /// No token-endpoint auth method is supported by both sides.
    #[error("no supported token endpoint authentication method")]
    #[diagnostic(
        code(podauth::unsupported_auth_method),
        help(
            "supported: client_secret_post, client_secret_basic, none; check the provider metadata"
        )
    )]
    UnsupportedAuthMethod,

    /// Configuration mismatch with provider capabilities.
    #[error("unsupported operation: {0}")]
    #[diagnostic(code(podauth::unsupported))]
    Unsupported(&'static str),

    /// Precondition violation: the operation requires a live session.
    #[error("not authenticated")]
    #[diagnostic(
        code(podauth::not_authenticated),
        help("call authenticate() or init() with restorable state first")
    )]
    NotAuthenticated,

    /// A token expected to be a JWT does not decode as one.
    #[error("token is not a decodable JWT: {0}")]
    #[diagnostic(code(podauth::invalid_token))]
    InvalidToken(String),

    /// The authorization response is malformed beyond the state check.
    #[error("authorization callback error: {0}")]
    #[diagnostic(code(podauth::callback))]
    Callback(String),

    /// Discovered issuer metadata is unusable.
    #[error("invalid issuer metadata: {0}")]
    #[diagnostic(code(podauth::metadata))]
    Metadata(String),

    /// Persisted session state is incomplete or unusable. Recovered
    /// locally by `init()`; surfaced only from explicit restore paths.
    #[error("invalid persisted session: {0}")]
    #[diagnostic(code(podauth::invalid_session))]
    InvalidSession(&'static str),

    /// The external redirect collaborator failed or was abandoned.
    #[error("redirect handling failed: {0}")]
    #[diagnostic(code(podauth::redirect))]
    Redirect(#[source] BoxError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolver(#[from] ResolveError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(code(podauth::serde_json))]
    SerdeJson(#[from] serde_json::Error),

    #[error(transparent)]
    #[diagnostic(code(podauth::serde_form))]
    Form(#[from] serde_html_form::ser::Error),

    #[error(transparent)]
    #[diagnostic(code(podauth::url))]
    Url(#[from] url::ParseError),
}

impl From<EndpointError> for AuthError {
    fn from(e: EndpointError) -> Self {
        match e {
            EndpointError::Provider(p) => AuthError::Provider(p),
            EndpointError::Http(h) => AuthError::Http(h),
            EndpointError::Transport(t) => AuthError::Transport(t),
        }
    }
}

pub type Result<T> = core::result::Result<T, AuthError>;
