//! Solid-OIDC client authentication with DPoP proof-of-possession.
//!
//! The pieces, leaf-first: [`keys`] generates the RSA signing material,
//! [`dpop`] mints per-request proofs bound to one URL + method pair,
//! [`client`]/[`types`] cover provider metadata and the wire shapes,
//! [`flow`] runs one grant negotiation, [`credential`] holds and refreshes
//! the resulting tokens, [`webid`] extracts and validates the authenticated
//! identity, and [`session`] orchestrates the lot behind injected
//! transport/resolver/store collaborators.
//!
//! Issuer resolution and the profile-document model live in
//! [`podauth_webid`]; the HTTP abstraction and secure store in
//! [`podauth_common`].

pub mod client;
pub mod credential;
pub mod dpop;
pub mod error;
pub mod flow;
pub mod jose;
pub mod keys;
pub mod scopes;
pub mod session;
pub mod types;
pub mod utils;
pub mod webid;

pub use client::{Client, ClientAuth, discover, select_client_auth};
pub use credential::{AutoRefreshGuard, Credential, GetTokenOptions};
pub use dpop::{DpopCredentials, DpopProof};
pub use error::AuthError;
pub use flow::{AuthUriOptions, Flow, FlowData, FlowGrant};
pub use keys::{KeyPair, RsaPublicJwk};
pub use session::{
    AuthenticatedSession, RedirectHandler, SessionConfig, SessionCoordinator, SessionPhase,
    SessionState,
};
pub use types::{CallbackParams, IssuerMetadata, TokenResponse};

pub use podauth_common::{HttpClient, SecureStore};
pub use podauth_webid::{IssuerResolver, WebIdIssuerResolver};
