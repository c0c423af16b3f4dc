//! Registered client, provider metadata discovery, and the shared
//! token-endpoint request plumbing.

use http::{Method, Request, StatusCode};
use podauth_common::{EndpointError, HttpClient, TransportError};
use podauth_webid::issuer_match;
use serde::Serialize;
use serde::de::DeserializeOwned;
use url::Url;

use crate::error::{AuthError, Result};
use crate::types::IssuerMetadata;

/// The application as registered with (or known to) a provider.
/// Immutable after construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Client {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub metadata: IssuerMetadata,
}

impl Client {
    pub fn new(
        client_id: impl Into<String>,
        client_secret: Option<String>,
        metadata: IssuerMetadata,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret,
            metadata,
        }
    }
}

/// Fetch `{issuer}/.well-known/openid-configuration`.
///
/// The advertised `issuer` must be equivalent to the requested one
/// (normalized comparison) and is then rewritten to the requested form to
/// avoid trailing-slash quirks downstream.
pub async fn discover<T: HttpClient>(http: &T, issuer: &Url) -> Result<IssuerMetadata> {
    let config_url = Url::parse(&format!(
        "{}/.well-known/openid-configuration",
        issuer.as_str().trim_end_matches('/')
    ))?;
    let req = Request::builder()
        .uri(config_url.as_str())
        .header("Accept", "application/json")
        .body(Vec::new())
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
    let res = http.send_http(req).await.map_err(TransportError::other)?;
    if res.status() != StatusCode::OK {
        return Err(EndpointError::classify(res.status(), res.body()).into());
    }
    let mut metadata: IssuerMetadata = serde_json::from_slice(res.body())?;
    if !issuer_match(&metadata.issuer, issuer) {
        return Err(AuthError::Metadata(format!(
            "advertised issuer {} does not match requested {}",
            metadata.issuer, issuer
        )));
    }
    metadata.issuer = issuer.clone();
    Ok(metadata)
}

/// Token-endpoint client authentication, selected from the provider's
/// advertised methods.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientAuth {
    /// `client_secret_post`: credentials in the form body.
    SecretPost {
        client_id: String,
        client_secret: String,
    },
    /// `client_secret_basic`: credentials in an `Authorization: Basic` header.
    SecretBasic {
        client_id: String,
        client_secret: String,
    },
    /// Public client: Basic with an empty secret.
    PublicBasic { client_id: String },
}

/// Pick the authentication method: `client_secret_post` preferred, then
/// `client_secret_basic`, then Basic-with-empty-secret for public clients.
/// An advertised set containing none of these is a hard failure. Providers
/// that advertise nothing get the RFC 8414 default, `client_secret_basic`.
pub fn select_client_auth(client: &Client) -> Result<ClientAuth> {
    let default_methods = vec!["client_secret_basic".to_owned()];
    let methods = client
        .metadata
        .token_endpoint_auth_methods_supported
        .as_ref()
        .unwrap_or(&default_methods);
    let advertised = |name: &str| methods.iter().any(|m| m == name);

    for method in ["client_secret_post", "client_secret_basic", "none"] {
        if !advertised(method) {
            continue;
        }
        match (method, &client.client_secret) {
            ("client_secret_post", Some(secret)) => {
                return Ok(ClientAuth::SecretPost {
                    client_id: client.client_id.clone(),
                    client_secret: secret.clone(),
                });
            }
            ("client_secret_basic", Some(secret)) => {
                return Ok(ClientAuth::SecretBasic {
                    client_id: client.client_id.clone(),
                    client_secret: secret.clone(),
                });
            }
            ("client_secret_basic", None) | ("none", _) => {
                return Ok(ClientAuth::PublicBasic {
                    client_id: client.client_id.clone(),
                });
            }
            _ => {}
        }
    }
    Err(AuthError::UnsupportedAuthMethod)
}

impl ClientAuth {
    fn body_fields(&self) -> (String, Option<String>) {
        match self {
            ClientAuth::SecretPost {
                client_id,
                client_secret,
            } => (client_id.clone(), Some(client_secret.clone())),
            ClientAuth::SecretBasic { client_id, .. } | ClientAuth::PublicBasic { client_id } => {
                (client_id.clone(), None)
            }
        }
    }

    fn authorization_header(&self) -> Option<String> {
        use base64::{Engine as _, engine::general_purpose::STANDARD};
        match self {
            ClientAuth::SecretPost { .. } => None,
            ClientAuth::SecretBasic {
                client_id,
                client_secret,
            } => Some(format!(
                "Basic {}",
                STANDARD.encode(format!("{client_id}:{client_secret}"))
            )),
            ClientAuth::PublicBasic { client_id } => {
                Some(format!("Basic {}", STANDARD.encode(format!("{client_id}:"))))
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct RequestPayload<T: Serialize> {
    client_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_secret: Option<String>,
    #[serde(flatten)]
    parameters: T,
}

/// POST a form-encoded request to a provider endpoint and deserialize the
/// JSON response. Empty 2xx bodies deserialize as `null`, so revocation
/// calls can ask for `()`.
pub(crate) async fn endpoint_request<O, T, P>(
    http: &T,
    endpoint: &Url,
    auth: &ClientAuth,
    parameters: P,
    dpop_proof: Option<&str>,
) -> Result<O>
where
    T: HttpClient,
    O: DeserializeOwned,
    P: Serialize,
{
    let (client_id, client_secret) = auth.body_fields();
    let body = serde_html_form::to_string(RequestPayload {
        client_id,
        client_secret,
        parameters,
    })?;
    let mut builder = Request::builder()
        .uri(endpoint.as_str())
        .method(Method::POST)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("Accept", "application/json");
    if let Some(authorization) = auth.authorization_header() {
        builder = builder.header("Authorization", authorization);
    }
    if let Some(proof) = dpop_proof {
        builder = builder.header("DPoP", proof);
    }
    let req = builder
        .body(body.into_bytes())
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

    let res = http.send_http(req).await.map_err(TransportError::other)?;
    if res.status().is_success() {
        if res.body().is_empty() {
            Ok(serde_json::from_slice(b"null")?)
        } else {
            Ok(serde_json::from_slice(res.body())?)
        }
    } else {
        Err(EndpointError::classify(res.status(), res.body()).into())
    }
}
