use serde::{Deserialize, Serialize};
use url::Url;

/// OIDC provider configuration, as published at
/// `{issuer}/.well-known/openid-configuration`.
///
/// Fetched once per issuer, cached for the lifetime of the session, and
/// treated as immutable after fetch.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct IssuerMetadata {
    // https://openid.net/specs/openid-connect-discovery-1_0.html#ProviderMetadata
    pub issuer: Url,
    pub authorization_endpoint: Url,
    pub token_endpoint: Url,
    pub userinfo_endpoint: Option<Url>,
    pub jwks_uri: Option<Url>,
    pub registration_endpoint: Option<Url>,
    #[serde(default)]
    pub scopes_supported: Vec<String>,
    #[serde(default)]
    pub response_types_supported: Vec<String>,
    pub grant_types_supported: Option<Vec<String>>,
    pub subject_types_supported: Option<Vec<String>>,
    pub id_token_signing_alg_values_supported: Option<Vec<String>>,
    pub token_endpoint_auth_methods_supported: Option<Vec<String>>,
    pub claims_supported: Option<Vec<String>>,
    pub code_challenge_methods_supported: Option<Vec<String>>,

    // https://datatracker.ietf.org/doc/html/rfc7009#section-2
    pub revocation_endpoint: Option<Url>,

    // https://openid.net/specs/openid-connect-rpinitiated-1_0.html
    pub end_session_endpoint: Option<Url>,

    // https://datatracker.ietf.org/doc/html/rfc9207#section-3
    pub authorization_response_iss_parameter_supported: Option<bool>,

    // https://datatracker.ietf.org/doc/html/rfc9449#section-5.1
    pub dpop_signing_alg_values_supported: Option<Vec<String>>,
}

impl IssuerMetadata {
    /// A metadata set with only the required endpoints filled in.
    pub fn new(issuer: Url, authorization_endpoint: Url, token_endpoint: Url) -> Self {
        Self {
            issuer,
            authorization_endpoint,
            token_endpoint,
            userinfo_endpoint: None,
            jwks_uri: None,
            registration_endpoint: None,
            scopes_supported: Vec::new(),
            response_types_supported: Vec::new(),
            grant_types_supported: None,
            subject_types_supported: None,
            id_token_signing_alg_values_supported: None,
            token_endpoint_auth_methods_supported: None,
            claims_supported: None,
            code_challenge_methods_supported: None,
            revocation_endpoint: None,
            end_session_endpoint: None,
            authorization_response_iss_parameter_supported: None,
            dpop_signing_alg_values_supported: None,
        }
    }
}
