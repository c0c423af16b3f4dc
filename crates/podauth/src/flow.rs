//! One grant-type negotiation, from construction to a live credential.
//!
//! The six grant types share their request/response plumbing but differ in
//! payload and in which leg completes them, so a flow is a shared
//! [`FlowData`] plus a [`FlowGrant`] tag dispatched by `match`. A flow is
//! terminal: completing or failing its exchange consumes it. Redirect-based
//! grants are cancelled by dropping the awaited callback; no timers are
//! started here.

use std::sync::Arc;

use chrono::{TimeDelta, Utc};
use podauth_common::{HttpClient, ProviderError};
use podauth_webid::issuer_match;
use url::Url;

use crate::client::{Client, endpoint_request, select_client_auth};
use crate::credential::Credential;
use crate::error::{AuthError, Result};
use crate::types::{
    AssertionTokenRequestParameters, AuthorizationRequestParameters, CallbackParams,
    ClientCredentialsTokenRequestParameters, CodeTokenRequestParameters,
    PasswordTokenRequestParameters, TokenEndpointResponse, TokenGrantType, TokenResponse,
};
use crate::utils::{generate_pkce, generate_state};

/// Fields every grant type carries.
#[derive(Debug, Clone)]
pub struct FlowData {
    pub client: Client,
    pub scopes: Vec<String>,
    /// Anti-CSRF nonce, generated at construction and checked in `callback`.
    pub state: String,
    pub redirect_uri: Option<Url>,
}

/// Grant-type-specific payload.
#[derive(Debug, Clone)]
pub enum FlowGrant {
    AuthorizationCode,
    Pkce { verifier: String, challenge: String },
    Implicit,
    Password,
    ClientCredentials,
    JwtBearer,
}

/// Options for building the authorization request URI.
#[derive(Debug, Clone, Default)]
pub struct AuthUriOptions {
    pub prompts: Vec<String>,
    pub login_hint: Option<String>,
    pub nonce: Option<String>,
}

/// One authentication attempt against a provider.
#[derive(Debug, Clone)]
pub struct Flow {
    pub data: FlowData,
    pub grant: FlowGrant,
}

impl Flow {
    fn new(client: Client, scopes: Vec<String>, redirect_uri: Option<Url>, grant: FlowGrant) -> Self {
        Self {
            data: FlowData {
                client,
                scopes,
                state: generate_state(),
                redirect_uri,
            },
            grant,
        }
    }

    pub fn authorization_code(client: Client, scopes: Vec<String>, redirect_uri: Url) -> Self {
        Self::new(
            client,
            scopes,
            Some(redirect_uri),
            FlowGrant::AuthorizationCode,
        )
    }

    /// Authorization code with PKCE. The verifier/challenge pair is derived
    /// at construction (S256).
    pub fn pkce(client: Client, scopes: Vec<String>, redirect_uri: Url) -> Self {
        let (challenge, verifier) = generate_pkce();
        Self::new(
            client,
            scopes,
            Some(redirect_uri),
            FlowGrant::Pkce { verifier, challenge },
        )
    }

    pub fn implicit(client: Client, scopes: Vec<String>, redirect_uri: Url) -> Self {
        Self::new(client, scopes, Some(redirect_uri), FlowGrant::Implicit)
    }

    pub fn password(client: Client, scopes: Vec<String>) -> Self {
        Self::new(client, scopes, None, FlowGrant::Password)
    }

    pub fn client_credentials(client: Client, scopes: Vec<String>) -> Self {
        Self::new(client, scopes, None, FlowGrant::ClientCredentials)
    }

    pub fn jwt_bearer(client: Client, scopes: Vec<String>) -> Self {
        Self::new(client, scopes, None, FlowGrant::JwtBearer)
    }

    fn scope_string(&self) -> String {
        self.data.scopes.join(" ")
    }

    /// The URI to send the user agent to. Only meaningful for grants with a
    /// redirect leg.
    pub fn authentication_uri(&self, options: &AuthUriOptions) -> Result<Url> {
        let response_type = match &self.grant {
            FlowGrant::AuthorizationCode | FlowGrant::Pkce { .. } => "code".to_owned(),
            FlowGrant::Implicit => implicit_response_type(&self.data.client),
            _ => return Err(AuthError::Unsupported("grant type has no authorization step")),
        };
        let redirect_uri = self
            .data
            .redirect_uri
            .as_ref()
            .ok_or(AuthError::Unsupported("flow has no redirect URI"))?;

        let parameters = AuthorizationRequestParameters {
            response_type,
            client_id: self.data.client.client_id.clone(),
            redirect_uri: redirect_uri.to_string(),
            scope: self.scope_string(),
            state: self.data.state.clone(),
            code_challenge: match &self.grant {
                FlowGrant::Pkce { challenge, .. } => Some(challenge.clone()),
                _ => None,
            },
            code_challenge_method: matches!(self.grant, FlowGrant::Pkce { .. }).then_some("S256"),
            prompt: (!options.prompts.is_empty()).then(|| options.prompts.join(" ")),
            login_hint: options.login_hint.clone(),
            nonce: options.nonce.clone(),
        };
        let mut url = self.data.client.metadata.authorization_endpoint.clone();
        url.set_query(Some(&serde_html_form::to_string(&parameters)?));
        Ok(url)
    }

    /// Complete a redirect-based grant with the parameters delivered to the
    /// redirect URI.
    ///
    /// The `state` check runs before anything else; a mismatch aborts the
    /// flow without touching the token endpoint. A `DPoP` proof for the
    /// token endpoint binds the issued tokens to the session key.
    pub async fn callback<T>(
        self,
        http: Arc<T>,
        params: CallbackParams,
        dpop_proof: Option<String>,
    ) -> Result<Credential<T>>
    where
        T: HttpClient + Sync,
    {
        if params.state.as_deref() != Some(self.data.state.as_str()) {
            return Err(AuthError::StateMismatch);
        }
        if let Some(error) = params.error {
            return Err(ProviderError {
                error,
                error_description: params.error_description,
                error_uri: params.error_uri,
            }
            .into());
        }
        self.check_iss(params.iss.as_deref())?;

        let token = match &self.grant {
            FlowGrant::AuthorizationCode | FlowGrant::Pkce { .. } => {
                let code = params
                    .code
                    .ok_or_else(|| AuthError::Callback("missing authorization code".into()))?;
                let redirect_uri = self
                    .data
                    .redirect_uri
                    .as_ref()
                    .ok_or(AuthError::Unsupported("flow has no redirect URI"))?
                    .to_string();
                let request = CodeTokenRequestParameters {
                    grant_type: TokenGrantType::AuthorizationCode,
                    code,
                    redirect_uri,
                    code_verifier: match &self.grant {
                        FlowGrant::Pkce { verifier, .. } => Some(verifier.clone()),
                        _ => None,
                    },
                };
                self.exchange(http.as_ref(), request, dpop_proof.as_deref())
                    .await?
            }
            FlowGrant::Implicit => {
                // tokens arrive in the redirect itself; no token-endpoint
                // round trip
                TokenResponse {
                    access_token: params.access_token,
                    refresh_token: None,
                    id_token: params.id_token,
                    token_type: params.token_type,
                    scope: None,
                    expires_at: params
                        .expires_in
                        .and_then(|secs| Utc::now().checked_add_signed(TimeDelta::seconds(secs))),
                }
            }
            FlowGrant::JwtBearer => {
                return Err(AuthError::Unsupported(
                    "jwt-bearer flows complete via login_with_assertion",
                ));
            }
            FlowGrant::Password | FlowGrant::ClientCredentials => {
                return Err(AuthError::Unsupported("grant type has no callback step"));
            }
        };
        Ok(Credential::new(http, self.data.client, token))
    }

    /// Resource-owner password grant; no redirect phase.
    pub async fn login_with_password<T>(
        self,
        http: Arc<T>,
        username: impl Into<String>,
        password: impl Into<String>,
        dpop_proof: Option<String>,
    ) -> Result<Credential<T>>
    where
        T: HttpClient + Sync,
    {
        if !matches!(self.grant, FlowGrant::Password) {
            return Err(AuthError::Unsupported("not a password flow"));
        }
        let request = PasswordTokenRequestParameters {
            grant_type: TokenGrantType::Password,
            username: username.into(),
            password: password.into(),
            scope: Some(self.scope_string()),
        };
        let token = self
            .exchange(http.as_ref(), request, dpop_proof.as_deref())
            .await?;
        Ok(Credential::new(http, self.data.client, token))
    }

    /// Client-credentials grant; no redirect phase.
    pub async fn login_with_client_credentials<T>(
        self,
        http: Arc<T>,
        dpop_proof: Option<String>,
    ) -> Result<Credential<T>>
    where
        T: HttpClient + Sync,
    {
        if !matches!(self.grant, FlowGrant::ClientCredentials) {
            return Err(AuthError::Unsupported("not a client-credentials flow"));
        }
        let request = ClientCredentialsTokenRequestParameters {
            grant_type: TokenGrantType::ClientCredentials,
            scope: Some(self.scope_string()),
        };
        let token = self
            .exchange(http.as_ref(), request, dpop_proof.as_deref())
            .await?;
        Ok(Credential::new(http, self.data.client, token))
    }

    /// Exchange an externally-obtained assertion
    /// (`urn:ietf:params:oauth:grant-type:jwt-bearer`).
    pub async fn login_with_assertion<T>(
        self,
        http: Arc<T>,
        assertion: impl Into<String>,
        dpop_proof: Option<String>,
    ) -> Result<Credential<T>>
    where
        T: HttpClient + Sync,
    {
        if !matches!(self.grant, FlowGrant::JwtBearer) {
            return Err(AuthError::Unsupported("not a jwt-bearer flow"));
        }
        let request = AssertionTokenRequestParameters {
            grant_type: TokenGrantType::JwtBearer,
            assertion: assertion.into(),
            scope: Some(self.scope_string()),
        };
        let token = self
            .exchange(http.as_ref(), request, dpop_proof.as_deref())
            .await?;
        Ok(Credential::new(http, self.data.client, token))
    }

    async fn exchange<T, P>(
        &self,
        http: &T,
        request: P,
        dpop_proof: Option<&str>,
    ) -> Result<TokenResponse>
    where
        T: HttpClient,
        P: serde::Serialize,
    {
        let auth = select_client_auth(&self.data.client)?;
        let response: TokenEndpointResponse = endpoint_request(
            http,
            &self.data.client.metadata.token_endpoint,
            &auth,
            request,
            dpop_proof,
        )
        .await?;
        Ok(TokenResponse::from_endpoint(response, Utc::now()))
    }

    fn check_iss(&self, iss: Option<&str>) -> Result<()> {
        // https://datatracker.ietf.org/doc/html/rfc9207
        let metadata = &self.data.client.metadata;
        match iss {
            Some(iss) => {
                let iss = Url::parse(iss)?;
                if !issuer_match(&iss, &metadata.issuer) {
                    return Err(AuthError::Callback(format!(
                        "issuer mismatch: expected {}, got {iss}",
                        metadata.issuer
                    )));
                }
            }
            None if metadata.authorization_response_iss_parameter_supported == Some(true) => {
                return Err(AuthError::Callback("missing `iss` parameter".into()));
            }
            None => {}
        }
        Ok(())
    }
}

fn implicit_response_type(client: &Client) -> String {
    let supported = &client.metadata.response_types_supported;
    let both = supported.iter().find(|rt| {
        let parts: Vec<&str> = rt.split_whitespace().collect();
        parts.contains(&"token") && parts.contains(&"id_token")
    });
    both.or_else(|| supported.iter().find(|rt| rt.trim() == "id_token"))
        .or_else(|| supported.iter().find(|rt| rt.trim() == "token"))
        .cloned()
        .unwrap_or_else(|| "id_token token".to_owned())
}
