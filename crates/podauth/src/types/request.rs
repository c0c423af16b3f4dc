use serde::{Deserialize, Serialize};

/// Grant type carried in a token endpoint request body.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TokenGrantType {
    AuthorizationCode,
    RefreshToken,
    Password,
    ClientCredentials,
    // https://datatracker.ietf.org/doc/html/rfc7523#section-2.1
    #[serde(rename = "urn:ietf:params:oauth:grant-type:jwt-bearer")]
    JwtBearer,
}

#[derive(Serialize, Debug, Clone)]
pub struct AuthorizationRequestParameters {
    // https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.1
    pub response_type: String,
    pub client_id: String,
    pub redirect_uri: String,
    pub scope: String,
    pub state: String,
    // https://datatracker.ietf.org/doc/html/rfc7636#section-4.3
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_challenge_method: Option<&'static str>,
    // https://openid.net/specs/openid-connect-core-1_0.html#AuthRequest
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub login_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nonce: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct CodeTokenRequestParameters {
    // https://datatracker.ietf.org/doc/html/rfc6749#section-4.1.3
    pub grant_type: TokenGrantType,
    pub code: String,
    pub redirect_uri: String,
    // https://datatracker.ietf.org/doc/html/rfc7636#section-4.5
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_verifier: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct PasswordTokenRequestParameters {
    // https://datatracker.ietf.org/doc/html/rfc6749#section-4.3.2
    pub grant_type: TokenGrantType,
    pub username: String,
    pub password: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct ClientCredentialsTokenRequestParameters {
    // https://datatracker.ietf.org/doc/html/rfc6749#section-4.4.2
    pub grant_type: TokenGrantType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct AssertionTokenRequestParameters {
    // https://datatracker.ietf.org/doc/html/rfc7523#section-2.1
    pub grant_type: TokenGrantType,
    pub assertion: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct RefreshRequestParameters {
    // https://datatracker.ietf.org/doc/html/rfc6749#section-6
    pub grant_type: TokenGrantType,
    pub refresh_token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

#[derive(Serialize, Debug, Clone)]
pub struct RevocationRequestParameters {
    // https://datatracker.ietf.org/doc/html/rfc7009#section-2.1
    pub token: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_type_hint: Option<&'static str>,
}
