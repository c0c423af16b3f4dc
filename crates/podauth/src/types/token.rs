use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};

use super::TokenEndpointResponse;

/// The token state a credential holds.
///
/// All fields are optional: a credential that has nothing to offer hands
/// back an empty token rather than failing, and callers check presence
/// themselves. `expires_at` is absolute, computed from `expires_in` at the
/// moment the endpoint response was received.
#[derive(Serialize, Deserialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenResponse {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: Option<String>,
    pub scope: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl TokenResponse {
    /// Convert an endpoint body, anchoring the expiry to `received_at`.
    pub fn from_endpoint(response: TokenEndpointResponse, received_at: DateTime<Utc>) -> Self {
        let expires_at = response
            .expires_in
            .and_then(|secs| received_at.checked_add_signed(TimeDelta::seconds(secs)));
        Self {
            access_token: Some(response.access_token),
            refresh_token: response.refresh_token,
            id_token: response.id_token,
            token_type: response.token_type,
            scope: response.scope,
            expires_at,
        }
    }

    /// Whether the access token's lifetime has elapsed. A token without an
    /// expiry never counts as expired.
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Utc::now() >= at)
    }

    /// Neither an access token nor a refresh token is present.
    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn endpoint_response(expires_in: Option<i64>) -> TokenEndpointResponse {
        TokenEndpointResponse {
            access_token: "at".into(),
            token_type: Some("DPoP".into()),
            expires_in,
            refresh_token: Some("rt".into()),
            id_token: None,
            scope: Some("openid webid".into()),
        }
    }

    #[test]
    fn expiry_is_anchored_to_receipt_time() {
        let received = Utc::now();
        let token = TokenResponse::from_endpoint(endpoint_response(Some(3600)), received);
        assert_eq!(
            token.expires_at,
            Some(received + TimeDelta::seconds(3600))
        );
        assert!(!token.is_expired());
    }

    #[test]
    fn past_expiry_counts_as_expired() {
        let received = Utc::now() - TimeDelta::seconds(7200);
        let token = TokenResponse::from_endpoint(endpoint_response(Some(3600)), received);
        assert!(token.is_expired());
    }

    #[test]
    fn no_expiry_never_expires() {
        let token = TokenResponse::from_endpoint(endpoint_response(None), Utc::now());
        assert!(!token.is_expired());
        assert!(!token.is_empty());
    }

    #[test]
    fn default_token_is_empty() {
        assert!(TokenResponse::default().is_empty());
    }
}
