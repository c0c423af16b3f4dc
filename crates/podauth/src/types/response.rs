use serde::{Deserialize, Serialize};
use url::Url;

/// Token endpoint success body.
///
/// <https://datatracker.ietf.org/doc/html/rfc6749#section-5.1>
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct TokenEndpointResponse {
    pub access_token: String,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
    pub refresh_token: Option<String>,
    pub id_token: Option<String>,
    pub scope: Option<String>,
}

/// Parameters delivered back to the redirect URI.
///
/// Code flows use the query component; implicit flows deliver tokens
/// directly in the fragment. [`CallbackParams::from_redirect_uri`] reads
/// both.
#[derive(Deserialize, Debug, Clone, Default, PartialEq, Eq)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    // https://datatracker.ietf.org/doc/html/rfc9207#section-2
    pub iss: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
    pub error_uri: Option<String>,
    // implicit grants only
    pub access_token: Option<String>,
    pub id_token: Option<String>,
    pub token_type: Option<String>,
    pub expires_in: Option<i64>,
}

impl CallbackParams {
    /// Parse from a raw query or fragment string.
    pub fn from_query(query: &str) -> Result<Self, serde_html_form::de::Error> {
        serde_html_form::from_str(query)
    }

    /// Parse from a full redirect URI, merging query and fragment
    /// parameters (fragment values win; implicit responses use it).
    pub fn from_redirect_uri(uri: &Url) -> Result<Self, serde_html_form::de::Error> {
        let query = uri.query().unwrap_or_default();
        let fragment = uri.fragment().unwrap_or_default();
        let merged = match (query.is_empty(), fragment.is_empty()) {
            (false, false) => format!("{query}&{fragment}"),
            (false, true) => query.to_owned(),
            _ => fragment.to_owned(),
        };
        Self::from_query(&merged)
    }
}
