use serde::{Deserialize, Serialize};

use crate::keys::{ALG_RS256, RsaPublicJwk};

/// JWS protected header. Only the fields this crate emits.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Header {
    pub alg: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub typ: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwk: Option<RsaPublicJwk>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,
}

impl Header {
    /// An RS256 header with no optional fields set.
    pub fn rs256() -> Self {
        Self {
            alg: ALG_RS256.into(),
            typ: None,
            jwk: None,
            kid: None,
        }
    }
}
