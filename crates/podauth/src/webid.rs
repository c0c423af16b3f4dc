//! WebID extraction from a completed authentication, and the anti-spoofing
//! issuer check.
//!
//! Extraction walks an ordered fallback chain over the authentication
//! result: a literal `webid` claim, then a URI-shaped `sub`, then the
//! `website` claim of a DPoP-authenticated UserInfo fetch. Whatever it
//! yields is only trusted after validation re-resolves the WebID's own
//! profile and finds the asserting issuer declared there; an issuer
//! cannot vouch for an identity that does not name it.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use http::{Request, StatusCode};
use podauth_common::{EndpointError, HttpClient, TransportError};
use podauth_webid::{IssuerResolver, issuer_match};
use serde_json::Value;
use url::Url;

use crate::client::Client;
use crate::dpop::{self, DpopProof};
use crate::error::{AuthError, Result};
use crate::keys::KeyPair;
use crate::types::TokenResponse;

/// Decode the payload claims of a compact JWT without verifying its
/// signature. Signature verification against the issuer's JWKS is the
/// transport layer's concern, not this crate's.
pub fn decode_claims(jwt: &str) -> Result<serde_json::Map<String, Value>> {
    let payload = jwt
        .split('.')
        .nth(1)
        .ok_or_else(|| AuthError::InvalidToken("not in compact serialization".into()))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))?;
    match serde_json::from_slice(&bytes)? {
        Value::Object(map) => Ok(map),
        _ => Err(AuthError::InvalidToken("payload is not a JSON object".into())),
    }
}

/// Parse a claim value as a WebID-shaped URI: http(s) with a host.
fn as_web_uri(value: &str) -> Option<Url> {
    let url = Url::parse(value).ok()?;
    if matches!(url.scheme(), "http" | "https") && url.host_str().is_some_and(|h| !h.is_empty()) {
        Some(url)
    } else {
        None
    }
}

/// Extract a candidate WebID from a completed authentication result.
///
/// Fallback order, first match wins:
/// 1. a claim literally named `webid`,
/// 2. the `sub` claim when it is itself an http(s) URI,
/// 3. the `website` claim from the UserInfo endpoint.
pub async fn extract_web_id<T: HttpClient + Sync>(
    http: &T,
    key_pair: &KeyPair,
    client: &Client,
    token: &TokenResponse,
) -> Result<Url> {
    // prefer id-token claims; Solid access tokens are often JWTs too and
    // serve as the fallback claim source
    let mut claims = serde_json::Map::new();
    for jwt in [token.id_token.as_deref(), token.access_token.as_deref()]
        .into_iter()
        .flatten()
    {
        if let Ok(parsed) = decode_claims(jwt) {
            claims = parsed;
            break;
        }
    }

    if let Some(web_id) = claims
        .get("webid")
        .and_then(Value::as_str)
        .and_then(as_web_uri)
    {
        return Ok(web_id);
    }
    if let Some(web_id) = claims
        .get("sub")
        .and_then(Value::as_str)
        .and_then(as_web_uri)
    {
        return Ok(web_id);
    }
    if let Some(web_id) = fetch_userinfo_website(http, key_pair, client, token).await? {
        return Ok(web_id);
    }
    Err(AuthError::NoWebIdFound)
}

async fn fetch_userinfo_website<T: HttpClient + Sync>(
    http: &T,
    key_pair: &KeyPair,
    client: &Client,
    token: &TokenResponse,
) -> Result<Option<Url>> {
    let (Some(endpoint), Some(access_token)) = (
        client.metadata.userinfo_endpoint.as_ref(),
        token.access_token.as_ref(),
    ) else {
        return Ok(None);
    };

    let proof = DpopProof {
        dpop_token: dpop::proof_now(key_pair, endpoint, "GET")?,
        access_token: access_token.clone(),
    };
    let mut builder = Request::builder()
        .uri(endpoint.as_str())
        .header("Accept", "application/json");
    for (name, value) in proof.header_pairs() {
        builder = builder.header(name, value);
    }
    let req = builder
        .body(Vec::new())
        .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
    let res = http.send_http(req).await.map_err(TransportError::other)?;
    if res.status() != StatusCode::OK {
        return Err(EndpointError::classify(res.status(), res.body()).into());
    }
    let userinfo: Value = serde_json::from_slice(res.body())?;
    Ok(userinfo
        .get("website")
        .and_then(Value::as_str)
        .and_then(as_web_uri))
}

/// The anti-spoofing check: re-resolve the WebID independently and require
/// the authenticating issuer among its declared issuers (normalized
/// comparison). Resolution failures here are fatal, unlike during login.
pub async fn validate_issuer<R: IssuerResolver + Sync>(
    resolver: &R,
    web_id: &Url,
    issuer: &Url,
) -> Result<()> {
    let declared = resolver.resolve_strict(web_id).await?;
    if declared.iter().any(|candidate| issuer_match(candidate, issuer)) {
        Ok(())
    } else {
        Err(AuthError::IssuerNotAuthorized {
            web_id: web_id.clone(),
            issuer: issuer.clone(),
        })
    }
}
