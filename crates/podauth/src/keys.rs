//! RSA signing key material for DPoP-bound sessions.
//!
//! Key pairs are held as PEM strings (SPKI public, PKCS#8 private) so they
//! serialize cleanly into secure storage and across thread boundaries; they
//! carry no live handles. The JWK form embedded in DPoP proof headers is
//! recomputed from the public PEM on demand.

use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use miette::Diagnostic;
use rsa::pkcs8::{DecodePublicKey, EncodePrivateKey, EncodePublicKey, LineEnding};
use rsa::traits::PublicKeyParts;
use rsa::{RsaPrivateKey, RsaPublicKey};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default RSA modulus size. Larger keys are accepted at a generation cost
/// that grows roughly with the cube of the modulus size.
pub const DEFAULT_KEY_BITS: usize = 2048;

/// Signing algorithm used for every key this module produces.
pub const ALG_RS256: &str = "RS256";

/// Key generation or parsing failure. Fatal and non-retryable.
#[derive(Debug, Error, Diagnostic)]
pub enum CryptoError {
    #[error("key generation failed: {0}")]
    #[diagnostic(
        code(podauth::crypto::generate),
        help("the backing RNG or RSA primitive is unavailable or the bit size is invalid")
    )]
    Generate(#[source] rsa::Error),
    #[error("invalid public key PEM: {0}")]
    #[diagnostic(code(podauth::crypto::public_pem))]
    PublicPem(#[source] rsa::pkcs8::spki::Error),
    #[error("invalid private key PEM: {0}")]
    #[diagnostic(code(podauth::crypto::private_pem))]
    PrivatePem(#[source] rsa::pkcs8::Error),
}

/// An RSA key pair in PEM form. Immutable once generated.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeyPair {
    /// SPKI PEM.
    pub public_key: String,
    /// PKCS#8 PEM.
    pub private_key: String,
}

impl std::fmt::Debug for KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyPair")
            .field("public_key", &self.public_key)
            .field("private_key", &"<redacted>")
            .finish()
    }
}

impl KeyPair {
    /// Generate a fresh RSA key pair of the given modulus size.
    pub fn generate(bits: usize) -> Result<KeyPair, CryptoError> {
        let mut rng = rand::thread_rng();
        let private = RsaPrivateKey::new(&mut rng, bits).map_err(CryptoError::Generate)?;
        let public = RsaPublicKey::from(&private);
        Ok(KeyPair {
            public_key: public
                .to_public_key_pem(LineEnding::LF)
                .map_err(CryptoError::PublicPem)?,
            private_key: private
                .to_pkcs8_pem(LineEnding::LF)
                .map_err(CryptoError::PrivatePem)?
                .to_string(),
        })
    }

    /// Generate with the default modulus size.
    pub fn generate_default() -> Result<KeyPair, CryptoError> {
        Self::generate(DEFAULT_KEY_BITS)
    }

    /// JWK form of the public key. Deterministic; `alg` is always RS256.
    pub fn to_jwk(&self) -> Result<RsaPublicJwk, CryptoError> {
        RsaPublicJwk::from_public_key_pem(&self.public_key)
    }
}

/// RSA public key in JWK form, as embedded in DPoP proof headers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RsaPublicJwk {
    pub kty: String,
    pub alg: String,
    /// Modulus, unpadded base64url big-endian.
    pub n: String,
    /// Public exponent, unpadded base64url big-endian.
    pub e: String,
    #[serde(rename = "use", skip_serializing_if = "Option::is_none")]
    pub use_: Option<String>,
}

impl RsaPublicJwk {
    /// Convert an SPKI PEM public key to its JWK form.
    pub fn from_public_key_pem(pem: &str) -> Result<RsaPublicJwk, CryptoError> {
        let public = RsaPublicKey::from_public_key_pem(pem).map_err(CryptoError::PublicPem)?;
        Ok(RsaPublicJwk {
            kty: "RSA".into(),
            alg: ALG_RS256.into(),
            n: URL_SAFE_NO_PAD.encode(public.n().to_bytes_be()),
            e: URL_SAFE_NO_PAD.encode(public.e().to_bytes_be()),
            use_: Some("sig".into()),
        })
    }

    /// The JWK as a JSON object map, for callers that need the untyped form.
    pub fn to_map(&self) -> serde_json::Map<String, serde_json::Value> {
        match serde_json::to_value(self) {
            Ok(serde_json::Value::Object(map)) => map,
            _ => unreachable!("JWK serializes to an object"),
        }
    }
}

#[cfg(test)]
pub(crate) mod test_keys {
    use super::*;
    use std::sync::OnceLock;

    /// One shared key pair per test binary; RSA generation is not cheap.
    pub(crate) fn key_pair() -> &'static KeyPair {
        static KEY: OnceLock<KeyPair> = OnceLock::new();
        KEY.get_or_init(|| KeyPair::generate_default().expect("key generation"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn jwk_always_carries_rs256() {
        let jwk = test_keys::key_pair().to_jwk().unwrap();
        assert_eq!(jwk.alg, "RS256");
        assert_eq!(jwk.kty, "RSA");
        assert!(!jwk.n.is_empty());
        // 65537
        assert_eq!(jwk.e, "AQAB");
    }

    #[test]
    fn to_jwk_is_deterministic() {
        let pair = test_keys::key_pair();
        assert_eq!(pair.to_jwk().unwrap(), pair.to_jwk().unwrap());
    }

    #[test]
    fn key_pair_round_trips_through_json() {
        let pair = test_keys::key_pair();
        let json = serde_json::to_string(pair).unwrap();
        assert!(json.contains("publicKey"));
        assert!(json.contains("privateKey"));
        let back: KeyPair = serde_json::from_str(&json).unwrap();
        assert_eq!(&back, pair);
    }

    #[test]
    fn malformed_pem_is_rejected() {
        assert!(RsaPublicJwk::from_public_key_pem("not a pem").is_err());
    }

    #[test]
    fn debug_redacts_private_key() {
        let rendered = format!("{:?}", test_keys::key_pair());
        assert!(!rendered.contains("PRIVATE KEY"));
    }
}
