use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use miette::Diagnostic;
use rsa::RsaPrivateKey;
use rsa::pkcs1v15::{Signature, SigningKey};
use rsa::pkcs8::DecodePrivateKey;
use sha2::Sha256;
use signature::{SignatureEncoding, Signer};
use thiserror::Error;

use super::{jws::Header, jwt::Claims};

/// Signing failure: the key material is malformed. Fatal and non-transient;
/// signing itself is deterministic given the inputs and never retried.
#[derive(Debug, Error, Diagnostic)]
pub enum SigningError {
    #[error("private key does not parse: {0}")]
    #[diagnostic(
        code(podauth::signing::key),
        help("the private key must be PKCS#8 PEM for an RSA key")
    )]
    Key(#[source] rsa::pkcs8::Error),
    #[error("JWT serialization failed: {0}")]
    #[diagnostic(code(podauth::signing::serde))]
    Serde(#[from] serde_json::Error),
    #[error("public key JWK conversion failed: {0}")]
    #[diagnostic(code(podauth::signing::jwk))]
    Jwk(#[source] crate::keys::CryptoError),
}

/// Parse a PKCS#8 PEM private key into an RS256 signing key.
pub fn signing_key_from_pem(private_pem: &str) -> Result<SigningKey<Sha256>, SigningError> {
    let private = RsaPrivateKey::from_pkcs8_pem(private_pem).map_err(SigningError::Key)?;
    Ok(SigningKey::<Sha256>::new(private))
}

/// Build a compact JWS (RS256) over the given header and claims.
pub fn create_signed_jwt(
    key: &SigningKey<Sha256>,
    header: &Header,
    claims: &Claims,
) -> Result<String, SigningError> {
    let header = URL_SAFE_NO_PAD.encode(serde_json::to_string(header)?);
    let payload = URL_SAFE_NO_PAD.encode(serde_json::to_string(claims)?);
    let signature: Signature = key.sign(format!("{header}.{payload}").as_bytes());
    Ok(format!(
        "{header}.{payload}.{}",
        URL_SAFE_NO_PAD.encode(signature.to_bytes())
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jose::jwt::RegisteredClaims;
    use crate::keys::test_keys;
    use rsa::RsaPublicKey;
    use rsa::pkcs1v15::VerifyingKey;
    use rsa::pkcs8::DecodePublicKey;
    use signature::Verifier;

    #[test]
    fn signed_jwt_verifies_against_public_key() {
        let pair = test_keys::key_pair();
        let key = signing_key_from_pem(&pair.private_key).unwrap();
        let claims = Claims::from(RegisteredClaims {
            iat: Some(1_700_000_000),
            jti: Some("abc".into()),
            ..Default::default()
        });
        let jwt = create_signed_jwt(&key, &Header::rs256(), &claims).unwrap();

        let mut parts = jwt.rsplitn(2, '.');
        let sig = URL_SAFE_NO_PAD.decode(parts.next().unwrap()).unwrap();
        let signed = parts.next().unwrap();

        let public = RsaPublicKey::from_public_key_pem(&pair.public_key).unwrap();
        let verifier = VerifyingKey::<Sha256>::new(public);
        let signature = Signature::try_from(sig.as_slice()).unwrap();
        verifier.verify(signed.as_bytes(), &signature).unwrap();
    }

    #[test]
    fn malformed_private_key_is_a_signing_error() {
        let err = signing_key_from_pem("-----BEGIN GARBAGE-----").unwrap_err();
        assert!(matches!(err, SigningError::Key(_)));
    }
}
