use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::rngs::ThreadRng;
use rand::{CryptoRng, Rng, RngCore};
use sha2::{Digest, Sha256};

/// PKCE verifier length, in characters.
///
/// <https://datatracker.ietf.org/doc/html/rfc7636#section-4.1>
pub const PKCE_VERIFIER_LEN: usize = 50;

pub fn get_random_values<R, const LEN: usize>(rng: &mut R) -> [u8; LEN]
where
    R: RngCore + CryptoRng,
{
    let mut bytes = [0u8; LEN];
    rng.fill_bytes(&mut bytes);
    bytes
}

/// Anti-CSRF state nonce for one authentication attempt.
pub fn generate_state() -> String {
    URL_SAFE_NO_PAD.encode(get_random_values::<_, 16>(&mut ThreadRng::default()))
}

/// OIDC request nonce.
pub fn generate_nonce() -> String {
    URL_SAFE_NO_PAD.encode(get_random_values::<_, 16>(&mut ThreadRng::default()))
}

/// Derive a PKCE pair: `(code_challenge, code_verifier)`, challenge =
/// unpadded base64url of SHA-256 over the verifier, method S256.
pub fn generate_pkce() -> (String, String) {
    let verifier: String = ThreadRng::default()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(PKCE_VERIFIER_LEN)
        .map(char::from)
        .collect();
    let challenge = URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()));
    (challenge, verifier)
}
