//! Just enough JOSE to mint RS256 compact JWTs with an embedded public JWK.

pub mod jws;
pub mod jwt;
pub mod signing;

pub use self::signing::{SigningError, create_signed_jwt, signing_key_from_pem};
