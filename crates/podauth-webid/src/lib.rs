//! WebID profile discovery and issuer resolution.
//!
//! A WebID is an HTTPS URI that dereferences to a profile document naming,
//! among other things, the identity providers authorized to assert that
//! identity (`solid:oidcIssuer`). This crate models the slice of the profile
//! the authentication core needs and implements the resolution protocol that
//! maps a login input (WebID or issuer URL) to an ordered list of candidate
//! issuers.

pub mod profile;
pub mod resolver;

pub use profile::WebIdProfile;
pub use resolver::{
    DocumentFetcher, FetchError, HttpDocumentFetcher, IssuerResolver, ResolveError,
    WebIdIssuerResolver, issuer_match, normalize_issuer,
};
