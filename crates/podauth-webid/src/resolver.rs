//! Issuer resolution: login input → ordered candidate issuer URIs.
//!
//! Resolution order (default):
//! - Fetch the input as a WebID profile document and return its declared
//!   `oidcIssuer` URIs when present.
//! - On fetch/parse failure or when the profile declares no issuer, fall
//!   back to treating the input literally as an issuer URL. The caller may
//!   already hold a valid issuer string, so this degradation is deliberate;
//!   it is reported through a `tracing` event rather than silently.

use std::future::Future;

use http::{Request, StatusCode};
use miette::Diagnostic;
use podauth_common::{HttpClient, TransportError};
use thiserror::Error;
use url::Url;

use crate::profile::WebIdProfile;

/// Error raised while fetching or parsing a profile document.
#[derive(Debug, Error, Diagnostic)]
pub enum FetchError {
    #[error(transparent)]
    #[diagnostic(code(podauth_webid::fetch::transport))]
    Transport(#[from] TransportError),
    #[error("http status {0}")]
    #[diagnostic(
        code(podauth_webid::fetch::http_status),
        help("the profile document must be publicly readable")
    )]
    HttpStatus(StatusCode),
    #[error("profile parse error: {0}")]
    #[diagnostic(
        code(podauth_webid::fetch::parse),
        help("the profile must be a JSON-LD document")
    )]
    Parse(#[from] serde_json::Error),
}

/// Error raised by issuer resolution.
#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    /// The input is neither a dereferenceable document nor a URL.
    #[error("not a valid WebID or issuer URL: {0}")]
    #[diagnostic(
        code(podauth_webid::resolve::invalid_input),
        help("provide an https WebID or an issuer base URL")
    )]
    InvalidInput(String),
    /// Profile fetch failed while failure was fatal (validation context).
    #[error(transparent)]
    #[diagnostic(transparent)]
    Fetch(#[from] FetchError),
}

/// Fetches a WebID profile document. Implementations own transport,
/// content negotiation, and parsing into [`WebIdProfile`].
#[trait_variant::make(Send)]
pub trait DocumentFetcher {
    fn fetch(&self, uri: &Url) -> impl Future<Output = Result<WebIdProfile, FetchError>>;
}

/// Maps a WebID or issuer string to an ordered list of candidate issuers.
///
/// Callers may substitute any implementation with the same contract;
/// [`WebIdIssuerResolver`] is the default.
#[trait_variant::make(Send)]
pub trait IssuerResolver {
    fn resolve(&self, input: &str) -> impl Future<Output = Result<Vec<Url>, ResolveError>>;

    /// Resolve without the literal-URI fallback: fetch failures and empty
    /// profiles are fatal. Used when validating an already-asserted
    /// identity, where degrading would defeat the anti-spoofing check.
    fn resolve_strict(&self, web_id: &Url)
    -> impl Future<Output = Result<Vec<Url>, ResolveError>>;
}

/// Default resolver: profile-document lookup with literal-URI fallback.
#[derive(Debug, Clone)]
pub struct WebIdIssuerResolver<F> {
    fetcher: F,
}

impl<F> WebIdIssuerResolver<F> {
    pub fn new(fetcher: F) -> Self {
        Self { fetcher }
    }
}

impl<F: DocumentFetcher + Sync> IssuerResolver for WebIdIssuerResolver<F> {
    async fn resolve(&self, input: &str) -> Result<Vec<Url>, ResolveError> {
        let url = Url::parse(input)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .ok_or_else(|| ResolveError::InvalidInput(input.to_owned()))?;

        match self.fetcher.fetch(&url).await {
            Ok(profile) if profile.has_issuers() => Ok(profile.oidc_issuers),
            Ok(_) => {
                tracing::debug!(input, "profile declares no issuer; using input as issuer");
                Ok(vec![url])
            }
            Err(e) => {
                tracing::debug!(input, error = %e, "profile fetch failed; using input as issuer");
                Ok(vec![url])
            }
        }
    }

    async fn resolve_strict(&self, web_id: &Url) -> Result<Vec<Url>, ResolveError> {
        let profile = self.fetcher.fetch(web_id).await?;
        Ok(profile.oidc_issuers)
    }
}

/// [`DocumentFetcher`] over an [`HttpClient`], negotiating JSON-LD.
#[derive(Debug, Clone)]
pub struct HttpDocumentFetcher<T> {
    client: T,
}

impl<T> HttpDocumentFetcher<T> {
    pub fn new(client: T) -> Self {
        Self { client }
    }
}

impl<T: HttpClient + Sync> DocumentFetcher for HttpDocumentFetcher<T> {
    async fn fetch(&self, uri: &Url) -> Result<WebIdProfile, FetchError> {
        let req = Request::builder()
            .uri(uri.as_str())
            .header("Accept", "application/ld+json")
            .body(Vec::new())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;
        let res = self
            .client
            .send_http(req)
            .await
            .map_err(TransportError::other)?;
        if res.status() != StatusCode::OK {
            return Err(FetchError::HttpStatus(res.status()));
        }
        let document = serde_json::from_slice(res.body())?;
        Ok(WebIdProfile::from_document(uri.clone(), &document))
    }
}

/// Normalize an issuer URL for comparison: the `url` crate already
/// lowercases scheme and host and elides default ports; this additionally
/// strips a trailing slash from the path.
pub fn normalize_issuer(url: &Url) -> String {
    let mut s = String::new();
    s.push_str(url.scheme());
    s.push_str("://");
    if let Some(host) = url.host_str() {
        s.push_str(host);
    }
    if let Some(port) = url.port() {
        s.push_str(&format!(":{port}"));
    }
    let path = url.path().trim_end_matches('/');
    s.push_str(path);
    s
}

/// Whether two issuer URLs are equivalent after normalization.
pub fn issuer_match(a: &Url, b: &Url) -> bool {
    normalize_issuer(a) == normalize_issuer(b)
}
