//! The live, refreshable token state resulting from a completed flow.
//!
//! A credential is the only component allowed to mutate its token. The
//! token field is a single-writer-at-a-time resource: reads go through an
//! `RwLock`, and refreshes additionally serialize on a dedicated mutex with
//! a double-check after acquisition, so an expiry-triggered refresh and an
//! explicit one cannot produce lost updates.

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use podauth_common::HttpClient;
use tokio::sync::{Mutex, RwLock, broadcast};
use url::Url;

use crate::client::{Client, endpoint_request, select_client_auth};
use crate::error::{AuthError, Result};
use crate::types::{
    RefreshRequestParameters, RevocationRequestParameters, TokenEndpointResponse, TokenGrantType,
    TokenResponse,
};

/// Options for [`Credential::get_token_response`].
#[derive(Debug, Clone, Default)]
pub struct GetTokenOptions {
    /// Refresh even when the cached token has not expired.
    pub force_refresh: bool,
    /// DPoP proof for the token endpoint, attached as a `DPoP` header.
    pub dpop_proof: Option<String>,
}

/// Mints token-endpoint DPoP proofs for scheduled refreshes.
pub type DpopProofFn = Arc<dyn Fn(&Url, &str) -> Option<String> + Send + Sync>;

/// Token-bearing credential for one completed grant.
///
/// Created on successful exchange or session restore; destroyed on logout.
#[derive(Debug)]
pub struct Credential<T> {
    http: Arc<T>,
    client: Client,
    token: RwLock<TokenResponse>,
    refresh_gate: Mutex<()>,
    updates: broadcast::Sender<TokenResponse>,
    nonce: Option<String>,
}

impl<T> Credential<T> {
    pub fn new(http: Arc<T>, client: Client, token: TokenResponse) -> Self {
        let (updates, _) = broadcast::channel(16);
        Self {
            http,
            client,
            token: RwLock::new(token),
            refresh_gate: Mutex::new(()),
            updates,
            nonce: None,
        }
    }

    /// Attach the request nonce the authorization leg carried, for callers
    /// that validate the id token against it.
    pub fn with_nonce(mut self, nonce: impl Into<String>) -> Self {
        self.nonce = Some(nonce.into());
        self
    }

    pub fn nonce(&self) -> Option<&str> {
        self.nonce.as_deref()
    }

    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Snapshot of the current token state.
    pub async fn token(&self) -> TokenResponse {
        self.token.read().await.clone()
    }

    /// Every successful token replacement is published here, so dependents
    /// observe new access tokens without polling.
    pub fn subscribe(&self) -> broadcast::Receiver<TokenResponse> {
        self.updates.subscribe()
    }
}

impl<T: HttpClient + Sync> Credential<T> {
    /// Return the cached token, refreshing it first when it has expired or
    /// the caller forces it.
    ///
    /// Without a refresh token there is nothing to exchange, so the token
    /// is handed back as-is, empty tokens included; callers check presence
    /// themselves.
    pub async fn get_token_response(&self, options: GetTokenOptions) -> Result<TokenResponse> {
        let current = self.token().await;
        if !options.force_refresh && !current.is_expired() {
            return Ok(current);
        }
        if current.refresh_token.is_none() {
            return Ok(current);
        }
        self.refresh(options).await
    }

    async fn refresh(&self, options: GetTokenOptions) -> Result<TokenResponse> {
        let _gate = self.refresh_gate.lock().await;
        // another task may have refreshed while we waited on the gate
        let current = self.token().await;
        if !options.force_refresh && !current.is_expired() {
            return Ok(current);
        }
        let Some(refresh_token) = current.refresh_token.clone() else {
            return Ok(current);
        };

        let auth = select_client_auth(&self.client)?;
        let response: TokenEndpointResponse = endpoint_request(
            self.http.as_ref(),
            &self.client.metadata.token_endpoint,
            &auth,
            RefreshRequestParameters {
                grant_type: TokenGrantType::RefreshToken,
                refresh_token: refresh_token.clone(),
                scope: None,
            },
            options.dpop_proof.as_deref(),
        )
        .await?;

        let mut next = TokenResponse::from_endpoint(response, Utc::now());
        // providers may omit the refresh token on rotation-free refreshes
        if next.refresh_token.is_none() {
            next.refresh_token = Some(refresh_token);
        }
        *self.token.write().await = next.clone();
        let _ = self.updates.send(next.clone());
        Ok(next)
    }

    /// Revoke the current token at the provider, preferring the refresh
    /// token as the `token_type_hint`.
    pub async fn revoke(&self) -> Result<()> {
        let endpoint = self
            .client
            .metadata
            .revocation_endpoint
            .clone()
            .ok_or(AuthError::Unsupported(
                "provider does not advertise a revocation endpoint",
            ))?;
        let current = self.token().await;
        let (token, hint) = if let Some(refresh) = current.refresh_token {
            (refresh, "refresh_token")
        } else if let Some(access) = current.access_token {
            (access, "access_token")
        } else {
            // nothing issued, nothing to revoke
            return Ok(());
        };
        let auth = select_client_auth(&self.client)?;
        endpoint_request::<(), _, _>(
            self.http.as_ref(),
            &endpoint,
            &auth,
            RevocationRequestParameters {
                token,
                token_type_hint: Some(hint),
            },
            None,
        )
        .await
    }
}

/// Cancels the scheduled refresh task when dropped, so a disposed
/// credential leaves no dangling timer behind.
#[derive(Debug)]
pub struct AutoRefreshGuard {
    handle: tokio::task::JoinHandle<()>,
}

impl Drop for AutoRefreshGuard {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

impl<T: HttpClient + Send + Sync + 'static> Credential<T> {
    /// Refresh `margin` ahead of every expiry until the guard is dropped.
    ///
    /// `proof` mints the token-endpoint DPoP proof per attempt; pass `None`
    /// for providers issuing Bearer tokens.
    pub fn spawn_auto_refresh(
        self: &Arc<Self>,
        margin: Duration,
        proof: Option<DpopProofFn>,
    ) -> AutoRefreshGuard {
        let credential = Arc::clone(self);
        let handle = tokio::spawn(async move {
            let mut updates = credential.subscribe();
            loop {
                let token = credential.token().await;
                let schedulable = token.refresh_token.is_some() && token.expires_at.is_some();
                let Some(expires_at) = token.expires_at.filter(|_| schedulable) else {
                    // nothing to schedule until a refreshable token with an
                    // expiry arrives
                    match updates.recv().await {
                        Ok(_) | Err(broadcast::error::RecvError::Lagged(_)) => continue,
                        Err(broadcast::error::RecvError::Closed) => break,
                    }
                };
                let refresh_at =
                    expires_at - TimeDelta::from_std(margin).unwrap_or_else(|_| TimeDelta::zero());
                let wait = (refresh_at - Utc::now()).to_std().unwrap_or(Duration::ZERO);
                tokio::time::sleep(wait).await;

                let proof = proof
                    .as_ref()
                    .and_then(|mint| mint(&credential.client.metadata.token_endpoint, "POST"));
                if let Err(e) = credential
                    .get_token_response(GetTokenOptions {
                        force_refresh: true,
                        dpop_proof: proof,
                    })
                    .await
                {
                    tracing::warn!(error = %e, "scheduled token refresh failed; backing off");
                    tokio::time::sleep(margin.max(Duration::from_secs(1))).await;
                }
            }
        });
        AutoRefreshGuard { handle }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use http::StatusCode;
    use std::collections::VecDeque;

    #[derive(Default)]
    struct MockHttp {
        responses: Mutex<VecDeque<http::Response<Vec<u8>>>>,
        requests: Mutex<Vec<http::Request<Vec<u8>>>>,
    }

    impl MockHttp {
        async fn push_json(&self, status: StatusCode, body: serde_json::Value) {
            self.responses.lock().await.push_back(
                http::Response::builder()
                    .status(status)
                    .body(serde_json::to_vec(&body).unwrap())
                    .unwrap(),
            );
        }

        async fn push_empty(&self, status: StatusCode) {
            self.responses.lock().await.push_back(
                http::Response::builder()
                    .status(status)
                    .body(Vec::new())
                    .unwrap(),
            );
        }
    }

    impl HttpClient for MockHttp {
        type Error = std::convert::Infallible;
        async fn send_http(
            &self,
            request: http::Request<Vec<u8>>,
        ) -> core::result::Result<http::Response<Vec<u8>>, Self::Error> {
            self.requests.lock().await.push(request);
            Ok(self
                .responses
                .lock()
                .await
                .pop_front()
                .expect("unexpected HTTP call"))
        }
    }

    fn test_client(revocation: bool) -> Client {
        let mut metadata = crate::types::IssuerMetadata::new(
            Url::parse("https://idp.example").unwrap(),
            Url::parse("https://idp.example/authorize").unwrap(),
            Url::parse("https://idp.example/token").unwrap(),
        );
        metadata.token_endpoint_auth_methods_supported = Some(vec!["none".into()]);
        if revocation {
            metadata.revocation_endpoint = Some(Url::parse("https://idp.example/revoke").unwrap());
        }
        Client::new("app", None, metadata)
    }

    fn live_token(expired: bool) -> TokenResponse {
        TokenResponse {
            access_token: Some("at-old".into()),
            refresh_token: Some("rt-old".into()),
            id_token: None,
            token_type: Some("DPoP".into()),
            scope: None,
            expires_at: Some(if expired {
                Utc::now() - TimeDelta::seconds(60)
            } else {
                Utc::now() + TimeDelta::seconds(3600)
            }),
        }
    }

    #[tokio::test]
    async fn unexpired_token_is_served_from_cache() {
        // no queued response: a cache hit must not touch the network
        let http = Arc::new(MockHttp::default());
        let credential = Credential::new(http, test_client(false), live_token(false));
        let token = credential
            .get_token_response(GetTokenOptions::default())
            .await
            .unwrap();
        assert_eq!(token.access_token.as_deref(), Some("at-old"));
    }

    #[tokio::test]
    async fn expired_token_refreshes_and_broadcasts() {
        let http = Arc::new(MockHttp::default());
        http.push_json(
            StatusCode::OK,
            serde_json::json!({
                "access_token": "at-new",
                "token_type": "DPoP",
                "expires_in": 3600
            }),
        )
        .await;
        let credential = Credential::new(http.clone(), test_client(false), live_token(true));
        let mut updates = credential.subscribe();

        let token = credential
            .get_token_response(GetTokenOptions {
                force_refresh: false,
                dpop_proof: Some("proof-jwt".into()),
            })
            .await
            .unwrap();
        assert_eq!(token.access_token.as_deref(), Some("at-new"));
        // response omitted the refresh token: the old one is preserved
        assert_eq!(token.refresh_token.as_deref(), Some("rt-old"));

        let published = updates.recv().await.unwrap();
        assert_eq!(published, token);

        let requests = http.requests.lock().await;
        assert_eq!(requests.len(), 1);
        assert_eq!(
            requests[0].headers().get("DPoP").unwrap().to_str().unwrap(),
            "proof-jwt"
        );
        let body = String::from_utf8(requests[0].body().clone()).unwrap();
        assert!(body.contains("grant_type=refresh_token"));
        assert!(body.contains("refresh_token=rt-old"));
    }

    #[tokio::test]
    async fn second_read_after_refresh_hits_the_cache() {
        let http = Arc::new(MockHttp::default());
        http.push_json(
            StatusCode::OK,
            serde_json::json!({
                "access_token": "at-new",
                "token_type": "DPoP",
                "expires_in": 3600,
                "refresh_token": "rt-new"
            }),
        )
        .await;
        let credential = Credential::new(http, test_client(false), live_token(true));
        credential
            .get_token_response(GetTokenOptions::default())
            .await
            .unwrap();
        // queue is empty now; a second call must not make a request
        let token = credential
            .get_token_response(GetTokenOptions::default())
            .await
            .unwrap();
        assert_eq!(token.access_token.as_deref(), Some("at-new"));
        assert_eq!(token.refresh_token.as_deref(), Some("rt-new"));
    }

    #[tokio::test]
    async fn empty_token_is_returned_as_is() {
        let http = Arc::new(MockHttp::default());
        let credential = Credential::new(http, test_client(false), TokenResponse::default());
        let token = credential
            .get_token_response(GetTokenOptions {
                force_refresh: true,
                dpop_proof: None,
            })
            .await
            .unwrap();
        assert!(token.is_empty());
    }

    #[tokio::test]
    async fn provider_error_body_is_structured() {
        let http = Arc::new(MockHttp::default());
        http.push_json(
            StatusCode::BAD_REQUEST,
            serde_json::json!({"error": "invalid_grant", "error_description": "revoked"}),
        )
        .await;
        let credential = Credential::new(http, test_client(false), live_token(true));
        let err = credential
            .get_token_response(GetTokenOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::Provider(p) if p.error == "invalid_grant"));
    }

    #[tokio::test]
    async fn revoke_without_endpoint_is_unsupported() {
        let http = Arc::new(MockHttp::default());
        let credential = Credential::new(http, test_client(false), live_token(false));
        assert!(matches!(
            credential.revoke().await,
            Err(AuthError::Unsupported(_))
        ));
    }

    #[tokio::test]
    async fn revoke_prefers_refresh_token_hint() {
        let http = Arc::new(MockHttp::default());
        http.push_empty(StatusCode::OK).await;
        let credential = Credential::new(http.clone(), test_client(true), live_token(false));
        credential.revoke().await.unwrap();
        let requests = http.requests.lock().await;
        let body = String::from_utf8(requests[0].body().clone()).unwrap();
        assert!(body.contains("token=rt-old"));
        assert!(body.contains("token_type_hint=refresh_token"));
    }

    #[tokio::test]
    async fn auto_refresh_fires_and_dies_with_its_guard() {
        let http = Arc::new(MockHttp::default());
        http.push_json(
            StatusCode::OK,
            serde_json::json!({
                "access_token": "at-timer",
                "token_type": "DPoP",
                "expires_in": 3600
            }),
        )
        .await;
        let credential = Arc::new(Credential::new(
            http,
            test_client(false),
            live_token(true),
        ));
        let mut updates = credential.subscribe();
        let guard = credential.spawn_auto_refresh(Duration::from_millis(10), None);
        let published = tokio::time::timeout(Duration::from_secs(5), updates.recv())
            .await
            .expect("refresh timer did not fire")
            .unwrap();
        assert_eq!(published.access_token.as_deref(), Some("at-timer"));
        drop(guard);
    }
}
