//! The session coordinator: owns the active flow/credential pair, persists
//! the minimal state needed to resume, exposes proof generation, and
//! manages logout.
//!
//! All collaborators (HTTP transport, issuer resolver, secure store, and
//! the redirect handler that drives the user-interaction leg) are injected
//! at construction; the coordinator holds no globals and shares nothing
//! with other instances. Session operations run cooperatively on one
//! logical task per coordinator; the credential's own locking covers the
//! refresh race.

use std::future::Future;
use std::sync::Arc;

use podauth_common::{HttpClient, SecureStore};
use podauth_webid::IssuerResolver;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use url::Url;

use crate::client::{self, Client};
use crate::credential::{AutoRefreshGuard, Credential, DpopProofFn, GetTokenOptions};
use crate::dpop::{self, DpopCredentials, DpopProof};
use crate::error::{AuthError, BoxError, Result};
use crate::flow::{AuthUriOptions, Flow};
use crate::keys::KeyPair;
use crate::scopes::{default_prompts, effective_scopes, PromptCalculator};
use crate::types::{CallbackParams, TokenResponse};
use crate::utils::generate_nonce;
use crate::webid;

/// Store namespace for everything this crate persists.
pub const STORE_NAMESPACE: &str = "podauth";

const SESSION_KEY: &str = "session";
const KEYS_KEY: &str = "keys";
const TOKENS_KEY: &str = "tokens";

/// Coordinator lifecycle. `LoggedOut` is terminal for the session that
/// reached it but the coordinator is reusable after another `init`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Uninitialized,
    Initializing,
    Unauthenticated,
    Authenticating,
    Authenticated,
    LoggedOut,
}

/// The minimal state persisted for session restoration. Its presence means
/// restore will be attempted, never that it will succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionState {
    pub web_id_or_issuer: String,
    pub scopes: Vec<String>,
}

/// Static configuration for a coordinator.
#[derive(Clone)]
pub struct SessionConfig {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub redirect_uri: Url,
    /// Scopes requested on every authentication, before extras.
    pub base_scopes: Vec<String>,
    /// Overrides the default prompt computation when set.
    pub prompt_calculator: Option<PromptCalculator>,
    /// Enables the refresh-before-expiry timer when set.
    pub auto_refresh_margin: Option<std::time::Duration>,
}

impl SessionConfig {
    pub fn new(client_id: impl Into<String>, redirect_uri: Url) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: None,
            redirect_uri,
            base_scopes: crate::scopes::default_scopes(),
            prompt_calculator: None,
            auto_refresh_margin: None,
        }
    }
}

impl std::fmt::Debug for SessionConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("redirect_uri", &self.redirect_uri)
            .field("base_scopes", &self.base_scopes)
            .field("auto_refresh_margin", &self.auto_refresh_margin)
            .finish_non_exhaustive()
    }
}

/// Drives the external user-interaction step of a redirect-based flow:
/// present the authorization URI, await the redirect back, return its
/// parameters. Cancellation is the caller dropping the future.
#[trait_variant::make(Send)]
pub trait RedirectHandler {
    fn authorize(
        &self,
        authorization_uri: Url,
    ) -> impl Future<Output = core::result::Result<CallbackParams, BoxError>>;
}

/// The outcome handed back by a successful authentication or restore.
#[derive(Debug, Clone)]
pub struct AuthenticatedSession {
    pub web_id: Url,
    pub issuer: Url,
    pub token: TokenResponse,
}

struct ActiveSession<T> {
    credential: Arc<Credential<T>>,
    key_pair: KeyPair,
    web_id: Url,
    issuer: Url,
    _refresh: Option<AutoRefreshGuard>,
}

/// Top-level orchestrator; at most one live credential per instance.
pub struct SessionCoordinator<T, R, S> {
    http: Arc<T>,
    resolver: R,
    store: S,
    config: SessionConfig,
    phase: RwLock<SessionPhase>,
    active: RwLock<Option<ActiveSession<T>>>,
}

impl<T, R, S> SessionCoordinator<T, R, S>
where
    T: HttpClient + Send + Sync + 'static,
    R: IssuerResolver + Sync,
    S: SecureStore,
{
    pub fn new(http: T, resolver: R, store: S, config: SessionConfig) -> Self {
        Self {
            http: Arc::new(http),
            resolver,
            store,
            config,
            phase: RwLock::new(SessionPhase::Uninitialized),
            active: RwLock::new(None),
        }
    }

    pub async fn phase(&self) -> SessionPhase {
        *self.phase.read().await
    }

    pub async fn is_authenticated(&self) -> bool {
        self.active.read().await.is_some()
    }

    /// The validated WebID of the active session, if any.
    pub async fn web_id(&self) -> Option<Url> {
        self.active.read().await.as_ref().map(|a| a.web_id.clone())
    }

    /// The live credential, e.g. to subscribe to token updates.
    pub async fn credential(&self) -> Option<Arc<Credential<T>>> {
        self.active.read().await.as_ref().map(|a| a.credential.clone())
    }

    /// Load persisted state and attempt to resume the previous session.
    ///
    /// Restoration is best-effort by contract: any failure (corrupt JSON,
    /// a stale token with no usable refresh, an unreachable issuer) clears
    /// the persisted state and lands in `Unauthenticated` instead of
    /// surfacing an error.
    pub async fn init(&self) -> SessionPhase {
        *self.phase.write().await = SessionPhase::Initializing;
        let phase = match self.try_restore().await {
            Ok(Some(active)) => {
                *self.active.write().await = Some(active);
                SessionPhase::Authenticated
            }
            Ok(None) => SessionPhase::Unauthenticated,
            Err(e) => {
                tracing::debug!(error = %e, "session restore failed; clearing persisted state");
                self.clear_persisted().await;
                SessionPhase::Unauthenticated
            }
        };
        *self.phase.write().await = phase;
        phase
    }

    /// Run a full PKCE authorization-code authentication against the issuer
    /// resolved from `webid_or_issuer`, driving the redirect leg through
    /// `handler`.
    ///
    /// An already-authenticated coordinator logs out first: one live
    /// credential per instance.
    pub async fn authenticate<H>(
        &self,
        webid_or_issuer: &str,
        extra_scopes: &[String],
        handler: &H,
    ) -> Result<AuthenticatedSession>
    where
        H: RedirectHandler + Sync,
    {
        if self.is_authenticated().await {
            self.logout().await;
        }
        *self.phase.write().await = SessionPhase::Authenticating;
        match self
            .run_authentication(webid_or_issuer, extra_scopes, handler)
            .await
        {
            Ok(outcome) => {
                *self.phase.write().await = SessionPhase::Authenticated;
                Ok(outcome)
            }
            Err(e) => {
                *self.phase.write().await = SessionPhase::Unauthenticated;
                Err(e)
            }
        }
    }

    /// Mint a fresh proof bound to exactly this URL and method, paired with
    /// the current access token.
    pub async fn gen_dpop_token(&self, url: &Url, method: &str) -> Result<DpopProof> {
        let active = self.active.read().await;
        let Some(active) = active.as_ref() else {
            return Err(AuthError::NotAuthenticated);
        };
        let access_token = active
            .credential
            .token()
            .await
            .access_token
            .ok_or(AuthError::NotAuthenticated)?;
        Ok(DpopProof {
            dpop_token: dpop::proof_now(&active.key_pair, url, method)?,
            access_token,
        })
    }

    /// Export the flattened signing snapshot for a worker context. The
    /// snapshot is an owned value; nothing of the live session crosses with
    /// it.
    pub async fn export_dpop_credentials(&self) -> Result<DpopCredentials> {
        let active = self.active.read().await;
        let Some(active) = active.as_ref() else {
            return Err(AuthError::NotAuthenticated);
        };
        let access_token = active
            .credential
            .token()
            .await
            .access_token
            .ok_or(AuthError::NotAuthenticated)?;
        Ok(DpopCredentials::new(&active.key_pair, access_token)?)
    }

    /// Best-effort provider-side revocation plus unconditional local
    /// cleanup. Idempotent.
    pub async fn logout(&self) {
        if let Some(active) = self.active.write().await.take() {
            if let Err(e) = active.credential.revoke().await {
                tracing::warn!(error = %e, "provider-side revocation failed during logout");
            }
        }
        self.clear_persisted().await;
        *self.phase.write().await = SessionPhase::LoggedOut;
    }

    async fn run_authentication<H>(
        &self,
        input: &str,
        extra_scopes: &[String],
        handler: &H,
    ) -> Result<AuthenticatedSession>
    where
        H: RedirectHandler + Sync,
    {
        let issuers = self.resolver.resolve(input).await?;
        let issuer = issuers
            .first()
            .cloned()
            .ok_or_else(|| AuthError::Metadata("resolution produced no issuer candidates".into()))?;
        let metadata = client::discover(self.http.as_ref(), &issuer).await?;
        let key_pair = self.restore_or_generate_key_pair().await?;

        let scopes = effective_scopes(&self.config.base_scopes, extra_scopes);
        let prompts = match &self.config.prompt_calculator {
            Some(calculator) => calculator(&scopes),
            None => default_prompts(&scopes),
        };

        let client = Client::new(
            self.config.client_id.clone(),
            self.config.client_secret.clone(),
            metadata,
        );
        let token_endpoint = client.metadata.token_endpoint.clone();
        let flow = Flow::pkce(client, scopes.clone(), self.config.redirect_uri.clone());
        let nonce = generate_nonce();
        let authorization_uri = flow.authentication_uri(&AuthUriOptions {
            prompts,
            login_hint: None,
            nonce: Some(nonce.clone()),
        })?;

        let params = handler
            .authorize(authorization_uri)
            .await
            .map_err(AuthError::Redirect)?;

        let proof = dpop::proof_now(&key_pair, &token_endpoint, "POST")?;
        let credential = Arc::new(
            flow.callback(self.http.clone(), params, Some(proof))
                .await?
                .with_nonce(nonce),
        );
        let token = credential.token().await;

        let web_id =
            webid::extract_web_id(self.http.as_ref(), &key_pair, credential.client(), &token)
                .await?;
        webid::validate_issuer(&self.resolver, &web_id, &issuer).await?;

        let state = SessionState {
            web_id_or_issuer: input.to_owned(),
            scopes,
        };
        self.persist(&state, &key_pair, &token).await?;

        let refresh = self.spawn_refresh(&credential, &key_pair);
        *self.active.write().await = Some(ActiveSession {
            credential,
            key_pair,
            web_id: web_id.clone(),
            issuer: issuer.clone(),
            _refresh: refresh,
        });

        Ok(AuthenticatedSession {
            web_id,
            issuer,
            token,
        })
    }

    async fn try_restore(&self) -> Result<Option<ActiveSession<T>>> {
        let Some(raw_state) = self.store.get(STORE_NAMESPACE, SESSION_KEY).await? else {
            return Ok(None);
        };
        let state: SessionState = serde_json::from_str(&raw_state)?;
        let raw_keys = self
            .store
            .get(STORE_NAMESPACE, KEYS_KEY)
            .await?
            .ok_or(AuthError::InvalidSession("missing persisted key pair"))?;
        let key_pair: KeyPair = serde_json::from_str(&raw_keys)?;
        let raw_tokens = self
            .store
            .get(STORE_NAMESPACE, TOKENS_KEY)
            .await?
            .ok_or(AuthError::InvalidSession("missing persisted tokens"))?;
        let token: TokenResponse = serde_json::from_str(&raw_tokens)?;
        if token.is_empty() {
            return Err(AuthError::InvalidSession("persisted token is empty"));
        }

        let issuers = self.resolver.resolve(&state.web_id_or_issuer).await?;
        let issuer = issuers
            .first()
            .cloned()
            .ok_or(AuthError::InvalidSession("no issuer resolved"))?;
        let metadata = client::discover(self.http.as_ref(), &issuer).await?;
        let token_endpoint = metadata.token_endpoint.clone();
        let client = Client::new(
            self.config.client_id.clone(),
            self.config.client_secret.clone(),
            metadata,
        );
        let credential = Arc::new(Credential::new(self.http.clone(), client, token));

        // validity pass: an expired token refreshes here; a session with
        // nothing usable afterwards is not restored
        let proof = dpop::proof_now(&key_pair, &token_endpoint, "POST")?;
        let token = credential
            .get_token_response(GetTokenOptions {
                force_refresh: false,
                dpop_proof: Some(proof),
            })
            .await?;
        if token.access_token.is_none() {
            return Err(AuthError::InvalidSession("no usable access token"));
        }

        let web_id =
            webid::extract_web_id(self.http.as_ref(), &key_pair, credential.client(), &token)
                .await?;
        webid::validate_issuer(&self.resolver, &web_id, &issuer).await?;

        // refresh may have rotated the tokens; keep the persisted copy live
        self.store
            .set(STORE_NAMESPACE, TOKENS_KEY, &serde_json::to_string(&token)?)
            .await?;

        let refresh = self.spawn_refresh(&credential, &key_pair);
        Ok(Some(ActiveSession {
            credential,
            key_pair,
            web_id,
            issuer,
            _refresh: refresh,
        }))
    }

    async fn restore_or_generate_key_pair(&self) -> Result<KeyPair> {
        if let Some(raw) = self.store.get(STORE_NAMESPACE, KEYS_KEY).await? {
            if let Ok(pair) = serde_json::from_str::<KeyPair>(&raw) {
                return Ok(pair);
            }
            tracing::debug!("persisted key pair does not parse; generating a fresh one");
        }
        Ok(KeyPair::generate_default()?)
    }

    fn spawn_refresh(
        &self,
        credential: &Arc<Credential<T>>,
        key_pair: &KeyPair,
    ) -> Option<AutoRefreshGuard> {
        let margin = self.config.auto_refresh_margin?;
        let key_pair = key_pair.clone();
        let proof: DpopProofFn =
            Arc::new(move |url, method| dpop::proof_now(&key_pair, url, method).ok());
        Some(credential.spawn_auto_refresh(margin, Some(proof)))
    }

    async fn persist(
        &self,
        state: &SessionState,
        key_pair: &KeyPair,
        token: &TokenResponse,
    ) -> Result<()> {
        self.store
            .set(STORE_NAMESPACE, SESSION_KEY, &serde_json::to_string(state)?)
            .await?;
        self.store
            .set(STORE_NAMESPACE, KEYS_KEY, &serde_json::to_string(key_pair)?)
            .await?;
        self.store
            .set(STORE_NAMESPACE, TOKENS_KEY, &serde_json::to_string(token)?)
            .await?;
        Ok(())
    }

    async fn clear_persisted(&self) {
        for key in [SESSION_KEY, KEYS_KEY, TOKENS_KEY] {
            if let Err(e) = self.store.remove(STORE_NAMESPACE, key).await {
                tracing::warn!(key, error = %e, "failed to clear persisted session entry");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::test_keys;
    use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
    use http::StatusCode;
    use podauth_common::store::MemoryStore;
    use podauth_webid::ResolveError;
    use std::collections::VecDeque;
    use tokio::sync::Mutex;

    const WEB_ID: &str = "https://alice.pod.example/card#me";
    const ISSUER: &str = "https://idp.example";

    fn unsigned_jwt(claims: serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
        let payload = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&claims).unwrap());
        format!("{header}.{payload}.sig")
    }

    #[derive(Default)]
    struct MockHttp {
        responses: Mutex<VecDeque<http::Response<Vec<u8>>>>,
    }

    impl MockHttp {
        async fn push_json(&self, body: serde_json::Value) {
            self.responses.lock().await.push_back(
                http::Response::builder()
                    .status(StatusCode::OK)
                    .body(serde_json::to_vec(&body).unwrap())
                    .unwrap(),
            );
        }
    }

    impl HttpClient for MockHttp {
        type Error = std::convert::Infallible;
        async fn send_http(
            &self,
            _request: http::Request<Vec<u8>>,
        ) -> core::result::Result<http::Response<Vec<u8>>, Self::Error> {
            Ok(self
                .responses
                .lock()
                .await
                .pop_front()
                .expect("unexpected HTTP call"))
        }
    }

    struct FixedResolver;

    impl IssuerResolver for FixedResolver {
        async fn resolve(&self, _input: &str) -> core::result::Result<Vec<Url>, ResolveError> {
            Ok(vec![Url::parse(ISSUER).unwrap()])
        }
        async fn resolve_strict(
            &self,
            _web_id: &Url,
        ) -> core::result::Result<Vec<Url>, ResolveError> {
            Ok(vec![Url::parse(ISSUER).unwrap()])
        }
    }

    /// Approves every request: echoes the state back with a canned code.
    struct AutoApprove;

    impl RedirectHandler for AutoApprove {
        async fn authorize(
            &self,
            authorization_uri: Url,
        ) -> core::result::Result<CallbackParams, BoxError> {
            let state = authorization_uri
                .query_pairs()
                .find(|(k, _)| k == "state")
                .map(|(_, v)| v.into_owned());
            Ok(CallbackParams {
                code: Some("authcode".into()),
                state,
                ..Default::default()
            })
        }
    }

    /// Ignores the authorization URI and returns a forged state.
    struct ForgedState;

    impl RedirectHandler for ForgedState {
        async fn authorize(
            &self,
            _authorization_uri: Url,
        ) -> core::result::Result<CallbackParams, BoxError> {
            Ok(CallbackParams {
                code: Some("authcode".into()),
                state: Some("forged".into()),
                ..Default::default()
            })
        }
    }

    fn discovery_body() -> serde_json::Value {
        serde_json::json!({
            "issuer": ISSUER,
            "authorization_endpoint": "https://idp.example/authorize",
            "token_endpoint": "https://idp.example/token",
            "response_types_supported": ["code"],
            "scopes_supported": ["openid", "webid", "offline_access"],
            "token_endpoint_auth_methods_supported": ["none"],
            "dpop_signing_alg_values_supported": ["RS256"]
        })
    }

    fn token_body(expires_in: i64) -> serde_json::Value {
        serde_json::json!({
            "access_token": "at-1",
            "token_type": "DPoP",
            "expires_in": expires_in,
            "refresh_token": "rt-1",
            "id_token": unsigned_jwt(serde_json::json!({"webid": WEB_ID}))
        })
    }

    async fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .set(
                STORE_NAMESPACE,
                KEYS_KEY,
                &serde_json::to_string(test_keys::key_pair()).unwrap(),
            )
            .await
            .unwrap();
        store
    }

    fn coordinator(
        http: MockHttp,
        store: MemoryStore,
    ) -> SessionCoordinator<MockHttp, FixedResolver, MemoryStore> {
        SessionCoordinator::new(
            http,
            FixedResolver,
            store,
            SessionConfig::new(
                "app",
                Url::parse("https://app.example/callback").unwrap(),
            ),
        )
    }

    #[tokio::test]
    async fn init_without_persisted_state_is_unauthenticated() {
        let coordinator = coordinator(MockHttp::default(), MemoryStore::new());
        assert_eq!(coordinator.init().await, SessionPhase::Unauthenticated);
        assert!(!coordinator.is_authenticated().await);
    }

    #[tokio::test]
    async fn init_with_corrupted_state_never_throws_and_clears() {
        let store = MemoryStore::new();
        store
            .set(STORE_NAMESPACE, SESSION_KEY, "{definitely not json")
            .await
            .unwrap();
        let coordinator = coordinator(MockHttp::default(), store);
        assert_eq!(coordinator.init().await, SessionPhase::Unauthenticated);
        // the corrupted entry is gone
        assert_eq!(
            coordinator
                .store
                .get(STORE_NAMESPACE, SESSION_KEY)
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn init_restores_a_valid_persisted_session() {
        let store = seeded_store().await;
        store
            .set(
                STORE_NAMESPACE,
                SESSION_KEY,
                &serde_json::to_string(&SessionState {
                    web_id_or_issuer: WEB_ID.to_owned(),
                    scopes: vec!["openid".into(), "webid".into()],
                })
                .unwrap(),
            )
            .await
            .unwrap();
        let token = TokenResponse {
            access_token: Some("at-live".into()),
            refresh_token: Some("rt-live".into()),
            id_token: Some(unsigned_jwt(serde_json::json!({"webid": WEB_ID}))),
            token_type: Some("DPoP".into()),
            scope: None,
            expires_at: Some(chrono::Utc::now() + chrono::TimeDelta::seconds(3600)),
        };
        store
            .set(
                STORE_NAMESPACE,
                TOKENS_KEY,
                &serde_json::to_string(&token).unwrap(),
            )
            .await
            .unwrap();

        let http = MockHttp::default();
        http.push_json(discovery_body()).await;

        let coordinator = coordinator(http, store);
        assert_eq!(coordinator.init().await, SessionPhase::Authenticated);
        assert_eq!(
            coordinator.web_id().await.unwrap().as_str(),
            WEB_ID
        );
    }

    #[tokio::test]
    async fn authenticate_end_to_end() {
        let http = MockHttp::default();
        http.push_json(discovery_body()).await;
        http.push_json(token_body(3600)).await;

        let coordinator = coordinator(http, seeded_store().await);
        let session = coordinator
            .authenticate(WEB_ID, &["profile".to_owned()], &AutoApprove)
            .await
            .unwrap();

        assert_eq!(session.web_id.as_str(), WEB_ID);
        assert_eq!(session.issuer.as_str(), "https://idp.example/");
        assert_eq!(session.token.access_token.as_deref(), Some("at-1"));
        assert_eq!(coordinator.phase().await, SessionPhase::Authenticated);

        // restoration state was persisted
        let persisted: SessionState = serde_json::from_str(
            &coordinator
                .store
                .get(STORE_NAMESPACE, SESSION_KEY)
                .await
                .unwrap()
                .unwrap(),
        )
        .unwrap();
        assert_eq!(persisted.web_id_or_issuer, WEB_ID);
        assert_eq!(
            persisted.scopes,
            vec!["offline_access", "openid", "profile", "webid"]
        );

        // proof generation is bound to the requested URL and method
        let target = Url::parse("https://alice.pod.example/storage/notes.ttl").unwrap();
        let proof = coordinator.gen_dpop_token(&target, "put").await.unwrap();
        assert_eq!(proof.access_token, "at-1");
        let payload: serde_json::Value = {
            let segment = proof.dpop_token.split('.').nth(1).unwrap();
            serde_json::from_slice(&URL_SAFE_NO_PAD.decode(segment).unwrap()).unwrap()
        };
        assert_eq!(payload["htu"], target.as_str());
        assert_eq!(payload["htm"], "PUT");

        // worker export carries the same signing capability as a value
        let exported = coordinator.export_dpop_credentials().await.unwrap();
        assert_eq!(exported.access_token, "at-1");
        assert_eq!(exported.public_key_jwk["alg"], "RS256");
    }

    #[tokio::test]
    async fn forged_state_aborts_before_token_exchange() {
        let http = MockHttp::default();
        // only discovery is queued: a state mismatch must not reach the
        // token endpoint
        http.push_json(discovery_body()).await;

        let coordinator = coordinator(http, seeded_store().await);
        let err = coordinator
            .authenticate(WEB_ID, &[], &ForgedState)
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::StateMismatch));
        assert_eq!(coordinator.phase().await, SessionPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn logout_clears_everything_and_is_idempotent() {
        let http = MockHttp::default();
        http.push_json(discovery_body()).await;
        http.push_json(token_body(3600)).await;

        let coordinator = coordinator(http, seeded_store().await);
        coordinator
            .authenticate(WEB_ID, &[], &AutoApprove)
            .await
            .unwrap();

        // no revocation endpoint advertised: the failure is suppressed and
        // local cleanup still runs
        coordinator.logout().await;
        assert_eq!(coordinator.phase().await, SessionPhase::LoggedOut);
        assert!(!coordinator.is_authenticated().await);
        for key in [SESSION_KEY, KEYS_KEY, TOKENS_KEY] {
            assert_eq!(
                coordinator.store.get(STORE_NAMESPACE, key).await.unwrap(),
                None
            );
        }

        let target = Url::parse("https://alice.pod.example/storage/").unwrap();
        assert!(matches!(
            coordinator.gen_dpop_token(&target, "GET").await,
            Err(AuthError::NotAuthenticated)
        ));
        assert!(matches!(
            coordinator.export_dpop_credentials().await,
            Err(AuthError::NotAuthenticated)
        ));

        // second logout is a no-op
        coordinator.logout().await;
        assert_eq!(coordinator.phase().await, SessionPhase::LoggedOut);
    }

    #[tokio::test]
    async fn proof_generation_requires_authentication() {
        let coordinator = coordinator(MockHttp::default(), MemoryStore::new());
        let target = Url::parse("https://alice.pod.example/storage/").unwrap();
        assert!(matches!(
            coordinator.gen_dpop_token(&target, "GET").await,
            Err(AuthError::NotAuthenticated)
        ));
    }
}
