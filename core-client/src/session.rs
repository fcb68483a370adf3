//! # Adapter Session & Token Lifecycle
//!
//! Every adapter owns one [`AdapterSession`]: the live token, the lifecycle
//! state machine, and the single-flight refresh gate.
//!
//! ## State machine
//!
//! ```text
//! Unvalidated -> Validating -> Valid
//!                    |  ^
//!                    v  |  (refresh re-enters validation)
//!                 Refreshing
//!
//! any state -> Invalid on unrecoverable failure
//! Invalid -> (external re-authentication)
//! ```
//!
//! `prepare()` drives validation: a lightweight authenticated "who am I"
//! request. 200 proves the token; 401 triggers the refresh sub-flow and one
//! re-validation; anything else invalidates the session. Data operations
//! never refresh — they fail fast on a missing token and surface 401 as
//! [`CloudError::Unauthorized`].
//!
//! ## Single-flight refresh
//!
//! Concurrent callers hitting an expired token must produce exactly one
//! refresh exchange. The session serializes refreshes behind a mutex and
//! stamps each completed refresh with an epoch; a caller that waited on the
//! gate re-checks the epoch and skips its own exchange when another caller
//! already finished one.

use bridge_traits::http::{HttpMethod, HttpRequest, HttpTransport};
use bytes::Bytes;
use core_runtime::events::{AuthEvent, CoreEvent, EventBus};
use serde::Deserialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::accounts::{AccountRecord, AccountStore};
use crate::binding::ProviderBinding;
use crate::config::ProviderConfig;
use crate::error::{CloudError, Result};
use crate::model::{CloudUser, ProviderKind, TokenSet};

/// Timeout applied to token-endpoint and validation requests.
const AUTH_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Lifecycle state of a session's token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    /// No validation attempted since construction/hydration.
    Unvalidated,
    /// Validation request in flight.
    Validating,
    /// Token proven usable.
    Valid,
    /// Refresh exchange in flight.
    Refreshing,
    /// Session unusable until external re-authentication.
    Invalid,
}

/// Token response from the OAuth provider's token endpoint.
#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    refresh_token: Option<String>,
    #[serde(default = "default_expires_in")]
    expires_in: i64,
    #[allow(dead_code)]
    token_type: Option<String>,
}

fn default_expires_in() -> i64 {
    3600 // Default to 1 hour if not specified
}

/// Per-adapter authentication session.
///
/// Exclusively owns the current [`TokenSet`]; the account store holds the
/// durable backing copy, updated only after initial authentication or a
/// successful refresh.
pub struct AdapterSession {
    kind: ProviderKind,
    config: ProviderConfig,
    http: Arc<dyn HttpTransport>,
    accounts: AccountStore,
    events: EventBus,
    state: RwLock<TokenState>,
    tokens: RwLock<Option<TokenSet>>,
    /// Serializes refresh exchanges (single-flight).
    refresh_gate: Mutex<()>,
    /// Bumped once per completed refresh; waiters use it to detect that the
    /// refresh they queued behind already did the work.
    refresh_epoch: AtomicU64,
}

impl AdapterSession {
    pub fn new(
        kind: ProviderKind,
        config: ProviderConfig,
        http: Arc<dyn HttpTransport>,
        accounts: AccountStore,
        events: EventBus,
    ) -> Self {
        Self {
            kind,
            config,
            http,
            accounts,
            events,
            state: RwLock::new(TokenState::Unvalidated),
            tokens: RwLock::new(None),
            refresh_gate: Mutex::new(()),
            refresh_epoch: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> ProviderKind {
        self.kind
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub async fn state(&self) -> TokenState {
        *self.state.read().await
    }

    async fn set_state(&self, state: TokenState) {
        *self.state.write().await = state;
    }

    fn emit(&self, event: AuthEvent) {
        let _ = self.events.emit(CoreEvent::Auth(event));
    }

    /// Load the stored account record into the live session, if one exists.
    ///
    /// Returns whether a record was found. The state stays `Unvalidated`;
    /// call [`AdapterSession::prepare`] to prove the token.
    pub async fn hydrate(&self) -> Result<bool> {
        match self.accounts.load(self.kind).await? {
            Some(record) => {
                *self.tokens.write().await = Some(record.tokens);
                debug!(provider = self.kind.as_str(), "Session hydrated from account store");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// The live access token, for building data-operation requests.
    ///
    /// Fails fast with [`CloudError::NoAccessToken`] when the session holds
    /// no token or has been invalidated — this check precedes any network
    /// call an adapter makes.
    pub async fn access_token(&self) -> Result<String> {
        if *self.state.read().await == TokenState::Invalid {
            return Err(CloudError::NoAccessToken);
        }
        match self.tokens.read().await.as_ref() {
            Some(tokens) => Ok(tokens.access_token.clone()),
            None => Err(CloudError::NoAccessToken),
        }
    }

    /// Exchange an authorization code (obtained by the external OAuth
    /// capture flow) for the initial token set.
    ///
    /// The tokens become the session's live set but are not persisted until
    /// the first successful validation identifies the user.
    #[instrument(skip(self, code), fields(provider = %self.kind))]
    pub async fn exchange_code(&self, code: &str) -> Result<TokenSet> {
        let params = [
            ("grant_type", "authorization_code"),
            ("code", code),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];

        let response = self.token_endpoint(&params).await?;
        if !response.is_success() {
            return Err(CloudError::from_status(response.status, &response.body));
        }

        let parsed: TokenResponse = serde_json::from_slice(&response.body)
            .map_err(|e| CloudError::MalformedResponse(format!("token response: {}", e)))?;

        info!(
            provider = self.kind.as_str(),
            expires_in = parsed.expires_in,
            "Authorization code exchanged"
        );

        let tokens = TokenSet::new(
            parsed.access_token,
            parsed.refresh_token,
            Some(parsed.expires_in),
        );
        *self.tokens.write().await = Some(tokens.clone());
        self.set_state(TokenState::Unvalidated).await;
        Ok(tokens)
    }

    /// Adopt externally obtained tokens for a known user and persist the
    /// account record immediately.
    pub async fn adopt(&self, tokens: TokenSet, user: &CloudUser) -> Result<()> {
        let record = AccountRecord::new(user, tokens.clone());
        self.accounts.save(self.kind, &record).await?;
        *self.tokens.write().await = Some(tokens);
        self.set_state(TokenState::Valid).await;
        self.emit(AuthEvent::Validated {
            provider: self.kind.as_str().to_string(),
            user_id: user.id.clone(),
        });
        Ok(())
    }

    /// Validate the session's token against the provider.
    ///
    /// 200 → `Valid`, the authenticated user is returned and subscribers
    /// are notified. 401 → refresh sub-flow, then one re-validation. Any
    /// other failure → `Invalid`.
    #[instrument(skip(self, binding), fields(provider = %self.kind))]
    pub async fn prepare(&self, binding: &dyn ProviderBinding) -> Result<CloudUser> {
        if self.tokens.read().await.is_none() {
            // Cold session: fall back to the durable record before giving up.
            self.hydrate().await?;
        }
        let Some(token) = self
            .tokens
            .read()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
        else {
            return Err(CloudError::NoAccessToken);
        };

        self.set_state(TokenState::Validating).await;
        self.emit(AuthEvent::Validating {
            provider: self.kind.as_str().to_string(),
        });

        match self.validate_once(binding, &token).await {
            Ok(user) => {
                self.complete_validation(&user).await?;
                Ok(user)
            }
            Err(CloudError::Unauthorized) => {
                debug!(provider = self.kind.as_str(), "Validation got 401, refreshing");
                self.refresh().await?;

                let Some(token) = self
                    .tokens
                    .read()
                    .await
                    .as_ref()
                    .map(|t| t.access_token.clone())
                else {
                    return Err(CloudError::NoAccessToken);
                };

                match self.validate_once(binding, &token).await {
                    Ok(user) => {
                        self.complete_validation(&user).await?;
                        Ok(user)
                    }
                    Err(error) => Err(self.invalidate(error).await),
                }
            }
            Err(error) => Err(self.invalidate(error).await),
        }
    }

    /// Issue one validation request and parse the user out of it.
    async fn validate_once(
        &self,
        binding: &dyn ProviderBinding,
        token: &str,
    ) -> Result<CloudUser> {
        let request = binding.about_request(token)?.timeout(AUTH_REQUEST_TIMEOUT);
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))?;

        if !response.is_success() {
            return Err(CloudError::from_status(response.status, &response.body));
        }

        binding.parse_user(&response.body)
    }

    async fn complete_validation(&self, user: &CloudUser) -> Result<()> {
        self.set_state(TokenState::Valid).await;

        // Persist the record if it is new or out of date; the store is the
        // durable copy of whatever this session currently holds.
        if let Some(tokens) = self.tokens.read().await.clone() {
            let stored = self.accounts.load(self.kind).await?;
            let fresh = AccountRecord::new(user, tokens);
            if stored.as_ref() != Some(&fresh) {
                self.accounts.save(self.kind, &fresh).await?;
            }
        }

        self.emit(AuthEvent::Validated {
            provider: self.kind.as_str().to_string(),
            user_id: user.id.clone(),
        });
        Ok(())
    }

    async fn invalidate(&self, error: CloudError) -> CloudError {
        warn!(provider = self.kind.as_str(), error = %error, "Session invalidated");
        self.set_state(TokenState::Invalid).await;
        self.emit(AuthEvent::Invalidated {
            provider: self.kind.as_str().to_string(),
            reason: error.to_string(),
        });
        error
    }

    /// Exchange the stored refresh token for a new token set.
    ///
    /// Single-flight: concurrent callers queue behind one exchange and share
    /// its outcome. A missing refresh token or a failed exchange performs
    /// logout-and-reset and surfaces [`CloudError::ReauthRequired`].
    pub async fn refresh(&self) -> Result<()> {
        let epoch_before = self.refresh_epoch.load(Ordering::SeqCst);
        let _gate = self.refresh_gate.lock().await;
        if self.refresh_epoch.load(Ordering::SeqCst) != epoch_before {
            debug!(
                provider = self.kind.as_str(),
                "Refresh already completed by a concurrent caller"
            );
            return Ok(());
        }

        self.set_state(TokenState::Refreshing).await;
        self.emit(AuthEvent::TokenRefreshing {
            provider: self.kind.as_str().to_string(),
        });

        let refresh_token = self
            .tokens
            .read()
            .await
            .as_ref()
            .and_then(|t| t.refresh_token.clone());
        let Some(refresh_token) = refresh_token else {
            return Err(self.logout_and_reset("no refresh token available").await);
        };

        let params = [
            ("grant_type", "refresh_token"),
            ("refresh_token", refresh_token.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];

        let response = match self.token_endpoint(&params).await {
            Ok(response) => response,
            Err(error) => {
                return Err(self
                    .logout_and_reset(&format!("refresh call failed: {}", error))
                    .await);
            }
        };

        if !response.is_success() {
            let error = CloudError::from_status(response.status, &response.body);
            return Err(self
                .logout_and_reset(&format!("token endpoint rejected refresh: {}", error))
                .await);
        }

        let parsed: TokenResponse = match serde_json::from_slice(&response.body) {
            Ok(parsed) => parsed,
            Err(e) => {
                return Err(self
                    .logout_and_reset(&format!("malformed token response: {}", e))
                    .await);
            }
        };

        // Providers may omit the refresh token on rotation; keep the old one.
        let fresh = TokenSet::new(
            parsed.access_token,
            parsed.refresh_token.or(Some(refresh_token)),
            Some(parsed.expires_in),
        );

        if let Err(error) = self.accounts.update_tokens(self.kind, &fresh).await {
            // A usable token beats a consistent store; the record catches up
            // at the next successful validation.
            warn!(provider = self.kind.as_str(), error = %error, "Failed to persist refreshed tokens");
        }

        *self.tokens.write().await = Some(fresh);
        self.refresh_epoch.fetch_add(1, Ordering::SeqCst);
        // Refresh re-enters validation; prepare() completes the transition.
        self.set_state(TokenState::Validating).await;
        self.emit(AuthEvent::TokenRefreshed {
            provider: self.kind.as_str().to_string(),
        });

        info!(provider = self.kind.as_str(), "Access token refreshed");
        Ok(())
    }

    /// Revoke, clear, and invalidate — the one unilateral recovery action.
    async fn logout_and_reset(&self, reason: &str) -> CloudError {
        warn!(provider = self.kind.as_str(), reason, "Logging out and resetting session");

        self.revoke_best_effort().await;
        if let Err(error) = self.accounts.remove(self.kind).await {
            warn!(provider = self.kind.as_str(), error = %error, "Failed to remove account record");
        }
        *self.tokens.write().await = None;
        self.set_state(TokenState::Invalid).await;
        self.emit(AuthEvent::Invalidated {
            provider: self.kind.as_str().to_string(),
            reason: reason.to_string(),
        });

        CloudError::ReauthRequired(reason.to_string())
    }

    /// Sign out: best-effort revoke, remove the account record, reset to
    /// `Unvalidated`.
    #[instrument(skip(self), fields(provider = %self.kind))]
    pub async fn sign_out(&self) -> Result<()> {
        self.revoke_best_effort().await;
        self.accounts.remove(self.kind).await?;
        *self.tokens.write().await = None;
        self.set_state(TokenState::Unvalidated).await;
        self.emit(AuthEvent::SignedOut {
            provider: self.kind.as_str().to_string(),
        });
        Ok(())
    }

    async fn revoke_best_effort(&self) {
        let Some(revoke_url) = self.config.revoke_url.clone() else {
            return;
        };
        let Some(token) = self
            .tokens
            .read()
            .await
            .as_ref()
            .map(|t| t.access_token.clone())
        else {
            return;
        };

        let params = [
            ("token", token.as_str()),
            ("client_id", self.config.client_id.as_str()),
            ("client_secret", self.config.client_secret.as_str()),
        ];
        let body = match serde_urlencoded::to_string(params) {
            Ok(body) => body,
            Err(_) => return,
        };

        let request = HttpRequest::new(HttpMethod::Post, revoke_url)
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(Bytes::from(body))
            .timeout(AUTH_REQUEST_TIMEOUT);

        match self.http.execute(request).await {
            Ok(response) if response.is_success() => {
                debug!(provider = self.kind.as_str(), "Token revoked");
            }
            Ok(response) => {
                debug!(
                    provider = self.kind.as_str(),
                    status = response.status,
                    "Token revocation rejected"
                );
            }
            Err(error) => {
                debug!(provider = self.kind.as_str(), error = %error, "Token revocation failed");
            }
        }
    }

    #[cfg(test)]
    pub(crate) async fn set_tokens_for_test(&self, tokens: Option<TokenSet>) {
        *self.tokens.write().await = tokens;
    }

    /// POST a form-encoded body to the provider's token endpoint.
    async fn token_endpoint(
        &self,
        params: &[(&str, &str)],
    ) -> Result<bridge_traits::http::HttpResponse> {
        let body = serde_urlencoded::to_string(params)
            .map_err(|e| CloudError::Transport(format!("encode token request: {}", e)))?;

        let request = HttpRequest::new(HttpMethod::Post, self.config.token_url.clone())
            .header("Content-Type", "application/x-www-form-urlencoded")
            .header("Accept", "application/json")
            .body(Bytes::from(body))
            .timeout(AUTH_REQUEST_TIMEOUT);

        self.http
            .execute(request)
            .await
            .map_err(|e| CloudError::Transport(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::binding::{PageChunk, PageRequest, ProviderBinding};
    use crate::model::{
        Addressing, CloudEntry, CloudFile, CloudFolder, ConflictPolicy, EntryLocator, SearchScope,
    };
    use async_trait::async_trait;
    use bridge_traits::error::Result as BridgeResult;
    use bridge_traits::http::HttpResponse;
    use bridge_traits::storage::SecureStore;
    use std::collections::HashMap;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Mutex as StdMutex;

    const TOKEN_URL: &str = "https://auth.example/token";

    /// Transport scripted for auth flows: answers the token endpoint with a
    /// fixed refresh response and the about endpoint according to a simple
    /// "fail until refreshed" rule.
    struct AuthScriptTransport {
        /// 401 the about call until a refresh succeeded.
        reject_until_refresh: bool,
        refresh_status: u16,
        refresh_calls: AtomicUsize,
        about_calls: AtomicUsize,
        refreshed: std::sync::atomic::AtomicBool,
        requests: StdMutex<Vec<HttpRequest>>,
    }

    impl AuthScriptTransport {
        fn new(reject_until_refresh: bool, refresh_status: u16) -> Self {
            Self {
                reject_until_refresh,
                refresh_status,
                refresh_calls: AtomicUsize::new(0),
                about_calls: AtomicUsize::new(0),
                refreshed: std::sync::atomic::AtomicBool::new(false),
                requests: StdMutex::new(Vec::new()),
            }
        }

        fn response(status: u16, body: &str) -> HttpResponse {
            HttpResponse {
                status,
                headers: HashMap::new(),
                body: Bytes::from(body.to_string()),
            }
        }
    }

    #[async_trait]
    impl HttpTransport for AuthScriptTransport {
        async fn execute(&self, request: HttpRequest) -> BridgeResult<HttpResponse> {
            self.requests.lock().unwrap().push(request.clone());

            if request.url == TOKEN_URL {
                self.refresh_calls.fetch_add(1, Ordering::SeqCst);
                // Simulate a slow token endpoint so concurrent callers pile
                // up on the gate.
                tokio::time::sleep(Duration::from_millis(20)).await;
                if self.refresh_status == 200 {
                    self.refreshed.store(true, Ordering::SeqCst);
                    return Ok(Self::response(
                        200,
                        r#"{"access_token":"fresh-token","refresh_token":"fresh-refresh","expires_in":3600,"token_type":"Bearer"}"#,
                    ));
                }
                return Ok(Self::response(
                    self.refresh_status,
                    r#"{"error":"invalid_grant"}"#,
                ));
            }

            self.about_calls.fetch_add(1, Ordering::SeqCst);
            if self.reject_until_refresh && !self.refreshed.load(Ordering::SeqCst) {
                return Ok(Self::response(401, r#"{"message":"expired"}"#));
            }
            Ok(Self::response(
                200,
                r#"{"id":"user-1","name":"user","display_name":"User One"}"#,
            ))
        }
    }

    #[derive(Default)]
    struct MemoryStore {
        secrets: StdMutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl SecureStore for MemoryStore {
        async fn set_secret(&self, key: &str, value: &[u8]) -> BridgeResult<()> {
            self.secrets
                .lock()
                .unwrap()
                .insert(key.to_string(), value.to_vec());
            Ok(())
        }
        async fn get_secret(&self, key: &str) -> BridgeResult<Option<Vec<u8>>> {
            Ok(self.secrets.lock().unwrap().get(key).cloned())
        }
        async fn delete_secret(&self, key: &str) -> BridgeResult<()> {
            self.secrets.lock().unwrap().remove(key);
            Ok(())
        }
        async fn list_keys(&self) -> BridgeResult<Vec<String>> {
            Ok(self.secrets.lock().unwrap().keys().cloned().collect())
        }
        async fn clear_all(&self) -> BridgeResult<()> {
            self.secrets.lock().unwrap().clear();
            Ok(())
        }
    }

    /// Binding stub: only the identity half is exercised by session tests.
    struct IdentityBinding;

    impl ProviderBinding for IdentityBinding {
        fn kind(&self) -> ProviderKind {
            ProviderKind::Box
        }
        fn addressing(&self) -> Addressing {
            Addressing::ById
        }
        fn root(&self) -> CloudFolder {
            CloudFolder::root(EntryLocator::by_id("0"), "/")
        }
        fn about_request(&self, token: &str) -> Result<HttpRequest> {
            Ok(HttpRequest::new(HttpMethod::Get, "https://api.example/me").bearer_token(token))
        }
        fn parse_user(&self, body: &[u8]) -> Result<CloudUser> {
            serde_json::from_slice(body)
                .map_err(|e| CloudError::MalformedResponse(e.to_string()))
        }
        fn folder_info_request(&self, _f: &EntryLocator, _t: &str) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn file_info_request(&self, _f: &EntryLocator, _t: &str) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn parse_folder(&self, _b: &[u8]) -> Result<CloudFolder> {
            unimplemented!()
        }
        fn parse_file(&self, _b: &[u8]) -> Result<CloudFile> {
            unimplemented!()
        }
        fn list_request(
            &self,
            _f: &CloudFolder,
            _p: &PageRequest,
            _t: &str,
        ) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn parse_listing(&self, _b: &[u8]) -> Result<PageChunk> {
            unimplemented!()
        }
        fn create_folder_request(
            &self,
            _p: &CloudFolder,
            _n: &str,
            _t: &str,
        ) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn parse_created_folder(
            &self,
            _p: &CloudFolder,
            _n: &str,
            _b: &[u8],
        ) -> Result<CloudFolder> {
            unimplemented!()
        }
        fn rename_request(&self, _e: &CloudEntry, _n: &str, _t: &str) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn move_request(&self, _e: &CloudEntry, _p: &CloudFolder, _t: &str) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn delete_request(&self, _e: &CloudEntry, _t: &str) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn upload_request(
            &self,
            _p: &CloudFolder,
            _n: &str,
            _c: Bytes,
            _policy: ConflictPolicy,
            _t: &str,
        ) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn update_request(&self, _f: &CloudFile, _c: Bytes, _t: &str) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn download_request(&self, _f: &CloudFile, _t: &str) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn thumbnail_request(&self, _f: &CloudFile, _t: &str) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn search_request(
            &self,
            _q: &str,
            _s: SearchScope,
            _p: &PageRequest,
            _t: &str,
        ) -> Result<HttpRequest> {
            unimplemented!()
        }
        fn parse_search(&self, _q: &str, _b: &[u8], _s: SearchScope) -> Result<PageChunk> {
            unimplemented!()
        }
    }

    fn config() -> ProviderConfig {
        ProviderConfig {
            auth_url: "https://auth.example/authorize".into(),
            token_url: TOKEN_URL.into(),
            revoke_url: None,
            api_base: "https://api.example".into(),
            content_base: None,
            client_id: "client".into(),
            client_secret: "secret".into(),
            redirect_uri: "app://callback".into(),
            scopes: vec![],
        }
    }

    async fn session_with(
        transport: Arc<AuthScriptTransport>,
        tokens: Option<TokenSet>,
    ) -> Arc<AdapterSession> {
        let accounts = AccountStore::new(Arc::new(MemoryStore::default()));
        let session = Arc::new(AdapterSession::new(
            ProviderKind::Box,
            config(),
            transport,
            accounts,
            EventBus::new(16),
        ));
        if tokens.is_some() {
            session.set_tokens_for_test(tokens).await;
        }
        session
    }

    #[tokio::test]
    async fn test_access_token_without_tokens_fails_fast() {
        let transport = Arc::new(AuthScriptTransport::new(false, 200));
        let session = AdapterSession::new(
            ProviderKind::Box,
            config(),
            transport.clone(),
            AccountStore::new(Arc::new(MemoryStore::default())),
            EventBus::new(16),
        );

        assert!(matches!(
            session.access_token().await,
            Err(CloudError::NoAccessToken)
        ));
        // Fail-fast means zero network traffic
        assert!(transport.requests.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_prepare_success_persists_record() {
        let transport = Arc::new(AuthScriptTransport::new(false, 200));
        let session = session_with(transport.clone(), Some(TokenSet::bearer_only("t"))).await;

        let user = session.prepare(&IdentityBinding).await.unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(session.state().await, TokenState::Valid);

        let record = session.accounts.load(ProviderKind::Box).await.unwrap();
        assert_eq!(record.unwrap().user_id, "user-1");
    }

    #[tokio::test]
    async fn test_prepare_refreshes_on_401() {
        let transport = Arc::new(AuthScriptTransport::new(true, 200));
        let session = session_with(
            transport.clone(),
            Some(TokenSet::new("stale", Some("refresh-1".into()), Some(-10))),
        )
        .await;

        let user = session.prepare(&IdentityBinding).await.unwrap();
        assert_eq!(user.id, "user-1");
        assert_eq!(session.state().await, TokenState::Valid);
        assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
        // One failed validation, one after refresh
        assert_eq!(transport.about_calls.load(Ordering::SeqCst), 2);
        assert_eq!(session.access_token().await.unwrap(), "fresh-token");
    }

    #[tokio::test]
    async fn test_prepare_without_refresh_token_resets() {
        let transport = Arc::new(AuthScriptTransport::new(true, 200));
        let session = session_with(transport.clone(), Some(TokenSet::bearer_only("stale"))).await;

        let error = session.prepare(&IdentityBinding).await.unwrap_err();
        assert!(matches!(error, CloudError::ReauthRequired(_)));
        assert_eq!(session.state().await, TokenState::Invalid);
        assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failed_refresh_resets_session() {
        let transport = Arc::new(AuthScriptTransport::new(true, 400));
        let session = session_with(
            transport.clone(),
            Some(TokenSet::new("stale", Some("refresh-1".into()), Some(-10))),
        )
        .await;

        let error = session.prepare(&IdentityBinding).await.unwrap_err();
        assert!(matches!(error, CloudError::ReauthRequired(_)));
        assert_eq!(session.state().await, TokenState::Invalid);
        assert!(matches!(
            session.access_token().await,
            Err(CloudError::NoAccessToken)
        ));
    }

    #[tokio::test]
    async fn test_refresh_is_single_flight() {
        let transport = Arc::new(AuthScriptTransport::new(true, 200));
        let session = session_with(
            transport.clone(),
            Some(TokenSet::new("stale", Some("refresh-1".into()), Some(-10))),
        )
        .await;

        let (a, b) = tokio::join!(session.refresh(), session.refresh());
        a.unwrap();
        b.unwrap();

        // Two concurrent callers, exactly one token-endpoint exchange.
        assert_eq!(transport.refresh_calls.load(Ordering::SeqCst), 1);
        assert_eq!(session.access_token().await.unwrap(), "fresh-token");
    }

    #[tokio::test]
    async fn test_exchange_code() {
        let transport = Arc::new(AuthScriptTransport::new(false, 200));
        let session = session_with(transport.clone(), None).await;

        let tokens = session.exchange_code("auth-code").await.unwrap();
        assert_eq!(tokens.access_token, "fresh-token");
        assert_eq!(tokens.refresh_token.as_deref(), Some("fresh-refresh"));

        // Body is form-encoded with the standard grant fields
        let requests = transport.requests.lock().unwrap();
        let body = String::from_utf8(requests[0].body.clone().unwrap().to_vec()).unwrap();
        assert!(body.contains("grant_type=authorization_code"));
        assert!(body.contains("code=auth-code"));
        assert!(body.contains("client_id=client"));
        assert!(body.contains("client_secret=secret"));
    }

    #[tokio::test]
    async fn test_sign_out_clears_state() {
        let transport = Arc::new(AuthScriptTransport::new(false, 200));
        let session = session_with(transport.clone(), Some(TokenSet::bearer_only("t"))).await;
        session.prepare(&IdentityBinding).await.unwrap();

        session.sign_out().await.unwrap();
        assert_eq!(session.state().await, TokenState::Unvalidated);
        assert!(matches!(
            session.access_token().await,
            Err(CloudError::NoAccessToken)
        ));
        assert!(session
            .accounts
            .load(ProviderKind::Box)
            .await
            .unwrap()
            .is_none());
    }
}
