//! Token broker
//!
//! Two independent caches, one per trust model. A cached token is handed out
//! while `now + 60s < expires_at`.
//!
//! The service cache lock is held across the client-credential exchange, so
//! concurrent misses collapse into one request. The delegated cache lock is
//! only taken to read and to store: a login can wait on a human for minutes
//! and must not block unrelated callers.

use chrono::Duration;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use url::Url;

use toolgate_core::{
    CachedCredential, IdentityConfig, SharedClock, TrustModel,
    SERVICE_CREDENTIAL_DEFAULT_LIFETIME_SECS, USER_CREDENTIAL_VALIDITY_SECS,
};

use super::pending::{NoPendingLogin, PendingLogins};
use super::pkce::{generate_state, PkceChallenge, PKCE_METHOD};
use super::presenter::UrlPresenter;
use super::provider::IdentityProvider;
use super::token::{AuthorizationCodeRequest, ClientCredentialsRequest, TokenResponse};
use super::AuthError;

pub struct TokenBroker {
    provider: Arc<dyn IdentityProvider>,
    presenter: Arc<dyn UrlPresenter>,
    identity: IdentityConfig,
    clock: SharedClock,
    service_cache: Mutex<Option<CachedCredential>>,
    user_cache: Mutex<Option<CachedCredential>>,
    pending: PendingLogins,
}

impl TokenBroker {
    pub fn new(
        identity: IdentityConfig,
        provider: Arc<dyn IdentityProvider>,
        presenter: Arc<dyn UrlPresenter>,
        clock: SharedClock,
    ) -> Self {
        let pending = PendingLogins::new(identity.correlation);
        Self {
            provider,
            presenter,
            identity,
            clock,
            service_cache: Mutex::new(None),
            user_cache: Mutex::new(None),
            pending,
        }
    }

    /// Logins currently waiting for an authorization code
    pub fn pending_logins(&self) -> usize {
        self.pending.len()
    }

    /// Access token under the given trust model
    pub async fn acquire(&self, trust_model: TrustModel) -> Result<String, AuthError> {
        match trust_model {
            TrustModel::ServiceCredential => self.service_credential().await,
            TrustModel::DelegatedUser => self.delegated_credential().await,
        }
    }

    /// Client-credential token, cached for the provider-reported lifetime
    pub async fn service_credential(&self) -> Result<String, AuthError> {
        let mut cache = self.service_cache.lock().await;

        if let Some(cached) = cache.as_ref() {
            if cached.is_reusable_at(self.clock.now()) {
                debug!("[OAuth] Using cached service credential");
                return Ok(cached.access_token.clone());
            }
        }

        let service = &self.identity.service;
        let request = ClientCredentialsRequest {
            token_endpoint: self.identity.token_endpoint(&service.tenant_id),
            client_id: service.client_id.clone(),
            client_secret: service.client_secret.clone(),
            scope: service.scope(),
        };

        let token = match self.provider.exchange_client_credentials(&request).await {
            Ok(token) => token,
            Err(e) => {
                warn!("[OAuth] Service credential exchange failed: {}", e);
                return Err(e);
            }
        };
        let token = non_empty(token)?;

        let lifetime = token.expires_in.unwrap_or(SERVICE_CREDENTIAL_DEFAULT_LIFETIME_SECS);
        let credential =
            CachedCredential::valid_for(token.access_token, self.clock.now(), Duration::seconds(lifetime));
        info!(
            "[OAuth] Service credential acquired, expires at {}",
            credential.expires_at
        );

        let access_token = credential.access_token.clone();
        *cache = Some(credential);
        Ok(access_token)
    }

    /// Delegated-user token via browser login, cached for one hour
    pub async fn delegated_credential(&self) -> Result<String, AuthError> {
        {
            let cache = self.user_cache.lock().await;
            if let Some(cached) = cache.as_ref() {
                if cached.is_reusable_at(self.clock.now()) {
                    debug!("[OAuth] Using cached user credential");
                    return Ok(cached.access_token.clone());
                }
            }
        }

        let login = &self.identity.login;
        let pkce = PkceChallenge::generate();
        let state = generate_state();
        let url = self.authorization_url(&pkce, &state)?;

        // Registered before the URL leaves the process, so a fast redirect
        // always finds its waiter
        let receiver = self
            .pending
            .register(state, pkce.verifier.clone(), self.clock.now());
        self.presenter.present(url.as_str());

        let grant = receiver.await.map_err(|_| AuthError::LoginAbandoned)?;

        let request = AuthorizationCodeRequest {
            token_endpoint: self.identity.token_endpoint(&login.tenant_id),
            client_id: login.client_id.clone(),
            code: grant.code,
            redirect_uri: login.redirect_uri.clone(),
            code_verifier: grant.verifier,
            scope: login.scope(),
        };

        let token = match self.provider.exchange_authorization_code(&request).await {
            Ok(token) => token,
            Err(e) => {
                warn!("[OAuth] Authorization code exchange failed: {}", e);
                return Err(e);
            }
        };
        let token = non_empty(token)?;

        let credential = CachedCredential::valid_for(
            token.access_token,
            self.clock.now(),
            Duration::seconds(USER_CREDENTIAL_VALIDITY_SECS),
        );
        info!(
            "[OAuth] User credential acquired, cached until {}",
            credential.expires_at
        );

        let access_token = credential.access_token.clone();
        *self.user_cache.lock().await = Some(credential);
        Ok(access_token)
    }

    /// Feed an authorization code from the browser callback to a pending login
    pub fn resolve_login(&self, code: &str, state: Option<&str>) -> Result<(), NoPendingLogin> {
        self.pending
            .resolve(code, state, self.clock.now())
            .map(|_| ())
    }

    /// Drop both cached tokens
    pub async fn invalidate(&self) {
        *self.service_cache.lock().await = None;
        *self.user_cache.lock().await = None;
        debug!("[OAuth] Credential caches cleared");
    }

    fn authorization_url(&self, pkce: &PkceChallenge, state: &str) -> Result<Url, AuthError> {
        let login = &self.identity.login;
        let mut url = Url::parse(&self.identity.authorize_endpoint(&login.tenant_id))?;
        url.query_pairs_mut()
            .append_pair("client_id", &login.client_id)
            .append_pair("response_type", "code")
            .append_pair("redirect_uri", &login.redirect_uri)
            .append_pair("scope", &login.scope())
            .append_pair("code_challenge", &pkce.challenge)
            .append_pair("code_challenge_method", PKCE_METHOD)
            .append_pair("state", state);
        Ok(url)
    }
}

fn non_empty(token: TokenResponse) -> Result<TokenResponse, AuthError> {
    if token.access_token.trim().is_empty() {
        warn!("[OAuth] Token endpoint answered without an access token");
        return Err(AuthError::EmptyToken);
    }
    Ok(token)
}
