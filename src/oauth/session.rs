use reqwest::header::AUTHORIZATION;
use reqwest::Url;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::callback::CallbackListener;
use crate::oauth::client::{is_expired, AuthorizationClient};
use crate::oauth::prompt::{CodePrompt, StdinPrompt};
use crate::oauth::registration::ClientRegistration;
use crate::oauth::store::CredentialStore;
use crate::oauth::token::{now_ms, GrantedToken};

/// Registration plus the current token, ready to sign outbound requests.
#[derive(Clone)]
pub struct AuthorizedSession {
    registration: ClientRegistration,
    token: GrantedToken,
}

impl std::fmt::Debug for AuthorizedSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizedSession")
            .field("client_id", &self.registration.client_id)
            .field("token_type", &self.token.token_type)
            .field("expiry_date", &self.token.expiry_date)
            .finish_non_exhaustive()
    }
}

impl AuthorizedSession {
    pub fn new(registration: ClientRegistration, token: GrantedToken) -> Self {
        Self {
            registration,
            token,
        }
    }

    pub fn registration(&self) -> &ClientRegistration {
        &self.registration
    }

    pub fn token(&self) -> &GrantedToken {
        &self.token
    }

    pub fn access_token(&self) -> &str {
        &self.token.access_token
    }

    /// Epoch milliseconds, if the grant expires at all.
    pub fn expiry_date(&self) -> Option<i64> {
        self.token.expiry_date
    }

    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        is_expired(&self.token, now_ms)
    }

    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token.token_type, self.token.access_token)
    }

    /// Attach the credentials to an outbound request.
    pub fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request.header(AUTHORIZATION, self.authorization_header())
    }

    /// Switch to a refreshed token, keeping the refresh token it may omit.
    pub fn adopt_token(&mut self, token: GrantedToken) {
        self.token = token.retain_refresh_token(&self.token);
    }
}

/// Entry point answering "give me something that can call the API now".
pub struct AuthSession {
    config: AuthConfig,
    store: CredentialStore,
    client: AuthorizationClient,
    in_flight: tokio::sync::Mutex<()>,
}

impl AuthSession {
    pub fn new(config: AuthConfig) -> Result<Self, AuthError> {
        let store = CredentialStore::new(&config);
        let client = AuthorizationClient::new(&config)?;
        Ok(Self {
            config,
            store,
            client,
            in_flight: tokio::sync::Mutex::new(()),
        })
    }

    pub fn from_env() -> Result<Self, AuthError> {
        Self::new(AuthConfig::from_env()?)
    }

    pub fn config(&self) -> &AuthConfig {
        &self.config
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    pub fn client(&self) -> &AuthorizationClient {
        &self.client
    }

    /// Both documents exist on disk. No parsing, expiry check or network.
    pub fn is_authenticated(&self) -> bool {
        self.store.has_registration() && self.store.has_token()
    }

    pub async fn get_authorized_client(&self) -> Option<AuthorizedSession> {
        self.get_authorized_client_at(now_ms()).await
    }

    /// Load the stored grant, refreshing it first if it expired at `now_ms`.
    /// A failed refresh yields `None` and leaves the stored token alone.
    pub async fn get_authorized_client_at(&self, now_ms: i64) -> Option<AuthorizedSession> {
        let registration = self.store.load_registration()?;
        let token = self.store.load_token()?;

        if !is_expired(&token, now_ms) {
            return Some(AuthorizedSession::new(registration, token));
        }

        let _guard = self.in_flight.lock().await;
        // A login or refresh that held the lock may have replaced the grant.
        let token = self.store.load_token()?;
        if !is_expired(&token, now_ms) {
            return Some(AuthorizedSession::new(registration, token));
        }
        tracing::info!("Access token expired, refreshing");
        let renewed = match self.client.refresh(&registration, &token).await {
            Ok(renewed) => renewed,
            Err(e) => {
                tracing::warn!("Error refreshing token: {e}");
                return None;
            }
        };
        if let Err(e) = self.store.save_token(&renewed) {
            tracing::warn!("Refreshed token could not be saved: {e}");
            return None;
        }
        Some(AuthorizedSession::new(registration, renewed))
    }

    /// Refresh the session in place when its token has expired.
    pub async fn ensure_fresh(&self, session: &mut AuthorizedSession) -> Result<(), AuthError> {
        if !session.is_expired_at(now_ms()) {
            return Ok(());
        }
        let _guard = self.in_flight.lock().await;
        if let Some(stored) = self.store.load_token() {
            if !is_expired(&stored, now_ms()) {
                session.adopt_token(stored);
                return Ok(());
            }
        }
        let renewed = self
            .client
            .refresh(session.registration(), session.token())
            .await?;
        self.store.save_token(&renewed)?;
        session.adopt_token(renewed);
        Ok(())
    }

    /// Interactive or headless authorization, per `config.headless`.
    pub async fn authorize(&self) -> Result<AuthorizedSession, AuthError> {
        if self.config.headless {
            self.authorize_headless(&StdinPrompt).await
        } else {
            self.authorize_interactive().await
        }
    }

    /// Browser flow: the provider redirects back to a loopback listener bound
    /// to the registration's redirect URI.
    pub async fn authorize_interactive(&self) -> Result<AuthorizedSession, AuthError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AuthError::AuthorizationInProgress)?;
        let registration = self.require_registration()?;
        let consent_url = self.client.build_consent_url(&registration, &self.config.scopes);

        let code = self
            .receive_redirect(&registration, &consent_url)
            .await
            .map_err(AuthError::authorization_failed)?;
        self.complete(registration, &code).await
    }

    /// Flow without browser or listener; the code arrives through `prompt`.
    pub async fn authorize_headless(
        &self,
        prompt: &dyn CodePrompt,
    ) -> Result<AuthorizedSession, AuthError> {
        let _guard = self
            .in_flight
            .try_lock()
            .map_err(|_| AuthError::AuthorizationInProgress)?;
        let registration = self.require_registration()?;
        let consent_url = self.client.build_consent_url(&registration, &self.config.scopes);

        announce_consent_url(&consent_url);
        let code = prompt
            .read_code(&consent_url)
            .await
            .map_err(AuthError::authorization_failed)?;
        self.complete(registration, &code).await
    }

    fn require_registration(&self) -> Result<ClientRegistration, AuthError> {
        self.store
            .load_registration()
            .ok_or_else(|| AuthError::MissingRegistration(self.store.registration_path().to_path_buf()))
    }

    async fn receive_redirect(
        &self,
        registration: &ClientRegistration,
        consent_url: &Url,
    ) -> Result<String, AuthError> {
        let listener = CallbackListener::bind(&registration.redirect_uri).await?;
        eprintln!(
            "Listening on http://{}{} for OAuth callback...",
            listener.local_addr(),
            listener.expected_path()
        );

        announce_consent_url(consent_url);
        if self.config.open_browser && webbrowser::open(consent_url.as_str()).is_err() {
            tracing::warn!("Could not open browser automatically. Please visit the URL above.");
        }
        eprintln!("Waiting for authorization...");

        listener.await_code(self.config.callback_timeout).await
    }

    async fn complete(
        &self,
        registration: ClientRegistration,
        code: &str,
    ) -> Result<AuthorizedSession, AuthError> {
        let token = self
            .client
            .exchange_code(&registration, code)
            .await
            .map_err(AuthError::authorization_failed)?;
        self.store
            .save_token(&token)
            .map_err(AuthError::authorization_failed)?;
        tracing::info!("Token saved to {}", self.store.token_path().display());
        Ok(AuthorizedSession::new(registration, token))
    }
}

fn announce_consent_url(url: &Url) {
    eprintln!("\nAuthorize this app by visiting this URL:\n");
    eprintln!("{url}\n");
}
