//! OAuth2 credential bridge for the Gmail API.
//!
//! Turns a one-time authorization-code grant into a persisted, auto-refreshing
//! access token that API clients can use without user interaction.

pub mod cli;
pub mod config;
pub mod error;
pub mod oauth;

pub use config::AuthConfig;
pub use error::AuthError;
pub use oauth::{AuthSession, AuthorizedSession, ClientRegistration, CredentialStore, GrantedToken};

/// Load configuration from the environment and return a session with a
/// currently valid token, or `NotConfigured` when authorization is needed.
pub async fn authorized_session() -> Result<AuthorizedSession, AuthError> {
    let auth = AuthSession::from_env()?;
    auth.get_authorized_client()
        .await
        .ok_or_else(|| AuthError::NotConfigured(auth.config().config_dir.clone()))
}
