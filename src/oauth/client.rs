use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;
use serde::Deserialize;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::registration::ClientRegistration;
use crate::oauth::token::{now_ms, GrantedToken, TokenResponse};

const TOKEN_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Talks to the provider's authorize and token endpoints.
#[derive(Debug, Clone)]
pub struct AuthorizationClient {
    http: reqwest::Client,
    authorization_endpoint: Url,
    token_endpoint: Url,
}

/// Error body returned by OAuth token endpoints.
#[derive(Debug, Deserialize)]
struct OAuthErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

impl AuthorizationClient {
    pub fn new(config: &AuthConfig) -> Result<Self, AuthError> {
        let http = reqwest::Client::builder()
            .timeout(TOKEN_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| AuthError::ConfigError {
                path: PathBuf::from("<http>"),
                detail: format!("Cannot build HTTP client: {e}"),
            })?;
        Ok(Self {
            http,
            authorization_endpoint: parse_endpoint(&config.authorization_endpoint)?,
            token_endpoint: parse_endpoint(&config.token_endpoint)?,
        })
    }

    /// Consent URL that always asks for offline access and forces the consent
    /// prompt, so the provider issues a refresh token on every authorization.
    pub fn build_consent_url(&self, registration: &ClientRegistration, scopes: &[String]) -> Url {
        let mut url = self.authorization_endpoint.clone();
        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", &registration.client_id)
            .append_pair("redirect_uri", &registration.redirect_uri)
            .append_pair("scope", &scopes.join(" "))
            .append_pair("access_type", "offline")
            .append_pair("prompt", "consent");
        url
    }

    pub async fn exchange_code(
        &self,
        registration: &ClientRegistration,
        code: &str,
    ) -> Result<GrantedToken, AuthError> {
        let resp = self
            .http
            .post(self.token_endpoint.clone())
            .form(&[
                ("grant_type", "authorization_code"),
                ("code", code),
                ("client_id", registration.client_id.as_str()),
                ("client_secret", registration.client_secret.as_str()),
                ("redirect_uri", registration.redirect_uri.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::ExchangeError(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::ExchangeError(describe_rejection(status, &body)));
        }

        let token_resp: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::ExchangeError(format!("cannot parse token response: {e}")))?;

        tracing::debug!("Exchanged authorization code for a new token");
        Ok(token_resp.into_granted_token(now_ms()))
    }

    /// Mint a new access token. The result keeps the old refresh token and
    /// scope when the provider omits them.
    pub async fn refresh(
        &self,
        registration: &ClientRegistration,
        token: &GrantedToken,
    ) -> Result<GrantedToken, AuthError> {
        let refresh_tok = token
            .refresh_token
            .as_deref()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AuthError::RefreshError("no refresh token stored".to_string()))?;

        let resp = self
            .http
            .post(self.token_endpoint.clone())
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_tok),
                ("client_id", registration.client_id.as_str()),
                ("client_secret", registration.client_secret.as_str()),
            ])
            .send()
            .await
            .map_err(|e| AuthError::RefreshError(format!("request failed: {e}")))?;

        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(AuthError::RefreshError(describe_rejection(status, &body)));
        }

        let token_resp: TokenResponse = resp
            .json()
            .await
            .map_err(|e| AuthError::RefreshError(format!("cannot parse token response: {e}")))?;

        let mut renewed = token_resp
            .into_granted_token(now_ms())
            .retain_refresh_token(token);
        if renewed.scope.is_empty() {
            renewed.scope = token.scope.clone();
        }
        Ok(renewed)
    }
}

/// True once the expiry has been reached; tokens without one never expire.
pub fn is_expired(token: &GrantedToken, now_ms: i64) -> bool {
    token.is_expired_at(now_ms)
}

fn parse_endpoint(raw: &str) -> Result<Url, AuthError> {
    Url::parse(raw).map_err(|e| AuthError::ConfigError {
        path: PathBuf::from("<config>"),
        detail: format!("Invalid OAuth endpoint '{raw}': {e}"),
    })
}

fn describe_rejection(status: reqwest::StatusCode, body: &str) -> String {
    match serde_json::from_str::<OAuthErrorBody>(body) {
        Ok(OAuthErrorBody {
            error,
            error_description: Some(desc),
        }) => format!("{error} ({desc}), status {status}"),
        Ok(OAuthErrorBody { error, .. }) => format!("{error}, status {status}"),
        Err(_) => format!("status {status}: {body}"),
    }
}
