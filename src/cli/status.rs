use std::io::IsTerminal;

use serde::Serialize;

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::token::now_ms;
use crate::oauth::AuthSession;

use super::output::{format_expiry, presence_line};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthStatus {
    pub config_dir: String,
    pub registration: bool,
    pub token: bool,
    pub authenticated: bool,
    pub expiry_date: Option<i64>,
    pub expired: bool,
}

/// Inspect the stored documents without touching the network.
pub fn collect_status(auth: &AuthSession, now_ms: i64) -> AuthStatus {
    let token = auth.store().load_token();
    AuthStatus {
        config_dir: auth.config().config_dir.display().to_string(),
        registration: auth.store().has_registration(),
        token: auth.store().has_token(),
        authenticated: auth.is_authenticated(),
        expiry_date: token.as_ref().and_then(|t| t.expiry_date),
        expired: token.as_ref().is_some_and(|t| t.is_expired_at(now_ms)),
    }
}

pub fn run_status(config: AuthConfig, json: bool) -> Result<(), AuthError> {
    let auth = AuthSession::new(config)?;
    let now = now_ms();
    let status = collect_status(&auth, now);

    if json {
        println!("{}", serde_json::to_string_pretty(&status).unwrap_or_default());
        return Ok(());
    }

    let is_tty = std::io::stdout().is_terminal();
    println!("Config directory: {}", status.config_dir);
    println!("{}", presence_line("Credentials", status.registration, is_tty));
    println!("{}", presence_line("Token", status.token, is_tty));
    if status.token {
        println!("Token expires: {}", format_expiry(status.expiry_date, now));
    }
    if !status.authenticated {
        println!("\nRun `gmail-auth login` to authorize access.");
    }
    Ok(())
}

/// Print a currently valid access token, refreshing the stored one if needed.
pub async fn run_token(config: AuthConfig, json: bool) -> Result<(), AuthError> {
    let auth = AuthSession::new(config)?;
    let session = auth
        .get_authorized_client()
        .await
        .ok_or_else(|| AuthError::NotConfigured(auth.config().config_dir.clone()))?;

    if json {
        let out = serde_json::json!({
            "accessToken": session.access_token(),
            "tokenType": session.token().token_type,
            "expiryDate": session.expiry_date(),
        });
        println!("{}", serde_json::to_string_pretty(&out).unwrap_or_default());
    } else {
        println!("{}", session.access_token());
    }
    Ok(())
}
