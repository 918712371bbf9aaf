use async_trait::async_trait;
use reqwest::Url;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::AuthError;

/// Source of an authorization code obtained out-of-band, for hosts without a
/// browser or loopback network.
#[async_trait]
pub trait CodePrompt: Send + Sync {
    async fn read_code(&self, consent_url: &Url) -> Result<String, AuthError>;
}

/// Asks the operator to paste the code (or the whole redirect URL) on stdin.
#[derive(Debug, Default, Clone, Copy)]
pub struct StdinPrompt;

#[async_trait]
impl CodePrompt for StdinPrompt {
    async fn read_code(&self, _consent_url: &Url) -> Result<String, AuthError> {
        eprintln!("After approving access, your browser is redirected to a page that may fail to load.");
        eprintln!("Copy the 'code' parameter from its address bar (or the full URL) and paste it here:");

        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        let line = lines.next_line().await?.unwrap_or_default();
        extract_code(&line).ok_or(AuthError::NoCodeReceived(None))
    }
}

/// Accept either a bare code or a redirect URL carrying `code=`.
pub fn extract_code(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }
    if let Ok(url) = Url::parse(input) {
        if url.has_host() {
            return url
                .query_pairs()
                .find(|(k, v)| k == "code" && !v.is_empty())
                .map(|(_, v)| v.into_owned());
        }
    }
    if input.starts_with('?') || input.contains("code=") {
        let query = input.trim_start_matches('?');
        return Url::parse(&format!("http://localhost/?{query}"))
            .ok()?
            .query_pairs()
            .find(|(k, v)| k == "code" && !v.is_empty())
            .map(|(_, v)| v.into_owned());
    }
    Some(input.to_string())
}
