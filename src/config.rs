use std::path::PathBuf;
use std::time::Duration;

use crate::error::AuthError;

pub const CONFIG_DIR_ENV: &str = "GMAIL_MCP_CONFIG_DIR";
pub const HEADLESS_ENV: &str = "HEADLESS";
pub const OAUTH_TIMEOUT_ENV: &str = "GMAIL_MCP_OAUTH_TIMEOUT_MS";

pub const DEFAULT_AUTHORIZATION_ENDPOINT: &str = "https://accounts.google.com/o/oauth2/v2/auth";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://oauth2.googleapis.com/token";
pub const DEFAULT_CALLBACK_TIMEOUT: Duration = Duration::from_secs(300);

pub const GMAIL_SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/gmail.readonly",
    "https://www.googleapis.com/auth/gmail.send",
    "https://www.googleapis.com/auth/gmail.compose",
    "https://www.googleapis.com/auth/gmail.modify",
    "https://www.googleapis.com/auth/gmail.labels",
];

/// Settings shared by every auth component, resolved once at startup.
#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub config_dir: PathBuf,
    pub scopes: Vec<String>,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    /// `None` waits for the browser redirect indefinitely.
    pub callback_timeout: Option<Duration>,
    pub headless: bool,
    pub open_browser: bool,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            config_dir: resolve_config_dir(None),
            scopes: GMAIL_SCOPES.iter().map(|s| s.to_string()).collect(),
            authorization_endpoint: DEFAULT_AUTHORIZATION_ENDPOINT.to_string(),
            token_endpoint: DEFAULT_TOKEN_ENDPOINT.to_string(),
            callback_timeout: Some(DEFAULT_CALLBACK_TIMEOUT),
            headless: false,
            open_browser: true,
        }
    }
}

impl AuthConfig {
    /// Defaults overlaid with `GMAIL_MCP_CONFIG_DIR`, `HEADLESS` and
    /// `GMAIL_MCP_OAUTH_TIMEOUT_MS`.
    pub fn from_env() -> Result<Self, AuthError> {
        let mut config = AuthConfig {
            config_dir: resolve_config_dir(std::env::var(CONFIG_DIR_ENV).ok().as_deref()),
            ..AuthConfig::default()
        };
        if let Ok(value) = std::env::var(HEADLESS_ENV) {
            config.headless = parse_bool_flag(&value);
        }
        if let Ok(value) = std::env::var(OAUTH_TIMEOUT_ENV) {
            config.callback_timeout = parse_timeout_ms(&value)?;
        }
        Ok(config)
    }

    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = dir.into();
        self
    }

    pub fn credentials_path(&self) -> PathBuf {
        self.config_dir.join("credentials.json")
    }

    pub fn token_path(&self) -> PathBuf {
        self.config_dir.join("token.json")
    }
}

/// Pick the storage directory: a non-empty override, else `~/.gmail-mcp`.
pub fn resolve_config_dir(env_override: Option<&str>) -> PathBuf {
    match env_override {
        Some(dir) if !dir.trim().is_empty() => PathBuf::from(dir),
        _ => dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".gmail-mcp"),
    }
}

pub fn parse_bool_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "true" | "1" | "yes" | "on"
    )
}

/// `0` disables the timeout.
pub fn parse_timeout_ms(value: &str) -> Result<Option<Duration>, AuthError> {
    let ms: u64 = value.trim().parse().map_err(|_| AuthError::ConfigError {
        path: PathBuf::from("<env>"),
        detail: format!("{OAUTH_TIMEOUT_ENV} must be a number of milliseconds, got '{value}'"),
    })?;
    Ok((ms > 0).then(|| Duration::from_millis(ms)))
}
