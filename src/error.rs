use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("No usable credentials in {}. Run: gmail-auth login", .0.display())]
    NotConfigured(PathBuf),

    #[error("Credentials not found. Please place your credentials.json in {}", .0.display())]
    MissingRegistration(PathBuf),

    #[error("Authorization code exchange failed: {0}")]
    ExchangeError(String),

    #[error("Token refresh failed: {0}")]
    RefreshError(String),

    #[error("Cannot listen for OAuth callback on {addr}: {source}")]
    ListenerBindError {
        addr: String,
        source: std::io::Error,
    },

    #[error("{}", format_no_code(.0.as_deref()))]
    NoCodeReceived(Option<String>),

    #[error("{}", format_cancelled(.0.as_ref()))]
    ListenerCancelled(Option<Duration>),

    #[error("Authorization failed: {0}")]
    AuthorizationFailed(#[source] Box<AuthError>),

    #[error("Another authorization attempt is already in progress")]
    AuthorizationInProgress,

    #[error("Error in config {}: {detail}", path.display())]
    ConfigError { path: PathBuf, detail: String },

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

fn format_no_code(provider_error: Option<&str>) -> String {
    match provider_error {
        Some(e) => format!("No authorization code received (provider returned '{e}')"),
        None => "No authorization code received".to_string(),
    }
}

fn format_cancelled(timeout: Option<&Duration>) -> String {
    match timeout {
        Some(d) => format!("Timed out waiting for OAuth callback after {}s", d.as_secs()),
        None => "Stopped waiting for OAuth callback".to_string(),
    }
}

impl AuthError {
    /// Wrap a stage failure of an authorization attempt, without nesting twice.
    pub fn authorization_failed(cause: AuthError) -> Self {
        match cause {
            AuthError::AuthorizationFailed(_) => cause,
            other => AuthError::AuthorizationFailed(Box::new(other)),
        }
    }

    /// Error code string for structured JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            AuthError::NotConfigured(_) => "not_configured",
            AuthError::MissingRegistration(_) => "missing_registration",
            AuthError::ExchangeError(_) => "exchange_error",
            AuthError::RefreshError(_) => "refresh_error",
            AuthError::ListenerBindError { .. } => "listener_bind_error",
            AuthError::NoCodeReceived(_) => "no_code_received",
            AuthError::ListenerCancelled(_) => "listener_cancelled",
            AuthError::AuthorizationFailed(_) => "authorization_failed",
            AuthError::AuthorizationInProgress => "authorization_in_progress",
            AuthError::ConfigError { .. } => "config_error",
            AuthError::IoError(_) => "io_error",
        }
    }

    /// Whether running the authorization flow again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            AuthError::MissingRegistration(_) | AuthError::ConfigError { .. } => false,
            AuthError::AuthorizationFailed(cause) => cause.is_retryable(),
            _ => true,
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        let mut obj = serde_json::Map::new();
        obj.insert("message".into(), serde_json::Value::String(self.to_string()));
        obj.insert("code".into(), serde_json::Value::String(self.code().to_string()));
        if let AuthError::AuthorizationFailed(cause) = self {
            obj.insert("cause".into(), serde_json::Value::String(cause.code().to_string()));
        }
        serde_json::json!({ "error": obj })
    }
}
