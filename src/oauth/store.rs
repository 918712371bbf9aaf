use std::path::{Path, PathBuf};

use crate::config::AuthConfig;
use crate::error::AuthError;
use crate::oauth::registration::ClientRegistration;
use crate::oauth::token::GrantedToken;

/// Reads the client registration and reads/writes the granted token.
///
/// Read failures of either document are logged and reported as absence.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    registration_path: PathBuf,
    token_path: PathBuf,
}

impl CredentialStore {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            registration_path: config.credentials_path(),
            token_path: config.token_path(),
        }
    }

    pub fn registration_path(&self) -> &Path {
        &self.registration_path
    }

    pub fn token_path(&self) -> &Path {
        &self.token_path
    }

    pub fn has_registration(&self) -> bool {
        self.registration_path.is_file()
    }

    pub fn has_token(&self) -> bool {
        self.token_path.is_file()
    }

    pub fn load_registration(&self) -> Option<ClientRegistration> {
        let content = read_document(&self.registration_path)?;
        match ClientRegistration::from_json(&content) {
            Ok(reg) => Some(reg),
            Err(e) => {
                tracing::warn!(
                    "Ignoring malformed credentials {}: {e}",
                    self.registration_path.display()
                );
                None
            }
        }
    }

    pub fn load_token(&self) -> Option<GrantedToken> {
        let content = read_document(&self.token_path)?;
        match serde_json::from_str(&content) {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::warn!(
                    "Ignoring malformed token {}: {e}",
                    self.token_path.display()
                );
                None
            }
        }
    }

    /// Write the token to a sibling temp file and rename it into place, so a
    /// failed write never clobbers the previous document.
    pub fn save_token(&self, token: &GrantedToken) -> Result<(), AuthError> {
        let dir = self
            .token_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        std::fs::create_dir_all(&dir)?;

        let data = serde_json::to_string_pretty(token).map_err(|e| AuthError::ConfigError {
            path: self.token_path.clone(),
            detail: format!("Failed to serialize token: {e}"),
        })?;

        let tmp_path = dir.join(format!(".token.json.{}.tmp", uuid::Uuid::new_v4()));
        if let Err(e) = write_private(&tmp_path, data.as_bytes())
            .and_then(|()| std::fs::rename(&tmp_path, &self.token_path))
        {
            let _ = std::fs::remove_file(&tmp_path);
            return Err(e.into());
        }

        tracing::debug!("Saved token to {}", self.token_path.display());
        Ok(())
    }
}

fn read_document(path: &Path) -> Option<String> {
    if !path.exists() {
        return None;
    }
    match std::fs::read_to_string(path) {
        Ok(content) => Some(content),
        Err(e) => {
            tracing::warn!("Cannot read {}: {e}", path.display());
            None
        }
    }
}

#[cfg(unix)]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = std::fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)?;
    file.write_all(data)?;
    file.sync_all()
}

#[cfg(not(unix))]
fn write_private(path: &Path, data: &[u8]) -> std::io::Result<()> {
    std::fs::write(path, data)
}
