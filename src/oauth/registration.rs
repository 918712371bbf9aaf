use serde::Deserialize;

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/oauth2callback";

/// Which section of the client secrets document the registration came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApplicationKind {
    Installed,
    Web,
}

/// The client application's identity as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientRegistration {
    pub kind: ApplicationKind,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsFile {
    #[serde(default)]
    installed: Option<ClientSecretsSection>,
    #[serde(default)]
    web: Option<ClientSecretsSection>,
}

#[derive(Debug, Deserialize)]
struct ClientSecretsSection {
    client_id: String,
    client_secret: String,
    #[serde(default)]
    redirect_uris: Vec<String>,
}

impl ClientRegistration {
    /// Parse a `credentials.json` document. The `installed` section is
    /// preferred over `web` when both are present.
    pub fn from_json(content: &str) -> Result<Self, String> {
        let file: ClientSecretsFile =
            serde_json::from_str(content).map_err(|e| format!("invalid JSON: {e}"))?;

        let (kind, section) = match (file.installed, file.web) {
            (Some(installed), _) => (ApplicationKind::Installed, installed),
            (None, Some(web)) => (ApplicationKind::Web, web),
            (None, None) => {
                return Err("expected an \"installed\" or \"web\" section".to_string());
            }
        };

        let redirect_uri = section
            .redirect_uris
            .into_iter()
            .find(|uri| !uri.is_empty())
            .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string());

        Ok(ClientRegistration {
            kind,
            client_id: section.client_id,
            client_secret: section.client_secret,
            redirect_uri,
        })
    }
}
