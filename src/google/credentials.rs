use crate::google::error::GoogleError;
use serde::Deserialize;
use std::path::Path;

const DEFAULT_AUTH_URI: &str = "https://accounts.google.com/o/oauth2/auth";
const DEFAULT_TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// OAuth client from a Google Cloud `credentials.json`.
#[derive(Clone, Debug, Deserialize)]
pub struct Credentials {
    pub client_id: String,
    #[serde(default)]
    pub client_secret: String,
    #[serde(default = "default_auth_uri")]
    pub auth_uri: String,
    #[serde(default = "default_token_uri")]
    pub token_uri: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
}

#[derive(Deserialize)]
struct ClientSecretFile {
    installed: Option<Credentials>,
    web: Option<Credentials>,
}

fn default_auth_uri() -> String {
    DEFAULT_AUTH_URI.to_string()
}

fn default_token_uri() -> String {
    DEFAULT_TOKEN_URI.to_string()
}

impl Credentials {
    /// Parse a client secret file, either a desktop (`installed`) or a web client.
    pub fn from_json(raw: &[u8]) -> Result<Self, GoogleError> {
        let file: ClientSecretFile =
            serde_json::from_slice(raw).map_err(|err| GoogleError::parse_secret(err.to_string()))?;

        let credentials = file
            .installed
            .or(file.web)
            .ok_or_else(|| GoogleError::parse_secret("missing \"installed\" or \"web\" client"))?;

        if credentials.client_id.is_empty() {
            return Err(GoogleError::parse_secret("empty client_id"));
        }

        Ok(credentials)
    }

    pub async fn from_file(path: &Path) -> Result<Self, GoogleError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|source| GoogleError::ReadSecret {
                path: path.to_path_buf(),
                source,
            })?;

        Self::from_json(&raw)
    }
}
