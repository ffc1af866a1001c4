use crate::google::error::GoogleError;
use chrono::{DateTime, Datelike, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tokio::io::AsyncWriteExt;

/// Tokens are refreshed this long before they actually expire.
fn expiry_delta() -> Duration {
    Duration::seconds(10)
}

/// OAuth2 token as persisted in `token.json`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub token_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry: Option<DateTime<Utc>>,
}

/// Successful response of the token endpoint.
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
}

impl TokenResponse {
    pub(crate) fn into_token(self, now: DateTime<Utc>) -> Token {
        Token {
            access_token: self.access_token,
            token_type: self.token_type,
            refresh_token: self.refresh_token.filter(|token| !token.is_empty()),
            expiry: self
                .expires_in
                .filter(|seconds| *seconds > 0)
                .map(|seconds| now + Duration::seconds(seconds)),
        }
    }
}

impl Token {
    /// Expiry, ignoring the zero timestamp written for tokens that never expire.
    fn effective_expiry(&self) -> Option<DateTime<Utc>> {
        self.expiry.filter(|expiry| expiry.year() > 1)
    }

    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        if self.access_token.is_empty() {
            return false;
        }

        match self.effective_expiry() {
            Some(expiry) => expiry - expiry_delta() > now,
            None => true,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.is_valid_at(Utc::now())
    }

    pub async fn load(path: &Path) -> Result<Self, GoogleError> {
        let raw = tokio::fs::read(path)
            .await
            .map_err(|source| GoogleError::ReadToken {
                path: path.to_path_buf(),
                source,
            })?;

        serde_json::from_slice(&raw).map_err(|source| GoogleError::ParseToken {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the token, readable by the current user only.
    pub async fn save(&self, path: &Path) -> Result<(), GoogleError> {
        tracing::info!(?path, "saving credential file");

        let save_error = |source| GoogleError::SaveToken {
            path: path.to_path_buf(),
            source,
        };

        let json = serde_json::to_vec_pretty(self).map_err(GoogleError::Decode)?;

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);

        let mut file = options.open(path).await.map_err(save_error)?;
        // `mode` only applies on create, tighten files that already existed
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(save_error)?;
        }
        file.write_all(&json).await.map_err(save_error)?;
        file.flush().await.map_err(save_error)?;

        Ok(())
    }
}
