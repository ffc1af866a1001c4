use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum GoogleError {
    /// Client secret file could not be read
    #[error("unable to read client secret file {path:?}: {source}")]
    ReadSecret {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Client secret file is not an installed/web OAuth client
    #[error("unable to parse client secret file to config: {reason}")]
    ParseSecret { reason: String },

    /// Token file missing or unreadable
    #[error("unable to read token file {path:?}: {source}")]
    ReadToken {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Token file is not valid token JSON
    #[error("unable to parse token file {path:?}: {source}")]
    ParseToken {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// Token file could not be written
    #[error("unable to cache oauth token to {path:?}: {source}")]
    SaveToken {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Token endpoint rejected an exchange or refresh
    #[error("token endpoint returned status {status}: {body}")]
    TokenEndpoint { status: u16, body: String },

    /// The browser/manual flow did not produce a code
    #[error("authorization failed: {reason}")]
    Authorization { reason: String },

    /// Interrupted while waiting for the redirect
    #[error("authorization cancelled")]
    Cancelled,

    /// Transport level failure
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Error body returned by a Google REST api
    #[error("{message} (status {status})")]
    Api { status: u16, message: String },

    /// Response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(serde_json::Error),

    #[error("invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("io error: {0}")]
    Io(#[from] io::Error),
}

impl GoogleError {
    pub fn parse_secret(reason: impl Into<String>) -> Self {
        GoogleError::ParseSecret {
            reason: reason.into(),
        }
    }

    pub fn authorization(reason: impl Into<String>) -> Self {
        GoogleError::Authorization {
            reason: reason.into(),
        }
    }
}
