use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ObsidianError {
    /// Error body returned by the REST API
    #[error("{message}")]
    Api { code: i64, message: String },

    /// Non-success status without a structured error body
    #[error("API error: status code {status}, body: {body}")]
    Status { status: u16, body: String },

    /// Transport level failure
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(serde_json::Error),

    /// Base url or endpoint could not be built
    #[error("invalid url {url:?}: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// CA certificate could not be loaded
    #[error("unable to load certificate {path:?}: {reason}")]
    Certificate { path: PathBuf, reason: String },

    /// Unknown value for one of the wire enums
    #[error("invalid {kind} {value:?}, expected one of: {expected}")]
    UnknownVariant {
        kind: &'static str,
        value: String,
        expected: &'static str,
    },
}

impl ObsidianError {
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        ObsidianError::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    pub fn certificate_io(path: impl Into<PathBuf>, err: io::Error) -> Self {
        ObsidianError::Certificate {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub fn certificate(path: impl Into<PathBuf>, err: reqwest::Error) -> Self {
        ObsidianError::Certificate {
            path: path.into(),
            reason: err.to_string(),
        }
    }

    pub fn unknown_variant(
        kind: &'static str,
        value: impl Into<String>,
        expected: &'static str,
    ) -> Self {
        ObsidianError::UnknownVariant {
            kind,
            value: value.into(),
            expected,
        }
    }
}
