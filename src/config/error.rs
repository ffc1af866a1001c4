use std::io;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// No config file in any XDG config directory
    #[error("config file {name} not found in any XDG config directory")]
    NotFound { name: String },

    /// IO error while reading the config file
    #[error("unable to read config {path:?}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Malformed JSON
    #[error("unable to parse config {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// A relative path could not be made absolute
    #[error("unable to resolve path {path:?}: {source}")]
    ResolvePath {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ConfigError {
    pub fn not_found(name: impl Into<String>) -> Self {
        ConfigError::NotFound { name: name.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        ConfigError::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        ConfigError::Parse {
            path: path.into(),
            source,
        }
    }
}
