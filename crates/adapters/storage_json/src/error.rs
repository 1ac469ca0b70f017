//! Storage-specific error type wrapping file system and JSON errors.

use std::path::PathBuf;

use omnihub_domain::error::OmniHubError;

/// Errors originating from the JSON file stores.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading, writing or renaming a state file failed.
    #[error("state file error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A state file did not contain the expected JSON document.
    #[error("invalid JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn json(path: impl Into<PathBuf>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.into(),
            source,
        }
    }
}

impl From<StoreError> for OmniHubError {
    fn from(err: StoreError) -> Self {
        Self::Storage(Box::new(err))
    }
}
