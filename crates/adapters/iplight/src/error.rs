//! IP light adapter error types.

use std::path::PathBuf;

use omnihub_domain::error::{OmniHubError, TransportError};

#[derive(Debug, thiserror::Error)]
pub enum IpLightError {
    #[error("light catalog error at {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("HTTP client error")]
    Http(#[from] reqwest::Error),
}

impl From<IpLightError> for OmniHubError {
    fn from(err: IpLightError) -> Self {
        match err {
            IpLightError::Http(source) => TransportError::Failed {
                operation: "ip light",
                detail: source.to_string(),
            }
            .into(),
            other => Self::Storage(Box::new(other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn should_report_catalog_problems_as_storage_errors() {
        let err: OmniHubError = IpLightError::Io {
            path: PathBuf::from("state/ip-lights.json"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        }
        .into();
        assert!(matches!(err, OmniHubError::Storage(_)));
    }
}
