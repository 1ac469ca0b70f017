//! [`IpLights`] over a catalog file and HTTP.

use std::future::Future;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

use reqwest::StatusCode;

use omnihub_app::ports::{IpLightInfo, IpLights};
use omnihub_domain::error::{OmniHubError, UnsupportedError};

use crate::catalog::LightCatalog;
use crate::error::IpLightError;

/// How long a reachability request may take.
pub const DEFAULT_PING_TIMEOUT: Duration = Duration::from_secs(3);

#[derive(Debug, Clone)]
pub struct HttpIpLights {
    catalog: PathBuf,
    client: reqwest::Client,
}

impl HttpIpLights {
    /// # Errors
    ///
    /// Returns [`IpLightError::Http`] when the HTTP client cannot be built.
    pub fn new(catalog: impl Into<PathBuf>, ping_timeout: Duration) -> Result<Self, IpLightError> {
        let client = reqwest::Client::builder()
            .timeout(ping_timeout)
            .user_agent(concat!("omnihub/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            catalog: catalog.into(),
            client,
        })
    }

    async fn load(&self) -> Result<LightCatalog, IpLightError> {
        let text = match tokio::fs::read_to_string(&self.catalog).await {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(LightCatalog::default()),
            Err(source) => {
                return Err(IpLightError::Io {
                    path: self.catalog.clone(),
                    source,
                });
            }
        };
        LightCatalog::parse(&text).map_err(|source| IpLightError::Json {
            path: self.catalog.clone(),
            source,
        })
    }
}

impl IpLights for HttpIpLights {
    fn list_lights(&self) -> impl Future<Output = Result<Vec<IpLightInfo>, OmniHubError>> + Send {
        async move {
            let catalog = self.load().await?;
            Ok(catalog.devices.into_iter().map(IpLightInfo::from).collect())
        }
    }

    fn ping(&self, address: &str) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        let url = format!("http://{}/", address.trim());
        async move {
            match self.client.get(&url).send().await {
                Ok(response) => Ok(response.status() == StatusCode::OK),
                Err(err) => {
                    tracing::debug!(%url, error = %err, "ip light unreachable");
                    Ok(false)
                }
            }
        }
    }

    fn set_power(
        &self,
        address: &str,
        _on: bool,
    ) -> impl Future<Output = Result<bool, OmniHubError>> + Send {
        let address = address.to_string();
        async move { Err(UnsupportedError::LightPowerUnavailable { address }.into()) }
    }
}
