//! Light catalog file: `{"devices": [{"id", "name", "ip", "type"}]}`.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use omnihub_app::ports::IpLightInfo;

/// One catalog row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub ip: String,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
}

impl From<CatalogEntry> for IpLightInfo {
    fn from(entry: CatalogEntry) -> Self {
        Self {
            name: entry.name.unwrap_or_else(|| entry.id.clone()),
            identifier: entry.id,
            kind: entry.kind,
            address: entry.ip,
        }
    }
}

/// The whole catalog document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LightCatalog {
    pub devices: Vec<CatalogEntry>,
}

impl LightCatalog {
    /// Read a catalog document, skipping rows that are not usable entries.
    ///
    /// # Errors
    ///
    /// Returns the JSON error when `text` is not JSON at all.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let document: Value = serde_json::from_str(text)?;
        let rows = document
            .get("devices")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let devices = rows
            .into_iter()
            .filter_map(|row| match serde_json::from_value::<CatalogEntry>(row) {
                Ok(entry) if !entry.id.trim().is_empty() => Some(entry),
                Ok(_) => None,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping light catalog row");
                    None
                }
            })
            .collect();
        Ok(Self { devices })
    }
}
