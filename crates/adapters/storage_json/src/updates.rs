//! Firmware update history.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use omnihub_domain::error::OmniHubError;

use crate::file::{read_json, write_json};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateEntry {
    pub version: String,
    pub description: String,
    /// Release date, `YYYY-MM-DD`.
    pub date: String,
}

impl UpdateEntry {
    #[must_use]
    pub fn new(
        version: impl Into<String>,
        description: impl Into<String>,
        date: impl Into<String>,
    ) -> Self {
        Self {
            version: version.into(),
            description: description.into(),
            date: date.into(),
        }
    }
}

fn seed_history() -> Vec<UpdateEntry> {
    vec![
        UpdateEntry::new(
            "1.0.0",
            "First stable release: Bluetooth display control and device dashboard.",
            "2025-09-12",
        ),
        UpdateEntry::new(
            "0.9.5-beta",
            "Accessory bridge discovery and infrared recording helpers.",
            "2025-07-01",
        ),
    ]
}

#[derive(Debug, Clone)]
pub struct UpdateHistoryStore {
    path: PathBuf,
}

impl UpdateHistoryStore {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the history, writing the seed releases first when the file is
    /// missing.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::Storage`] when the file cannot be read, parsed
    /// or seeded.
    pub async fn load(&self) -> Result<Vec<UpdateEntry>, OmniHubError> {
        if let Some(history) = read_json(&self.path).await? {
            return Ok(history);
        }
        let history = seed_history();
        write_json(&self.path, &history).await?;
        Ok(history)
    }

    /// Add `entry` at the end and rewrite the file.
    ///
    /// # Errors
    ///
    /// Returns [`OmniHubError::Storage`] on read or write failure.
    pub async fn append(&self, entry: UpdateEntry) -> Result<Vec<UpdateEntry>, OmniHubError> {
        let mut history = self.load().await?;
        history.push(entry);
        write_json(&self.path, &history).await?;
        Ok(history)
    }
}
