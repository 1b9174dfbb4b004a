//! Loading and saving lock files.

use anyhow::{Context, Result};
use std::path::Path;

use crate::core::BzError;
use crate::utils::fs::atomic_write;

use super::LockedConfigContent;

impl LockedConfigContent {
    /// Loads a lock file.
    ///
    /// # Errors
    ///
    /// Returns [`BzError::LockfileParseError`] when the file is missing,
    /// unreadable, or not valid lock JSON. Callers at the project root treat
    /// this as "re-resolve from the fuzzy config".
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| BzError::LockfileParseError {
            file: path.display().to_string(),
            reason: e.to_string(),
        })?;

        serde_json::from_str(&content).map_err(|e| {
            BzError::LockfileParseError {
                file: path.display().to_string(),
                reason: e.to_string(),
            }
            .into()
        })
    }

    /// Writes the lock file as pretty JSON, atomically replacing any
    /// existing file.
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut content =
            serde_json::to_string_pretty(self).context("Failed to serialize lock file")?;
        content.push('\n');

        atomic_write(path, content.as_bytes())
            .with_context(|| format!("Cannot write lock file: {}", path.display()))?;

        tracing::debug!("Wrote lock file {}", path.display());
        Ok(())
    }
}
