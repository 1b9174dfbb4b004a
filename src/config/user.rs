//! User configuration (`~/.bz/config.toml`).
//!
//! Holds settings that must never live in a project: per-server access
//! tokens for private release hosts, and an optional local mirror directory
//! used while developing dependencies.
//!
//! ```toml
//! local_repo = "/home/me/bz-local"
//!
//! [servers."github.com"]
//! token = "ghp_xxxxxxxxxxxx"
//!
//! [servers."github.example.com"]
//! token = "..."
//! api_url = "https://github.example.com/api/v3"
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Settings for one release server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bearer token sent with every API request to this server.
    pub token: Option<String>,

    /// REST API base URL. Defaults to `https://api.github.com` for
    /// `github.com` and `https://<server>/api/v3` otherwise.
    pub api_url: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    /// Server name to settings. Servers listed here are served by the GitHub
    /// release resolver in addition to `github.com`.
    pub servers: BTreeMap<String, ServerConfig>,

    /// Root of a local mirror laid out as `<server>/<owner>/<repo>/v<version>/`.
    pub local_repo: Option<PathBuf>,
}

impl UserConfig {
    /// Loads the user config, returning defaults when the file is missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub async fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load_from(path).await
        } else {
            tracing::debug!("No user config at {}, using defaults", path.display());
            Ok(Self::default())
        }
    }

    pub async fn load_from(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read user config from {}", path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse user config from {}", path.display()))
    }

    /// Case-insensitive lookup of a server's settings.
    #[must_use]
    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|(k, _)| k.eq_ignore_ascii_case(name)).map(|(_, v)| v)
    }

    #[must_use]
    pub fn token_for(&self, server: &str) -> Option<&str> {
        self.server(server).and_then(|s| s.token.as_deref()).filter(|t| !t.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_missing_file_is_default() {
        let temp = TempDir::new().unwrap();
        let cfg = UserConfig::load(&temp.path().join("config.toml")).await.unwrap();
        assert_eq!(cfg, UserConfig::default());
    }

    #[tokio::test]
    async fn test_load_servers_and_local_repo() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
local_repo = "/srv/bz"

[servers."GitHub.com"]
token = "abc"

[servers."ghe.example.com"]
api_url = "https://ghe.example.com/api/v3"
"#,
        )
        .unwrap();

        let cfg = UserConfig::load(&path).await.unwrap();
        assert_eq!(cfg.local_repo, Some(PathBuf::from("/srv/bz")));
        assert_eq!(cfg.token_for("github.com"), Some("abc"));
        assert_eq!(cfg.token_for("ghe.example.com"), None);
        assert_eq!(
            cfg.server("ghe.example.com").and_then(|s| s.api_url.as_deref()),
            Some("https://ghe.example.com/api/v3")
        );
    }

    #[tokio::test]
    async fn test_invalid_file_is_error() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("config.toml");
        std::fs::write(&path, "servers = 3").unwrap();

        let err = UserConfig::load(&path).await.unwrap_err();
        assert!(err.to_string().contains("Failed to parse user config"));
    }
}
