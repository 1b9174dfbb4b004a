//! Fuzzy config files (`.bz.toml`, `.bz.json`, `.bz`).
//!
//! A fuzzy config is what users write by hand. Its dependencies are
//! coordinate strings that may omit the version or use a pattern; the
//! resolver pins them and records the result in the lock file.
//!
//! # Format
//!
//! TOML:
//!
//! ```toml
//! binDir = "$DIR/tools/bin"
//! deps = ["github.com/acme/jdk@17.*", "github.com/acme/gradle@8"]
//!
//! [env]
//! JAVA_HOME = "$ACME_JDK_DIR"
//!
//! [alias]
//! build = "gradle build --offline"
//!
//! [triggers]
//! installScript = "./setup.sh"
//! ```
//!
//! JSON uses the same keys. A file named plain `.bz` is JSON when its first
//! line that is neither blank nor a `//` comment starts with `{`, and TOML
//! otherwise.

use crate::core::BzError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Shell commands a dependency runs at lifecycle points.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Triggers {
    /// Runs once, in the dependency directory, right after extraction.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub install_script: Option<String>,

    /// Runs at every composition; receives and returns `{path, env}` as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pre_run_script: Option<String>,
}

impl Triggers {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.install().is_none() && self.pre_run().is_none()
    }

    /// The install script, ignoring an empty string.
    #[must_use]
    pub fn install(&self) -> Option<&str> {
        self.install_script.as_deref().filter(|s| !s.trim().is_empty())
    }

    /// The pre-run script, ignoring an empty string.
    #[must_use]
    pub fn pre_run(&self) -> Option<&str> {
        self.pre_run_script.as_deref().filter(|s| !s.trim().is_empty())
    }
}

/// Contents of a hand-written config file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FuzzyConfigContent {
    /// Directory prepended to PATH; may reference `$DIR`. Defaults to `<dir>/bin`.
    pub bin_dir: Option<String>,

    /// Dependency coordinates, `server/owner/repo[@version]`.
    pub deps: Vec<String>,

    /// Variables exported into the composed environment.
    pub env: BTreeMap<String, String>,

    /// Command aliases; values are shell-tokenized at expansion time.
    pub alias: BTreeMap<String, String>,

    pub triggers: Triggers,
}

/// Serialization format of a config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    Toml,
    Json,
}

impl ConfigFormat {
    /// Picks the format from the file extension, sniffing `content` when the
    /// extension says nothing.
    #[must_use]
    pub fn detect(path: &Path, content: &str) -> Self {
        match path.extension().and_then(|e| e.to_str()).map(str::to_ascii_lowercase).as_deref() {
            Some("json") => Self::Json,
            Some("toml") => Self::Toml,
            _ if looks_like_json(content) => Self::Json,
            _ => Self::Toml,
        }
    }
}

fn looks_like_json(content: &str) -> bool {
    content
        .lines()
        .map(str::trim)
        .find(|line| !line.is_empty() && !line.starts_with("//"))
        .is_some_and(|line| line.starts_with('{'))
}

impl FuzzyConfigContent {
    /// Parses config text in the given format.
    ///
    /// # Errors
    ///
    /// Returns [`BzError::ConfigParseError`] naming `path` on malformed input.
    pub fn parse(path: &Path, content: &str, format: ConfigFormat) -> Result<Self> {
        let parsed = match format {
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| e.to_string()),
            ConfigFormat::Json => {
                let stripped = strip_line_comments(content);
                serde_json::from_str(&stripped).map_err(|e| e.to_string())
            }
        };

        parsed.map_err(|reason| {
            BzError::ConfigParseError {
                file: path.display().to_string(),
                reason,
            }
            .into()
        })
    }

    /// Reads and parses a config file, detecting its format.
    pub async fn load(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        let format = ConfigFormat::detect(path, &content);
        tracing::debug!("Parsing {} as {:?}", path.display(), format);
        Self::parse(path, &content, format)
    }
}

// Drops whole-line `//` comments so sniffed JSON files may carry a header.
fn strip_line_comments(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim_start().starts_with("//"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Returns the first of `names` that exists as a file in `dir`.
#[must_use]
pub fn find_config_file<S: AsRef<str>>(dir: &Path, names: &[S]) -> Option<PathBuf> {
    names
        .iter()
        .map(|name| dir.join(name.as_ref()))
        .find(|path| crate::utils::fs::is_file(path))
}
