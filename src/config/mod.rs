//! Configuration management for bz
//!
//! bz reads three kinds of configuration:
//!
//! 1. **User configuration** (`~/.bz/config.toml`) - tokens and the local
//!    mirror directory; see [`user`]
//! 2. **Fuzzy config** (`.bz.toml`, `.bz.json`, `.bz`) - the project's
//!    hand-written dependency list; see [`content`]
//! 3. **Lock file** (`.bz.lock`) - pinned versions; see [`crate::lockfile`]
//!
//! [`AppContext`] ties these together with the directory layout.
//!
//! # Directory Layout
//!
//! ```text
//! ~/.bz/                      # user dir       (BZ_HOME)
//! ├── config.toml             # user config    (BZ_CONFIG)
//! └── cache/                  # cache dir      (BZ_CACHE_DIR)
//!     └── deps/<server>/<owner>/<repo>/v<version>/
//! ```

pub mod content;
pub mod user;

pub use content::{ConfigFormat, FuzzyConfigContent, Triggers, find_config_file};
pub use user::{ServerConfig, UserConfig};

use crate::cache::Cache;
use crate::constants::{
    APP_NAME, CACHE_DIR_ENV, CONFIG_ENV, CONFIG_FILE_NAMES, HOME_ENV, LOCK_FILE_NAME,
};
use anyhow::Result;
use std::path::{Path, PathBuf};

/// Names and locations bz works with, plus the loaded user config.
///
/// Built once in `main` and passed by reference; nothing in bz reads the
/// environment for these values after construction.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub app_name: String,
    pub lock_file_name: String,
    /// Fuzzy config names in lookup priority order
    pub config_file_names: Vec<String>,
    pub user_dir: PathBuf,
    pub cache_dir: PathBuf,
    pub user_config_path: PathBuf,
    pub user_config: UserConfig,
}

impl AppContext {
    /// Builds the context from the environment and loads the user config.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the user
    /// config exists but is invalid.
    pub async fn load() -> Result<Self> {
        let user_dir = match std::env::var_os(HOME_ENV) {
            Some(dir) if !dir.is_empty() => PathBuf::from(dir),
            _ => crate::utils::platform::get_home_dir()?.join(format!(".{APP_NAME}")),
        };

        let mut ctx = Self::with_user_dir(user_dir);

        if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|d| !d.is_empty()) {
            ctx.cache_dir = PathBuf::from(dir);
        }
        if let Some(path) = std::env::var_os(CONFIG_ENV).filter(|p| !p.is_empty()) {
            ctx.user_config_path = PathBuf::from(path);
        }

        ctx.user_config = UserConfig::load(&ctx.user_config_path).await?;
        tracing::debug!(
            "User dir: {}, cache dir: {}",
            ctx.user_dir.display(),
            ctx.cache_dir.display()
        );
        Ok(ctx)
    }

    /// A context rooted at `user_dir` with default names and an empty user config.
    #[must_use]
    pub fn with_user_dir(user_dir: PathBuf) -> Self {
        Self {
            app_name: APP_NAME.to_string(),
            lock_file_name: LOCK_FILE_NAME.to_string(),
            config_file_names: CONFIG_FILE_NAMES.iter().map(ToString::to_string).collect(),
            cache_dir: user_dir.join("cache"),
            user_config_path: user_dir.join("config.toml"),
            user_dir,
            user_config: UserConfig::default(),
        }
    }

    #[must_use]
    pub fn with_user_config(mut self, user_config: UserConfig) -> Self {
        self.user_config = user_config;
        self
    }

    /// Path of the lock file belonging to `dir`.
    #[must_use]
    pub fn lock_file(&self, dir: &Path) -> PathBuf {
        dir.join(&self.lock_file_name)
    }

    /// The highest-priority fuzzy config present in `dir`.
    #[must_use]
    pub fn find_config_file(&self, dir: &Path) -> Option<PathBuf> {
        find_config_file(dir, &self.config_file_names)
    }

    /// Nearest ancestor of `start` holding a fuzzy config or lock file, or
    /// `start` itself when there is none.
    #[must_use]
    pub fn find_project_root(&self, start: &Path) -> PathBuf {
        let mut markers: Vec<&str> = self.config_file_names.iter().map(String::as_str).collect();
        markers.push(&self.lock_file_name);

        match crate::utils::fs::find_project_root(start, &markers) {
            Some(root) => {
                tracing::debug!("Found project root: {}", root.display());
                root
            }
            None => {
                tracing::debug!("No project config found, using {}", start.display());
                start.to_path_buf()
            }
        }
    }

    #[must_use]
    pub fn cache(&self) -> Cache {
        Cache::new(self.cache_dir.clone())
    }
}
