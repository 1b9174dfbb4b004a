//! Dependency cache layout.
//!
//! Every locked coordinate owns one directory in the shared cache:
//!
//! ```text
//! <cache>/deps/<server>/<owner>/<repo>/v<canonical version>/
//! ├── <downloaded archive>
//! └── extracted/            # unpacked archive; its presence means "installed"
//! ```
//!
//! Presence of `extracted/` is the only installation marker. There is no
//! cross-process locking: two bz processes installing the same dependency at
//! once may both download it.

use crate::constants::{DEPS_DIR_NAME, EXTRACTED_DIR_NAME};
use crate::coord::LockedCoord;
use crate::core::BzError;
use crate::utils::fs::is_safe_path;
use anyhow::Result;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Cache {
    dir: PathBuf,
}

impl Cache {
    #[must_use]
    pub const fn new(dir: PathBuf) -> Self {
        Self {
            dir,
        }
    }

    #[must_use]
    pub fn cache_dir(&self) -> &Path {
        &self.dir
    }

    /// Creates the cache directory if necessary.
    pub fn ensure_cache_dir(&self) -> Result<()> {
        crate::utils::fs::ensure_dir(&self.dir)
    }

    /// `<cache>/deps/<server>/<owner>/<repo>/v<version>`
    ///
    /// # Errors
    ///
    /// Returns [`BzError::CoordinateFormat`] when a part of `coord` is not a
    /// plain name, so the directory would land outside the cache.
    pub fn dependency_dir(&self, coord: &LockedCoord) -> Result<PathBuf> {
        coord.validate()?;

        let deps = self.dir.join(DEPS_DIR_NAME);
        let dir = deps
            .join(&coord.server)
            .join(&coord.owner)
            .join(&coord.repo)
            .join(format!("v{}", coord.version.canonical()));

        if !is_safe_path(&deps, &dir) {
            return Err(BzError::CoordinateFormat {
                coord: coord.to_string(),
                reason: format!("{} is outside the cache", dir.display()),
            }
            .into());
        }
        Ok(dir)
    }

    /// Directory holding the unpacked archive of `coord`.
    pub fn extracted_dir(&self, coord: &LockedCoord) -> Result<PathBuf> {
        Ok(self.dependency_dir(coord)?.join(EXTRACTED_DIR_NAME))
    }

    #[must_use]
    pub fn is_installed(&self, coord: &LockedCoord) -> bool {
        self.extracted_dir(coord).is_ok_and(|dir| dir.is_dir())
    }
}
