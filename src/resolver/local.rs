//! Local mirror resolver for developing dependencies.
//!
//! When `local_repo` is set in the user config, archives placed under
//!
//! ```text
//! <local_repo>/<server>/<owner>/<repo>/v<version>/<repo>-v<version>.zip
//! ```
//!
//! take priority over the network. Anything the mirror does not have is left
//! to the next resolver.

use super::registry::{Resolver, asset_names};
use crate::coord::{FuzzyCoord, LockedCoord};
use crate::version::{Version, latest_matching};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct LocalResolver {
    root: PathBuf,
}

impl LocalResolver {
    #[must_use]
    pub const fn new(root: PathBuf) -> Self {
        Self {
            root,
        }
    }

    fn repo_dir(&self, server: &str, owner: &str, repo: &str) -> PathBuf {
        self.root.join(server).join(owner).join(repo)
    }

    /// Versions available in the mirror, from `v*` directory names.
    async fn available_versions(&self, repo_dir: &Path) -> Result<Vec<Version>> {
        let mut versions = Vec::new();
        let mut entries = tokio::fs::read_dir(repo_dir)
            .await
            .with_context(|| format!("Failed to list {}", repo_dir.display()))?;

        while let Some(entry) = entries.next_entry().await? {
            if !entry.file_type().await?.is_dir() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str().filter(|n| n.starts_with('v')) {
                versions.push(Version::parse(name));
            }
        }
        Ok(versions)
    }
}

impl Resolver for LocalResolver {
    fn name(&self) -> &str {
        "local"
    }

    fn resolve_coord<'a>(&'a self, coord: &'a FuzzyCoord) -> BoxFuture<'a, Result<Option<LockedCoord>>> {
        Box::pin(async move {
            let repo_dir = self.repo_dir(&coord.server, &coord.owner, &coord.repo);
            if !repo_dir.is_dir() {
                return Ok(None);
            }

            let versions = self.available_versions(&repo_dir).await?;
            let found = if coord.wants_latest() {
                versions.iter().max()
            } else {
                latest_matching(&coord.version_pattern(), &versions)
            };

            let locked = found.map(|v| coord.lock(v.clone()));
            if let Some(locked) = &locked {
                tracing::debug!("Resolved {} from local repository as {}", coord, locked);
            }
            Ok(locked)
        })
    }

    fn download_resolved_coord<'a>(
        &'a self,
        coord: &'a LockedCoord,
        dest_dir: &'a Path,
    ) -> BoxFuture<'a, Result<Option<PathBuf>>> {
        Box::pin(async move {
            let version_dir = self
                .repo_dir(&coord.server, &coord.owner, &coord.repo)
                .join(format!("v{}", coord.version.canonical()));
            if !version_dir.is_dir() {
                return Ok(None);
            }

            let Some(source) =
                asset_names(coord).into_iter().map(|name| version_dir.join(name)).find(|p| p.is_file())
            else {
                tracing::debug!("No archive for {} in {}", coord, version_dir.display());
                return Ok(None);
            };

            tokio::fs::create_dir_all(dest_dir)
                .await
                .with_context(|| format!("Failed to create {}", dest_dir.display()))?;

            let file_name = source.file_name().context("archive path has no file name")?;
            let target = dest_dir.join(file_name);
            tokio::fs::copy(&source, &target)
                .await
                .with_context(|| format!("Failed to copy {} to {}", source.display(), target.display()))?;

            tracing::info!("Using {} from local repository", source.display());
            Ok(Some(target))
        })
    }
}
