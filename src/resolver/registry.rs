//! Pluggable collaborators of the dependency resolver.
//!
//! Resolvers answer two questions about a coordinate: which exact version a
//! fuzzy request means, and where to get the archive for a locked one. They
//! are consulted in registration order. For resolution `Ok(None)` means "not
//! mine" and the next resolver is asked; an error aborts. For downloads every
//! resolver is tried until one produces a file.

use crate::archive::{ArchiveExtractor, Extractor};
use crate::config::AppContext;
use crate::constants::ARCHIVE_EXTENSIONS;
use crate::coord::{FuzzyCoord, LockedCoord};
use crate::triggers::{ProcessTriggerRunner, TriggerRunner};
use crate::utils::platform::{asset_arch, asset_os};
use anyhow::Result;
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};

/// A source of released dependencies.
pub trait Resolver: Send + Sync {
    /// Short name used in logs and error messages.
    fn name(&self) -> &str;

    /// Pins a fuzzy coordinate to an exact version.
    fn resolve_coord<'a>(&'a self, coord: &'a FuzzyCoord) -> BoxFuture<'a, Result<Option<LockedCoord>>>;

    /// Downloads the archive for `coord` into `dest_dir`, returning its path.
    fn download_resolved_coord<'a>(
        &'a self,
        coord: &'a LockedCoord,
        dest_dir: &'a Path,
    ) -> BoxFuture<'a, Result<Option<PathBuf>>>;
}

/// Everything the resolver delegates to, built once at startup.
pub struct Collaborators {
    pub resolvers: Vec<Box<dyn Resolver>>,
    pub extractor: Box<dyn Extractor>,
    pub triggers: Box<dyn TriggerRunner>,
}

impl Collaborators {
    /// Collaborators with no resolvers and the real extractor and trigger runner.
    #[must_use]
    pub fn new() -> Self {
        Self {
            resolvers: Vec::new(),
            extractor: Box::new(ArchiveExtractor),
            triggers: Box::new(ProcessTriggerRunner),
        }
    }

    /// The production set: local mirror (when configured) then GitHub.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_context(context: &AppContext) -> Result<Self> {
        let mut collaborators = Self::new();

        if let Some(local_repo) = &context.user_config.local_repo {
            tracing::debug!("Using local repository {}", local_repo.display());
            collaborators = collaborators.with_resolver(super::local::LocalResolver::new(local_repo.clone()));
        }

        Ok(collaborators.with_resolver(super::github::GitHubResolver::new(context.user_config.clone())?))
    }

    /// Appends a resolver; earlier resolvers take priority.
    #[must_use]
    pub fn with_resolver(mut self, resolver: impl Resolver + 'static) -> Self {
        self.resolvers.push(Box::new(resolver));
        self
    }

    #[must_use]
    pub fn with_extractor(mut self, extractor: impl Extractor + 'static) -> Self {
        self.extractor = Box::new(extractor);
        self
    }

    #[must_use]
    pub fn with_triggers(mut self, triggers: impl TriggerRunner + 'static) -> Self {
        self.triggers = Box::new(triggers);
        self
    }
}

impl Default for Collaborators {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Collaborators {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.resolvers.iter().map(|r| r.name()).collect();
        f.debug_struct("Collaborators").field("resolvers", &names).finish_non_exhaustive()
    }
}

/// Archive file names a release of `coord` may publish, most specific first.
///
/// For each extension in `zip`, `tgz`, `tar.gz`: the platform build
/// `<repo>-<os>-<arch>-v<version>`, the portable `<repo>-v<version>`, then the
/// bare `<repo>`.
#[must_use]
pub fn asset_names(coord: &LockedCoord) -> Vec<String> {
    let version = coord.version.canonical();
    let (os, arch) = (asset_os(), asset_arch());

    ARCHIVE_EXTENSIONS
        .iter()
        .flat_map(|ext| {
            [
                format!("{}-{os}-{arch}-v{version}.{ext}", coord.repo),
                format!("{}-v{version}.{ext}", coord.repo),
                format!("{}.{ext}", coord.repo),
            ]
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_asset_names_order() {
        let coord = LockedCoord::new("github.com", "acme", "tool", "1.2.0+build");
        let names = asset_names(&coord);
        let platform = format!("tool-{}-{}-v1.2.0.zip", asset_os(), asset_arch());

        assert_eq!(names.len(), 9);
        assert_eq!(names[0], platform);
        assert_eq!(names[1], "tool-v1.2.0.zip");
        assert_eq!(names[2], "tool.zip");
        assert_eq!(names[4], "tool-v1.2.0.tgz");
        assert_eq!(names[8], "tool.tar.gz");
    }

    #[test]
    fn test_default_collaborators_have_no_resolvers() {
        let collaborators = Collaborators::default();
        assert!(collaborators.resolvers.is_empty());
        assert_eq!(format!("{collaborators:?}"), "Collaborators { resolvers: [], .. }");
    }
}
