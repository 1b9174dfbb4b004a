//! Dependency resolution for bz.
//!
//! This module turns a project directory into a tree of
//! [`ResolvedDependency`] nodes, downloading and unpacking every dependency
//! into the shared cache on the way.
//!
//! # Resolution Process
//!
//! For the project root:
//!
//! 1. **Pick a source** ([`ConfigSource`]): the lock file is used unless it is
//!    missing, older than the fuzzy config, or unreadable. Reading the fuzzy
//!    config means the lock file is rewritten at the end.
//! 2. **Lock fuzzy coordinates**: each `server/owner/repo[@version]` string is
//!    handed to the registered [`Resolver`]s in order; the first one that
//!    answers pins the version.
//! 3. **Walk the tree**: every dependency is installed into
//!    `<cache>/deps/<server>/<owner>/<repo>/v<version>/extracted` if it is not
//!    already there, and its shipped `.bz.lock` names its own dependencies.
//!    The walk is depth-first and sequential; children keep declaration order.
//! 4. **Persist**: when the fuzzy config was read, the root's locked config is
//!    written back to `.bz.lock`. A failed write is only a warning.
//!
//! # Cycles
//!
//! Each branch carries a [`CycleDetector`] keyed by version-independent names,
//! so `a@1 -> b -> a@2` is rejected just like `a -> a`.
//!
//! # Installation
//!
//! Downloads fall through the resolver list until one produces a file; only
//! when all fail is the error fatal. A fresh extraction runs the dependency's
//! install trigger once. If extraction or the trigger fails, the partial
//! `extracted` directory is deleted so the next run starts over.
//!
//! # Example
//!
//! ```rust,no_run
//! use bz_cli::config::AppContext;
//! use bz_cli::resolver::{Collaborators, DependencyResolver};
//! use std::path::Path;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let context = AppContext::load().await?;
//! let collaborators = Collaborators::from_context(&context)?;
//! let tree = DependencyResolver::new(&context, &collaborators)
//!     .resolve_project(Path::new("."))
//!     .await?;
//! println!("{}", tree.render_tree());
//! # Ok(())
//! # }
//! ```

pub mod cycle;
pub mod github;
pub mod local;
pub mod registry;

pub use cycle::CycleDetector;
pub use registry::{Collaborators, Resolver, asset_names};

use crate::cache::Cache;
use crate::config::{AppContext, FuzzyConfigContent, Triggers};
use crate::constants::DEFAULT_BIN_DIR;
use crate::coord::{FuzzyCoord, LockedCoord};
use crate::core::BzError;
use crate::lockfile::LockedConfigContent;
use crate::utils::fs::{compare_file_times, ensure_dir, remove_dir_all};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

/// Which config file a directory is read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// The lock file is current.
    Lock(PathBuf),
    /// Resolve from the fuzzy config (or nothing, if the directory has none).
    Fuzzy(Option<PathBuf>),
}

impl ConfigSource {
    /// Picks the source for `dir`.
    ///
    /// The fuzzy config wins when there is no lock file or when its
    /// modification time is strictly after the lock file's.
    #[must_use]
    pub fn decide(context: &AppContext, dir: &Path) -> Self {
        let lock_file = context.lock_file(dir);
        let fuzzy_file = context.find_config_file(dir);

        if !lock_file.is_file() {
            tracing::debug!("No lock file in {}, reading fuzzy config", dir.display());
            return Self::Fuzzy(fuzzy_file);
        }

        if let Some(fuzzy) = &fuzzy_file
            && matches!(compare_file_times(fuzzy, &lock_file), Ok(Ordering::Greater))
        {
            tracing::debug!("{} is newer than the lock file, reading it", fuzzy.display());
            return Self::Fuzzy(fuzzy_file);
        }

        Self::Lock(lock_file)
    }
}

/// One node of the resolved dependency tree.
///
/// The root node is the project itself, with the pseudo-coordinate
/// `localhost/local/local@0.0.0`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedDependency {
    pub coord: LockedCoord,
    /// Absolute directory; the project root or the dependency's `extracted` dir
    pub dir: PathBuf,
    /// Declared bin dir, unexpanded
    pub bin_dir: Option<String>,
    pub exports: BTreeMap<String, String>,
    pub alias: BTreeMap<String, String>,
    pub triggers: Triggers,
    /// Direct dependencies in declaration order
    pub sub: Vec<ResolvedDependency>,
}

impl ResolvedDependency {
    /// The declared bin dir, or `<dir>/bin`.
    #[must_use]
    pub fn bin_dir_or_default(&self) -> String {
        match &self.bin_dir {
            Some(bin_dir) if !bin_dir.is_empty() => bin_dir.clone(),
            _ => self.dir.join(DEFAULT_BIN_DIR).display().to_string(),
        }
    }

    /// This node and all descendants, parents before children.
    pub fn iter(&self) -> impl Iterator<Item = &Self> {
        let mut stack = vec![self];
        std::iter::from_fn(move || {
            let node = stack.pop()?;
            stack.extend(node.sub.iter().rev());
            Some(node)
        })
    }

    /// One line per node, indented two spaces per level.
    #[must_use]
    pub fn render_tree(&self) -> String {
        let mut out = String::new();
        self.render_into(&mut out, 0);
        out
    }

    fn render_into(&self, out: &mut String, depth: usize) {
        let label = if depth == 0 {
            self.dir.display().to_string()
        } else {
            self.coord.to_string()
        };
        let _ = writeln!(out, "{:indent$}{label}", "", indent = depth * 2);
        for child in &self.sub {
            child.render_into(out, depth + 1);
        }
    }
}

/// Resolves project directories into dependency trees.
pub struct DependencyResolver<'a> {
    context: &'a AppContext,
    collaborators: &'a Collaborators,
    cache: Cache,
}

impl<'a> DependencyResolver<'a> {
    #[must_use]
    pub fn new(context: &'a AppContext, collaborators: &'a Collaborators) -> Self {
        Self {
            context,
            collaborators,
            cache: context.cache(),
        }
    }

    /// Resolves the project rooted at `dir`.
    ///
    /// # Errors
    ///
    /// Fails on malformed or unresolvable coordinates, cycles, and download,
    /// extraction or trigger failures. Lock file write errors are only logged.
    pub async fn resolve_project(&self, dir: &Path) -> Result<ResolvedDependency> {
        let dir = std::path::absolute(dir)
            .with_context(|| format!("Cannot resolve project directory {}", dir.display()))?;

        let (content, persist) = self.load_root_config(&dir).await?;
        tracing::debug!("Root config of {}: {:?}", dir.display(), content);

        self.cache.ensure_cache_dir()?;
        let tree = self
            .resolve_node(dir.clone(), LockedCoord::root(), content.clone(), CycleDetector::new())
            .await?;

        if persist {
            let lock_file = self.context.lock_file(&dir);
            if let Err(e) = content.save(&lock_file) {
                tracing::warn!("Failed to update {}: {:#}", lock_file.display(), e);
            }
        }

        Ok(tree)
    }

    /// Reads the root config, returning it and whether the lock file must be
    /// rewritten.
    async fn load_root_config(&self, dir: &Path) -> Result<(LockedConfigContent, bool)> {
        match ConfigSource::decide(self.context, dir) {
            ConfigSource::Fuzzy(fuzzy) => Ok((self.lock_fuzzy(fuzzy.as_deref()).await?, true)),
            ConfigSource::Lock(lock_file) => match LockedConfigContent::load(&lock_file).await {
                Ok(content) => Ok((content, false)),
                Err(e) => {
                    tracing::warn!("{:#}; re-resolving from the project config", e);
                    let fuzzy = self.context.find_config_file(dir);
                    Ok((self.lock_fuzzy(fuzzy.as_deref()).await?, true))
                }
            },
        }
    }

    /// Loads a fuzzy config and pins every dependency. No file means an
    /// empty config.
    async fn lock_fuzzy(&self, fuzzy_file: Option<&Path>) -> Result<LockedConfigContent> {
        let fuzzy = match fuzzy_file {
            Some(path) => FuzzyConfigContent::load(path).await?,
            None => FuzzyConfigContent::default(),
        };

        let mut deps = Vec::with_capacity(fuzzy.deps.len());
        for dep in &fuzzy.deps {
            let coord = FuzzyCoord::parse(dep)?;
            deps.push(self.resolve_coord(&coord).await?);
        }

        Ok(LockedConfigContent::from_fuzzy(fuzzy, deps))
    }

    /// Asks each resolver in turn; the first `Some` wins.
    pub async fn resolve_coord(&self, coord: &FuzzyCoord) -> Result<LockedCoord> {
        for resolver in &self.collaborators.resolvers {
            let answer = resolver
                .resolve_coord(coord)
                .await
                .with_context(|| format!("{} resolver failed on {}", resolver.name(), coord))?;

            if let Some(locked) = answer {
                tracing::debug!("{} resolved {} to {}", resolver.name(), coord, locked);
                return Ok(locked);
            }
        }

        Err(BzError::UnresolvableCoordinate {
            coord: coord.to_string(),
        }
        .into())
    }

    fn resolve_node(
        &self,
        dir: PathBuf,
        coord: LockedCoord,
        content: LockedConfigContent,
        detector: CycleDetector,
    ) -> BoxFuture<'_, Result<ResolvedDependency>> {
        Box::pin(async move {
            tracing::debug!("Resolving {} in {}", coord, dir.display());

            let mut sub = Vec::with_capacity(content.deps.len());
            for child in &content.deps {
                let mut branch = detector.clone();
                branch.push(&child.canonical_name_no_version())?;

                let (child_dir, child_content) = self.install(child).await?;
                sub.push(self.resolve_node(child_dir, child.clone(), child_content, branch).await?);
            }

            Ok(ResolvedDependency {
                coord,
                dir,
                bin_dir: content.bin_dir,
                exports: content.env,
                alias: content.alias,
                triggers: content.triggers,
                sub,
            })
        })
    }

    /// Makes sure `coord` is unpacked in the cache and returns its directory
    /// together with its shipped lock file.
    async fn install(&self, coord: &LockedCoord) -> Result<(PathBuf, LockedConfigContent)> {
        let extracted = self.cache.extracted_dir(coord)?;
        let lock_file = self.context.lock_file(&extracted);

        if self.cache.is_installed(coord) {
            tracing::debug!("{} already installed", coord);
            let content = LockedConfigContent::load(&lock_file)
                .await
                .with_context(|| format!("Cannot load dependency {coord}"))?;
            return Ok((extracted, content));
        }

        let dependency_dir = self.cache.dependency_dir(coord)?;
        ensure_dir(&dependency_dir)?;
        let archive = self.download(coord, &dependency_dir).await?;

        let installed = async {
            self.collaborators.extractor.extract(&archive, &extracted)?;
            let content = LockedConfigContent::load(&lock_file)
                .await
                .with_context(|| format!("Cannot load dependency {coord}"))?;
            if let Some(script) = content.triggers.install() {
                self.collaborators.triggers.run_install_script(script, &extracted).await?;
            }
            Ok::<_, anyhow::Error>(content)
        }
        .await;

        match installed {
            Ok(content) => {
                tracing::info!("Installed {}", coord);
                Ok((extracted, content))
            }
            Err(e) => {
                if extracted.exists() {
                    if let Err(cleanup) = remove_dir_all(&extracted) {
                        tracing::warn!("Failed to clean up {}: {:#}", extracted.display(), cleanup);
                    }
                }
                Err(e)
            }
        }
    }

    /// Tries every resolver's download until one yields an existing file.
    async fn download(&self, coord: &LockedCoord, dest_dir: &Path) -> Result<PathBuf> {
        let mut failures = Vec::new();

        for resolver in &self.collaborators.resolvers {
            match resolver.download_resolved_coord(coord, dest_dir).await {
                Ok(Some(path)) if path.is_file() => {
                    tracing::debug!("{} downloaded {} to {}", resolver.name(), coord, path.display());
                    return Ok(path);
                }
                Ok(Some(path)) => {
                    failures.push(format!("{}: {} does not exist", resolver.name(), path.display()));
                }
                Ok(None) => failures.push(format!("{}: not available", resolver.name())),
                Err(e) => {
                    tracing::warn!("{} failed to download {}: {:#}", resolver.name(), coord, e);
                    failures.push(format!("{}: {e:#}", resolver.name()));
                }
            }
        }

        if failures.is_empty() {
            failures.push("no resolvers registered".to_string());
        }

        Err(BzError::DownloadFailed {
            coord: coord.to_string(),
            reason: failures.join("; "),
        }
        .into())
    }
}
