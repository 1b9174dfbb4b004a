//! In-memory collaborators for resolver tests.

use super::fixtures::ArchiveFixture;
use crate::coord::{FuzzyCoord, LockedCoord};
use crate::resolver::Resolver;
use crate::triggers::{PreRunContext, TriggerRunner};
use crate::version::{Version, latest_matching};
use anyhow::{Result, anyhow};
use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Shared record of calls made to a test collaborator.
#[derive(Clone, Debug, Default)]
pub struct CallLog(Arc<Mutex<Vec<String>>>);

impl CallLog {
    pub fn record(&self, call: impl Into<String>) {
        self.0.lock().expect("call log poisoned").push(call.into());
    }

    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().expect("call log poisoned").clone()
    }

    /// Number of calls starting with `prefix`.
    #[must_use]
    pub fn count(&self, prefix: &str) -> usize {
        self.entries().iter().filter(|c| c.starts_with(prefix)).count()
    }

    pub fn clear(&self) {
        self.0.lock().expect("call log poisoned").clear();
    }
}

#[derive(Debug, Clone)]
struct Release {
    name: String,
    version: Version,
    archive: PathBuf,
}

/// Resolver backed by zip archives written to a local directory.
///
/// Calls are logged as `resolve:<coord>` and `download:<coord>`.
#[derive(Debug, Clone)]
pub struct MemoryResolver {
    label: String,
    archives_dir: PathBuf,
    releases: Vec<Release>,
    calls: CallLog,
}

impl MemoryResolver {
    pub fn new(archives_dir: PathBuf) -> Self {
        Self {
            label: "memory".to_string(),
            archives_dir,
            releases: Vec::new(),
            calls: CallLog::default(),
        }
    }

    #[must_use]
    pub fn named(mut self, label: &str) -> Self {
        self.label = label.to_string();
        self
    }

    /// Publishes `archive` as release `version` of `name` (`server/owner/repo`).
    pub fn with_release(mut self, name: &str, version: &str, archive: ArchiveFixture) -> Result<Self> {
        let version = Version::parse(version);
        let repo = name.rsplit('/').next().unwrap_or(name);
        let path = self
            .archives_dir
            .join(name)
            .join(format!("v{}", version.canonical()))
            .join(format!("{repo}.zip"));
        archive.write_zip(&path)?;

        self.releases.push(Release {
            name: name.to_string(),
            version,
            archive: path,
        });
        Ok(self)
    }

    /// Handle on the call log that stays valid after the resolver is boxed.
    #[must_use]
    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

impl Resolver for MemoryResolver {
    fn name(&self) -> &str {
        &self.label
    }

    fn resolve_coord<'a>(&'a self, coord: &'a FuzzyCoord) -> BoxFuture<'a, Result<Option<LockedCoord>>> {
        Box::pin(async move {
            self.calls.record(format!("resolve:{coord}"));
            let name = coord.canonical_name_no_version();
            let versions: Vec<&Version> =
                self.releases.iter().filter(|r| r.name == name).map(|r| &r.version).collect();

            let found = if coord.wants_latest() {
                versions.into_iter().max()
            } else {
                latest_matching(&coord.version_pattern(), versions)
            };
            Ok(found.map(|v| coord.lock(v.clone())))
        })
    }

    fn download_resolved_coord<'a>(
        &'a self,
        coord: &'a LockedCoord,
        dest_dir: &'a Path,
    ) -> BoxFuture<'a, Result<Option<PathBuf>>> {
        Box::pin(async move {
            self.calls.record(format!("download:{coord}"));
            let name = coord.canonical_name_no_version();
            let Some(release) =
                self.releases.iter().find(|r| r.name == name && r.version == coord.version)
            else {
                return Ok(None);
            };

            std::fs::create_dir_all(dest_dir)?;
            let file_name = release.archive.file_name().ok_or_else(|| anyhow!("no file name"))?;
            let target = dest_dir.join(file_name);
            std::fs::copy(&release.archive, &target)?;
            Ok(Some(target))
        })
    }
}

/// Resolver that fails: on resolution, on download, or both.
#[derive(Debug, Clone, Default)]
pub struct FailingResolver {
    fail_resolve: bool,
    fail_download: bool,
    calls: CallLog,
}

impl FailingResolver {
    /// Errors on every resolution.
    #[must_use]
    pub fn on_resolve() -> Self {
        Self {
            fail_resolve: true,
            ..Self::default()
        }
    }

    /// Answers `None` to resolution but errors on every download.
    #[must_use]
    pub fn on_download() -> Self {
        Self {
            fail_download: true,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

impl Resolver for FailingResolver {
    fn name(&self) -> &str {
        "failing"
    }

    fn resolve_coord<'a>(&'a self, coord: &'a FuzzyCoord) -> BoxFuture<'a, Result<Option<LockedCoord>>> {
        Box::pin(async move {
            self.calls.record(format!("resolve:{coord}"));
            if self.fail_resolve {
                Err(anyhow!("resolver unavailable"))
            } else {
                Ok(None)
            }
        })
    }

    fn download_resolved_coord<'a>(
        &'a self,
        coord: &'a LockedCoord,
        _dest_dir: &'a Path,
    ) -> BoxFuture<'a, Result<Option<PathBuf>>> {
        Box::pin(async move {
            self.calls.record(format!("download:{coord}"));
            if self.fail_download {
                Err(anyhow!("connection reset"))
            } else {
                Ok(None)
            }
        })
    }
}

/// Trigger runner that records calls instead of spawning processes.
///
/// Calls are logged as `install:<script>` and `pre-run:<script>`. Pre-run
/// returns the configured replacement, or its input unchanged.
#[derive(Debug, Clone, Default)]
pub struct RecordingTriggerRunner {
    pre_run_result: Option<PreRunContext>,
    fail_install: bool,
    calls: CallLog,
}

impl RecordingTriggerRunner {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn returning(mut self, context: PreRunContext) -> Self {
        self.pre_run_result = Some(context);
        self
    }

    #[must_use]
    pub fn failing_install(mut self) -> Self {
        self.fail_install = true;
        self
    }

    #[must_use]
    pub fn calls(&self) -> CallLog {
        self.calls.clone()
    }
}

impl TriggerRunner for RecordingTriggerRunner {
    fn run_install_script<'a>(&'a self, script: &'a str, _dir: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            self.calls.record(format!("install:{script}"));
            if self.fail_install {
                return Err(crate::core::BzError::TriggerFailed {
                    script: script.to_string(),
                    reason: "exited with 1".to_string(),
                }
                .into());
            }
            Ok(())
        })
    }

    fn run_pre_run<'a>(
        &'a self,
        script: &'a str,
        _dir: &'a Path,
        context: PreRunContext,
    ) -> BoxFuture<'a, Result<PreRunContext>> {
        Box::pin(async move {
            self.calls.record(format!("pre-run:{script}"));
            Ok(self.pre_run_result.clone().unwrap_or(context))
        })
    }
}
