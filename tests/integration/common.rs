//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use anyhow::{Context, Result};
use assert_cmd::Command;
use bz_cli::config::{AppContext, UserConfig};
use bz_cli::lockfile::LockedConfigContent;
use bz_cli::test_utils::ArchiveFixture;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Server used for every fixture dependency. Only the local resolver knows it.
pub const SERVER: &str = "example.com";
pub const OWNER: &str = "acme";

/// A project directory with its own bz home and a local release mirror.
///
/// ```text
/// <temp>/home/config.toml     local_repo = "<temp>/mirror"
/// <temp>/mirror/example.com/acme/<repo>/v<version>/<repo>.zip
/// <temp>/project/
/// ```
pub struct TestProject {
    _temp: TempDir,
    pub home: PathBuf,
    pub mirror: PathBuf,
    pub project: PathBuf,
}

impl TestProject {
    pub fn new() -> Result<Self> {
        bz_cli::test_utils::init_test_logging(None);
        let temp = TempDir::new()?;
        let home = temp.path().join("home");
        let mirror = temp.path().join("mirror");
        let project = temp.path().join("project");
        for dir in [&home, &mirror, &project] {
            std::fs::create_dir_all(dir)?;
        }

        let user_config = UserConfig {
            local_repo: Some(mirror.clone()),
            ..UserConfig::default()
        };
        std::fs::write(home.join("config.toml"), toml::to_string(&user_config)?)?;

        Ok(Self {
            _temp: temp,
            home,
            mirror,
            project: project.canonicalize()?,
        })
    }

    /// The context `bz` builds for this project's home.
    pub fn context(&self) -> AppContext {
        AppContext::with_user_dir(self.home.clone()).with_user_config(UserConfig {
            local_repo: Some(self.mirror.clone()),
            ..UserConfig::default()
        })
    }

    /// Publishes `archive` as `example.com/acme/<repo>` at `version`, as a zip.
    pub fn publish(&self, repo: &str, version: &str, archive: &ArchiveFixture) -> Result<PathBuf> {
        let path = self.release_dir(repo, version).join(format!("{repo}.zip"));
        archive.write_zip(&path)?;
        Ok(path)
    }

    /// Same as [`publish`](Self::publish) but as a gzip'd tar.
    pub fn publish_tgz(&self, repo: &str, version: &str, archive: &ArchiveFixture) -> Result<PathBuf> {
        let path = self.release_dir(repo, version).join(format!("{repo}.tgz"));
        archive.write_tgz(&path)?;
        Ok(path)
    }

    fn release_dir(&self, repo: &str, version: &str) -> PathBuf {
        self.mirror.join(SERVER).join(OWNER).join(repo).join(format!("v{version}"))
    }

    pub fn write_config(&self, toml: &str) -> Result<()> {
        std::fs::write(self.project.join(".bz.toml"), toml).context("write .bz.toml")
    }

    pub fn lock_file(&self) -> PathBuf {
        self.project.join(".bz.lock")
    }

    pub fn read_lock(&self) -> Result<String> {
        std::fs::read_to_string(self.lock_file()).context("read .bz.lock")
    }

    /// Where the resolver unpacks `example.com/acme/<repo>@<version>`.
    pub fn installed_dir(&self, repo: &str, version: &str) -> PathBuf {
        self.home
            .join("cache")
            .join("deps")
            .join(SERVER)
            .join(OWNER)
            .join(repo)
            .join(format!("v{version}"))
            .join("extracted")
    }

    /// The `bz` binary pointed at this project's home, run from the project.
    pub fn bz(&self) -> Command {
        let mut cmd = Command::cargo_bin("bz").expect("bz binary is built");
        cmd.current_dir(&self.project)
            .env("BZ_HOME", &self.home)
            .env_remove("BZ_CACHE_DIR")
            .env_remove("BZ_CONFIG")
            .env_remove("RUST_LOG")
            .env("NO_COLOR", "1");
        cmd
    }
}

/// `{"deps": [...]}` naming fixture coordinates.
pub fn depends_on(coords: &[(&str, &str)]) -> LockedConfigContent {
    LockedConfigContent {
        deps: coords
            .iter()
            .map(|(repo, version)| bz_cli::coord::LockedCoord::new(SERVER, OWNER, repo, version))
            .collect(),
        ..Default::default()
    }
}

/// A release with an empty lock file and one executable in `bin/`.
pub fn tool_archive(bin: &str, script: &str) -> ArchiveFixture {
    ArchiveFixture::new()
        .lock(&LockedConfigContent::default())
        .executable(&format!("bin/{bin}"), format!("#!/bin/sh\n{script}\n"))
}

pub fn read_trimmed(path: &Path) -> String {
    std::fs::read_to_string(path).map(|s| s.trim().to_string()).unwrap_or_default()
}
