//! Dependency coordinates.
//!
//! A dependency is written in a config file as `server/owner/repo[@version]`,
//! for example `github.com/acme/tool@1.2.*`. That string parses into a
//! [`FuzzyCoord`], whose version may be empty or a pattern. A resolver turns
//! it into a [`LockedCoord`] carrying one exact [`Version`]; locked
//! coordinates are what lock files store and what the cache is keyed by.

use crate::core::BzError;
use crate::version::{Version, VersionPattern};
use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Component, Path};

/// A coordinate as written by the user, before resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyCoord {
    /// The dependency string exactly as written
    pub original: String,
    pub server: String,
    pub owner: String,
    pub repo: String,
    /// Requested version without a leading `v`; may be empty or contain `*`
    pub version: String,
}

impl FuzzyCoord {
    /// Parses `server/owner/repo[@version]`.
    ///
    /// Only the first three `/`-separated segments are considered. A leading
    /// `v` on the version is removed.
    ///
    /// # Errors
    ///
    /// Returns [`BzError::CoordinateFormat`] when fewer than three segments
    /// are present or any of server, owner, or repo is empty or not a plain
    /// directory name (`.`, `..`, containing `\`).
    ///
    /// # Examples
    ///
    /// ```rust
    /// use bz_cli::coord::FuzzyCoord;
    ///
    /// let coord = FuzzyCoord::parse("github.com/acme/tool@v1.2").unwrap();
    /// assert_eq!(coord.repo, "tool");
    /// assert_eq!(coord.version, "1.2");
    /// assert!(FuzzyCoord::parse("acme/tool").is_err());
    /// ```
    pub fn parse(dep: &str) -> Result<Self> {
        let invalid = |reason: &str| BzError::CoordinateFormat {
            coord: dep.to_string(),
            reason: reason.to_string(),
        };

        let mut parts = dep.split('/');
        let server = parts.next().unwrap_or_default();
        let owner = parts.next().unwrap_or_default();
        let repo_version = parts.next().unwrap_or_default();

        if server.is_empty() || owner.is_empty() || repo_version.is_empty() {
            return Err(invalid("expected server/owner/repo[@version]").into());
        }

        let (repo, version) = match repo_version.split_once('@') {
            Some((repo, rest)) => (repo, rest.split('@').next().unwrap_or_default()),
            None => (repo_version, ""),
        };

        if repo.is_empty() {
            return Err(invalid("repo name is required").into());
        }
        for segment in [server, owner, repo] {
            if !is_plain_segment(segment) {
                return Err(invalid(&format!("'{segment}' is not a valid name")).into());
            }
        }

        Ok(Self {
            original: dep.to_string(),
            server: server.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            version: version.strip_prefix('v').unwrap_or(version).to_string(),
        })
    }

    /// `server/owner/repo`, the key used for cycle detection.
    #[must_use]
    pub fn canonical_name_no_version(&self) -> String {
        format!("{}/{}/{}", self.server, self.owner, self.repo)
    }

    /// The requested version as a pattern.
    #[must_use]
    pub fn version_pattern(&self) -> VersionPattern {
        VersionPattern::parse(&self.version)
    }

    /// True when no particular version was requested (`""` or `"0"`).
    #[must_use]
    pub fn wants_latest(&self) -> bool {
        self.version.is_empty() || self.version == "0"
    }

    /// Pins this coordinate to a concrete version.
    #[must_use]
    pub fn lock(&self, version: Version) -> LockedCoord {
        LockedCoord {
            server: self.server.clone(),
            owner: self.owner.clone(),
            repo: self.repo.clone(),
            version,
        }
    }
}

impl fmt::Display for FuzzyCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.original)
    }
}

/// True when `segment` names exactly one ordinary directory entry.
fn is_plain_segment(segment: &str) -> bool {
    let mut components = Path::new(segment).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(name)), None) => name == segment && !segment.contains('\\'),
        _ => false,
    }
}

/// A coordinate pinned to one exact version.
///
/// Deserialization rejects coordinates that [`LockedCoord::validate`] rejects,
/// since lock files shipped inside downloaded archives are untrusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawLockedCoord")]
pub struct LockedCoord {
    pub server: String,
    pub owner: String,
    pub repo: String,
    pub version: Version,
}

#[derive(Deserialize)]
struct RawLockedCoord {
    server: String,
    owner: String,
    repo: String,
    version: Version,
}

impl TryFrom<RawLockedCoord> for LockedCoord {
    type Error = BzError;

    fn try_from(raw: RawLockedCoord) -> Result<Self, Self::Error> {
        let coord = Self {
            server: raw.server,
            owner: raw.owner,
            repo: raw.repo,
            version: raw.version,
        };
        coord.validate()?;
        Ok(coord)
    }
}

impl LockedCoord {
    /// Creates a locked coordinate, parsing `version`.
    #[must_use]
    pub fn new(server: &str, owner: &str, repo: &str, version: &str) -> Self {
        Self {
            server: server.to_string(),
            owner: owner.to_string(),
            repo: repo.to_string(),
            version: Version::parse(version),
        }
    }

    /// The pseudo-coordinate given to the project itself.
    #[must_use]
    pub fn root() -> Self {
        Self::new("localhost", "local", "local", "0.0.0")
    }

    #[must_use]
    pub fn canonical_name_no_version(&self) -> String {
        format!("{}/{}/{}", self.server, self.owner, self.repo)
    }

    /// Checks that every part of the coordinate is usable as a single cache
    /// path segment.
    ///
    /// # Errors
    ///
    /// Returns [`BzError::CoordinateFormat`] naming the offending part.
    pub fn validate(&self) -> Result<(), BzError> {
        let version = format!("v{}", self.version.canonical());
        for segment in [self.server.as_str(), self.owner.as_str(), self.repo.as_str(), version.as_str()] {
            if !is_plain_segment(segment) {
                return Err(BzError::CoordinateFormat {
                    coord: self.to_string(),
                    reason: format!("'{segment}' is not a valid name"),
                });
            }
        }
        Ok(())
    }
}

impl fmt::Display for LockedCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}/{}@{}",
            self.server,
            self.owner,
            self.repo,
            self.version.canonical()
        )
    }
}
