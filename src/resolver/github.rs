//! GitHub releases resolver.
//!
//! Serves `github.com` plus every server listed under `[servers]` in the
//! user config (GitHub Enterprise hosts). Versions map to release tags:
//!
//! - no version, or `0` → the latest release
//! - `1.2.3` → the release tagged `v1.2.3`
//! - anything else with no exact tag (`1.2`, `1.*`) → the greatest non-draft
//!   release whose tag matches the version pattern
//!
//! Downloads pick the first asset named by [`asset_names`] and stream it to a
//! `.tmp` file that is renamed once complete. Requests are retried with
//! exponential backoff on network errors and 5xx responses.

use super::registry::{Resolver, asset_names};
use crate::config::UserConfig;
use crate::constants::{
    HTTP_RETRIES, HTTP_TIMEOUT, MAX_BACKOFF_DELAY, RELEASES_PER_PAGE, STARTING_BACKOFF_DELAY_MS,
};
use crate::coord::{FuzzyCoord, LockedCoord};
use crate::version::{Version, VersionPattern, latest_matching};
use anyhow::{Context, Result, anyhow};
use futures::future::BoxFuture;
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, USER_AGENT};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tokio_retry::Retry;
use tokio_retry::strategy::ExponentialBackoff;

const GITHUB_SERVER: &str = "github.com";
const GITHUB_API: &str = "https://api.github.com";
const JSON_MEDIA_TYPE: &str = "application/vnd.github+json";
const BINARY_MEDIA_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone, Deserialize)]
struct Release {
    tag_name: String,
    #[serde(default)]
    draft: bool,
    #[serde(default)]
    assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
struct ReleaseAsset {
    id: u64,
    name: String,
}

#[derive(Debug)]
pub struct GitHubResolver {
    client: reqwest::Client,
    user_config: UserConfig,
}

impl GitHubResolver {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be initialized.
    pub fn new(user_config: UserConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(HTTP_TIMEOUT)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            user_config,
        })
    }

    /// Whether `server` is served by this resolver.
    #[must_use]
    pub fn handles(&self, server: &str) -> bool {
        server.eq_ignore_ascii_case(GITHUB_SERVER) || self.user_config.server(server).is_some()
    }

    /// REST API base URL for `server`.
    #[must_use]
    pub fn api_base(&self, server: &str) -> String {
        if let Some(url) = self.user_config.server(server).and_then(|s| s.api_url.as_deref()) {
            return url.trim_end_matches('/').to_string();
        }
        if server.eq_ignore_ascii_case(GITHUB_SERVER) {
            GITHUB_API.to_string()
        } else {
            format!("https://{server}/api/v3")
        }
    }

    async fn get(&self, server: &str, url: &str, accept: &str) -> Result<reqwest::Response> {
        let strategy = ExponentialBackoff::from_millis(STARTING_BACKOFF_DELAY_MS)
            .max_delay(MAX_BACKOFF_DELAY)
            .take(HTTP_RETRIES);
        let token = self.user_config.token_for(server);

        Retry::spawn(strategy, move || async move {
            tracing::debug!("GET {}", url);
            let mut request = self
                .client
                .get(url)
                .header(ACCEPT, accept)
                .header(USER_AGENT, concat!("bz/", env!("CARGO_PKG_VERSION")));
            if let Some(token) = token {
                request = request.bearer_auth(token);
            }

            let response = request.send().await.with_context(|| format!("Request to {url} failed"))?;
            if response.status().is_server_error() {
                tracing::debug!("GET {} returned {}, retrying", url, response.status());
                return Err(anyhow!("{url} returned {}", response.status()));
            }
            Ok(response)
        })
        .await
    }

    /// Fetches a single release; `Ok(None)` on 404.
    async fn get_release(&self, server: &str, url: &str) -> Result<Option<Release>> {
        let response = self.get(server, url, JSON_MEDIA_TYPE).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response.error_for_status().with_context(|| format!("GET {url}"))?;
        let release = response.json().await.with_context(|| format!("Invalid release JSON from {url}"))?;
        Ok(Some(release))
    }

    async fn list_releases(&self, coord: &FuzzyCoord) -> Result<Vec<Release>> {
        let base = self.api_base(&coord.server);
        let mut releases = Vec::new();

        for page in 1.. {
            let url = format!(
                "{base}/repos/{}/{}/releases?per_page={RELEASES_PER_PAGE}&page={page}",
                coord.owner, coord.repo
            );
            let batch: Vec<Release> = self
                .get(&coord.server, &url, JSON_MEDIA_TYPE)
                .await?
                .error_for_status()
                .with_context(|| format!("GET {url}"))?
                .json()
                .await
                .with_context(|| format!("Invalid release list JSON from {url}"))?;

            let last_page = batch.len() < RELEASES_PER_PAGE;
            releases.extend(batch);
            if last_page {
                break;
            }
        }

        Ok(releases)
    }
}

/// Greatest non-draft release whose tag matches `pattern`.
fn best_matching_release(releases: &[Release], pattern: &VersionPattern) -> Option<Version> {
    let versions: Vec<Version> =
        releases.iter().filter(|r| !r.draft).map(|r| Version::parse(&r.tag_name)).collect();
    latest_matching(pattern, &versions).cloned()
}

/// First asset in `wanted` order that the release publishes.
fn pick_asset<'a>(release: &'a Release, wanted: &[String]) -> Option<&'a ReleaseAsset> {
    wanted.iter().find_map(|name| release.assets.iter().find(|a| &a.name == name))
}

impl Resolver for GitHubResolver {
    fn name(&self) -> &str {
        "github"
    }

    fn resolve_coord<'a>(&'a self, coord: &'a FuzzyCoord) -> BoxFuture<'a, Result<Option<LockedCoord>>> {
        Box::pin(async move {
            if !self.handles(&coord.server) {
                return Ok(None);
            }

            let base = self.api_base(&coord.server);
            let repo_url = format!("{base}/repos/{}/{}", coord.owner, coord.repo);

            if coord.wants_latest() {
                let release = self
                    .get_release(&coord.server, &format!("{repo_url}/releases/latest"))
                    .await?
                    .ok_or_else(|| anyhow!("{} has no published release", coord.canonical_name_no_version()))?;
                return Ok(Some(coord.lock(Version::parse(&release.tag_name))));
            }

            let tag_url = format!("{repo_url}/releases/tags/v{}", coord.version);
            if let Some(release) = self.get_release(&coord.server, &tag_url).await? {
                return Ok(Some(coord.lock(Version::parse(&release.tag_name))));
            }

            tracing::debug!("No release tagged v{}, scanning releases of {}", coord.version, repo_url);
            let releases = self.list_releases(coord).await?;
            match best_matching_release(&releases, &coord.version_pattern()) {
                Some(version) => Ok(Some(coord.lock(version))),
                None => Err(anyhow!("No release of {} matches version {}", coord.canonical_name_no_version(), coord.version)),
            }
        })
    }

    fn download_resolved_coord<'a>(
        &'a self,
        coord: &'a LockedCoord,
        dest_dir: &'a Path,
    ) -> BoxFuture<'a, Result<Option<PathBuf>>> {
        Box::pin(async move {
            if !self.handles(&coord.server) {
                return Ok(None);
            }

            let base = self.api_base(&coord.server);
            let repo_url = format!("{base}/repos/{}/{}", coord.owner, coord.repo);
            let tag_url = format!("{repo_url}/releases/tags/v{}", coord.version.canonical());

            let release = self
                .get_release(&coord.server, &tag_url)
                .await?
                .ok_or_else(|| anyhow!("No release tagged v{} for {}", coord.version.canonical(), coord))?;

            let wanted = asset_names(coord);
            let asset = pick_asset(&release, &wanted)
                .ok_or_else(|| anyhow!("Could not find any of [{}] in release of {}", wanted.join(", "), coord))?;

            tokio::fs::create_dir_all(dest_dir)
                .await
                .with_context(|| format!("Failed to create {}", dest_dir.display()))?;
            let file = dest_dir.join(&asset.name);
            let tmp = dest_dir.join(format!("{}.tmp", asset.name));

            tracing::info!("Downloading {} ...", asset.name);
            let asset_url = format!("{repo_url}/releases/assets/{}", asset.id);
            let mut response = self
                .get(&coord.server, &asset_url, BINARY_MEDIA_TYPE)
                .await?
                .error_for_status()
                .with_context(|| format!("GET {asset_url}"))?;

            let mut out = tokio::fs::File::create(&tmp)
                .await
                .with_context(|| format!("Failed to create {}", tmp.display()))?;
            while let Some(chunk) = response.chunk().await.context("Download interrupted")? {
                out.write_all(&chunk).await?;
            }
            out.flush().await?;
            drop(out);

            tokio::fs::rename(&tmp, &file)
                .await
                .with_context(|| format!("Failed to move {} into place", tmp.display()))?;
            tracing::info!("Downloaded {}", file.display());

            Ok(Some(file))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServerConfig;
    use std::collections::BTreeMap;

    fn release(tag: &str, draft: bool, assets: &[&str]) -> Release {
        Release {
            tag_name: tag.to_string(),
            draft,
            assets: assets
                .iter()
                .enumerate()
                .map(|(i, name)| ReleaseAsset {
                    id: i as u64,
                    name: (*name).to_string(),
                })
                .collect(),
        }
    }

    fn enterprise_config() -> UserConfig {
        UserConfig {
            servers: BTreeMap::from([
                (
                    "git.example.com".to_string(),
                    ServerConfig {
                        token: Some("t".to_string()),
                        api_url: None,
                    },
                ),
                (
                    "ghe.example.org".to_string(),
                    ServerConfig {
                        token: None,
                        api_url: Some("https://api.ghe.example.org/".to_string()),
                    },
                ),
            ]),
            local_repo: None,
        }
    }

    #[test]
    fn test_handles_configured_servers() {
        let resolver = GitHubResolver::new(enterprise_config()).unwrap();
        assert!(resolver.handles("github.com"));
        assert!(resolver.handles("GitHub.com"));
        assert!(resolver.handles("git.example.com"));
        assert!(!resolver.handles("gitlab.com"));
    }

    #[test]
    fn test_api_base() {
        let resolver = GitHubResolver::new(enterprise_config()).unwrap();
        assert_eq!(resolver.api_base("github.com"), "https://api.github.com");
        assert_eq!(resolver.api_base("git.example.com"), "https://git.example.com/api/v3");
        assert_eq!(resolver.api_base("ghe.example.org"), "https://api.ghe.example.org");
    }

    #[tokio::test]
    async fn test_unknown_server_is_not_mine() {
        let resolver = GitHubResolver::new(UserConfig::default()).unwrap();
        let coord = FuzzyCoord::parse("gitlab.com/acme/tool@1.0").unwrap();
        assert!(resolver.resolve_coord(&coord).await.unwrap().is_none());

        let locked = LockedCoord::new("gitlab.com", "acme", "tool", "1.0");
        let temp = tempfile::TempDir::new().unwrap();
        assert!(resolver.download_resolved_coord(&locked, temp.path()).await.unwrap().is_none());
    }

    #[test]
    fn test_best_matching_release_skips_drafts() {
        let releases = vec![
            release("v1.2.0", false, &[]),
            release("v1.9.0", true, &[]),
            release("v1.4.1", false, &[]),
            release("v2.0.0", false, &[]),
        ];

        let best = best_matching_release(&releases, &VersionPattern::parse("1.*")).unwrap();
        assert_eq!(best.canonical(), "1.4.1");
        assert!(best_matching_release(&releases, &VersionPattern::parse("3")).is_none());
    }

    #[test]
    fn test_pick_asset_prefers_earlier_names() {
        let rel = release("v1.0", false, &["tool.tar.gz", "tool-v1.0.zip", "checksums.txt"]);
        let wanted = vec!["tool-v1.0.zip".to_string(), "tool.tar.gz".to_string()];
        assert_eq!(pick_asset(&rel, &wanted).unwrap().name, "tool-v1.0.zip");

        let wanted = vec!["tool.tgz".to_string()];
        assert!(pick_asset(&rel, &wanted).is_none());
    }
}
