//! Environment composition.
//!
//! Flattens a [`ResolvedDependency`] tree into one [`RuntimeContext`]: the
//! variables and PATH entries a wrapped command runs with.
//!
//! The tree is walked post-order. For every node:
//!
//! 1. children are composed first; their variables are merged in declaration
//!    order (a later sibling overrides an earlier one) and their PATH lists
//!    are concatenated
//! 2. `DIR` (the node directory), `CURDIR` (the working directory) and
//!    `BZ_PROJECT_DIR` are set, replacing inherited values
//! 3. exports are expanded against the variables so far and set, in key order
//! 4. `BINDIR` is the declared bin dir (default `$DIR/bin`), expanded last
//! 5. namespaced copies of `DIR` and `BINDIR` are added, e.g. for
//!    `github.com/acme/jdk@17.0.2`:
//!
//! ```text
//! GITHUB_COM_ACME_JDK_17_0_2_DIR   GITHUB_COM_ACME_JDK_DIR
//! ACME_JDK_17_0_2_DIR              ACME_JDK_DIR
//! JDK_17_0_2_DIR                   JDK_DIR
//! ```
//!
//! 6. the node's PATH is its `BINDIR` followed by its children's entries
//! 7. a pre-run trigger, if declared, may replace the node's contribution
//!
//! The root's PATH list is finally followed by the process PATH.
//!
//! Expansion is best effort: `$NAME` and `${NAME}` resolve against the
//! variables composed so far and unknown names are left as written.

pub mod alias;

pub use alias::resolve_alias;

use crate::constants::PROJECT_DIR_ENV;
use crate::coord::LockedCoord;
use crate::resolver::ResolvedDependency;
use crate::triggers::{PreRunContext, TriggerRunner};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use std::collections::BTreeMap;
use std::ffi::OsString;
use std::path::PathBuf;

/// The composed environment of a command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RuntimeContext {
    /// Composed variables, including `PATH` once finalized
    pub env: BTreeMap<String, String>,
    /// Entries prepended to the process PATH, highest priority first
    pub path: Vec<String>,
}

impl From<PreRunContext> for RuntimeContext {
    fn from(ctx: PreRunContext) -> Self {
        Self {
            env: ctx.env,
            path: ctx.path,
        }
    }
}

impl From<RuntimeContext> for PreRunContext {
    fn from(ctx: RuntimeContext) -> Self {
        Self {
            path: ctx.path,
            env: ctx.env,
        }
    }
}

/// Expands `$NAME` / `${NAME}` against `env`, leaving unknown names as written.
#[must_use]
pub fn expand(input: &str, env: &BTreeMap<String, String>) -> String {
    shellexpand::env_with_context_no_errors(input, |name| env.get(name)).into_owned()
}

/// Uppercases and replaces `.`, `-` and `/` with `_`.
///
/// ```rust
/// use bz_cli::environment::to_env_key;
/// assert_eq!(to_env_key("github.com/acme/my-tool_1.2"), "GITHUB_COM_ACME_MY_TOOL_1_2");
/// ```
#[must_use]
pub fn to_env_key(s: &str) -> String {
    s.chars()
        .map(|c| match c {
            '.' | '-' | '/' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

/// Prefixes of the implicit `<PREFIX>_DIR` / `<PREFIX>_BINDIR` variables,
/// most specific first.
#[must_use]
pub fn namespace_prefixes(coord: &LockedCoord) -> [String; 6] {
    let version = coord.version.canonical();
    let (server, owner, repo) = (&coord.server, &coord.owner, &coord.repo);
    [
        to_env_key(&format!("{server}_{owner}_{repo}_{version}")),
        to_env_key(&format!("{server}_{owner}_{repo}")),
        to_env_key(&format!("{owner}_{repo}_{version}")),
        to_env_key(&format!("{owner}_{repo}")),
        to_env_key(&format!("{repo}_{version}")),
        to_env_key(repo),
    ]
}

/// Builds a [`RuntimeContext`] from a resolved tree.
pub struct EnvironmentComposer<'a> {
    triggers: &'a dyn TriggerRunner,
    project_dir: String,
    curdir: String,
    base_path: Option<OsString>,
}

impl<'a> EnvironmentComposer<'a> {
    /// A composer using the process working directory and PATH.
    #[must_use]
    pub fn new(triggers: &'a dyn TriggerRunner, project_dir: &std::path::Path) -> Self {
        let curdir = std::env::current_dir().unwrap_or_else(|_| project_dir.to_path_buf());
        Self {
            triggers,
            project_dir: project_dir.display().to_string(),
            curdir: curdir.display().to_string(),
            base_path: std::env::var_os("PATH"),
        }
    }

    #[must_use]
    pub fn with_curdir(mut self, curdir: impl Into<PathBuf>) -> Self {
        self.curdir = curdir.into().display().to_string();
        self
    }

    /// Replaces the PATH appended after the composed entries.
    #[must_use]
    pub fn with_base_path(mut self, base_path: Option<OsString>) -> Self {
        self.base_path = base_path;
        self
    }

    /// Composes the whole tree and finalizes `PATH`.
    ///
    /// # Errors
    ///
    /// Fails when a pre-run trigger fails or a PATH entry contains the
    /// platform separator.
    pub async fn compose(&self, tree: &ResolvedDependency) -> Result<RuntimeContext> {
        let mut ctx = self.compose_node(tree).await?;

        let mut entries: Vec<PathBuf> = ctx.path.iter().map(PathBuf::from).collect();
        if let Some(base) = &self.base_path {
            entries.extend(std::env::split_paths(base));
        }
        let joined = std::env::join_paths(&entries).context("Cannot build PATH")?;
        ctx.env.insert("PATH".to_string(), joined.to_string_lossy().into_owned());

        tracing::debug!("Composed PATH: {:?}", ctx.path);
        Ok(ctx)
    }

    fn compose_node<'b>(&'b self, node: &'b ResolvedDependency) -> BoxFuture<'b, Result<RuntimeContext>> {
        Box::pin(async move {
            let mut env = BTreeMap::new();
            let mut child_path = Vec::new();
            for child in &node.sub {
                let composed = self.compose_node(child).await?;
                env.extend(composed.env);
                child_path.extend(composed.path);
            }

            let dir = node.dir.display().to_string();
            env.insert("DIR".to_string(), dir.clone());
            env.insert("CURDIR".to_string(), self.curdir.clone());
            env.insert(PROJECT_DIR_ENV.to_string(), self.project_dir.clone());

            for (key, value) in &node.exports {
                let expanded = expand(value, &env);
                env.insert(key.clone(), expanded);
            }

            let bin_dir = expand(&node.bin_dir_or_default(), &env);
            env.insert("BINDIR".to_string(), bin_dir.clone());

            for prefix in namespace_prefixes(&node.coord) {
                env.insert(format!("{prefix}_DIR"), dir.clone());
                env.insert(format!("{prefix}_BINDIR"), bin_dir.clone());
            }

            let mut path = Vec::with_capacity(child_path.len() + 1);
            path.push(bin_dir);
            path.extend(child_path);

            let ctx = RuntimeContext {
                env,
                path,
            };

            match node.triggers.pre_run() {
                Some(script) => {
                    let replaced = self.triggers.run_pre_run(script, &node.dir, ctx.into()).await?;
                    Ok(replaced.into())
                }
                None => Ok(ctx),
            }
        })
    }
}
