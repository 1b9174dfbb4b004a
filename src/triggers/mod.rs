//! Lifecycle triggers declared by dependencies.
//!
//! A dependency's config may name two shell commands:
//!
//! - `installScript` runs once in the freshly extracted dependency directory,
//!   with `DIR` set to that directory.
//! - `preRunScript` runs on every composition. It receives the node's
//!   contribution as JSON on stdin and must print the (possibly modified)
//!   contribution as JSON on stdout:
//!
//! ```json
//! { "path": ["/cache/.../extracted/bin"], "env": { "DIR": "/cache/.../extracted" } }
//! ```
//!
//! Scripts run through the platform shell (`sh -c`, `cmd /C`).

use crate::core::BzError;
use crate::utils::platform::get_shell_command;
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// What a pre-run trigger sees and returns.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreRunContext {
    pub path: Vec<String>,
    pub env: BTreeMap<String, String>,
}

/// Executes trigger scripts.
pub trait TriggerRunner: Send + Sync {
    /// Runs an install script with `dir` as working directory.
    fn run_install_script<'a>(&'a self, script: &'a str, dir: &'a Path) -> BoxFuture<'a, Result<()>>;

    /// Runs a pre-run script, returning the replacement contribution.
    fn run_pre_run<'a>(
        &'a self,
        script: &'a str,
        dir: &'a Path,
        context: PreRunContext,
    ) -> BoxFuture<'a, Result<PreRunContext>>;
}

/// Runs triggers as child processes of the platform shell.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessTriggerRunner;

impl ProcessTriggerRunner {
    fn command(script: &str, dir: &Path) -> Command {
        let (shell, flag) = get_shell_command();
        let mut cmd = Command::new(shell);
        cmd.arg(flag).arg(script).current_dir(dir).env("DIR", dir).kill_on_drop(true);
        cmd
    }

    fn failed(script: &str, reason: impl Into<String>) -> anyhow::Error {
        BzError::TriggerFailed {
            script: script.to_string(),
            reason: reason.into(),
        }
        .into()
    }
}

impl TriggerRunner for ProcessTriggerRunner {
    fn run_install_script<'a>(&'a self, script: &'a str, dir: &'a Path) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            tracing::info!("Running install script in {}: {}", dir.display(), script);

            let status = Self::command(script, dir)
                .stdin(Stdio::null())
                .stdout(Stdio::inherit())
                .stderr(Stdio::inherit())
                .status()
                .await
                .with_context(|| format!("Failed to spawn install script: {script}"))?;

            if !status.success() {
                return Err(Self::failed(script, format!("exited with {status}")));
            }
            Ok(())
        })
    }

    fn run_pre_run<'a>(
        &'a self,
        script: &'a str,
        dir: &'a Path,
        context: PreRunContext,
    ) -> BoxFuture<'a, Result<PreRunContext>> {
        Box::pin(async move {
            tracing::debug!("Running pre-run script in {}: {}", dir.display(), script);

            let input = serde_json::to_vec(&context).context("Failed to encode pre-run input")?;

            let mut child = Self::command(script, dir)
                .envs(&context.env)
                .stdin(Stdio::piped())
                .stdout(Stdio::piped())
                .stderr(Stdio::inherit())
                .spawn()
                .with_context(|| format!("Failed to spawn pre-run script: {script}"))?;

            // Feed stdin while draining stdout, or a script echoing a large
            // context fills both pipes and never exits
            let stdin = child.stdin.take();
            let feed = async move {
                if let Some(mut stdin) = stdin {
                    // A script that ignores stdin may exit before reading it all
                    if let Err(e) = stdin.write_all(&input).await {
                        tracing::debug!("Pre-run script closed stdin early: {}", e);
                    }
                }
            };

            let ((), output) = tokio::join!(feed, child.wait_with_output());
            let output = output.with_context(|| format!("Failed to wait for pre-run script: {script}"))?;

            if !output.status.success() {
                return Err(Self::failed(script, format!("exited with {}", output.status)));
            }

            serde_json::from_slice(&output.stdout)
                .map_err(|e| Self::failed(script, format!("invalid JSON on stdout: {e}")))
        })
    }
}
