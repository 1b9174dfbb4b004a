//! Running the user's command inside the composed environment.
//!
//! The program is looked up on the composed `PATH` rather than bz's own, so
//! tools provided by dependencies shadow anything installed system-wide. The
//! child inherits bz's stdio and environment, with the composed variables
//! layered on top.

use crate::core::BzError;
use crate::environment::RuntimeContext;
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use tokio::process::Command;

/// Finds `program` on the composed `PATH`.
///
/// Names containing a path separator are resolved relative to `cwd` instead.
///
/// # Errors
///
/// Returns [`BzError::CommandNotFound`] when nothing executable matches.
pub fn find_program(program: &str, context: &RuntimeContext, cwd: &Path) -> Result<PathBuf> {
    let search_path = context.env.get("PATH").map(String::as_str).unwrap_or_default();

    which::which_in(program, Some(search_path), cwd).map_err(|e| {
        tracing::debug!("Lookup of {} on {} failed: {}", program, search_path, e);
        BzError::CommandNotFound {
            command: program.to_string(),
        }
        .into()
    })
}

/// Runs `argv` with the composed environment and waits for it.
///
/// Returns the child's exit code. A child killed by a signal reports
/// `128 + signal`, as shells do.
///
/// # Errors
///
/// Returns an error if `argv` is empty, the program cannot be found, or the
/// process cannot be spawned.
pub async fn run(argv: &[String], context: &RuntimeContext, cwd: &Path) -> Result<i32> {
    let Some((program, args)) = argv.split_first() else {
        return Err(BzError::Other {
            message: "No command given".to_string(),
        }
        .into());
    };

    let resolved = find_program(program, context, cwd)?;
    tracing::debug!("Running {} {:?}", resolved.display(), args);

    let status = Command::new(&resolved)
        .args(args)
        .current_dir(cwd)
        .envs(&context.env)
        .kill_on_drop(true)
        .status()
        .await
        .with_context(|| format!("Failed to start {}", resolved.display()))?;

    Ok(exit_code(status))
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }

    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }

    1
}
