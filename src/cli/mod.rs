//! Command-line interface for bz.
//!
//! bz has no subcommands: everything after the options is the command to run
//! inside the project's composed environment.
//!
//! ```bash
//! # Resolve dependencies and write .bz.lock
//! bz
//!
//! # Run a tool provided by a dependency (or an alias)
//! bz gradle build
//!
//! # Inspect what bz would do
//! bz --print-tree
//! bz --print-env
//!
//! # Work on another project
//! bz -C ../service make test
//! ```
//!
//! # Logging
//!
//! bz wraps other programs, so it stays silent unless something goes wrong.
//! `RUST_LOG` takes precedence over `--verbose` / `--quiet`; all log output
//! goes to stderr.


use crate::config::AppContext;
use crate::environment::{EnvironmentComposer, RuntimeContext, resolve_alias};
use crate::resolver::{Collaborators, DependencyResolver, ResolvedDependency};
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Runs commands with a project's tool dependencies on the PATH.
#[derive(Parser, Debug)]
#[command(
    name = "bz",
    about = "Run commands with project-local tool dependencies",
    version,
    long_about = "bz resolves the dependencies declared in .bz.toml / .bz.json, pins them in .bz.lock, \
                  installs them into a shared cache and runs COMMAND with their bin directories and \
                  exports in the environment."
)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, conflicts_with = "quiet")]
    pub verbose: bool,

    /// Only log errors
    #[arg(short, long)]
    pub quiet: bool,

    /// Run as if started in DIR
    #[arg(short = 'C', long, value_name = "DIR")]
    pub dir: Option<PathBuf>,

    /// Print the composed environment as sorted KEY=VALUE lines
    #[arg(long)]
    pub print_env: bool,

    /// Print the resolved dependency tree
    #[arg(long)]
    pub print_tree: bool,

    /// Command to run, possibly an alias
    #[arg(trailing_var_arg = true, allow_hyphen_values = true, value_name = "COMMAND")]
    pub command: Vec<String>,
}

impl Cli {
    /// The log filter for these flags when `RUST_LOG` is not set.
    #[must_use]
    pub const fn default_log_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "error"
        } else {
            "warn"
        }
    }

    fn init_logging(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(self.default_log_level()));

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

    /// Runs bz and returns the process exit code.
    ///
    /// With no command the project is resolved (refreshing `.bz.lock`) and the
    /// exit code is 0; otherwise it is the command's.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration cannot be loaded, resolution fails,
    /// a trigger fails, or the command cannot be started.
    pub async fn execute(self) -> Result<i32> {
        self.init_logging();

        let context = AppContext::load().await?;
        let start = match &self.dir {
            Some(dir) => std::path::absolute(dir)
                .with_context(|| format!("Invalid directory {}", dir.display()))?,
            None => std::env::current_dir().context("Cannot determine the current directory")?,
        };
        let project_dir = context.find_project_root(&start);

        let collaborators = Collaborators::from_context(&context)?;
        let tree = DependencyResolver::new(&context, &collaborators)
            .resolve_project(&project_dir)
            .await?;

        if self.print_tree {
            println!("{}", tree.render_tree());
        }
        if self.command.is_empty() && !self.print_env {
            return Ok(0);
        }

        let runtime = EnvironmentComposer::new(collaborators.triggers.as_ref(), &project_dir)
            .with_curdir(start.clone())
            .compose(&tree)
            .await?;

        if self.print_env {
            print!("{}", render_env(&runtime));
        }
        if self.command.is_empty() {
            return Ok(0);
        }

        self.run_command(&tree, &runtime, &start).await
    }

    async fn run_command(
        &self,
        tree: &ResolvedDependency,
        runtime: &RuntimeContext,
        cwd: &std::path::Path,
    ) -> Result<i32> {
        let argv = resolve_alias(tree, &runtime.env, &self.command)?;
        crate::exec::run(&argv, runtime, cwd).await
    }
}

/// `KEY=VALUE` lines in key order.
#[must_use]
pub fn render_env(runtime: &RuntimeContext) -> String {
    runtime.env.iter().map(|(key, value)| format!("{key}={value}\n")).collect()
}
