//! bz - project-local tool dependencies
//!
//! bz runs a command inside an environment composed from a project's tool
//! dependencies. Each dependency is a released archive (a JDK, a build tool,
//! a linter) identified by a coordinate such as `github.com/acme/tool@1.4`.
//! bz pins those coordinates in a lock file, installs the archives into a
//! shared cache, and puts their bin directories and exported variables in
//! front of the command it runs.
//!
//! # Architecture Overview
//!
//! bz follows a fuzzy-config/lock-file model:
//! - `.bz.toml` (or `.bz.json`, `.bz`) lists dependencies with version patterns
//! - `.bz.lock` records the exact versions and the whole transitive tree
//! - every released archive ships its own `.bz.lock`, so dependencies of
//!   dependencies never need re-resolving
//!
//! A run goes through four stages:
//!
//! 1. **Resolution** ([`resolver`]) - pin the project's coordinates, install
//!    each dependency, and build the tree, rejecting cycles
//! 2. **Composition** ([`environment`]) - fold the tree into `PATH` and
//!    environment variables, children first, parents overriding
//! 3. **Alias expansion** ([`environment::alias`]) - rewrite the command line
//!    through every scope's alias table
//! 4. **Execution** ([`exec`]) - run the command and return its exit code
//!
//! # Core Modules
//!
//! - [`version`] - dotted versions with optional pre-release, and patterns
//! - [`coord`] - fuzzy and locked dependency coordinates
//! - [`resolver`] - the dependency graph resolver and its pluggable resolvers
//! - [`environment`] - the environment composer and alias expander
//! - [`exec`] - command lookup and execution
//!
//! ## Supporting Modules
//! - [`archive`] - zip and gzip'd tar extraction
//! - [`cache`] - the on-disk dependency cache layout
//! - [`cli`] - command-line interface
//! - [`config`] - user config, fuzzy config formats, and [`config::AppContext`]
//! - [`core`] - error types and user-facing error reporting
//! - [`lockfile`] - lock file model and I/O
//! - [`triggers`] - install and pre-run trigger execution
//! - [`utils`] - file system and platform helpers
//!
//! # Config Format (.bz.toml)
//!
//! ```toml
//! deps = [
//!     "github.com/adoptium/temurin17-binaries@17.0.2+8",
//!     "github.com/acme/gradle-dist@7",
//! ]
//! binDir = "$DIR/scripts"
//!
//! [env]
//! TOOLS_HOME = "$DIR"
//!
//! [alias]
//! build = "gradle build --offline"
//!
//! [triggers]
//! preRunScript = "./scripts/env.sh"
//! ```
//!
//! # Environment
//!
//! - `BZ_HOME` - user directory (default `~/.bz`)
//! - `BZ_CACHE_DIR` - cache directory (default `$BZ_HOME/cache`)
//! - `BZ_CONFIG` - user config file (default `$BZ_HOME/config.toml`)
//! - `RUST_LOG` - log filter, overriding `--verbose` / `--quiet`

pub mod archive;
pub mod cache;
pub mod cli;
pub mod config;
pub mod constants;
pub mod coord;
pub mod core;
pub mod environment;
pub mod exec;
pub mod lockfile;
pub mod resolver;
pub mod triggers;
pub mod utils;
pub mod version;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
