//! Integration test suite for bz
//!
//! End-to-end tests that resolve real archives from a local mirror, compose
//! the environment and run commands, both through the library API and
//! through the `bz` binary. Nothing here touches the network: dependencies
//! live on a server name the GitHub resolver does not answer for.
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **common**: `TestProject`, a project directory plus user dir and mirror
//! - **pipeline**: resolve, compose, alias and exec through the library
//! - **cli**: the `bz` binary, its flags and exit codes

mod common;

#[cfg(unix)]
mod cli;
#[cfg(unix)]
mod pipeline;
