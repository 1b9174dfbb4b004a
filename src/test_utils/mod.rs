//! Test utilities for bz
//!
//! Helpers shared by unit tests and the integration suite:
//!
//! - [`init_test_logging`] - one-time tracing setup
//! - [`fixtures`] - zip/tgz archive builders for fake releases
//! - [`resolver`] - in-memory resolvers and a recording trigger runner, so
//!   resolution can be exercised without a network
//!
//! # Example
//!
//! ```rust,no_run
//! use bz_cli::lockfile::LockedConfigContent;
//! use bz_cli::test_utils::{ArchiveFixture, MemoryResolver};
//!
//! # fn example() -> anyhow::Result<()> {
//! let temp = tempfile::TempDir::new()?;
//! let resolver = MemoryResolver::new(temp.path().join("releases")).with_release(
//!     "github.com/acme/tool",
//!     "1.0.0",
//!     ArchiveFixture::new().lock(&LockedConfigContent::default()),
//! )?;
//! # Ok(())
//! # }
//! ```

pub mod fixtures;
pub mod resolver;

pub use fixtures::{ArchiveFixture, raw_tgz};
pub use resolver::{CallLog, FailingResolver, MemoryResolver, RecordingTriggerRunner};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Uses `level` when given, otherwise `RUST_LOG`; does nothing when neither
/// is set. Safe to call from every test.
///
/// ```bash
/// RUST_LOG=bz_cli=debug cargo test
/// ```
pub fn init_test_logging(level: Option<Level>) {
    INIT_LOGGING.call_once(|| {
        let filter = if let Some(level) = level {
            EnvFilter::new(level.to_string())
        } else if std::env::var("RUST_LOG").is_ok() {
            EnvFilter::from_default_env()
        } else {
            return;
        };

        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .with_thread_ids(false)
            .try_init();
    });
}
