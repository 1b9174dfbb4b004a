//! Constants used throughout bz.
//!
//! File names, environment variable names, and network retry parameters
//! live here so the names users see in their projects are defined once.

use std::time::Duration;

/// Application name; prefixes every file and directory bz owns.
pub const APP_NAME: &str = "bz";

/// Lock file written next to the fuzzy config.
pub const LOCK_FILE_NAME: &str = ".bz.lock";

/// Fuzzy config file names, in lookup priority order.
pub const CONFIG_FILE_NAMES: &[&str] = &[".bz.toml", ".bz.json", ".bz"];

/// Directory inside a dependency's cache directory holding its unpacked archive.
pub const EXTRACTED_DIR_NAME: &str = "extracted";

/// Subdirectory of the cache holding downloaded dependencies.
pub const DEPS_DIR_NAME: &str = "deps";

/// Default bin directory of a dependency, relative to its root.
pub const DEFAULT_BIN_DIR: &str = "bin";

/// Overrides the user directory (`~/.bz`).
pub const HOME_ENV: &str = "BZ_HOME";

/// Overrides the cache directory (`<user dir>/cache`).
pub const CACHE_DIR_ENV: &str = "BZ_CACHE_DIR";

/// Overrides the user config path (`<user dir>/config.toml`).
pub const CONFIG_ENV: &str = "BZ_CONFIG";

/// Exported to every composed environment: the project root directory.
pub const PROJECT_DIR_ENV: &str = "BZ_PROJECT_DIR";

/// Archive extensions accepted for releases, in download preference order.
pub const ARCHIVE_EXTENSIONS: &[&str] = &["zip", "tgz", "tar.gz"];

/// Starting delay for HTTP retry backoff (100ms).
pub const STARTING_BACKOFF_DELAY_MS: u64 = 100;

/// Maximum delay between HTTP retries (2 seconds).
pub const MAX_BACKOFF_DELAY: Duration = Duration::from_secs(2);

/// Number of retries after the first failed HTTP request.
pub const HTTP_RETRIES: usize = 3;

/// Timeout for a single HTTP request (5 minutes; release archives can be large).
pub const HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Releases requested per page when scanning for a version pattern.
pub const RELEASES_PER_PAGE: usize = 30;
