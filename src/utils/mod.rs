//! Cross-platform utilities and helpers
//!
//! - [`fs`] - File system operations with atomic writes and path checks
//! - [`platform`] - Platform-specific helpers (home dir, shell, asset naming)

pub mod fs;
pub mod platform;

pub use fs::{atomic_write, ensure_dir, normalize_path};
pub use platform::{get_home_dir, is_windows};
