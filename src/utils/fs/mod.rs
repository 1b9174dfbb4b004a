//! File system utilities
//!
//! - [`atomic`] - temp-and-rename writes for lock files
//! - [`dirs`] - directory creation and removal
//! - [`metadata`] - modification times for staleness checks
//! - [`paths`] - normalization, containment checks, and project discovery

pub mod atomic;
pub mod dirs;
pub mod metadata;
pub mod paths;

pub use atomic::atomic_write;
pub use dirs::{ensure_dir, remove_dir_all};
pub use metadata::{compare_file_times, get_modified_time, is_file};
pub use paths::{find_project_root, is_safe_path, normalize_path};
