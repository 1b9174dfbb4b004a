//! Core types for bz
//!
//! Currently this is the error system shared by every other module:
//! - [`BzError`] - Enumerated error types covering all bz failure modes
//! - [`ErrorContext`] - User-friendly error wrapper with suggestions and details
//! - [`user_friendly_error`] - Convert any error to user-friendly format

pub mod error;

pub use error::{BzError, ErrorContext, user_friendly_error};
