//! Error handling for bz
//!
//! This module provides the typed errors raised by the resolution and
//! composition engine, plus user-friendly error reporting for the CLI. The
//! error system follows two principles:
//! 1. **Strongly-typed errors** so callers can tell recoverable failures
//!    (a corrupt lock file) from fatal ones (a dependency cycle)
//! 2. **User-friendly messages** with actionable suggestions for CLI users
//!
//! # Architecture
//!
//! - [`BzError`] - Enumerated error types for all failure cases in bz
//! - [`ErrorContext`] - Wrapper that adds user-friendly messages and suggestions
//!
//! Library code returns [`anyhow::Result`] and raises [`BzError`] values
//! through it; code that needs to react to a specific failure uses
//! `downcast_ref::<BzError>()`.
//!
//! # Examples
//!
//! ```rust,no_run
//! use bz_cli::core::{BzError, ErrorContext, user_friendly_error};
//!
//! fn parse_something() -> anyhow::Result<()> {
//!     Err(BzError::CoordinateFormat {
//!         coord: "acme/tool".to_string(),
//!         reason: "expected server/owner/repo".to_string(),
//!     }
//!     .into())
//! }
//!
//! if let Err(e) = parse_something() {
//!     let ctx = user_friendly_error(e);
//!     ctx.display();
//! }
//! ```

use colored::Colorize;
use std::fmt;

/// The main error type for bz operations.
///
/// Variants map one-to-one onto the failure kinds of the resolution
/// pipeline. Only [`BzError::LockfileParseError`] is recovered from
/// internally (by falling back to the fuzzy config at the project root);
/// every other variant aborts the command.
#[derive(thiserror::Error, Debug, Clone)]
pub enum BzError {
    /// A dependency string is not of the form `server/owner/repo[@version]`.
    #[error("Invalid dependency coordinate '{coord}': {reason}")]
    CoordinateFormat {
        /// The coordinate string as written in the config
        coord: String,
        /// What is wrong with it
        reason: String,
    },

    /// No registered resolver recognized the coordinate.
    #[error("Unable to resolve dependency '{coord}'")]
    UnresolvableCoordinate {
        /// The coordinate string as written in the config
        coord: String,
    },

    /// A dependency appears among its own ancestors.
    ///
    /// The chain lists every ancestor from the root to the offending
    /// dependency, joined with `->`.
    #[error("Detected circular dependency: {chain}")]
    CircularDependency {
        /// Full ancestor chain including the repeated name
        chain: String,
    },

    /// Every resolver failed to download a locked coordinate.
    #[error("Failed to download '{coord}': {reason}")]
    DownloadFailed {
        /// The locked coordinate
        coord: String,
        /// Collected failure reasons
        reason: String,
    },

    /// An archive could not be extracted.
    #[error("Failed to extract '{file}': {reason}")]
    ExtractionFailed {
        /// Archive path
        file: String,
        /// Underlying failure
        reason: String,
    },

    /// Archive extension is not one of `.zip`, `.tgz`, `.tar.gz`.
    #[error("Archive file extension not supported: {file}")]
    UnsupportedArchive {
        /// Archive path
        file: String,
    },

    /// An archive entry would be written outside the destination directory.
    #[error("Archive entry '{entry}' escapes destination {dest}")]
    UnsafeArchiveEntry {
        /// Entry name as stored in the archive
        entry: String,
        /// Destination directory
        dest: String,
    },

    /// A lock file is missing or cannot be parsed.
    #[error("Invalid lock file {file}: {reason}")]
    LockfileParseError {
        /// Lock file path
        file: String,
        /// Parser message
        reason: String,
    },

    /// A fuzzy config file cannot be parsed.
    #[error("Invalid config file {file}: {reason}")]
    ConfigParseError {
        /// Config file path
        file: String,
        /// Parser message
        reason: String,
    },

    /// An install or pre-run trigger failed.
    #[error("Trigger '{script}' failed: {reason}")]
    TriggerFailed {
        /// The trigger command line
        script: String,
        /// Exit status or decoding failure
        reason: String,
    },

    /// The command to run could not be found on the composed PATH.
    #[error("Command not found: {command}")]
    CommandNotFound {
        /// Program name after alias expansion
        command: String,
    },

    /// Other error
    #[error("{message}")]
    Other {
        /// Generic error message
        message: String,
    },
}

/// Error context wrapper that provides user-friendly error information.
///
/// Adds an optional suggestion (what to do) and details (why it happened)
/// to a [`BzError`] for display on the terminal.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying bz error
    pub error: BzError,
    /// Optional suggestion for resolving the error
    pub suggestion: Option<String>,
    /// Optional additional details about the error
    pub details: Option<String>,
}

impl ErrorContext {
    /// Create a new error context without suggestion or details.
    #[must_use]
    pub const fn new(error: BzError) -> Self {
        Self {
            error,
            suggestion: None,
            details: None,
        }
    }

    /// Add a suggestion for resolving the error.
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Add additional details explaining the error.
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Display the error context to stderr with terminal colors.
    ///
    /// - Error message: Red and bold
    /// - Details: Yellow
    /// - Suggestion: Green
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.error);

        if let Some(details) = &self.details {
            eprintln!("{}: {}", "details".yellow(), details);
        }

        if let Some(suggestion) = &self.suggestion {
            eprintln!("{}: {}", "suggestion".green(), suggestion);
        }
    }
}

impl fmt::Display for ErrorContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

impl std::error::Error for ErrorContext {}

/// Convert any error into a user-friendly [`ErrorContext`].
///
/// Known [`BzError`] variants anywhere in the error chain get tailored
/// suggestions; everything else is reported with its full cause chain.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    for cause in error.chain() {
        if let Some(bz_error) = cause.downcast_ref::<BzError>() {
            let ctx = create_error_context(bz_error.clone());
            // Keep the outer context messages: they name the dependency being processed
            if error.chain().count() > 1 && ctx.details.is_none() {
                return ctx.with_details(chain_message(&error));
            }
            return ctx;
        }
    }

    if let Some(io_error) = error.downcast_ref::<std::io::Error>()
        && io_error.kind() == std::io::ErrorKind::PermissionDenied
    {
        return ErrorContext::new(BzError::Other {
            message: chain_message(&error),
        })
        .with_suggestion("Check the permissions of the bz cache directory (~/.bz/cache)");
    }

    ErrorContext::new(BzError::Other {
        message: chain_message(&error),
    })
}

fn chain_message(error: &anyhow::Error) -> String {
    let mut message = error.to_string();
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();

    if !chain.is_empty() {
        message.push_str("\n\nCaused by:");
        for (i, cause) in chain.iter().enumerate() {
            message.push_str(&format!("\n  {}: {}", i + 1, cause));
        }
    }
    message
}

fn create_error_context(error: BzError) -> ErrorContext {
    match &error {
        BzError::CoordinateFormat {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Dependencies are written as server/owner/repo[@version], e.g. github.com/acme/tool@1.2",
        ),
        BzError::UnresolvableCoordinate {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the server name, owner, and repo, and that a matching release exists")
            .with_details(
                "Private repositories need a token in ~/.bz/config.toml under [servers.\"<server>\"]",
            ),
        BzError::CircularDependency {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Remove one of the dependencies forming the cycle")
            .with_details("A repository cannot depend on itself at any version"),
        BzError::DownloadFailed {
            ..
        } => ErrorContext::new(error).with_suggestion(
            "Check network connectivity and that the release ships an archive named after the repo",
        ),
        BzError::ExtractionFailed {
            ..
        }
        | BzError::UnsupportedArchive {
            ..
        }
        | BzError::UnsafeArchiveEntry {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Release archives must be .zip, .tgz or .tar.gz with relative entries"),
        BzError::ConfigParseError {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check the syntax of your .bz.toml / .bz.json file"),
        BzError::TriggerFailed {
            ..
        } => ErrorContext::new(error).with_details(
            "Pre-run triggers must print a JSON object {\"path\": [...], \"env\": {...}} on stdout",
        ),
        BzError::CommandNotFound {
            ..
        } => ErrorContext::new(error)
            .with_suggestion("Check that a dependency provides this command in its bin directory"),
        BzError::LockfileParseError {
            ..
        }
        | BzError::Other {
            ..
        } => ErrorContext::new(error),
    }
}
