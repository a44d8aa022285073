//! Error handling for firecommit's self-update subsystem.
//!
//! Two types cooperate here:
//! - [`UpdateError`] enumerates every failure mode of the check/apply/rollback
//!   pipeline. Library functions return `anyhow::Result` and wrap these, so
//!   callers can still `downcast_ref::<UpdateError>()` to branch on a step.
//! - [`ErrorContext`] pairs an error with optional details and a suggestion for
//!   the CLI, produced by [`user_friendly_error`].
//!
//! Several outcomes are intentionally *not* errors: an HTTP 304 is a
//! [`FetchOutcome::NotModified`](crate::upgrade::release::FetchOutcome), a
//! failed archive or prune is logged with `tracing::warn!`, and a corrupt
//! schedule or archive index is replaced by empty state.
//!
//! # Examples
//!
//! ```rust,no_run
//! use firecommit::core::{UpdateError, user_friendly_error};
//!
//! let err = anyhow::Error::from(UpdateError::NoMatchingAsset {
//!     os: "linux".to_string(),
//!     arch: "riscv64".to_string(),
//! });
//! user_friendly_error(err).display();
//! ```

use colored::Colorize;
use std::fmt;
use thiserror::Error;

/// The error type for self-update operations.
///
/// Variants are grouped by the pipeline step that raises them:
///
/// ## Discovery
/// - [`NetworkError`](Self::NetworkError) - timeout, transport failure or non-200 response
/// - [`NoRelease`](Self::NoRelease) - the provider returned no installable release
///
/// ## Download and verification
/// - [`NoMatchingAsset`](Self::NoMatchingAsset) - release has no build for this platform
/// - [`ChecksumManifestMissing`](Self::ChecksumManifestMissing)
/// - [`ChecksumFormatInvalid`](Self::ChecksumFormatInvalid)
/// - [`ChecksumEntryMissing`](Self::ChecksumEntryMissing)
/// - [`ChecksumMismatch`](Self::ChecksumMismatch)
/// - [`ExtractionFailure`](Self::ExtractionFailure)
///
/// ## Installation and rollback
/// - [`BinaryReplaceFailure`](Self::BinaryReplaceFailure)
/// - [`VersionNotArchived`](Self::VersionNotArchived)
/// - [`ArchivedBinaryMissing`](Self::ArchivedBinaryMissing)
#[derive(Error, Debug)]
pub enum UpdateError {
    /// A request to the release provider failed.
    ///
    /// Never retried within one process run; the check schedule backs off and
    /// tries again on a later invocation.
    #[error("Network error: {operation}: {reason}")]
    NetworkError {
        /// What was being fetched (e.g. "fetch latest release")
        operation: String,
        /// Transport error text or HTTP status
        reason: String,
    },

    /// No non-draft release is available on the channel.
    #[error("No release available on the '{channel}' channel")]
    NoRelease {
        /// Channel that was queried
        channel: String,
    },

    /// The release carries no asset for the running OS/architecture.
    #[error("No release asset found for {os}/{arch}")]
    NoMatchingAsset {
        /// Provider-style OS name (e.g. "darwin")
        os: String,
        /// Provider-style architecture name (e.g. "arm64")
        arch: String,
    },

    /// The release does not publish a checksum manifest.
    #[error("Checksum manifest '{name}' not found in release assets")]
    ChecksumManifestMissing {
        /// Expected manifest asset name
        name: String,
    },

    /// The manifest entry for the asset is not a valid SHA-256 digest.
    #[error("Invalid checksum entry for '{asset}': {reason}")]
    ChecksumFormatInvalid {
        /// Asset whose entry is malformed
        asset: String,
        /// What was wrong with the entry
        reason: String,
    },

    /// The manifest has no line for the asset.
    #[error("Checksum entry not found for '{asset}'")]
    ChecksumEntryMissing {
        /// Asset that was looked up
        asset: String,
    },

    /// The downloaded archive does not match its published digest.
    #[error("SHA-256 mismatch for '{name}': expected {expected}, got {actual}")]
    ChecksumMismatch {
        /// Asset name
        name: String,
        /// Digest from the manifest
        expected: String,
        /// Digest of the downloaded file
        actual: String,
    },

    /// The archive could not be unpacked or did not contain the binary.
    #[error("Failed to extract '{binary}' from {archive}: {reason}")]
    ExtractionFailure {
        /// Archive path or asset name
        archive: String,
        /// Binary that was being looked for
        binary: String,
        /// Underlying failure
        reason: String,
    },

    /// Replacing the installed executable failed.
    #[error("Failed to replace binary at {path}: {reason}")]
    BinaryReplaceFailure {
        /// Executable that was being replaced
        path: String,
        /// Underlying failure
        reason: String,
    },

    /// A rollback target is not listed in the archive index.
    #[error("Version {version} not found in archive")]
    VersionNotArchived {
        /// Requested version
        version: String,
    },

    /// The archive index lists a version whose binary has been deleted.
    #[error("Archived binary for {version} is missing: {path}")]
    ArchivedBinaryMissing {
        /// Requested version
        version: String,
        /// Expected location of the archived binary
        path: String,
    },

    /// Configuration could not be read or understood.
    #[error("Configuration error: {message}")]
    ConfigError {
        /// Description of the problem
        message: String,
    },
}

impl UpdateError {
    /// Build a [`UpdateError::NetworkError`] from any displayable cause.
    pub fn network(operation: impl Into<String>, reason: impl fmt::Display) -> Self {
        Self::NetworkError {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Build a [`UpdateError::BinaryReplaceFailure`] from any displayable cause.
    pub fn replace_failure(path: &std::path::Path, reason: impl fmt::Display) -> Self {
        Self::BinaryReplaceFailure {
            path: path.display().to_string(),
            reason: reason.to_string(),
        }
    }
}

/// An error with optional details and an actionable suggestion for the CLI.
#[derive(Debug)]
pub struct ErrorContext {
    /// The underlying error message
    pub message: String,
    /// Additional context, usually the error chain
    pub details: Option<String>,
    /// What the user can do about it
    pub suggestion: Option<String>,
}

impl ErrorContext {
    /// Create a context with just a message.
    #[must_use]
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            details: None,
            suggestion: None,
        }
    }

    /// Attach a suggestion.
    #[must_use]
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Attach details.
    #[must_use]
    pub fn with_details(mut self, details: impl Into<String>) -> Self {
        self.details = Some(details.into());
        self
    }

    /// Print the error to stderr with colors.
    pub fn display(&self) {
        eprintln!("{}: {}", "error".red().bold(), self.message);

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
        write!(f, "{}", self.message)?;

        if let Some(details) = &self.details {
            write!(f, "\nDetails: {details}")?;
        }

        if let Some(suggestion) = &self.suggestion {
            write!(f, "\nSuggestion: {suggestion}")?;
        }

        Ok(())
    }
}

/// Convert any error into a user-facing [`ErrorContext`].
///
/// The outermost message names the failing step (the CLI wraps each step with
/// `anyhow::Context`); the rest of the chain becomes the details, and a known
/// [`UpdateError`] anywhere in the chain selects the suggestion.
#[must_use]
pub fn user_friendly_error(error: anyhow::Error) -> ErrorContext {
    let chain: Vec<String> = error.chain().skip(1).map(ToString::to_string).collect();
    let mut context = ErrorContext::new(error.to_string());
    if !chain.is_empty() {
        context = context.with_details(chain.join(": "));
    }

    let suggestion = error.chain().find_map(|cause| {
        cause.downcast_ref::<UpdateError>().map(suggestion_for)
    });
    match suggestion {
        Some(Some(text)) => context.with_suggestion(text),
        _ => context,
    }
}

fn suggestion_for(error: &UpdateError) -> Option<&'static str> {
    match error {
        UpdateError::NetworkError { .. } => {
            Some("Check your network connection; GitHub may also be rate limiting unauthenticated requests")
        }
        UpdateError::NoRelease { .. } => {
            Some("Try the other channel: set `upgrade.channel` to \"latest\" or \"stable\"")
        }
        UpdateError::NoMatchingAsset { .. } => {
            Some("This release has no prebuilt binary for your platform; build from source instead")
        }
        UpdateError::ChecksumManifestMissing { .. }
        | UpdateError::ChecksumFormatInvalid { .. }
        | UpdateError::ChecksumEntryMissing { .. } => {
            Some("The release is missing verification data; wait for a fixed release or report it upstream")
        }
        UpdateError::ChecksumMismatch { .. } => {
            Some("The download was corrupted or tampered with; nothing was installed. Retry later")
        }
        UpdateError::BinaryReplaceFailure { .. } => {
            Some("Check write permissions on the install directory, or reinstall manually")
        }
        UpdateError::VersionNotArchived { .. } | UpdateError::ArchivedBinaryMissing { .. } => {
            Some("Run `firecommit rollback --list` to see which versions can be restored")
        }
        UpdateError::ConfigError { .. } => Some("Fix or remove the configuration file"),
        UpdateError::ExtractionFailure { .. } => None,
    }
}
