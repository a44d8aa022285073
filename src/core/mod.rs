//! Core types shared by every firecommit module.
//!
//! Currently this is the error taxonomy of the self-update subsystem:
//! - **Strongly-typed errors** ([`UpdateError`]) that name the failing step
//! - **User-friendly contexts** ([`ErrorContext`]) with actionable suggestions
//!   for the CLI, built by [`user_friendly_error`]

pub mod error;

pub use error::{ErrorContext, UpdateError, user_friendly_error};
