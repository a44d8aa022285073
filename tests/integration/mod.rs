//! Integration test suite for firecommit
//!
//! End-to-end tests of the self-update subsystem against a mock release
//! provider (`wiremock`), plus command-line tests of the `firecommit` binary
//! (`assert_cmd`).
//!
//! # Running Integration Tests
//!
//! ```bash
//! cargo test --test integration
//! ```
//!
//! # Test Organization
//!
//! - **release_source**: Conditional fetches, ETag handling and the two-endpoint merge
//! - **background_check**: Check cycles with a persisted schedule
//! - **apply**: Download, verification, archive and replacement against a temporary executable
//! - **environment**: Path and endpoint overrides from environment variables
//! - **cli**: The `update`, `rollback` and `version` commands

mod common;

mod apply;
mod background_check;
mod cli;
mod environment;
