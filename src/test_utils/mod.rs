//! Test utilities for firecommit
//!
//! Fixtures for release payloads, archives and checksum manifests, plus
//! once-only logging setup for tests.
//!
//! # Example
//!
//! ```rust,no_run
//! use firecommit::test_utils::{ArchiveEntry, checksum_manifest, tar_gz};
//!
//! let archive = tar_gz(&[ArchiveEntry::executable("firecommit", b"#!/bin/sh\n")]);
//! let manifest = checksum_manifest(&[("fire-commit_1.0.0_linux_amd64.tar.gz", &archive)]);
//! assert!(manifest.contains("linux_amd64"));
//! ```

pub mod fixtures;

pub use fixtures::{ArchiveEntry, ReleaseFixture, checksum_manifest, sha256_hex, tar_gz, zip};

use std::sync::Once;
use tracing::Level;
use tracing_subscriber::EnvFilter;

/// Global flag to ensure logging is only initialized once in tests
static INIT_LOGGING: Once = Once::new();

/// Initialize logging for tests.
///
/// Only the first call has an effect. Uses `level` if given, otherwise
/// `RUST_LOG`; with neither, tests stay silent.
///
/// ```bash
/// RUST_LOG=firecommit=debug cargo test
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
            .with_ansi(true)
            .try_init();
    });
}
