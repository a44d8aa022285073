//! firecommit - AI-assisted git commits
//!
//! This crate holds firecommit's self-update subsystem: discovering newer
//! builds on GitHub, downloading and verifying them, replacing the running
//! executable and rolling back to previously installed builds.
//!
//! # Architecture Overview
//!
//! firecommit publishes two release streams:
//! - tagged semantic-version releases (`v1.2.3`), the `stable` channel
//! - a continuously rebuilt pre-release under the fixed tag `dev`, whose
//!   display name carries the build (`dev-42-20260215-abc1234`)
//!
//! The `latest` channel follows whichever of the two was published more
//! recently. A background check runs next to every ordinary command, polling
//! with adaptive backoff and conditional requests so most invocations make no
//! network call at all.
//!
//! # Core Modules
//!
//! - [`upgrade`] - Release discovery, verification, replacement and rollback
//! - [`cli`] - `update`, `rollback` and `version` commands plus the background check
//! - [`config`] - Global configuration (`[upgrade]` table)
//! - [`core`] - Error types and user-facing error formatting
//! - [`constants`] - Timeouts, intervals and release coordinates
//! - [`utils`] - Filesystem and platform helpers
//!
//! # Example
//!
//! ```rust,no_run
//! use firecommit::upgrade::{BackgroundChecker, Channel, ReleaseSource, UpdatePaths};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let paths = UpdatePaths::from_env()?;
//! let checker = BackgroundChecker::new(ReleaseSource::github()?, paths.schedule());
//! let handle = checker.start(firecommit::BUILD_VERSION, Channel::Latest);
//!
//! // ... do the real work ...
//!
//! if let Some(notice) = handle.wait().await.notice() {
//!     eprint!("{notice}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod cli;
pub mod config;
pub mod constants;
pub mod core;
pub mod upgrade;
pub mod utils;

// test_utils module is available for both unit tests and integration tests
#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

/// Version of this build.
///
/// Release builds set `FIRECOMMIT_VERSION` at compile time (`v1.2.3` or
/// `dev-42-20260215-abc1234`); other builds report `v<crate version>`.
pub const BUILD_VERSION: &str = match option_env!("FIRECOMMIT_VERSION") {
    Some(version) => version,
    None => concat!("v", env!("CARGO_PKG_VERSION")),
};
