//! Global constants used throughout the firecommit codebase.
//!
//! Timeouts, polling intervals, release-provider coordinates and file names
//! that more than one module depends on live here so the numbers stay
//! discoverable.

use std::time::Duration;

/// GitHub owner of the release repository.
pub const REPO_OWNER: &str = "lieyanc";

/// GitHub repository that publishes firecommit releases.
pub const REPO_NAME: &str = "fire-commit";

/// Root of the provider's REST API.
pub const GITHUB_API_ROOT: &str = "https://api.github.com";

/// Environment variable replacing the repository API URL (mirrors and tests).
pub const RELEASES_URL_ENV: &str = "FIRECOMMIT_RELEASES_URL";

/// Name of the main executable (without platform suffix).
pub const BINARY_NAME: &str = "firecommit";

/// Secondary entry points installed next to the main binary.
pub const ALIAS_NAMES: &[&str] = &["fcmt", "git-fire-commit"];

/// Tag reused by every continuously rebuilt dev pre-release.
pub const DEV_RELEASE_TAG: &str = "dev";

/// Asset name of the SHA-256 manifest published alongside every release.
pub const CHECKSUMS_ASSET_NAME: &str = "checksums.txt";

/// Timeout for release metadata requests (5 seconds).
///
/// The background check runs next to the user's command; it must give up
/// quickly when the network is slow.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(5);

/// Timeout for asset and manifest downloads (60 seconds).
pub const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(60);

/// Number of archived binaries kept after a successful update.
pub const DEFAULT_KEEP_VERSIONS: usize = 5;

/// Base no-update interval on the latest channel, in minutes.
pub const LATEST_BASE_INTERVAL_MINUTES: i64 = 15;

/// Maximum no-update interval on the latest channel, in minutes (12 hours).
pub const LATEST_MAX_INTERVAL_MINUTES: i64 = 12 * 60;

/// Base no-update interval on the stable channel, in minutes (2 hours).
pub const STABLE_BASE_INTERVAL_MINUTES: i64 = 2 * 60;

/// Maximum no-update interval on the stable channel, in minutes (24 hours).
pub const STABLE_MAX_INTERVAL_MINUTES: i64 = 24 * 60;

/// Re-check interval while an update is pending, in minutes.
pub const HAS_UPDATE_INTERVAL_MINUTES: i64 = 15;

/// Retry interval after a failed fetch on the latest channel, in minutes.
pub const LATEST_ERROR_RETRY_MINUTES: i64 = 15;

/// Retry interval after a failed fetch on the stable channel, in minutes.
pub const STABLE_ERROR_RETRY_MINUTES: i64 = 60;

/// Upper bound on the backoff exponent so doubling never overflows.
pub const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Poll delay used by the deferred replace helper while the binary is locked.
pub const DEFERRED_POLL_SECONDS: u32 = 1;
