//! Self-update functionality for firecommit.
//!
//! This module discovers newer firecommit builds, downloads and verifies them,
//! replaces the running executable and keeps a bounded history of replaced
//! binaries for rollback.
//!
//! # Architecture Overview
//!
//! Components, leaves first:
//!
//! - [`version`]: pure comparison of semantic versions and dev build identifiers
//! - [`release`]: release metadata from GitHub with conditional (ETag) requests,
//!   merging the stable and dev streams for the `latest` channel
//! - [`schedule`]: persisted per-channel adaptive polling state
//! - [`background`]: one check cycle on a background task with a one-shot result
//! - [`asset`], [`download`], [`extract`]: platform asset selection, download
//!   and single-binary extraction
//! - [`verification`]: SHA-256 checks against the release's `checksums.txt`
//! - [`replace`]: immediate or deferred replacement of the executable
//! - [`archive`]: the version archive used by `firecommit rollback`
//! - [`self_updater`]: the apply sequence tying everything together
//!
//! ## Update Process Flow
//!
//! ```text
//! 1. Background check (every invocation, unless due later)
//!    ├── Load schedule state for the channel
//!    ├── Conditional GET(s) against the provider
//!    └── Persist backoff, ETag and last-seen version
//!
//! 2. Apply (auto-update or `firecommit update`)
//!    ├── Select, download and verify the platform asset
//!    ├── Extract the binary
//!    ├── Archive the current binary (best-effort)
//!    ├── Replace the executable
//!    └── Prune the archive (best-effort)
//! ```
//!
//! # Channels
//!
//! - `stable`: tagged releases only (`GET /releases/latest`)
//! - `latest`: the more recently published of the stable release and the
//!   continuously rebuilt `dev` pre-release
//!
//! # Safety Mechanisms
//!
//! - Nothing is installed without a matching SHA-256 entry in the release's manifest
//! - Every failure before the replace step leaves the installed binary untouched
//! - The immediate strategy renames the old binary aside and restores it if the copy fails
//! - Schedule and archive writes are atomic and serialized with an advisory lock

pub mod archive;
pub mod asset;
pub mod background;
pub mod channel;
/// Configuration structures for upgrade behavior.
pub mod config;
pub mod download;
pub mod extract;
pub mod lock;
pub mod release;
pub mod replace;
pub mod schedule;
/// Core self-update implementation.
pub mod self_updater;
/// Download verification and integrity checking.
pub mod verification;
pub mod version;

pub use archive::{VersionArchive, VersionEntry};
pub use background::{BackgroundChecker, CheckHandle, CheckResult};
pub use channel::Channel;
pub use config::{AutoUpdateMode, UpdatePaths, UpdateTiming, UpgradeConfig};
pub use release::{Release, ReleaseSource};
pub use schedule::CheckSchedule;
pub use self_updater::{SelfUpdater, UpdateOutcome};
pub use verification::ChecksumVerifier;
