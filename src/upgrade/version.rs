//! Version identifiers and the "is there something newer" decision.
//!
//! firecommit ships two kinds of version strings:
//!
//! - **Semantic versions** for tagged releases, e.g. `v1.2.3` or `v1.3.0-rc1`.
//! - **Dev builds** produced by CI for every push, e.g. `dev-42-20260215-abc1234`.
//!   Older builds used `dev-<date>-<build>-<hash>` and, before that,
//!   `dev-<date>-<hash>`; all three layouts are still understood. A local,
//!   unversioned build reports the bare marker `dev`.
//!
//! Everything here is pure and total: any pair of strings yields an answer.
//! When a version string cannot be understood the comparison errs towards
//! updating, so an install with a corrupt version recovers to a published one.

use std::cmp::Ordering;

use super::channel::Channel;

/// Version reported by builds that were not produced by the release pipeline.
pub const LOCAL_DEV_MARKER: &str = "dev";

/// Identity of a CI dev build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevBuild {
    /// Build date as eight digits (`YYYYMMDD`).
    pub date: String,
    /// CI build counter; `0` for the legacy layout that carried none.
    pub build: u64,
}

/// Returns `true` for the local marker `dev` and for any `dev-*` identifier.
#[must_use]
pub fn is_dev_build(version: &str) -> bool {
    version == LOCAL_DEV_MARKER || version.starts_with("dev-")
}

/// Parse a dev build identifier.
///
/// Accepted layouts, tried in order:
///
/// 1. `dev-<build>-<date>-<hash>` (current)
/// 2. `dev-<date>-<build>-<hash>` (previous)
/// 3. `dev-<date>-<hash>` (legacy, build `0`)
///
/// The date must be exactly eight ASCII digits and the build number all
/// digits. Returns `None` for the bare `dev` marker and for anything else.
///
/// # Examples
///
/// ```rust
/// use firecommit::upgrade::version::parse_dev_build;
///
/// let build = parse_dev_build("dev-42-20260215-abc1234").unwrap();
/// assert_eq!(build.build, 42);
/// assert_eq!(build.date, "20260215");
///
/// assert!(parse_dev_build("dev").is_none());
/// assert!(parse_dev_build("v1.2.3").is_none());
/// ```
#[must_use]
pub fn parse_dev_build(version: &str) -> Option<DevBuild> {
    if version == LOCAL_DEV_MARKER || !is_dev_build(version) {
        return None;
    }

    let parts: Vec<&str> = version.split('-').collect();
    if parts.len() < 3 {
        return None;
    }

    if parts.len() >= 4 && is_digits(parts[1]) && is_date_token(parts[2]) {
        return Some(DevBuild {
            date: parts[2].to_string(),
            build: parts[1].parse().ok()?,
        });
    }

    if parts.len() >= 4 && is_date_token(parts[1]) && is_digits(parts[2]) {
        return Some(DevBuild {
            date: parts[1].to_string(),
            build: parts[2].parse().ok()?,
        });
    }

    if is_date_token(parts[1]) {
        return Some(DevBuild {
            date: parts[1].to_string(),
            build: 0,
        });
    }

    None
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn is_date_token(s: &str) -> bool {
    s.len() == 8 && is_digits(s)
}

/// Parse `major.minor.patch`, with an optional leading `v`.
///
/// Exactly three dot-separated components are required. A `-suffix` on a
/// component (e.g. `3-rc1`) is discarded before parsing.
#[must_use]
pub fn parse_semver(version: &str) -> Option<(u64, u64, u64)> {
    let version = version.strip_prefix('v').unwrap_or(version);
    let mut numbers = [0u64; 3];
    let mut parts = version.splitn(3, '.');

    for slot in &mut numbers {
        let part = parts.next()?;
        let numeric = part.split_once('-').map_or(part, |(head, _)| head);
        if !is_digits(numeric) {
            return None;
        }
        *slot = numeric.parse().ok()?;
    }

    Some((numbers[0], numbers[1], numbers[2]))
}

/// Whether `latest` is a strictly greater semantic version than `current`.
///
/// Returns `false` if either side fails to parse.
#[must_use]
pub fn compare_semver(current: &str, latest: &str) -> bool {
    match (parse_semver(current), parse_semver(latest)) {
        (Some(cur), Some(lat)) => lat > cur,
        _ => false,
    }
}

/// Semver comparison that also upgrades away from an unparsable current version.
fn compare_semver_with_recovery(current: &str, latest: &str) -> bool {
    if compare_semver(current, latest) {
        return true;
    }
    parse_semver(current).is_none() && parse_semver(latest).is_some()
}

/// Decide whether `latest` should replace `current` on `channel`.
///
/// - An empty `latest` (unknown) or identical strings never update.
/// - The local `dev` marker always updates.
/// - On [`Channel::Stable`], a dev build moving to a tagged release updates;
///   otherwise semantic versions are compared.
/// - On [`Channel::Latest`], two dev builds compare by build number and then
///   by date. A switch between the dev and stable streams always updates.
///
/// Whenever one side cannot be parsed, the parseable side wins; when neither
/// can, the answer is "update".
///
/// # Examples
///
/// ```rust
/// use firecommit::upgrade::{Channel, version::has_newer_version};
///
/// assert!(has_newer_version("dev-10-20260215-aaaaaaa", "dev-11-20260215-bbbbbbb", Channel::Latest));
/// assert!(!has_newer_version("v1.2.3", "v1.2.3", Channel::Stable));
/// assert!(has_newer_version("dev", "v0.1.0", Channel::Stable));
/// ```
#[must_use]
pub fn has_newer_version(current: &str, latest: &str, channel: Channel) -> bool {
    if latest.is_empty() || current == latest {
        return false;
    }
    if current == LOCAL_DEV_MARKER {
        return true;
    }

    let current_is_dev = is_dev_build(current);
    let latest_is_dev = is_dev_build(latest);

    match channel {
        Channel::Stable => {
            if current_is_dev && !latest_is_dev {
                return true;
            }
            compare_semver_with_recovery(current, latest)
        }
        Channel::Latest if current_is_dev && latest_is_dev => {
            match (parse_dev_build(current), parse_dev_build(latest)) {
                (Some(cur), Some(lat)) => match lat.build.cmp(&cur.build) {
                    Ordering::Equal => lat.date > cur.date,
                    ordering => ordering == Ordering::Greater,
                },
                (None, Some(_)) => true,
                (Some(_), None) => false,
                (None, None) => true,
            }
        }
        Channel::Latest if current_is_dev != latest_is_dev => true,
        Channel::Latest => compare_semver_with_recovery(current, latest),
    }
}
