//! Adaptive polling schedule for background update checks.
//!
//! Each channel keeps a small record in `update-check.json`: the cached
//! validator, the last version seen, how many checks in a row found nothing
//! new, and when the next check is allowed. While nothing changes the
//! interval doubles from a per-channel base up to a per-channel cap; seeing
//! an update or hitting an error switches to a short fixed interval.
//!
//! ```text
//! latest: 15m → 30m → 1h → 2h → ... → 12h (cap)
//! stable:  2h → 4h  → 8h → 16h → 24h (cap)
//! ```
//!
//! A missing or unreadable state file is empty state, never an error.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use super::channel::Channel;
use super::lock::StateLock;
use crate::constants::{
    HAS_UPDATE_INTERVAL_MINUTES, LATEST_BASE_INTERVAL_MINUTES, LATEST_ERROR_RETRY_MINUTES,
    LATEST_MAX_INTERVAL_MINUTES, MAX_BACKOFF_EXPONENT, STABLE_BASE_INTERVAL_MINUTES,
    STABLE_ERROR_RETRY_MINUTES, STABLE_MAX_INTERVAL_MINUTES,
};
use crate::utils::fs::atomic_write;

/// Persisted polling state for one channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelCheckState {
    /// Validator from the last successful fetch (composite on the latest channel).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Version resolved by the last successful fetch; empty if never fetched.
    pub last_seen_version: String,
    pub consecutive_no_update: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_check_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_checked_at: Option<DateTime<Utc>>,
}

impl ChannelCheckState {
    /// Whether a network check is allowed at `now`.
    #[must_use]
    pub fn should_check(&self, now: DateTime<Utc>) -> bool {
        self.next_check_at.is_none_or(|next| now >= next)
    }

    /// A check found nothing newer: back off further.
    pub fn record_no_update(&mut self, channel: Channel, now: DateTime<Utc>) {
        self.consecutive_no_update = self.consecutive_no_update.saturating_add(1);
        self.next_check_at = Some(now + no_update_interval(channel, self.consecutive_no_update));
        self.last_checked_at = Some(now);
    }

    /// A check found an update: reconfirm soon.
    pub fn record_has_update(&mut self, now: DateTime<Utc>) {
        self.consecutive_no_update = 0;
        self.next_check_at = Some(now + Duration::minutes(HAS_UPDATE_INTERVAL_MINUTES));
        self.last_checked_at = Some(now);
    }

    /// A check failed: retry after a short fixed delay, keeping the backoff counter.
    pub fn record_fetch_error(&mut self, channel: Channel, now: DateTime<Utc>) {
        let minutes = match channel {
            Channel::Latest => LATEST_ERROR_RETRY_MINUTES,
            Channel::Stable => STABLE_ERROR_RETRY_MINUTES,
        };
        self.next_check_at = Some(now + Duration::minutes(minutes));
        self.last_checked_at = Some(now);
    }
}

/// Interval after the `consecutive`-th check in a row that found nothing new.
///
/// `base * 2^(consecutive - 1)`, capped per channel. The exponent itself is
/// capped so the multiplication cannot overflow.
#[must_use]
pub fn no_update_interval(channel: Channel, consecutive: u32) -> Duration {
    let (base, max) = match channel {
        Channel::Latest => (LATEST_BASE_INTERVAL_MINUTES, LATEST_MAX_INTERVAL_MINUTES),
        Channel::Stable => (STABLE_BASE_INTERVAL_MINUTES, STABLE_MAX_INTERVAL_MINUTES),
    };
    let exponent = consecutive.saturating_sub(1).min(MAX_BACKOFF_EXPONENT);
    let minutes = base.saturating_mul(1_i64 << exponent).min(max);
    Duration::minutes(minutes)
}

/// The whole state document, one record per channel.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckState {
    pub channels: BTreeMap<String, ChannelCheckState>,
}

impl CheckState {
    /// Record for `channel`, or a fresh one if it has never been checked.
    #[must_use]
    pub fn channel(&self, channel: Channel) -> ChannelCheckState {
        self.channels.get(channel.as_str()).cloned().unwrap_or_default()
    }

    pub fn channel_mut(&mut self, channel: Channel) -> &mut ChannelCheckState {
        self.channels.entry(channel.as_str().to_string()).or_default()
    }
}

/// On-disk home of the [`CheckState`] document.
#[derive(Debug, Clone)]
pub struct CheckSchedule {
    path: PathBuf,
}

impl CheckSchedule {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the state document. Missing or corrupt files yield empty state.
    pub async fn load(&self) -> CheckState {
        let content = match tokio::fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No update-check state at {}", self.path.display());
                return CheckState::default();
            }
            Err(e) => {
                warn!("Failed to read update-check state {}: {}", self.path.display(), e);
                return CheckState::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            warn!("Ignoring corrupt update-check state {}: {}", self.path.display(), e);
            CheckState::default()
        })
    }

    /// Write the whole document atomically.
    pub async fn save(&self, state: &CheckState) -> Result<()> {
        let _lock = StateLock::acquire(&self.path).await?;
        self.write(state)
    }

    /// Replace the record for `channel`, preserving other channels' records as
    /// they are on disk now.
    pub async fn store_channel(&self, channel: Channel, record: ChannelCheckState) -> Result<()> {
        let _lock = StateLock::acquire(&self.path).await?;
        let mut state = self.load().await;
        *state.channel_mut(channel) = record;
        self.write(&state)
    }

    fn write(&self, state: &CheckState) -> Result<()> {
        let json = serde_json::to_string_pretty(state)
            .context("Failed to serialize update-check state")?;
        atomic_write(&self.path, json.as_bytes())
            .with_context(|| format!("Failed to write update-check state {}", self.path.display()))
    }
}
