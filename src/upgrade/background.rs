//! One-shot background update check.
//!
//! [`BackgroundChecker::start`] spawns a single check cycle on the tokio
//! runtime and hands back a [`CheckHandle`]. The host keeps doing its real
//! work and calls [`CheckHandle::wait`] only when it wants the answer (before
//! or after its command, depending on configuration), or drops the handle to
//! ignore it. The cycle always terminates: metadata requests carry a short
//! timeout and are never retried within one run.

use chrono::{DateTime, Utc};
use colored::Colorize;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::channel::Channel;
use super::release::{FetchOutcome, ReleaseSource};
use super::schedule::CheckSchedule;
use super::version::has_newer_version;
use crate::constants::BINARY_NAME;

/// Outcome of one check cycle.
#[derive(Debug)]
pub struct CheckResult {
    pub current_version: String,
    /// Resolved newest version; empty when unknown.
    pub latest_version: String,
    pub has_update: bool,
    /// Set when the provider could not be reached or answered unexpectedly.
    pub error: Option<anyhow::Error>,
}

impl CheckResult {
    fn resolved(current: &str, latest: String, channel: Channel) -> Self {
        let has_update = has_newer_version(current, &latest, channel);
        Self {
            current_version: current.to_string(),
            latest_version: latest,
            has_update,
            error: None,
        }
    }

    fn failed(current: &str, error: anyhow::Error) -> Self {
        Self {
            current_version: current.to_string(),
            latest_version: String::new(),
            has_update: false,
            error: Some(error),
        }
    }

    /// Boxed "update available" notice, or `None` if there is nothing to say.
    #[must_use]
    pub fn notice(&self) -> Option<String> {
        if self.error.is_some() || !self.has_update {
            return None;
        }

        let plain = [
            format!("Update available: {} → {}", self.current_version, self.latest_version),
            format!("Run {BINARY_NAME} update to upgrade."),
        ];
        let styled = [
            format!(
                "Update available: {} → {}",
                self.current_version.cyan().bold(),
                self.latest_version.cyan().bold()
            ),
            format!("Run {} to upgrade.", format!("{BINARY_NAME} update").bright_cyan().bold()),
        ];

        let width = plain.iter().map(|l| l.chars().count()).max().unwrap_or(0);
        let border = "─".repeat(width + 2);
        let mut out = String::new();
        out.push('\n');
        out.push_str(&format!("{}\n", format!("╭{border}╮").blue()));
        for (plain_line, styled_line) in plain.iter().zip(&styled) {
            let pad = " ".repeat(width - plain_line.chars().count());
            out.push_str(&format!("{} {styled_line}{pad} {}\n", "│".blue(), "│".blue()));
        }
        out.push_str(&format!("{}\n", format!("╰{border}╯").blue()));
        Some(out)
    }
}

/// Handle to a running check. Consumed by [`wait`](Self::wait).
#[derive(Debug)]
pub struct CheckHandle {
    current_version: String,
    receiver: oneshot::Receiver<CheckResult>,
}

impl CheckHandle {
    /// Wait for the check to finish and take its result.
    pub async fn wait(self) -> CheckResult {
        match self.receiver.await {
            Ok(result) => result,
            Err(_) => CheckResult::failed(
                &self.current_version,
                anyhow::anyhow!("background update check did not complete"),
            ),
        }
    }
}

/// Runs check cycles against a [`ReleaseSource`], optionally through a
/// persisted [`CheckSchedule`].
///
/// Without a schedule ("uncached" mode) every cycle fetches unconditionally
/// and nothing is written to disk.
#[derive(Debug, Clone)]
pub struct BackgroundChecker {
    source: ReleaseSource,
    schedule: Option<CheckSchedule>,
}

impl BackgroundChecker {
    /// Checker using adaptive scheduling and conditional requests.
    pub fn new(source: ReleaseSource, schedule: CheckSchedule) -> Self {
        Self {
            source,
            schedule: Some(schedule),
        }
    }

    /// Checker that fetches on every cycle and keeps no state.
    pub fn uncached(source: ReleaseSource) -> Self {
        Self {
            source,
            schedule: None,
        }
    }

    /// Start a check cycle in the background.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use firecommit::upgrade::{BackgroundChecker, Channel, CheckSchedule, ReleaseSource};
    ///
    /// # async fn example() -> anyhow::Result<()> {
    /// let checker = BackgroundChecker::new(
    ///     ReleaseSource::github()?,
    ///     CheckSchedule::new("/tmp/firecommit/update-check.json"),
    /// );
    /// let handle = checker.start("v0.3.1", Channel::Stable);
    ///
    /// // ... run the actual command ...
    ///
    /// if let Some(notice) = handle.wait().await.notice() {
    ///     eprintln!("{notice}");
    /// }
    /// # Ok(())
    /// # }
    /// ```
    pub fn start(self, current_version: &str, channel: Channel) -> CheckHandle {
        let (sender, receiver) = oneshot::channel();
        let current = current_version.to_string();
        let task_current = current.clone();

        tokio::spawn(async move {
            let result = self.run_cycle(&task_current, channel, Utc::now()).await;
            // The host may have stopped listening; that is fine.
            let _ = sender.send(result);
        });

        CheckHandle {
            current_version: current,
            receiver,
        }
    }

    /// Run one check cycle as of `now`.
    pub async fn run_cycle(
        &self,
        current_version: &str,
        channel: Channel,
        now: DateTime<Utc>,
    ) -> CheckResult {
        let Some(schedule) = &self.schedule else {
            return match self.source.fetch_latest(channel).await {
                Ok(release) => CheckResult::resolved(
                    current_version,
                    release.effective_version().to_string(),
                    channel,
                ),
                Err(e) => CheckResult::failed(current_version, e),
            };
        };

        let mut record = schedule.load().await.channel(channel);

        if !record.should_check(now) {
            debug!("Skipping {} update check until {:?}", channel, record.next_check_at);
            return CheckResult::resolved(current_version, record.last_seen_version, channel);
        }

        let outcome = self
            .source
            .fetch_latest_conditional(channel, record.etag.as_deref())
            .await;

        let result = match outcome {
            Err(e) => {
                debug!("Update check failed: {:#}", e);
                record.record_fetch_error(channel, now);
                CheckResult::failed(current_version, e)
            }
            Ok(FetchOutcome::NotModified { etag }) => {
                if etag.is_some() {
                    record.etag = etag;
                }
                debug!("Release metadata unchanged for {}", channel);
                CheckResult::resolved(current_version, record.last_seen_version.clone(), channel)
            }
            Ok(FetchOutcome::Modified { release, etag }) => {
                if etag.is_some() {
                    record.etag = etag;
                }
                record.last_seen_version = release.effective_version().to_string();
                CheckResult::resolved(current_version, record.last_seen_version.clone(), channel)
            }
        };

        if result.error.is_none() {
            if result.has_update {
                record.record_has_update(now);
            } else {
                record.record_no_update(channel, now);
            }
        }

        if let Err(e) = schedule.store_channel(channel, record).await {
            warn!("Failed to save update-check state: {:#}", e);
        }

        result
    }
}
