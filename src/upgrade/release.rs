//! Release metadata from the hosting provider.
//!
//! The stable channel reads a single endpoint (`/releases/latest`, which by
//! provider convention never returns prereleases). The latest channel reads
//! two independent views, the stable feed and the fixed `dev` tag, and merges
//! them by publish time. Conditional requests are supported for both: the
//! stable channel caches the provider's `ETag` as-is, the latest channel
//! caches a [`CompositeETag`] carrying one validator per endpoint.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use reqwest::StatusCode;
use reqwest::header::{ACCEPT, ETAG, HeaderMap, HeaderValue, IF_NONE_MATCH};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::channel::Channel;
use crate::constants::{
    DEV_RELEASE_TAG, GITHUB_API_ROOT, METADATA_TIMEOUT, RELEASES_URL_ENV, REPO_NAME, REPO_OWNER,
};
use crate::core::UpdateError;

/// A published release as returned by the provider API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Release {
    /// Git tag; `dev` for every dev pre-release.
    pub tag_name: String,
    /// Display name; carries the dev build identifier for dev pre-releases.
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub prerelease: bool,
    /// Drafts are never installable.
    #[serde(default)]
    pub draft: bool,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub assets: Vec<Asset>,
}

impl Release {
    /// The version string this release installs.
    ///
    /// Dev pre-releases reuse the `dev` tag, so their unique identifier is
    /// the display name. Every other release is identified by its tag.
    #[must_use]
    pub fn effective_version(&self) -> &str {
        if self.prerelease && self.tag_name == DEV_RELEASE_TAG {
            if let Some(name) = self.name.as_deref().filter(|n| !n.is_empty()) {
                return name;
            }
        }
        &self.tag_name
    }
}

/// A downloadable file attached to a release.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Asset {
    pub name: String,
    pub browser_download_url: String,
}

/// Result of a conditional fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
    /// New metadata, with the validator to send next time.
    Modified {
        release: Release,
        etag: Option<String>,
    },
    /// Nothing changed since the validator that was sent.
    NotModified { etag: Option<String> },
}

/// Per-endpoint part of a [`CompositeETag`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointValidator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// The endpoint answered 404 (no release) last time.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub absent: bool,
}

/// Validator for the two-endpoint latest channel, stored as a compact JSON token.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompositeETag {
    #[serde(default)]
    pub stable: EndpointValidator,
    #[serde(default)]
    pub dev: EndpointValidator,
}

impl CompositeETag {
    /// Decode a stored token. Empty or unreadable tokens decode to "no validators".
    #[must_use]
    pub fn decode(token: Option<&str>) -> Self {
        match token.map(str::trim).filter(|t| !t.is_empty()) {
            Some(token) => serde_json::from_str(token).unwrap_or_else(|_| {
                debug!("Discarding unreadable composite ETag token");
                Self::default()
            }),
            None => Self::default(),
        }
    }

    #[must_use]
    pub fn encode(&self) -> String {
        // Serializing two optional strings and two bools cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

/// What a single endpoint returned.
#[derive(Debug)]
enum EndpointResponse {
    Found {
        release: Release,
        etag: Option<String>,
    },
    NotModified {
        etag: Option<String>,
    },
    NotFound,
}

impl EndpointResponse {
    /// An endpoint is unchanged if it answered 304, or if it has no release
    /// now and had none before.
    fn is_unchanged(&self, prior: &EndpointValidator) -> bool {
        match self {
            Self::NotModified { .. } => true,
            Self::NotFound => prior.absent,
            Self::Found { .. } => false,
        }
    }

    fn validator(&self, prior: &EndpointValidator) -> EndpointValidator {
        match self {
            Self::Found { etag, .. } => EndpointValidator {
                etag: etag.clone(),
                absent: false,
            },
            Self::NotModified { etag } => EndpointValidator {
                etag: etag.clone().or_else(|| prior.etag.clone()),
                absent: false,
            },
            Self::NotFound => EndpointValidator {
                etag: None,
                absent: true,
            },
        }
    }

    fn into_release(self) -> Option<Release> {
        match self {
            Self::Found { release, .. } => Some(release),
            _ => None,
        }
    }
}

/// Client for the provider's release API.
///
/// # Examples
///
/// ```rust,no_run
/// use firecommit::upgrade::{Channel, release::ReleaseSource};
///
/// # async fn example() -> anyhow::Result<()> {
/// let source = ReleaseSource::github()?;
/// let release = source.fetch_latest(Channel::Stable).await?;
/// println!("latest stable: {}", release.effective_version());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ReleaseSource {
    client: reqwest::Client,
    api_base: String,
}

impl ReleaseSource {
    /// Source for the official firecommit repository.
    pub fn github() -> Result<Self> {
        Self::with_base_url(format!("{GITHUB_API_ROOT}/repos/{REPO_OWNER}/{REPO_NAME}"))
    }

    /// `FIRECOMMIT_RELEASES_URL` when set, otherwise [`github`](Self::github).
    pub fn from_env() -> Result<Self> {
        match std::env::var(RELEASES_URL_ENV) {
            Ok(url) if !url.is_empty() => Self::with_base_url(url),
            _ => Self::github(),
        }
    }

    /// Source rooted at an arbitrary repository API URL (used by tests).
    pub fn with_base_url(api_base: impl Into<String>) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/vnd.github.v3+json"));

        let client = reqwest::Client::builder()
            .user_agent(concat!("firecommit/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .timeout(METADATA_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
        })
    }

    #[must_use]
    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// Fetch the newest installable release on `channel`, unconditionally.
    pub async fn fetch_latest(&self, channel: Channel) -> Result<Release> {
        match self.fetch_latest_conditional(channel, None).await? {
            FetchOutcome::Modified { release, .. } => Ok(release),
            FetchOutcome::NotModified { .. } => Err(UpdateError::network(
                "fetch latest release",
                "provider answered 304 to an unconditional request",
            )
            .into()),
        }
    }

    /// Fetch the newest installable release on `channel`, revalidating `etag`.
    ///
    /// For [`Channel::Latest`] the `etag` is a [`CompositeETag`] token and the
    /// returned validator is one too.
    pub async fn fetch_latest_conditional(
        &self,
        channel: Channel,
        etag: Option<&str>,
    ) -> Result<FetchOutcome> {
        match channel {
            Channel::Stable => self.fetch_stable(etag).await,
            Channel::Latest => self.fetch_merged(etag).await,
        }
    }

    async fn fetch_stable(&self, etag: Option<&str>) -> Result<FetchOutcome> {
        match self.get_endpoint("/releases/latest", etag).await? {
            EndpointResponse::Found { release, etag } if !release.draft && !release.prerelease => {
                Ok(FetchOutcome::Modified { release, etag })
            }
            EndpointResponse::NotModified { etag: new_etag } => Ok(FetchOutcome::NotModified {
                etag: new_etag.or_else(|| etag.map(str::to_string)),
            }),
            _ => Err(UpdateError::NoRelease {
                channel: Channel::Stable.to_string(),
            }
            .into()),
        }
    }

    async fn fetch_merged(&self, token: Option<&str>) -> Result<FetchOutcome> {
        let prior = CompositeETag::decode(token);
        let dev_path = format!("/releases/tags/{DEV_RELEASE_TAG}");

        let mut stable = self.get_endpoint("/releases/latest", prior.stable.etag.as_deref()).await?;
        let mut dev = self.get_endpoint(&dev_path, prior.dev.etag.as_deref()).await?;

        let stable_unchanged = stable.is_unchanged(&prior.stable);
        let dev_unchanged = dev.is_unchanged(&prior.dev);

        if stable_unchanged && dev_unchanged {
            let next = CompositeETag {
                stable: stable.validator(&prior.stable),
                dev: dev.validator(&prior.dev),
            };
            debug!("Both release endpoints unchanged");
            return Ok(FetchOutcome::NotModified {
                etag: Some(next.encode()),
            });
        }

        // One side changed; the 304 side carries no body, so fetch it in full
        // to have comparable publish times.
        if matches!(stable, EndpointResponse::NotModified { .. }) {
            debug!("Re-fetching unchanged stable endpoint");
            stable = self.get_endpoint("/releases/latest", None).await?;
        }
        if matches!(dev, EndpointResponse::NotModified { .. }) {
            debug!("Re-fetching unchanged dev endpoint");
            dev = self.get_endpoint(&dev_path, None).await?;
        }

        let next = CompositeETag {
            stable: stable.validator(&prior.stable),
            dev: dev.validator(&prior.dev),
        };

        let candidates = [stable.into_release(), dev.into_release()];
        let release = select_newest(candidates.into_iter().flatten()).ok_or_else(|| {
            UpdateError::NoRelease {
                channel: Channel::Latest.to_string(),
            }
        })?;

        Ok(FetchOutcome::Modified {
            release,
            etag: Some(next.encode()),
        })
    }

    async fn get_endpoint(&self, path: &str, etag: Option<&str>) -> Result<EndpointResponse> {
        let url = format!("{}{path}", self.api_base);
        debug!("GET {} (validator: {})", url, etag.is_some());

        let mut request = self.client.get(&url);
        if let Some(etag) = etag.filter(|e| !e.is_empty()) {
            request = request.header(IF_NONE_MATCH, etag);
        }

        let response = request
            .send()
            .await
            .map_err(|e| UpdateError::network(format!("fetch {path}"), e))?;

        let etag = response
            .headers()
            .get(ETAG)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);

        match response.status() {
            StatusCode::NOT_MODIFIED => Ok(EndpointResponse::NotModified { etag }),
            StatusCode::NOT_FOUND => Ok(EndpointResponse::NotFound),
            StatusCode::OK => {
                let release: Release = response
                    .json()
                    .await
                    .map_err(|e| UpdateError::network(format!("decode {path}"), e))?;
                if release.draft {
                    debug!("Ignoring draft release {}", release.tag_name);
                    return Ok(EndpointResponse::NotFound);
                }
                Ok(EndpointResponse::Found { release, etag })
            }
            status => Err(UpdateError::network(
                format!("fetch {path}"),
                format!("provider API returned HTTP {status}"),
            )
            .into()),
        }
    }
}

/// Pick the most recently published non-draft release.
///
/// A release without a publish time loses to one that has it; ties keep the
/// earlier candidate.
pub fn select_newest(releases: impl IntoIterator<Item = Release>) -> Option<Release> {
    let mut newest: Option<Release> = None;
    for release in releases.into_iter().filter(|r| !r.draft) {
        let replace = match &newest {
            None => true,
            Some(current) => match (current.published_at, release.published_at) {
                (None, Some(_)) => true,
                (Some(current), Some(candidate)) => candidate > current,
                _ => false,
            },
        };
        if replace {
            newest = Some(release);
        }
    }
    newest
}
