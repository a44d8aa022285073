//! Asset downloads into private temporary files.

use anyhow::{Context, Result};
use indicatif::ProgressBar;
use reqwest::StatusCode;
use std::path::Path;
use tempfile::NamedTempFile;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::constants::DOWNLOAD_TIMEOUT;
use crate::core::UpdateError;

/// HTTP client for release asset downloads.
#[derive(Debug, Clone)]
pub struct Downloader {
    client: reqwest::Client,
}

impl Downloader {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("firecommit/", env!("CARGO_PKG_VERSION")))
            .timeout(DOWNLOAD_TIMEOUT)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client })
    }

    /// Download `url` into a new temporary file inside `dir`.
    ///
    /// The file is deleted when the returned handle is dropped. Any status
    /// other than 200 is a [`UpdateError::NetworkError`]. When `progress` is
    /// given it is sized from `Content-Length` and advanced per chunk.
    pub async fn download_to_temp(
        &self,
        url: &str,
        dir: &Path,
        progress: Option<&ProgressBar>,
    ) -> Result<NamedTempFile> {
        info!("Downloading {}", url);

        let mut response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpdateError::network(format!("download {url}"), e))?;

        if response.status() != StatusCode::OK {
            return Err(UpdateError::network(
                format!("download {url}"),
                format!("HTTP {}", response.status()),
            )
            .into());
        }

        if let (Some(pb), Some(len)) = (progress, response.content_length()) {
            pb.set_length(len);
        }

        let temp = tempfile::Builder::new()
            .prefix("firecommit-download-")
            .tempfile_in(dir)
            .context("Failed to create temporary download file")?;
        let mut file = tokio::fs::File::from_std(
            temp.reopen().context("Failed to open temporary download file")?,
        );

        let mut written: u64 = 0;
        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| UpdateError::network(format!("download {url}"), e))?
        {
            file.write_all(&chunk).await.context("Failed to write download")?;
            written += chunk.len() as u64;
            if let Some(pb) = progress {
                pb.inc(chunk.len() as u64);
            }
        }
        file.flush().await.context("Failed to flush download")?;
        file.sync_all().await.context("Failed to sync download")?;

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }
        debug!("Downloaded {} bytes to {}", written, temp.path().display());
        Ok(temp)
    }

    /// Download a small text asset such as the checksum manifest.
    pub async fn download_text(&self, url: &str) -> Result<String> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| UpdateError::network(format!("download {url}"), e))?;

        if response.status() != StatusCode::OK {
            return Err(UpdateError::network(
                format!("download {url}"),
                format!("HTTP {}", response.status()),
            )
            .into());
        }

        Ok(response
            .text()
            .await
            .map_err(|e| UpdateError::network(format!("read {url}"), e))?)
    }
}
