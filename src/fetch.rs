//! Archive fetching
//!
//! Downloads the remote archive into the task workspace. The body is streamed
//! to `archive.part` and renamed once complete, so a partially written file
//! never looks like a finished archive.

use crate::config::FetchConfig;
use crate::error::{Error, PipelineError, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Archive suffixes recognised in URL paths, longest first
const KNOWN_SUFFIXES: &[&str] = &[".tar.gz", ".tgz", ".zip", ".tar", ".7z", ".rar"];

/// Validate a caller-supplied archive URL
///
/// Only absolute `http`/`https` URLs with a host are accepted.
pub fn validate_url(raw: &str) -> Result<Url> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(Error::InvalidInput("url must not be empty".into()));
    }

    let url = Url::parse(trimmed)
        .map_err(|e| Error::InvalidInput(format!("malformed url '{}': {}", trimmed, e)))?;

    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::InvalidInput(format!(
                "unsupported url scheme '{}': expected http or https",
                other
            )));
        }
    }

    if url.host_str().map(str::is_empty).unwrap_or(true) {
        return Err(Error::InvalidInput(format!("url '{}' has no host", trimmed)));
    }

    Ok(url)
}

/// File name used for the fetched archive, keeping a known suffix from the URL
pub fn archive_file_name(url: &Url) -> String {
    let path = url.path().to_ascii_lowercase();
    KNOWN_SUFFIXES
        .iter()
        .find(|suffix| path.ends_with(*suffix))
        .map(|suffix| format!("archive{}", suffix))
        .unwrap_or_else(|| "archive".to_string())
}

/// HTTP fetcher for remote archives
#[derive(Clone, Debug)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout: Duration,
    max_bytes: u64,
}

impl Fetcher {
    /// Build a fetcher with the configured timeouts and size cap
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                Error::Io(std::io::Error::other(format!(
                    "Failed to create HTTP client: {}",
                    e
                )))
            })?;

        Ok(Self {
            client,
            timeout: config.timeout,
            max_bytes: config.max_archive_bytes,
        })
    }

    /// Download `url` into `workspace`, returning the archive path
    ///
    /// Observes `cancel` while waiting for the response and between chunks.
    pub async fn fetch(
        &self,
        url: &Url,
        workspace: &Path,
        cancel: &CancellationToken,
    ) -> Result<PathBuf> {
        let final_path = workspace.join(archive_file_name(url));
        let part_path = workspace.join("archive.part");

        tokio::fs::create_dir_all(workspace).await?;

        let send = self.client.get(url.clone()).send();
        let response = tokio::select! {
            _ = cancel.cancelled() => return Err(PipelineError::Cancelled.into()),
            response = send => response.map_err(|e| self.describe(url, e))?,
        };

        if !response.status().is_success() {
            return Err(fetch_failed(url, format!("HTTP {}", response.status())));
        }

        if let Some(len) = response.content_length() {
            if len > self.max_bytes {
                return Err(fetch_failed(
                    url,
                    format!(
                        "archive is {} bytes, limit is {} bytes",
                        len, self.max_bytes
                    ),
                ));
            }
        }

        let result = self.stream_body(url, response, &part_path, cancel).await;
        if let Err(e) = result {
            let _ = tokio::fs::remove_file(&part_path).await;
            return Err(e);
        }

        tokio::fs::rename(&part_path, &final_path).await?;
        tracing::debug!(url = %url, path = ?final_path, "archive fetched");
        Ok(final_path)
    }

    async fn stream_body(
        &self,
        url: &Url,
        mut response: reqwest::Response,
        part_path: &Path,
        cancel: &CancellationToken,
    ) -> Result<u64> {
        let mut file = tokio::fs::File::create(part_path).await?;
        let mut written: u64 = 0;

        loop {
            let chunk = tokio::select! {
                _ = cancel.cancelled() => return Err(PipelineError::Cancelled.into()),
                chunk = response.chunk() => chunk.map_err(|e| self.describe(url, e))?,
            };

            let Some(chunk) = chunk else {
                break;
            };

            written += chunk.len() as u64;
            if written > self.max_bytes {
                return Err(fetch_failed(
                    url,
                    format!("archive exceeds limit of {} bytes", self.max_bytes),
                ));
            }
            file.write_all(&chunk).await?;
        }

        file.flush().await?;
        Ok(written)
    }

    fn describe(&self, url: &Url, e: reqwest::Error) -> Error {
        let reason = if e.is_timeout() {
            format!("timed out after {:?}", self.timeout)
        } else if e.is_connect() {
            format!("connection failed: {}", e)
        } else {
            e.to_string()
        };
        fetch_failed(url, reason)
    }
}

fn fetch_failed(url: &Url, reason: String) -> Error {
    Error::Pipeline(PipelineError::FetchFailed {
        url: url.to_string(),
        reason,
    })
}
