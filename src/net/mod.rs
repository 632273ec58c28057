//! # Network Access
//!
//! Every outbound request goes through a [`Fetcher`]. The HTTP implementation
//! applies a per-request timeout so a hanging endpoint fails one row instead
//! of stalling a whole batch.

pub mod proxy;

pub use proxy::{CorsProxy, ImageProxy, ImageRewrite};

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use crate::PlacardError;

/// Default per-request timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

const USER_AGENT: &str = concat!("placard/", env!("CARGO_PKG_VERSION"));

/// Source of raw bytes for a URL.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PlacardError>;
}

/// Fetches `http(s)://` URLs with reqwest.
///
/// Local sources (plain paths or `file://`) are refused unless a local root
/// is set, and then only files inside that root are readable.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout: Duration,
    local_root: Option<PathBuf>,
}

impl HttpFetcher {
    /// Build a fetcher with the given per-request timeout.
    pub fn new(timeout: Duration) -> Result<Self, PlacardError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| PlacardError::Config(format!("HTTP client error: {}", e)))?;
        Ok(Self {
            client,
            timeout,
            local_root: None,
        })
    }

    /// Allow local sources, resolved relative to `root`.
    pub fn with_local_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.local_root = Some(root.into());
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn local_root(&self) -> Option<&Path> {
        self.local_root.as_deref()
    }

    /// Map a local source onto a file inside the local root.
    async fn local_path(&self, src: &str) -> Result<PathBuf, PlacardError> {
        let Some(root) = &self.local_root else {
            return Err(PlacardError::Fetch(format!(
                "local source {} refused: only http(s) URLs are allowed",
                src
            )));
        };

        let relative = Path::new(src.strip_prefix("file://").unwrap_or(src));
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(PlacardError::Fetch(format!(
                "local source {} refused: parent directory references",
                src
            )));
        }

        let root = tokio::fs::canonicalize(root)
            .await
            .map_err(|e| PlacardError::Fetch(format!("local root {}: {}", root.display(), e)))?;
        // `join` keeps absolute paths as-is; the prefix check below catches those.
        let resolved = tokio::fs::canonicalize(root.join(relative))
            .await
            .map_err(|e| PlacardError::Fetch(format!("Failed to read {}: {}", src, e)))?;
        if !resolved.starts_with(&root) {
            return Err(PlacardError::Fetch(format!(
                "local source {} refused: outside {}",
                src,
                root.display()
            )));
        }
        Ok(resolved)
    }
}

fn is_remote(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, PlacardError> {
        if !is_remote(url) {
            let path = self.local_path(url).await?;
            return tokio::fs::read(&path).await.map_err(|e| {
                PlacardError::Fetch(format!("Failed to read {}: {}", path.display(), e))
            });
        }

        tracing::debug!(url, "fetching");
        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                PlacardError::Fetch(format!(
                    "Timed out after {:?} downloading {}",
                    self.timeout, url
                ))
            } else {
                PlacardError::Fetch(format!("Failed to download {}: {}", url, e))
            }
        })?;
        if !response.status().is_success() {
            return Err(PlacardError::Fetch(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }
        let bytes = response
            .bytes()
            .await
            .map_err(|e| PlacardError::Fetch(format!("Failed to read response body: {}", e)))?;
        Ok(bytes.to_vec())
    }
}
