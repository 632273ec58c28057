//! Image asset loading for a filled page.
//!
//! Every image element with a source is fetched and decoded concurrently,
//! each under its own timeout. A slow or broken asset never fails the page:
//! it is recorded as [`AssetState::Failed`] or [`AssetState::TimedOut`] and
//! the rasterizer leaves that box empty.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use image::DynamicImage;
use lru::LruCache;
use tokio::sync::Mutex;

use crate::PlacardError;
use crate::net::Fetcher;
use crate::template::Page;

/// Default per-asset wait.
pub const DEFAULT_ASSET_TIMEOUT: Duration = Duration::from_millis(5000);

/// Default number of decoded images kept by a loader.
pub const DEFAULT_CACHE_ENTRIES: usize = 64;

/// Load outcome of one image element.
#[derive(Debug, Clone)]
pub enum AssetState {
    Ready(Arc<DynamicImage>),
    Failed(String),
    TimedOut,
}

impl AssetState {
    pub fn image(&self) -> Option<&DynamicImage> {
        match self {
            AssetState::Ready(img) => Some(img),
            _ => None,
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, AssetState::Ready(_))
    }
}

/// Loaded assets of one page, keyed by element id.
#[derive(Debug, Clone, Default)]
pub struct PageAssets {
    states: HashMap<String, AssetState>,
}

impl PageAssets {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element_id: impl Into<String>, state: AssetState) {
        self.states.insert(element_id.into(), state);
    }

    pub fn get(&self, element_id: &str) -> Option<&AssetState> {
        self.states.get(element_id)
    }

    pub fn image(&self, element_id: &str) -> Option<&DynamicImage> {
        self.get(element_id).and_then(AssetState::image)
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    /// Number of assets that did not load.
    pub fn failures(&self) -> usize {
        self.states.values().filter(|s| !s.is_ready()).count()
    }
}

/// Fetches and decodes page images, keeping the most recently used decoded
/// images by source.
pub struct AssetLoader {
    fetcher: Arc<dyn Fetcher>,
    timeout: Duration,
    cache: Mutex<LruCache<String, Arc<DynamicImage>>>,
}

impl AssetLoader {
    pub fn new(fetcher: Arc<dyn Fetcher>, timeout: Duration) -> Self {
        Self::with_cache_capacity(fetcher, timeout, DEFAULT_CACHE_ENTRIES)
    }

    /// Loader holding at most `entries` decoded images (at least one).
    pub fn with_cache_capacity(fetcher: Arc<dyn Fetcher>, timeout: Duration, entries: usize) -> Self {
        let capacity = NonZeroUsize::new(entries).unwrap_or(NonZeroUsize::MIN);
        Self {
            fetcher,
            timeout,
            cache: Mutex::new(LruCache::new(capacity)),
        }
    }

    /// Number of decoded images currently cached.
    pub async fn cached(&self) -> usize {
        self.cache.lock().await.len()
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Load every visible image element of `page` with a non-empty source.
    pub async fn prepare(&self, page: &Page) -> PageAssets {
        let pending = page
            .children
            .iter()
            .filter(|el| el.visible)
            .filter_map(|el| {
                let src = el.as_image()?.src.as_str();
                (!src.is_empty()).then(|| (el.id.clone(), src.to_string()))
            })
            .map(|(id, src)| async move {
                let state = match tokio::time::timeout(self.timeout, self.load(&src)).await {
                    Ok(Ok(img)) => AssetState::Ready(img),
                    Ok(Err(e)) => {
                        tracing::warn!(src = %src, error = %e, "asset failed to load");
                        AssetState::Failed(e.to_string())
                    }
                    Err(_) => {
                        tracing::warn!(src = %src, timeout_ms = self.timeout.as_millis() as u64, "asset timed out");
                        AssetState::TimedOut
                    }
                };
                (id, state)
            });

        let mut assets = PageAssets::new();
        for (id, state) in join_all(pending).await {
            assets.insert(id, state);
        }
        assets
    }

    async fn load(&self, src: &str) -> Result<Arc<DynamicImage>, PlacardError> {
        if let Some(img) = self.cache.lock().await.get(src) {
            return Ok(img.clone());
        }

        let bytes = self.fetcher.fetch(src).await?;
        let img = tokio::task::spawn_blocking(move || image::load_from_memory(&bytes))
            .await
            .map_err(|e| PlacardError::Asset(format!("decode task failed: {}", e)))?
            .map_err(|e| PlacardError::Asset(format!("cannot decode {}: {}", src, e)))?;

        let img = Arc::new(img);
        self.cache.lock().await.put(src.to_string(), img.clone());
        Ok(img)
    }
}
