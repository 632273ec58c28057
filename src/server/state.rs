//! Server state shared across handlers.

use std::sync::Arc;

use crate::PlacardError;
use crate::config::Settings;
use crate::fill::{Filler, RuleSet};
use crate::net::{Fetcher, HttpFetcher};
use crate::record::{FeedClient, FeedSchema, MissingPolicy};
use crate::render::{AssetLoader, CanvasRasterizer};

/// Application state shared across handlers.
pub struct AppState {
    pub settings: Settings,
    pub fetcher: Arc<dyn Fetcher>,
    /// Shared so decoded images are reused across requests.
    pub assets: Arc<AssetLoader>,
    pub rasterizer: Arc<CanvasRasterizer>,
}

impl AppState {
    pub fn new(settings: Settings) -> Result<Self, PlacardError> {
        let fetcher: Arc<dyn Fetcher> = Arc::new(HttpFetcher::new(settings.network.timeout)?);
        Ok(Self::with_fetcher(settings, fetcher))
    }

    /// Build state around a given fetcher (tests use a stub).
    pub fn with_fetcher(settings: Settings, fetcher: Arc<dyn Fetcher>) -> Self {
        let assets = Arc::new(AssetLoader::with_cache_capacity(
            fetcher.clone(),
            settings.batch.asset_timeout,
            settings.batch.asset_cache_entries,
        ));
        let rasterizer = Arc::new(CanvasRasterizer::new(settings.batch.pixel_ratio));
        Self {
            settings,
            fetcher,
            assets,
            rasterizer,
        }
    }

    /// Fill engine for a request: request overrides, else configured defaults.
    pub fn filler(&self, rules: Option<RuleSet>, missing: Option<MissingPolicy>) -> Filler {
        Filler::new(
            rules.unwrap_or_else(|| self.settings.batch.rules.clone()),
            missing.unwrap_or(self.settings.batch.missing),
        )
    }

    pub fn feed_client(&self, schema: FeedSchema) -> FeedClient {
        FeedClient::new(schema, self.fetcher.clone())
            .with_relay(self.settings.network.cors_proxy.clone())
            .with_image_proxy(self.settings.network.image_proxy.clone())
    }
}
