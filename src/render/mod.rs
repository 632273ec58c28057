//! # Rendering Module
//!
//! Turns a filled page into PNG bytes.
//!
//! ## Modules
//!
//! - [`assets`]: concurrent image loading with per-asset timeouts
//! - [`canvas`]: built-in RGBA rasterizer with PNG output
//! - [`font`]: Spleen bitmap glyphs for text
//!
//! Rendering is a seam: the batch runner only sees [`Rasterizer`], so an
//! external canvas backend can stand in for [`CanvasRasterizer`].

pub mod assets;
pub mod canvas;
pub mod font;

pub use assets::{AssetLoader, AssetState, PageAssets};
pub use canvas::CanvasRasterizer;

use async_trait::async_trait;

use crate::PlacardError;
use crate::template::Page;

/// Renders one filled page, with its loaded assets, to encoded image bytes.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, page: &Page, assets: &PageAssets) -> Result<Vec<u8>, PlacardError>;
}
