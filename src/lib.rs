//! # Placard - Template Fill and Batch Export
//!
//! Placard takes a poster template exported from a design editor, binds each
//! data row onto its placeholder elements and renders one PNG per row.
//!
//! - **Records**: pasted text, delimited files or product-feed lookups, mapped
//!   onto named fields by column bindings
//! - **Fill**: `{{field}}` tokens, exact-text placeholders and named image slots
//! - **Render**: image loading with per-asset timeouts and PNG rasterization
//! - **Batch**: ordered, cancellable runs with progress events
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use placard::{
//!     batch::{BatchContext, DirectorySink, RowSource},
//!     net::{HttpFetcher, DEFAULT_TIMEOUT},
//!     record::RowInput,
//!     net::ImageRewrite,
//!     render::{AssetLoader, CanvasRasterizer, assets::DEFAULT_ASSET_TIMEOUT},
//!     template::Template,
//! };
//!
//! # async fn demo() -> Result<(), placard::PlacardError> {
//! let template = Template::load("poster.json").await?;
//! let records = RowInput::pasted("Widget,10,https://example.com/w.png")
//!     .with_columns("name=1,price=2,url=3")
//!     .records(ImageRewrite::None)?;
//!
//! let fetcher = Arc::new(HttpFetcher::new(DEFAULT_TIMEOUT)?);
//! let summary = BatchContext::new(
//!     Arc::new(template),
//!     Arc::new(AssetLoader::new(fetcher, DEFAULT_ASSET_TIMEOUT)),
//!     Arc::new(CanvasRasterizer::default()),
//!     Arc::new(DirectorySink::new("out")),
//! )
//! .run(RowSource::Records(records))
//! .await?;
//!
//! println!("{} exported", summary.succeeded);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`template`] | Template model, loading and page cloning |
//! | [`record`] | Rows, column bindings and feed lookups |
//! | [`fill`] | Placeholder rules and substitution |
//! | [`render`] | Asset loading and rasterization |
//! | [`batch`] | Batch runner, naming and artifact sinks |
//! | [`net`] | HTTP fetching and URL proxies |
//! | [`server`] | Local HTTP API |
//! | [`config`] | Layered settings |
//! | [`error`] | Error types |

pub mod batch;
pub mod config;
pub mod error;
pub mod fill;
pub mod net;
pub mod record;
pub mod render;
pub mod server;
pub mod telemetry;
pub mod template;

pub use error::PlacardError;
