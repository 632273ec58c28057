//! # Local HTTP API
//!
//! Exposes row parsing, fill preview and batch export over HTTP so a design
//! editor can drive them.
//!
//! | Method | Path | Body | Response |
//! |--------|------|------|----------|
//! | POST | `/api/rows/preview` | rows + column mapping | parsed records (JSON) |
//! | POST | `/api/fill/preview` | template + record | filled page (PNG) |
//! | POST | `/api/batch` | template + rows or feed queries | batch summary (JSON) |
//!
//! ## Usage
//!
//! ```bash
//! placard serve --listen 127.0.0.1:8088
//! ```

mod handlers;
mod state;

pub use handlers::fill::UNRESOLVED_HEADER;
pub use state::AppState;

use axum::{extract::DefaultBodyLimit, routing::post, Router};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::error::PlacardError;

/// Templates with embedded images can be large.
const BODY_LIMIT_BYTES: usize = 25 * 1024 * 1024;

/// Build the API router.
pub fn router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/api/rows/preview", post(handlers::rows::preview))
        .route("/api/fill/preview", post(handlers::fill::preview))
        .route("/api/batch", post(handlers::batch::run))
        .layer(DefaultBodyLimit::max(BODY_LIMIT_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server; returns once `shutdown` is cancelled.
pub async fn serve(state: AppState, shutdown: CancellationToken) -> Result<(), PlacardError> {
    let listen = state.settings.server.listen;
    let app = router(Arc::new(state));

    let listener = tokio::net::TcpListener::bind(listen)
        .await
        .map_err(|e| PlacardError::Config(format!("Failed to bind to {}: {}", listen, e)))?;

    tracing::info!(addr = %listen, "placard HTTP API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;

    Ok(())
}
