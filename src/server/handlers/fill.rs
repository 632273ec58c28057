//! Fill preview: one record onto one template page, rendered to PNG.

use axum::{
    extract::State,
    http::{header, HeaderName, HeaderValue, StatusCode},
    response::IntoResponse,
    Json,
};
use serde::Deserialize;
use std::sync::Arc;

use crate::fill::RuleSet;
use crate::record::{MissingPolicy, Record};
use crate::render::Rasterizer;
use crate::template::Template;

use super::super::state::AppState;

/// Lists tokens the record could not satisfy, comma separated.
pub const UNRESOLVED_HEADER: &str = "x-placard-unresolved";

#[derive(Debug, Deserialize)]
pub struct FillPreviewRequest {
    pub template: Template,
    #[serde(default)]
    pub record: Record,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub missing: Option<MissingPolicy>,
    #[serde(default)]
    pub rules: Option<RuleSet>,
}

/// Handle POST /api/fill/preview - render a filled page as PNG.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Json(req): Json<FillPreviewRequest>,
) -> Result<impl IntoResponse, (StatusCode, String)> {
    let page_index = req.page.unwrap_or(state.settings.batch.page);
    let mut instance = req
        .template
        .instantiate_page(page_index)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let filler = state.filler(req.rules, req.missing);
    let unresolved = filler.unresolved_tokens(&instance.page, &req.record);
    filler.fill_page(&mut instance, &req.record);

    state
        .rasterizer
        .check_limits(&instance.page)
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    let assets = state.assets.prepare(&instance.page).await;
    let png_bytes = state
        .rasterizer
        .rasterize(&instance.page, &assets)
        .await
        .map_err(|e| {
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                format!("Preview render failed: {}", e),
            )
        })?;

    // Token names are restricted to header-safe characters.
    let unresolved = HeaderValue::from_str(&unresolved.join(","))
        .unwrap_or_else(|_| HeaderValue::from_static(""));

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (HeaderName::from_static(UNRESOLVED_HEADER), unresolved),
        ],
        png_bytes,
    ))
}
