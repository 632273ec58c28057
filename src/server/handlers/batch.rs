//! Batch run: fill a template for every row and write PNGs to the output
//! directory.

use axum::{extract::State, http::StatusCode, Json};
use serde::Deserialize;
use std::sync::Arc;

use crate::batch::{BatchContext, BatchSummary, DirectorySink, RowSource};
use crate::fill::RuleSet;
use crate::record::{MissingPolicy, RowInput, feed};
use crate::template::Template;
use crate::PlacardError;

use super::super::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BatchRequest {
    pub template: Template,
    /// Pasted or file rows; ignored when `queries` is set.
    #[serde(flatten)]
    pub rows: RowInput,
    /// One feed query per line or comma.
    #[serde(default)]
    pub queries: Option<String>,
    /// Feed schema for `queries`.
    #[serde(default)]
    pub feed: Option<String>,
    #[serde(default)]
    pub page: Option<usize>,
    #[serde(default)]
    pub concurrency: Option<usize>,
    #[serde(default)]
    pub missing: Option<MissingPolicy>,
    #[serde(default)]
    pub rules: Option<RuleSet>,
}

fn status_for(error: &PlacardError) -> StatusCode {
    match error {
        PlacardError::Input(_) | PlacardError::Template(_) | PlacardError::Config(_) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn row_source(state: &AppState, req: &BatchRequest) -> Result<RowSource, PlacardError> {
    if let Some(queries) = &req.queries {
        let name = req.feed.as_deref().unwrap_or("product-feed");
        let schemas = feed::builtin_schemas();
        let schema = feed::find_schema(&schemas, name)
            .cloned()
            .ok_or_else(|| PlacardError::Input(format!("unknown feed schema '{}'", name)))?;
        let queries = schema.query.split(queries);
        return Ok(RowSource::Queries {
            provider: Arc::new(state.feed_client(schema)),
            queries,
        });
    }

    let records = req.rows.records(state.settings.network.image_rewrite())?;
    Ok(RowSource::Records(records))
}

/// Handle POST /api/batch - run a batch and return its summary.
pub async fn run(
    State(state): State<Arc<AppState>>,
    Json(req): Json<BatchRequest>,
) -> Result<Json<BatchSummary>, (StatusCode, String)> {
    let source = row_source(&state, &req).map_err(|e| (status_for(&e), e.to_string()))?;

    let mut options = state.settings.batch.options();
    if let Some(page) = req.page {
        options.page_index = page;
    }
    if let Some(concurrency) = req.concurrency {
        options.concurrency = concurrency.clamp(1, 16);
    }

    let filler = Arc::new(state.filler(req.rules, req.missing));
    let sink = Arc::new(DirectorySink::new(state.settings.batch.output_dir.clone()));
    let context = BatchContext::new(
        Arc::new(req.template),
        state.assets.clone(),
        state.rasterizer.clone(),
        sink,
    )
    .with_filler(filler)
    .with_options(options);

    let summary = context
        .run(source)
        .await
        .map_err(|e| (status_for(&e), e.to_string()))?;

    Ok(Json(summary))
}
