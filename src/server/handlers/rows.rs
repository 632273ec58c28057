//! Row preview: parse rows exactly as a batch would and return the records.

use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use std::sync::Arc;

use crate::record::{Record, RowInput};

use super::super::state::AppState;

#[derive(Debug, Serialize)]
pub struct RowsPreview {
    pub count: usize,
    pub records: Vec<Record>,
}

/// Handle POST /api/rows/preview.
pub async fn preview(
    State(state): State<Arc<AppState>>,
    Json(input): Json<RowInput>,
) -> Result<Json<RowsPreview>, (StatusCode, String)> {
    let records = input
        .records(state.settings.network.image_rewrite())
        .map_err(|e| (StatusCode::BAD_REQUEST, e.to_string()))?;

    Ok(Json(RowsPreview {
        count: records.len(),
        records,
    }))
}
