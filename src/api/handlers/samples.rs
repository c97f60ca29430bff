use axum::{extract::rejection::JsonRejection, extract::State, http::StatusCode, Json};

use super::AppState;
use crate::{error::Result, models::RawSample, services::IngestSummary};

/// POST /samples
/// Validates and stores a batch of readings. The batch is all-or-nothing.
pub async fn create_samples(
    State(state): State<AppState>,
    payload: std::result::Result<Json<Vec<RawSample>>, JsonRejection>,
) -> Result<(StatusCode, Json<IngestSummary>)> {
    let Json(samples) = payload?;
    let summary = state.ingest.ingest(samples).await?;

    Ok((StatusCode::CREATED, Json(summary)))
}
