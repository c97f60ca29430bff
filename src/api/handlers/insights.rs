use axum::{extract::State, Json};

use super::AppState;
use crate::{error::Result, models::Insight};

/// GET /insights
/// Four statements about the current week
pub async fn get_insights(State(state): State<AppState>) -> Result<Json<Vec<Insight>>> {
    let weekly = state.insights.weekly().await?;

    Ok(Json(weekly.render()))
}
