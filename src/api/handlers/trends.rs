use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use serde::Deserialize;

use super::AppState;
use crate::{api::models::TrendResponse, bucketing::Period, error::Result};

#[derive(Debug, Default, Deserialize)]
pub struct TrendQuery {
    pub date: Option<String>,
}

/// GET /trends/daily?date=YYYY-MM-DD
/// Hour-of-day usage for one local day
pub async fn get_daily(
    State(state): State<AppState>,
    query: std::result::Result<Query<TrendQuery>, QueryRejection>,
) -> Result<Json<TrendResponse>> {
    trend(&state, Period::Daily, query?).await
}

/// GET /trends/weekly?date=YYYY-MM-DD
/// Per-day usage for the Monday-based week containing the date
pub async fn get_weekly(
    State(state): State<AppState>,
    query: std::result::Result<Query<TrendQuery>, QueryRejection>,
) -> Result<Json<TrendResponse>> {
    trend(&state, Period::Weekly, query?).await
}

/// GET /trends/monthly?date=YYYY-MM
pub async fn get_monthly(
    State(state): State<AppState>,
    query: std::result::Result<Query<TrendQuery>, QueryRejection>,
) -> Result<Json<TrendResponse>> {
    trend(&state, Period::Monthly, query?).await
}

async fn trend(
    state: &AppState,
    period: Period,
    Query(query): Query<TrendQuery>,
) -> Result<Json<TrendResponse>> {
    let reference = period.parse_reference(query.date.as_deref())?;
    let aggregation = state.trends.aggregate(period, reference).await?;

    Ok(Json(TrendResponse::from(&aggregation)))
}
