//! Statistics API endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    services::stats::{AreaStats, DayQuery, FloorCount, MotiveCount, RangeQuery, StatsSummary},
    AppState,
};

/// Daily summary
#[utoipa::path(
    get,
    path = "/stats/summary",
    tag = "stats",
    params(DayQuery),
    responses(
        (status = 200, description = "Counts by state, busiest areas and average wait", body = StatsSummary)
    )
)]
pub async fn summary(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<DayQuery>, AppError>,
) -> AppResult<Json<StatsSummary>> {
    Ok(Json(state.services.stats.summary(query.date).await?))
}

/// Turns per floor for a day
#[utoipa::path(
    get,
    path = "/stats/by-floor",
    tag = "stats",
    params(DayQuery),
    responses(
        (status = 200, description = "Turns per floor", body = Vec<FloorCount>)
    )
)]
pub async fn by_floor(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<DayQuery>, AppError>,
) -> AppResult<Json<Vec<FloorCount>>> {
    Ok(Json(state.services.stats.by_floor(query.date).await?))
}

/// Turns per area for a day
#[utoipa::path(
    get,
    path = "/stats/by-area",
    tag = "stats",
    params(DayQuery),
    responses(
        (status = 200, description = "Totals, attended and waiting per area", body = Vec<AreaStats>)
    )
)]
pub async fn by_area(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<DayQuery>, AppError>,
) -> AppResult<Json<Vec<AreaStats>>> {
    Ok(Json(state.services.stats.by_area(query.date).await?))
}

/// Most frequent motives over a day range
#[utoipa::path(
    get,
    path = "/stats/by-motive",
    tag = "stats",
    params(RangeQuery),
    responses(
        (status = 200, description = "Top motives", body = Vec<MotiveCount>),
        (status = 400, description = "Inverted range", body = crate::error::ErrorResponse)
    )
)]
pub async fn by_motive(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<RangeQuery>, AppError>,
) -> AppResult<Json<Vec<MotiveCount>>> {
    Ok(Json(
        state.services.stats.by_motive(query.from, query.to).await?,
    ))
}
