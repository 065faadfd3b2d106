//! Turn API endpoints (reception and floor terminals)

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use axum_extra::extract::WithRejection;
use uuid::Uuid;

use super::extract::OptionalJson;
use crate::{
    error::{AppError, AppResult},
    models::turn::{
        AttendTurn, AuthorizeTurn, CreateTurn, QueueQuery, RejectTurn, Turn, TurnDetails,
        TurnQuery, VisitorHistory, VisitorRecord,
    },
    AppState,
};

fn details(turns: Vec<Turn>) -> Vec<TurnDetails> {
    turns.into_iter().map(TurnDetails::from).collect()
}

/// Register a visitor
#[utoipa::path(
    post,
    path = "/turns",
    tag = "turns",
    request_body = CreateTurn,
    responses(
        (status = 201, description = "Turn created", body = TurnDetails),
        (status = 400, description = "Missing name or area", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_turn(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<CreateTurn>, AppError>,
) -> AppResult<(StatusCode, Json<TurnDetails>)> {
    let turn = state.services.turns.create(request).await?;
    Ok((StatusCode::CREATED, Json(turn.into())))
}

/// List turns, most recent first
#[utoipa::path(
    get,
    path = "/turns",
    tag = "turns",
    params(TurnQuery),
    responses(
        (status = 200, description = "Turns", body = Vec<TurnDetails>),
        (status = 400, description = "Invalid filter", body = crate::error::ErrorResponse)
    )
)]
pub async fn list_turns(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<TurnQuery>, AppError>,
) -> AppResult<Json<Vec<TurnDetails>>> {
    let turns = state.services.turns.list(query).await?;
    Ok(Json(details(turns)))
}

/// Get turn by ID
#[utoipa::path(
    get,
    path = "/turns/{id}",
    tag = "turns",
    params(("id" = Uuid, Path, description = "Turn ID")),
    responses(
        (status = 200, description = "Turn", body = TurnDetails),
        (status = 404, description = "Turn not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_turn(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<TurnDetails>> {
    let turn = state.services.turns.get(id).await?;
    Ok(Json(turn.into()))
}

/// FIFO queue of open turns
#[utoipa::path(
    get,
    path = "/turns/waiting",
    tag = "turns",
    params(QueueQuery),
    responses(
        (status = 200, description = "WAITING and AUTHORIZED turns, oldest first", body = Vec<TurnDetails>)
    )
)]
pub async fn waiting_turns(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<QueueQuery>, AppError>,
) -> AppResult<Json<Vec<TurnDetails>>> {
    let turns = state.services.queue.waiting_queue(query.area_key).await?;
    Ok(Json(details(turns)))
}

/// Open turns routed to one floor
#[utoipa::path(
    get,
    path = "/turns/floor/{floor}",
    tag = "turns",
    params(("floor" = String, Path, description = "Floor, e.g. 1")),
    responses(
        (status = 200, description = "Open turns for the floor, oldest first", body = Vec<TurnDetails>)
    )
)]
pub async fn floor_turns(
    State(state): State<AppState>,
    WithRejection(Path(floor), _): WithRejection<Path<String>, AppError>,
) -> AppResult<Json<Vec<TurnDetails>>> {
    let turns = state.services.queue.floor_queue(&floor).await?;
    Ok(Json(details(turns)))
}

/// Call the visitor up
#[utoipa::path(
    post,
    path = "/turns/{id}/authorize",
    tag = "turns",
    params(("id" = Uuid, Path, description = "Turn ID")),
    request_body(content = AuthorizeTurn, description = "Optional staff names"),
    responses(
        (status = 200, description = "Turn authorized", body = TurnDetails),
        (status = 400, description = "Turn is not WAITING", body = crate::error::ErrorResponse),
        (status = 404, description = "Turn not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn authorize_turn(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    OptionalJson(request): OptionalJson<AuthorizeTurn>,
) -> AppResult<Json<TurnDetails>> {
    let turn = state.services.turns.authorize(id, request).await?;
    Ok(Json(turn.into()))
}

/// Mark the visitor as served
#[utoipa::path(
    post,
    path = "/turns/{id}/attend",
    tag = "turns",
    params(("id" = Uuid, Path, description = "Turn ID")),
    request_body(content = AttendTurn, description = "Optional staff name"),
    responses(
        (status = 200, description = "Turn attended", body = TurnDetails),
        (status = 400, description = "Turn already closed", body = crate::error::ErrorResponse),
        (status = 404, description = "Turn not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn attend_turn(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    OptionalJson(request): OptionalJson<AttendTurn>,
) -> AppResult<Json<TurnDetails>> {
    let turn = state.services.turns.attend(id, request).await?;
    Ok(Json(turn.into()))
}

/// Turn the visitor away
#[utoipa::path(
    post,
    path = "/turns/{id}/reject",
    tag = "turns",
    params(("id" = Uuid, Path, description = "Turn ID")),
    request_body(content = RejectTurn, description = "Optional reason"),
    responses(
        (status = 200, description = "Turn rejected", body = TurnDetails),
        (status = 400, description = "Transition not allowed", body = crate::error::ErrorResponse),
        (status = 404, description = "Turn not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn reject_turn(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
    OptionalJson(request): OptionalJson<RejectTurn>,
) -> AppResult<Json<TurnDetails>> {
    let turn = state.services.turns.reject(id, request).await?;
    Ok(Json(turn.into()))
}

/// Undo a call made by mistake
#[utoipa::path(
    post,
    path = "/turns/{id}/revert",
    tag = "turns",
    params(("id" = Uuid, Path, description = "Turn ID")),
    responses(
        (status = 200, description = "Turn back to WAITING", body = TurnDetails),
        (status = 400, description = "Turn is not AUTHORIZED", body = crate::error::ErrorResponse),
        (status = 404, description = "Turn not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn revert_turn(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, AppError>,
) -> AppResult<Json<TurnDetails>> {
    let turn = state.services.turns.revert_authorization(id).await?;
    Ok(Json(turn.into()))
}

/// Last visitor with this national id (reception autocomplete)
#[utoipa::path(
    get,
    path = "/turns/by-national-id/{national_id}/history",
    tag = "turns",
    params(("national_id" = String, Path, description = "Exact national id")),
    responses(
        (status = 200, description = "Latest visitor, or null", body = VisitorHistory)
    )
)]
pub async fn national_id_history(
    State(state): State<AppState>,
    WithRejection(Path(national_id), _): WithRejection<Path<String>, AppError>,
) -> AppResult<Json<Option<VisitorHistory>>> {
    let history = state.services.turns.history(&national_id).await?;
    Ok(Json(history))
}

/// Every visit of a person
#[utoipa::path(
    get,
    path = "/visitors/{national_id}",
    tag = "turns",
    params(("national_id" = String, Path, description = "Full or partial national id")),
    responses(
        (status = 200, description = "Visit record", body = VisitorRecord),
        (status = 404, description = "No visits", body = crate::error::ErrorResponse)
    )
)]
pub async fn visitor_record(
    State(state): State<AppState>,
    WithRejection(Path(national_id), _): WithRejection<Path<String>, AppError>,
) -> AppResult<Json<VisitorRecord>> {
    let record = state.services.turns.visitor_record(&national_id).await?;
    Ok(Json(record))
}
