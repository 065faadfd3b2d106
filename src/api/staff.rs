//! Staff directory endpoints

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    models::staff::{CreateStaff, StaffUser},
    AppState,
};

/// List staff users
#[utoipa::path(
    get,
    path = "/staff",
    tag = "staff",
    responses(
        (status = 200, description = "Staff users", body = Vec<StaffUser>)
    )
)]
pub async fn list_staff(State(state): State<AppState>) -> AppResult<Json<Vec<StaffUser>>> {
    Ok(Json(state.services.staff.list().await?))
}

/// Create a staff user
#[utoipa::path(
    post,
    path = "/staff",
    tag = "staff",
    request_body = CreateStaff,
    responses(
        (status = 201, description = "Staff user created", body = StaffUser),
        (status = 409, description = "Username taken", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_staff(
    State(state): State<AppState>,
    WithRejection(Json(staff), _): WithRejection<Json<CreateStaff>, AppError>,
) -> AppResult<(StatusCode, Json<StaffUser>)> {
    let user = state.services.staff.create(staff).await?;
    Ok((StatusCode::CREATED, Json(user)))
}
