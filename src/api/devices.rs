//! Device registration endpoints

use axum::{extract::State, http::StatusCode, Json};
use axum_extra::extract::WithRejection;

use crate::{
    error::{AppError, AppResult},
    models::device::{DeviceRegistration, RegisterDevice, UnregisterDevice},
    AppState,
};

/// Register a device for push notifications
#[utoipa::path(
    post,
    path = "/devices",
    tag = "devices",
    request_body = RegisterDevice,
    responses(
        (status = 200, description = "Device registered or reactivated", body = DeviceRegistration),
        (status = 400, description = "Invalid token", body = crate::error::ErrorResponse),
        (status = 404, description = "Unknown staff user", body = crate::error::ErrorResponse)
    )
)]
pub async fn register_device(
    State(state): State<AppState>,
    WithRejection(Json(device), _): WithRejection<Json<RegisterDevice>, AppError>,
) -> AppResult<Json<DeviceRegistration>> {
    Ok(Json(state.services.devices.register(device).await?))
}

/// Stop pushing to a device
#[utoipa::path(
    post,
    path = "/devices/unregister",
    tag = "devices",
    request_body = UnregisterDevice,
    responses(
        (status = 204, description = "Device deactivated"),
        (status = 404, description = "Unknown token", body = crate::error::ErrorResponse)
    )
)]
pub async fn unregister_device(
    State(state): State<AppState>,
    WithRejection(Json(request), _): WithRejection<Json<UnregisterDevice>, AppError>,
) -> AppResult<StatusCode> {
    state.services.devices.unregister(&request.token).await?;
    Ok(StatusCode::NO_CONTENT)
}
