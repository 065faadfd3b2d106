//! API handlers for the Turnero REST endpoints

pub mod catalog;
pub mod chat;
pub mod devices;
pub mod extract;
pub mod health;
pub mod openapi;
pub mod staff;
pub mod stats;
pub mod turns;

use axum::{
    routing::{get, post},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

use crate::AppState;

/// Create the application router with all routes
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let api_v1 = Router::new()
        // Health check
        .route("/health", get(health::health_check))
        .route("/ready", get(health::readiness_check))
        // Turns
        .route("/turns", get(turns::list_turns).post(turns::create_turn))
        .route("/turns/waiting", get(turns::waiting_turns))
        .route("/turns/floor/:floor", get(turns::floor_turns))
        .route(
            "/turns/by-national-id/:national_id/history",
            get(turns::national_id_history),
        )
        .route("/turns/:id", get(turns::get_turn))
        .route("/turns/:id/authorize", post(turns::authorize_turn))
        .route("/turns/:id/attend", post(turns::attend_turn))
        .route("/turns/:id/reject", post(turns::reject_turn))
        .route("/turns/:id/revert", post(turns::revert_turn))
        .route("/visitors/:national_id", get(turns::visitor_record))
        // Statistics
        .route("/stats/summary", get(stats::summary))
        .route("/stats/by-floor", get(stats::by_floor))
        .route("/stats/by-area", get(stats::by_area))
        .route("/stats/by-motive", get(stats::by_motive))
        // Chat
        .route(
            "/chat/messages",
            get(chat::list_messages).post(chat::post_message),
        )
        .route("/chat/messages/:id/read", post(chat::mark_read))
        // Devices
        .route("/devices", post(devices::register_device))
        .route("/devices/unregister", post(devices::unregister_device))
        // Staff
        .route("/staff", get(staff::list_staff).post(staff::create_staff))
        // Catalog
        .route("/catalog", get(catalog::get_catalog))
        .route("/catalog/normalize", get(catalog::normalize))
        .with_state(state);

    Router::new()
        .nest("/api/v1", api_v1)
        .merge(openapi::create_openapi_router())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors)
                .layer(CompressionLayer::new()),
        )
}
