//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{catalog, chat, devices, health, staff, stats, turns};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Turnero API",
        version = "0.3.0",
        description = "Visitor turn management for municipal reception desks and floor terminals",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Turns
        turns::create_turn,
        turns::list_turns,
        turns::get_turn,
        turns::waiting_turns,
        turns::floor_turns,
        turns::authorize_turn,
        turns::attend_turn,
        turns::reject_turn,
        turns::revert_turn,
        turns::national_id_history,
        turns::visitor_record,
        // Stats
        stats::summary,
        stats::by_floor,
        stats::by_area,
        stats::by_motive,
        // Chat
        chat::list_messages,
        chat::post_message,
        chat::mark_read,
        // Devices
        devices::register_device,
        devices::unregister_device,
        // Staff
        staff::list_staff,
        staff::create_staff,
        // Catalog
        catalog::get_catalog,
        catalog::normalize,
    ),
    components(
        schemas(
            // Turns
            crate::models::turn::TurnState,
            crate::models::turn::TurnAction,
            crate::models::turn::Turn,
            crate::models::turn::TurnDetails,
            crate::models::turn::CreateTurn,
            crate::models::turn::AuthorizeTurn,
            crate::models::turn::AttendTurn,
            crate::models::turn::RejectTurn,
            crate::models::turn::VisitorHistory,
            crate::models::turn::VisitorRecord,
            // Stats
            crate::services::stats::StateCounts,
            crate::services::stats::AreaCount,
            crate::services::stats::StatsSummary,
            crate::services::stats::FloorCount,
            crate::services::stats::AreaStats,
            crate::services::stats::MotiveCount,
            // Chat
            crate::models::chat::ChatMessage,
            crate::models::chat::CreateChatMessage,
            // Devices
            crate::models::device::Platform,
            crate::models::device::DeviceRegistration,
            crate::models::device::RegisterDevice,
            crate::models::device::UnregisterDevice,
            // Staff
            crate::models::staff::StaffUser,
            crate::models::staff::CreateStaff,
            // Catalog
            crate::models::catalog::Catalog,
            crate::models::catalog::AreaCatalogEntry,
            crate::models::catalog::MotiveCatalogEntry,
            crate::models::catalog::VariantEntry,
            crate::normalizer::MatchKind,
            crate::normalizer::AreaMatch,
            crate::normalizer::MotiveMatch,
            catalog::NormalizeResponse,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "turns", description = "Visitor turns and queues"),
        (name = "stats", description = "Statistics"),
        (name = "chat", description = "Staff chat"),
        (name = "devices", description = "Push notification devices"),
        (name = "staff", description = "Staff directory"),
        (name = "catalog", description = "Area and motive catalog")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
