//! Area/motive catalog endpoints

use axum::{
    extract::{Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    models::catalog::Catalog,
    normalizer::{AreaMatch, MotiveMatch},
    AppState,
};

/// Free text to preview
#[derive(Debug, Deserialize, IntoParams)]
pub struct NormalizeQuery {
    pub area: Option<String>,
    pub motive: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct NormalizeResponse {
    pub area: Option<AreaMatch>,
    pub motive: Option<MotiveMatch>,
}

/// Catalog in use
#[utoipa::path(
    get,
    path = "/catalog",
    tag = "catalog",
    responses(
        (status = 200, description = "Areas, motives and variant maps", body = Catalog)
    )
)]
pub async fn get_catalog(State(state): State<AppState>) -> Json<Catalog> {
    Json(state.services.normalizer.catalog().clone())
}

/// Preview how reception input would be normalized
#[utoipa::path(
    get,
    path = "/catalog/normalize",
    tag = "catalog",
    params(NormalizeQuery),
    responses(
        (status = 200, description = "Normalization result", body = NormalizeResponse)
    )
)]
pub async fn normalize(
    State(state): State<AppState>,
    Query(query): Query<NormalizeQuery>,
) -> Json<NormalizeResponse> {
    let normalizer = &state.services.normalizer;
    Json(NormalizeResponse {
        area: query.area.as_deref().map(|a| normalizer.normalize_area(a)),
        motive: query.motive.as_deref().map(|m| normalizer.normalize_motive(m)),
    })
}
