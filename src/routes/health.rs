use std::collections::BTreeMap;

use axum::{Json, extract::State};
use serde::Serialize;
use utoipa::ToSchema;

use crate::{
    error::AppResult,
    response::{ApiResponse, Meta},
    state::AppState,
    store::CollectionStats,
};

#[derive(Serialize, ToSchema)]
pub struct HealthData {
    pub status: String,
    pub collections: BTreeMap<String, CollectionStats>,
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "OK", body = ApiResponse<HealthData>),
        (status = 500, description = "Data directory unreadable"),
    ),
        tag = "Health"
)]
pub async fn health_check(State(state): State<AppState>) -> AppResult<Json<ApiResponse<HealthData>>> {
    let mut collections = BTreeMap::new();
    collections.insert("users".to_string(), state.users.stats().await?);
    collections.insert("rooms".to_string(), state.properties.stats().await?);
    collections.insert("bookings".to_string(), state.bookings.stats().await?);

    let data = HealthData {
        status: "ok".to_string(),
        collections,
    };

    Ok(Json(ApiResponse::success(
        "Health check",
        data,
        Some(Meta::empty()),
    )))
}
