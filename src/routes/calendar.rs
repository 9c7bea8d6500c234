use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::get,
};

use crate::{
    dto::properties::{AvailabilityResponse, CalendarResponse, DateRangeQuery, PriceQuote},
    error::AppResult,
    response::ApiResponse,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/availability/{id}", get(availability))
        .route("/days/{id}", get(days))
        .route("/pricing/{id}", get(pricing))
}

#[utoipa::path(
    get,
    path = "/api/calendar/availability/{id}",
    params(
        ("id" = i64, Path, description = "Property ID"),
        ("start_date" = String, Query, description = "Check-in date (YYYY-MM-DD)"),
        ("end_date" = String, Query, description = "Check-out date (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Whether the range is free", body = ApiResponse<AvailabilityResponse>),
        (status = 400, description = "Invalid dates"),
        (status = 404, description = "Property not found")
    ),
    tag = "Calendar"
)]
pub async fn availability(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<AvailabilityResponse>>> {
    let result = state
        .properties
        .availability(id, &range.start_date, &range.end_date)
        .await?;
    Ok(Json(ApiResponse::success("Availability", result, None)))
}

#[utoipa::path(
    get,
    path = "/api/calendar/days/{id}",
    params(
        ("id" = i64, Path, description = "Property ID"),
        ("start_date" = String, Query, description = "First day (YYYY-MM-DD)"),
        ("end_date" = String, Query, description = "Last day, inclusive (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Per-day availability and price", body = ApiResponse<CalendarResponse>),
        (status = 400, description = "Invalid dates")
    ),
    tag = "Calendar"
)]
pub async fn days(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<CalendarResponse>>> {
    let calendar = state
        .properties
        .calendar(id, &range.start_date, &range.end_date)
        .await?;
    Ok(Json(ApiResponse::success("Calendar", calendar, None)))
}

#[utoipa::path(
    get,
    path = "/api/calendar/pricing/{id}",
    params(
        ("id" = i64, Path, description = "Property ID"),
        ("start_date" = String, Query, description = "Check-in date (YYYY-MM-DD)"),
        ("end_date" = String, Query, description = "Check-out date (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Price breakdown", body = ApiResponse<PriceQuote>),
        (status = 400, description = "Invalid dates")
    ),
    tag = "Calendar"
)]
pub async fn pricing(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(range): Query<DateRangeQuery>,
) -> AppResult<Json<ApiResponse<PriceQuote>>> {
    let quote = state
        .properties
        .pricing_quote(id, &range.start_date, &range.end_date)
        .await?;
    Ok(Json(ApiResponse::success("Price quote", quote, None)))
}
