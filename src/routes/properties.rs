use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
};

use crate::{
    dto::{
        bookings::{BookingStatusQuery, BookingWithGuest},
        properties::{
            CreatePropertyRequest, LimitQuery, PropertyDetails, PropertySearchQuery,
            UpdatePropertyRequest,
        },
        reviews::{ReviewListQuery, ReviewWithGuest, ReviewsSummary},
    },
    error::AppResult,
    extract::ValidatedJson,
    middleware::auth::AuthUser,
    models::Property,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

const DEFAULT_SIMILAR: usize = 5;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(search_properties).post(create_property))
        .route(
            "/{id}",
            get(get_property).put(update_property).delete(delete_property),
        )
        .route("/{id}/similar", get(similar_properties))
        .route("/{id}/reviews", get(property_reviews))
        .route("/{id}/reviews/summary", get(property_reviews_summary))
        .route("/{id}/bookings", get(property_bookings))
        .route("/host/{host_id}", get(host_properties))
}

#[utoipa::path(
    get,
    path = "/api/properties",
    params(
        ("location" = Option<String>, Query, description = "Substring of city, state, country, title or address"),
        ("city" = Option<String>, Query, description = "City"),
        ("country" = Option<String>, Query, description = "Country"),
        ("property_type" = Option<String>, Query, description = "Property type"),
        ("room_type" = Option<String>, Query, description = "Room type"),
        ("min_price" = Option<f64>, Query, description = "Minimum nightly price"),
        ("max_price" = Option<f64>, Query, description = "Maximum nightly price"),
        ("guests" = Option<u32>, Query, description = "Number of guests"),
        ("bedrooms" = Option<u32>, Query, description = "Minimum bedrooms"),
        ("bathrooms" = Option<f64>, Query, description = "Minimum bathrooms"),
        ("amenities" = Option<String>, Query, description = "Comma separated amenities, all required"),
        ("ne_lat" = Option<f64>, Query, description = "North-east latitude"),
        ("ne_lng" = Option<f64>, Query, description = "North-east longitude"),
        ("sw_lat" = Option<f64>, Query, description = "South-west latitude"),
        ("sw_lng" = Option<f64>, Query, description = "South-west longitude"),
        ("check_in" = Option<String>, Query, description = "Check-in date (YYYY-MM-DD)"),
        ("check_out" = Option<String>, Query, description = "Check-out date (YYYY-MM-DD)"),
        ("instant_bookable" = Option<bool>, Query, description = "Instant booking only"),
        ("date_option" = Option<String>, Query, description = "dates, flexible or month"),
        ("stay_duration" = Option<String>, Query, description = "weekend, week or month"),
        ("month_duration" = Option<u32>, Query, description = "Months for month mode"),
        ("date_flexibility" = Option<u32>, Query, description = "Days of slack for month mode"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Matching properties", body = ApiResponse<Vec<Property>>),
        (status = 400, description = "Invalid dates")
    ),
    tag = "Properties"
)]
pub async fn search_properties(
    State(state): State<AppState>,
    Query(query): Query<PropertySearchQuery>,
) -> AppResult<Json<ApiResponse<Vec<Property>>>> {
    let pagination = Pagination::new(query.page, query.per_page);
    let page = state.properties.search_properties(query).await?;
    let meta = pagination.meta(page.total);
    Ok(Json(ApiResponse::success("Properties", page.items, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/properties",
    request_body = CreatePropertyRequest,
    responses(
        (status = 201, description = "Create property", body = ApiResponse<Property>),
        (status = 400, description = "Invalid input")
    ),
    security(("bearer_auth" = [])),
    tag = "Properties"
)]
pub async fn create_property(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreatePropertyRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Property>>)> {
    let property = state.properties.create_property(user.user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Property created", property, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/properties/{id}",
    params(("id" = i64, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Property with reviews and availability", body = ApiResponse<PropertyDetails>),
        (status = 404, description = "Property not found")
    ),
    tag = "Properties"
)]
pub async fn get_property(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<PropertyDetails>>> {
    let details = state.properties.get_property_details(id).await?;
    Ok(Json(ApiResponse::success("Property", details, None)))
}

#[utoipa::path(
    put,
    path = "/api/properties/{id}",
    params(("id" = i64, Path, description = "Property ID")),
    request_body = UpdatePropertyRequest,
    responses(
        (status = 200, description = "Updated property", body = ApiResponse<Property>),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Properties"
)]
pub async fn update_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<UpdatePropertyRequest>,
) -> AppResult<Json<ApiResponse<Property>>> {
    let property = state.properties.update_property(user.user_id, id, payload).await?;
    Ok(Json(ApiResponse::success("Updated", property, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/api/properties/{id}",
    params(("id" = i64, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Deleted property"),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Properties"
)]
pub async fn delete_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.properties.delete_property(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/properties/{id}/similar",
    params(
        ("id" = i64, Path, description = "Property ID"),
        ("limit" = Option<usize>, Query, description = "Maximum results, default 5"),
    ),
    responses((status = 200, description = "Similar properties", body = ApiResponse<Vec<Property>>)),
    tag = "Properties"
)]
pub async fn similar_properties(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<LimitQuery>,
) -> AppResult<Json<ApiResponse<Vec<Property>>>> {
    let limit = query.limit.unwrap_or(DEFAULT_SIMILAR).min(50);
    let similar = state.properties.get_similar_properties(id, limit).await?;
    Ok(Json(ApiResponse::success("Similar properties", similar, None)))
}

#[utoipa::path(
    get,
    path = "/api/properties/{id}/reviews",
    params(
        ("id" = i64, Path, description = "Property ID"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("public_only" = Option<bool>, Query, description = "Only public reviews, default true"),
    ),
    responses((status = 200, description = "Property reviews", body = ApiResponse<Vec<ReviewWithGuest>>)),
    tag = "Properties"
)]
pub async fn property_reviews(
    State(state): State<AppState>,
    Path(id): Path<i64>,
    Query(query): Query<ReviewListQuery>,
) -> AppResult<Json<ApiResponse<Vec<ReviewWithGuest>>>> {
    let pagination = Pagination::new(query.page, query.per_page);
    let page = state
        .reviews
        .get_property_reviews(id, pagination, query.public_only.unwrap_or(true))
        .await?;
    let meta = pagination.meta(page.total);
    Ok(Json(ApiResponse::success("Reviews", page.items, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/api/properties/{id}/reviews/summary",
    params(("id" = i64, Path, description = "Property ID")),
    responses(
        (status = 200, description = "Rating statistics and recent reviews", body = ApiResponse<ReviewsSummary>),
        (status = 404, description = "Property not found")
    ),
    tag = "Properties"
)]
pub async fn property_reviews_summary(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<ReviewsSummary>>> {
    let summary = state.reviews.get_property_reviews_summary(id).await?;
    Ok(Json(ApiResponse::success("Review summary", summary, None)))
}

#[utoipa::path(
    get,
    path = "/api/properties/{id}/bookings",
    params(
        ("id" = i64, Path, description = "Property ID"),
        ("status" = Option<String>, Query, description = "Filter by booking status"),
    ),
    responses(
        (status = 200, description = "Bookings of the property", body = ApiResponse<Vec<BookingWithGuest>>),
        (status = 403, description = "Not the host")
    ),
    security(("bearer_auth" = [])),
    tag = "Properties"
)]
pub async fn property_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Query(query): Query<BookingStatusQuery>,
) -> AppResult<Json<ApiResponse<Vec<BookingWithGuest>>>> {
    let bookings = state
        .bookings
        .get_property_bookings(user.user_id, id, query.status)
        .await?;
    Ok(Json(ApiResponse::success("Bookings", bookings, None)))
}

#[utoipa::path(
    get,
    path = "/api/properties/host/{host_id}",
    params(
        ("host_id" = i64, Path, description = "Host user ID"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses((status = 200, description = "Properties of a host", body = ApiResponse<Vec<Property>>)),
    tag = "Properties"
)]
pub async fn host_properties(
    State(state): State<AppState>,
    Path(host_id): Path<i64>,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Vec<Property>>>> {
    let page = state.properties.get_host_properties(host_id, pagination).await?;
    let meta = pagination.meta(page.total);
    Ok(Json(ApiResponse::success("Host properties", page.items, Some(meta))))
}
