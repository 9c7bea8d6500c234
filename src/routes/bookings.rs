use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::bookings::{BookingPrice, CancelBookingRequest, CreateBookingRequest, PriceQuoteQuery},
    error::AppResult,
    extract::ValidatedJson,
    middleware::auth::AuthUser,
    models::{Booking, Payment},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_booking))
        .route("/price-quote", get(price_quote))
        .route("/{id}", get(get_booking))
        .route("/{id}/confirm", post(confirm_booking))
        .route("/{id}/cancel", post(cancel_booking))
        .route("/{id}/complete", post(complete_booking))
        .route("/{id}/payments", get(booking_payments))
}

#[utoipa::path(
    post,
    path = "/api/bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Create booking", body = ApiResponse<Booking>),
        (status = 400, description = "Invalid booking request"),
        (status = 409, description = "Dates already booked")
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn create_booking(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateBookingRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Booking>>)> {
    let booking = state.bookings.create_booking(user.user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Booking created", booking, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/bookings/price-quote",
    params(
        ("property_id" = i64, Query, description = "Property ID"),
        ("check_in" = String, Query, description = "Check-in date (YYYY-MM-DD)"),
        ("check_out" = String, Query, description = "Check-out date (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Booking total", body = ApiResponse<BookingPrice>),
        (status = 400, description = "Invalid dates or property")
    ),
    tag = "Bookings"
)]
pub async fn price_quote(
    State(state): State<AppState>,
    Query(query): Query<PriceQuoteQuery>,
) -> AppResult<Json<ApiResponse<BookingPrice>>> {
    let price = state
        .bookings
        .calculate_total_price(query.property_id, &query.check_in, &query.check_out)
        .await?;
    Ok(Json(ApiResponse::success("Price quote", price, None)))
}

#[utoipa::path(
    get,
    path = "/api/bookings/{id}",
    params(("id" = i64, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking", body = ApiResponse<Booking>),
        (status = 403, description = "Neither guest nor host"),
        (status = 404, description = "Booking not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn get_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let booking = state.bookings.get_for_user(user.user_id, id).await?;
    Ok(Json(ApiResponse::success("Booking", booking, None)))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/confirm",
    params(("id" = i64, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking confirmed", body = ApiResponse<Booking>),
        (status = 400, description = "Booking is not pending"),
        (status = 403, description = "Not the host")
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn confirm_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let booking = state.bookings.confirm_booking(user.user_id, id).await?;
    Ok(Json(ApiResponse::success("Booking confirmed", booking, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/cancel",
    params(("id" = i64, Path, description = "Booking ID")),
    request_body(content = CancelBookingRequest, description = "Optional cancellation reason"),
    responses(
        (status = 200, description = "Booking cancelled", body = ApiResponse<Booking>),
        (status = 400, description = "Booking cannot be cancelled")
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    payload: Option<Json<CancelBookingRequest>>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let reason = payload.and_then(|Json(body)| body.reason);
    let booking = state.bookings.cancel_booking(user.user_id, id, reason).await?;
    Ok(Json(ApiResponse::success("Booking cancelled", booking, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/bookings/{id}/complete",
    params(("id" = i64, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking completed", body = ApiResponse<Booking>),
        (status = 400, description = "Booking is not confirmed"),
        (status = 403, description = "Not the host")
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn complete_booking(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Booking>>> {
    let booking = state.bookings.complete_booking(user.user_id, id).await?;
    Ok(Json(ApiResponse::success("Booking completed", booking, Some(Meta::empty()))))
}

#[utoipa::path(
    get,
    path = "/api/bookings/{id}/payments",
    params(("id" = i64, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Charges and refunds of the booking", body = ApiResponse<Vec<Payment>>),
        (status = 403, description = "Neither guest nor host")
    ),
    security(("bearer_auth" = [])),
    tag = "Bookings"
)]
pub async fn booking_payments(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<Payment>>>> {
    let payments = state.payments.get_booking_payments(user.user_id, id).await?;
    Ok(Json(ApiResponse::success("Payments", payments, None)))
}
