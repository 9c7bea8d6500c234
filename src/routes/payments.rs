use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::payments::{AnalyticsQuery, CreatePaymentRequest, PaymentAnalytics, RefundRequest},
    error::AppResult,
    extract::ValidatedJson,
    middleware::auth::{AuthUser, ensure_host},
    models::{Payment, TransactionStatus},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(process_payment))
        .route("/analytics", get(analytics))
        .route("/{id}", get(get_payment))
        .route("/{id}/refund", post(refund_payment))
}

#[utoipa::path(
    post,
    path = "/api/payments",
    request_body = CreatePaymentRequest,
    responses(
        (status = 201, description = "Payment recorded; check status for the gateway outcome", body = ApiResponse<Payment>),
        (status = 403, description = "Not the guest of the booking")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn process_payment(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreatePaymentRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Payment>>)> {
    let payment = state.payments.process_payment(user.user_id, payload).await?;
    let message = match payment.status {
        TransactionStatus::Completed => "Payment processed",
        _ => "Payment failed",
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(message, payment, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/payments/{id}",
    params(("id" = i64, Path, description = "Payment ID")),
    responses(
        (status = 200, description = "Payment", body = ApiResponse<Payment>),
        (status = 404, description = "Payment not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn get_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Payment>>> {
    let payment = state.payments.get_payment(user.user_id, id).await?;
    Ok(Json(ApiResponse::success("Payment", payment, None)))
}

#[utoipa::path(
    post,
    path = "/api/payments/{id}/refund",
    params(("id" = i64, Path, description = "Original payment ID")),
    request_body = RefundRequest,
    responses(
        (status = 201, description = "Refund recorded", body = ApiResponse<Payment>),
        (status = 400, description = "Refund not allowed")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn refund_payment(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<RefundRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Payment>>)> {
    let refund = state
        .payments
        .initiate_refund(Some(user.user_id), id, payload)
        .await?;
    let message = match refund.status {
        TransactionStatus::Completed => "Refund processed",
        _ => "Refund failed",
    };
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(message, refund, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/payments/analytics",
    params(
        ("start_date" = Option<String>, Query, description = "First day (YYYY-MM-DD)"),
        ("end_date" = Option<String>, Query, description = "Last day, inclusive (YYYY-MM-DD)"),
    ),
    responses(
        (status = 200, description = "Payment totals", body = ApiResponse<PaymentAnalytics>),
        (status = 403, description = "Hosts only")
    ),
    security(("bearer_auth" = [])),
    tag = "Payments"
)]
pub async fn analytics(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<AnalyticsQuery>,
) -> AppResult<Json<ApiResponse<PaymentAnalytics>>> {
    ensure_host(&user)?;
    let report = state
        .payments
        .get_payment_analytics(query.start_date.as_deref(), query.end_date.as_deref())
        .await?;
    Ok(Json(ApiResponse::success("Payment analytics", report, None)))
}
