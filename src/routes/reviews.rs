use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::reviews::{CreateReviewRequest, FlagReviewRequest, HostResponseRequest, ReviewWithGuest},
    error::AppResult,
    extract::ValidatedJson,
    middleware::auth::AuthUser,
    models::Review,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_review))
        .route("/{id}", get(get_review))
        .route("/{id}/response", post(respond_to_review))
        .route("/{id}/flag", post(flag_review))
}

#[utoipa::path(
    post,
    path = "/api/reviews",
    request_body = CreateReviewRequest,
    responses(
        (status = 201, description = "Create review", body = ApiResponse<ReviewWithGuest>),
        (status = 400, description = "Booking not eligible for review")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn create_review(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<CreateReviewRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<ReviewWithGuest>>)> {
    let review = state.reviews.create_review(user.user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Review created", review, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/reviews/{id}",
    params(("id" = i64, Path, description = "Review ID")),
    responses(
        (status = 200, description = "Review", body = ApiResponse<Review>),
        (status = 404, description = "Review not found")
    ),
    tag = "Reviews"
)]
pub async fn get_review(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let review = state.reviews.get_review(id).await?;
    Ok(Json(ApiResponse::success("Review", review, None)))
}

#[utoipa::path(
    post,
    path = "/api/reviews/{id}/response",
    params(("id" = i64, Path, description = "Review ID")),
    request_body = HostResponseRequest,
    responses(
        (status = 200, description = "Host response added", body = ApiResponse<Review>),
        (status = 403, description = "Not the host of the property")
    ),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn respond_to_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<HostResponseRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let review = state
        .reviews
        .add_host_response(id, user.user_id, &payload.response)
        .await?;
    Ok(Json(ApiResponse::success("Response added", review, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/reviews/{id}/flag",
    params(("id" = i64, Path, description = "Review ID")),
    request_body = FlagReviewRequest,
    responses((status = 200, description = "Review flagged", body = ApiResponse<Review>)),
    security(("bearer_auth" = [])),
    tag = "Reviews"
)]
pub async fn flag_review(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    ValidatedJson(payload): ValidatedJson<FlagReviewRequest>,
) -> AppResult<Json<ApiResponse<Review>>> {
    let review = state.reviews.flag_review(id, user.user_id, &payload.reason).await?;
    Ok(Json(ApiResponse::success("Review flagged", review, Some(Meta::empty()))))
}
