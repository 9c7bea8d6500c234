use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post, put},
};

use crate::{
    dto::{
        bookings::{BookingStatusQuery, BookingWithProperty},
        payments::PaymentWithBooking,
        reviews::ReviewWithProperty,
        users::{ChangePasswordRequest, UpdateProfileRequest, UserListQuery},
    },
    error::AppResult,
    extract::ValidatedJson,
    middleware::auth::AuthUser,
    models::UserProfile,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_users))
        .route("/me", put(update_me).delete(delete_me))
        .route("/me/password", post(change_password))
        .route("/me/bookings", get(my_bookings))
        .route("/me/reviews", get(my_reviews))
        .route("/me/payments", get(my_payments))
        .route("/{id}", get(get_user))
}

#[utoipa::path(
    get,
    path = "/api/users",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
        ("is_host" = Option<bool>, Query, description = "Only hosts (true) or only guests (false)"),
    ),
    responses(
        (status = 200, description = "List users", body = ApiResponse<Vec<UserProfile>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<AppState>,
    _user: AuthUser,
    Query(pagination): Query<Pagination>,
    Query(query): Query<UserListQuery>,
) -> AppResult<Json<ApiResponse<Vec<UserProfile>>>> {
    let page = state.users.list_users(pagination, query.is_host).await?;
    let meta = pagination.meta(page.total);
    Ok(Json(ApiResponse::success("Users", page.items, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/api/users/{id}",
    params(("id" = i64, Path, description = "User ID")),
    responses(
        (status = 200, description = "User profile", body = ApiResponse<UserProfile>),
        (status = 404, description = "User not found")
    ),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state.users.get_user_profile(id).await?;
    Ok(Json(ApiResponse::success("User", profile, None)))
}

#[utoipa::path(
    put,
    path = "/api/users/me",
    request_body = UpdateProfileRequest,
    responses(
        (status = 200, description = "Updated profile", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid input")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn update_me(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state.users.update_profile(user.user_id, payload).await?;
    Ok(Json(ApiResponse::success("Profile updated", profile, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/users/me/password",
    request_body = ChangePasswordRequest,
    responses(
        (status = 200, description = "Password changed"),
        (status = 400, description = "Current password is incorrect")
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn change_password(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<ChangePasswordRequest>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.users.change_password(user.user_id, payload).await?;
    Ok(Json(ApiResponse::success(
        "Password changed",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/users/me",
    responses((status = 200, description = "Account deleted")),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn delete_me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.users.delete_user(user.user_id).await?;
    Ok(Json(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    get,
    path = "/api/users/me/bookings",
    params(("status" = Option<String>, Query, description = "Filter by booking status")),
    responses(
        (status = 200, description = "Bookings made by the caller", body = ApiResponse<Vec<BookingWithProperty>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn my_bookings(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<BookingStatusQuery>,
) -> AppResult<Json<ApiResponse<Vec<BookingWithProperty>>>> {
    let bookings = state.users.get_user_bookings(user.user_id, query.status).await?;
    Ok(Json(ApiResponse::success("Bookings", bookings, None)))
}

#[utoipa::path(
    get,
    path = "/api/users/me/reviews",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Reviews written by the caller", body = ApiResponse<Vec<ReviewWithProperty>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn my_reviews(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Vec<ReviewWithProperty>>>> {
    let page = state.reviews.get_user_reviews(user.user_id, pagination).await?;
    let meta = pagination.meta(page.total);
    Ok(Json(ApiResponse::success("Reviews", page.items, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/api/users/me/payments",
    params(
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses(
        (status = 200, description = "Payments on the caller's bookings", body = ApiResponse<Vec<PaymentWithBooking>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Users"
)]
pub async fn my_payments(
    State(state): State<AppState>,
    user: AuthUser,
    Query(pagination): Query<Pagination>,
) -> AppResult<Json<ApiResponse<Vec<PaymentWithBooking>>>> {
    let page = state.payments.get_user_payments(user.user_id, pagination).await?;
    let meta = pagination.meta(page.total);
    Ok(Json(ApiResponse::success("Payments", page.items, Some(meta))))
}
