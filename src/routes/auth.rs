use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::{get, post},
};

use crate::{
    dto::auth::{LoginRequest, RegisterRequest, TokenResponse},
    error::AppResult,
    extract::ValidatedJson,
    middleware::auth::{AuthUser, bearer_token},
    models::UserProfile,
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/refresh", post(refresh))
        .route("/me", get(me))
}

#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Register user", body = ApiResponse<UserProfile>),
        (status = 400, description = "Invalid input"),
        (status = 409, description = "Email already registered")
    ),
    tag = "Auth"
)]
pub async fn register(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<RegisterRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<UserProfile>>)> {
    let user = state.auth.register_user(payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("User registered", user, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login user", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(payload): ValidatedJson<LoginRequest>,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let token = state.auth.login_user(payload).await?;
    Ok(Json(ApiResponse::success("Login successful", token, None)))
}

#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "Fresh access token", body = ApiResponse<TokenResponse>),
        (status = 401, description = "Invalid or expired token")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> AppResult<Json<ApiResponse<TokenResponse>>> {
    let token = state.auth.refresh_token(bearer_token(&headers)?).await?;
    Ok(Json(ApiResponse::success("Token refreshed", token, None)))
}

#[utoipa::path(
    get,
    path = "/api/auth/me",
    responses(
        (status = 200, description = "Current user", body = ApiResponse<UserProfile>),
        (status = 401, description = "Not authenticated")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UserProfile>>> {
    let profile = state.users.get_user_profile(user.user_id).await?;
    Ok(Json(ApiResponse::success("Current user", profile, None)))
}
