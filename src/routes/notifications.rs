use axum::{
    Json, Router,
    extract::{Path, Query, State},
    routing::{get, post},
};

use crate::{
    dto::{
        messages::MarkedRead,
        notifications::{NotificationQuery, UnreadCount},
    },
    error::AppResult,
    middleware::auth::AuthUser,
    models::Notification,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_notifications))
        .route("/unread-count", get(unread_count))
        .route("/read-all", post(mark_all_read))
        .route("/{id}", get(get_notification).delete(delete_notification))
        .route("/{id}/read", post(mark_read))
}

#[utoipa::path(
    get,
    path = "/api/notifications",
    params(
        ("is_read" = Option<bool>, Query, description = "Filter by read state"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses((status = 200, description = "Notifications, newest first", body = ApiResponse<Vec<Notification>>)),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn list_notifications(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<NotificationQuery>,
) -> AppResult<Json<ApiResponse<Vec<Notification>>>> {
    let pagination = Pagination::new(query.page, query.per_page);
    let page = state
        .notifications
        .list(user.user_id, query.is_read, pagination)
        .await?;
    let meta = pagination.meta(page.total);
    Ok(Json(ApiResponse::success("Notifications", page.items, Some(meta))))
}

#[utoipa::path(
    get,
    path = "/api/notifications/unread-count",
    responses((status = 200, description = "Unread notifications", body = ApiResponse<UnreadCount>)),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn unread_count(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<UnreadCount>>> {
    let unread_count = state.notifications.unread_count(user.user_id).await?;
    Ok(Json(ApiResponse::success(
        "Unread count",
        UnreadCount { unread_count },
        None,
    )))
}

#[utoipa::path(
    get,
    path = "/api/notifications/{id}",
    params(("id" = i64, Path, description = "Notification ID")),
    responses(
        (status = 200, description = "Notification", body = ApiResponse<Notification>),
        (status = 404, description = "Notification not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn get_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let notification = state.notifications.get(user.user_id, id).await?;
    Ok(Json(ApiResponse::success("Notification", notification, None)))
}

#[utoipa::path(
    post,
    path = "/api/notifications/{id}/read",
    params(("id" = i64, Path, description = "Notification ID")),
    responses((status = 200, description = "Marked as read", body = ApiResponse<Notification>)),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Notification>>> {
    let notification = state.notifications.mark_read(user.user_id, id).await?;
    Ok(Json(ApiResponse::success("Marked as read", notification, Some(Meta::empty()))))
}

#[utoipa::path(
    post,
    path = "/api/notifications/read-all",
    responses((status = 200, description = "All notifications marked as read", body = ApiResponse<MarkedRead>)),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn mark_all_read(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MarkedRead>>> {
    let updated = state.notifications.mark_all_read(user.user_id).await?;
    Ok(Json(ApiResponse::success(
        "Marked as read",
        MarkedRead { updated },
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    delete,
    path = "/api/notifications/{id}",
    params(("id" = i64, Path, description = "Notification ID")),
    responses((status = 200, description = "Deleted notification")),
    security(("bearer_auth" = [])),
    tag = "Notifications"
)]
pub async fn delete_notification(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.notifications.delete(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}
