use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::wishlists::{CreateWishlistRequest, WishlistDetailQuery, WishlistDetails, WishlistQuery},
    error::AppResult,
    extract::ValidatedJson,
    middleware::auth::AuthUser,
    models::Wishlist,
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_wishlists).post(create_wishlist))
        .route("/{id}", get(get_wishlist).delete(delete_wishlist))
        .route(
            "/{id}/properties/{property_id}",
            post(add_property).delete(remove_property),
        )
}

#[utoipa::path(
    get,
    path = "/api/wishlists",
    params(
        ("user_id" = Option<i64>, Query, description = "Owner filter"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20"),
    ),
    responses((status = 200, description = "Visible wishlists, newest first", body = ApiResponse<Vec<Wishlist>>)),
    security(("bearer_auth" = [])),
    tag = "Wishlists"
)]
pub async fn list_wishlists(
    State(state): State<AppState>,
    user: AuthUser,
    Query(query): Query<WishlistQuery>,
) -> AppResult<Json<ApiResponse<Vec<Wishlist>>>> {
    let pagination = Pagination::new(query.page, query.per_page);
    let page = state
        .wishlists
        .list(user.user_id, query.user_id, pagination)
        .await?;
    let meta = pagination.meta(page.total);
    Ok(Json(ApiResponse::success("Wishlists", page.items, Some(meta))))
}

#[utoipa::path(
    post,
    path = "/api/wishlists",
    request_body = CreateWishlistRequest,
    responses((status = 201, description = "Create wishlist", body = ApiResponse<Wishlist>)),
    security(("bearer_auth" = [])),
    tag = "Wishlists"
)]
pub async fn create_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateWishlistRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Wishlist>>)> {
    let wishlist = state.wishlists.create(user.user_id, payload).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Wishlist created", wishlist, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/wishlists/{id}",
    params(
        ("id" = i64, Path, description = "Wishlist ID"),
        ("include_properties" = Option<bool>, Query, description = "Attach property summaries"),
    ),
    responses(
        (status = 200, description = "Wishlist", body = ApiResponse<WishlistDetails>),
        (status = 403, description = "Private wishlist")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlists"
)]
pub async fn get_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Query(query): Query<WishlistDetailQuery>,
) -> AppResult<Json<ApiResponse<WishlistDetails>>> {
    let details = state
        .wishlists
        .get(user.user_id, id, query.include_properties.unwrap_or(false))
        .await?;
    Ok(Json(ApiResponse::success("Wishlist", details, None)))
}

#[utoipa::path(
    delete,
    path = "/api/wishlists/{id}",
    params(("id" = i64, Path, description = "Wishlist ID")),
    responses(
        (status = 200, description = "Deleted wishlist"),
        (status = 403, description = "Not the owner")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlists"
)]
pub async fn delete_wishlist(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<serde_json::Value>>> {
    state.wishlists.delete(user.user_id, id).await?;
    Ok(Json(ApiResponse::success(
        "Deleted",
        serde_json::json!({}),
        Some(Meta::empty()),
    )))
}

#[utoipa::path(
    post,
    path = "/api/wishlists/{id}/properties/{property_id}",
    params(
        ("id" = i64, Path, description = "Wishlist ID"),
        ("property_id" = i64, Path, description = "Property ID"),
    ),
    responses(
        (status = 200, description = "Property saved", body = ApiResponse<Wishlist>),
        (status = 404, description = "Property not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Wishlists"
)]
pub async fn add_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, property_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<Wishlist>>> {
    let wishlist = state
        .wishlists
        .add_property(user.user_id, id, property_id)
        .await?;
    Ok(Json(ApiResponse::success("Property saved", wishlist, Some(Meta::empty()))))
}

#[utoipa::path(
    delete,
    path = "/api/wishlists/{id}/properties/{property_id}",
    params(
        ("id" = i64, Path, description = "Wishlist ID"),
        ("property_id" = i64, Path, description = "Property ID"),
    ),
    responses((status = 200, description = "Property removed", body = ApiResponse<Wishlist>)),
    security(("bearer_auth" = [])),
    tag = "Wishlists"
)]
pub async fn remove_property(
    State(state): State<AppState>,
    user: AuthUser,
    Path((id, property_id)): Path<(i64, i64)>,
) -> AppResult<Json<ApiResponse<Wishlist>>> {
    let wishlist = state
        .wishlists
        .remove_property(user.user_id, id, property_id)
        .await?;
    Ok(Json(ApiResponse::success("Property removed", wishlist, Some(Meta::empty()))))
}
