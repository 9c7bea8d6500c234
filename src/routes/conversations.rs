use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
};

use crate::{
    dto::messages::{
        ConversationOverview, CreateConversationRequest, MarkedRead, MessageWithSender,
        SendMessageRequest,
    },
    error::AppResult,
    extract::ValidatedJson,
    middleware::auth::AuthUser,
    models::{Conversation, Message},
    response::{ApiResponse, Meta},
    state::AppState,
};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_conversations).post(create_conversation))
        .route("/{id}/messages", get(list_messages).post(send_message))
        .route("/{id}/read", post(mark_read))
}

#[utoipa::path(
    get,
    path = "/api/conversations",
    responses(
        (status = 200, description = "Caller's conversations, most recent first", body = ApiResponse<Vec<ConversationOverview>>)
    ),
    security(("bearer_auth" = [])),
    tag = "Conversations"
)]
pub async fn list_conversations(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<Vec<ConversationOverview>>>> {
    let conversations = state.conversations.get_user_conversations(user.user_id).await?;
    Ok(Json(ApiResponse::success("Conversations", conversations, None)))
}

#[utoipa::path(
    post,
    path = "/api/conversations",
    request_body = CreateConversationRequest,
    responses(
        (status = 201, description = "New or existing conversation", body = ApiResponse<Conversation>),
        (status = 400, description = "Invalid participants")
    ),
    security(("bearer_auth" = [])),
    tag = "Conversations"
)]
pub async fn create_conversation(
    State(state): State<AppState>,
    user: AuthUser,
    ValidatedJson(payload): ValidatedJson<CreateConversationRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Conversation>>)> {
    let conversation = state
        .conversations
        .create_conversation(user.user_id, payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Conversation", conversation, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    get,
    path = "/api/conversations/{id}/messages",
    params(("id" = i64, Path, description = "Conversation ID")),
    responses(
        (status = 200, description = "Messages, oldest first", body = ApiResponse<Vec<MessageWithSender>>),
        (status = 400, description = "Not a participant")
    ),
    security(("bearer_auth" = [])),
    tag = "Conversations"
)]
pub async fn list_messages(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<Vec<MessageWithSender>>>> {
    let messages = state
        .conversations
        .get_conversation_messages(id, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success("Messages", messages, None)))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}/messages",
    params(("id" = i64, Path, description = "Conversation ID")),
    request_body = SendMessageRequest,
    responses(
        (status = 201, description = "Message sent", body = ApiResponse<Message>),
        (status = 400, description = "Not a participant or invalid content")
    ),
    security(("bearer_auth" = [])),
    tag = "Conversations"
)]
pub async fn send_message(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
    Json(payload): Json<SendMessageRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<Message>>)> {
    let message = state
        .conversations
        .send_message(id, user.user_id, payload)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success("Message sent", message, Some(Meta::empty()))),
    ))
}

#[utoipa::path(
    post,
    path = "/api/conversations/{id}/read",
    params(("id" = i64, Path, description = "Conversation ID")),
    responses((status = 200, description = "Messages marked as read", body = ApiResponse<MarkedRead>)),
    security(("bearer_auth" = [])),
    tag = "Conversations"
)]
pub async fn mark_read(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i64>,
) -> AppResult<Json<ApiResponse<MarkedRead>>> {
    let marked = state
        .conversations
        .mark_messages_as_read(id, user.user_id)
        .await?;
    Ok(Json(ApiResponse::success("Marked as read", marked, None)))
}
