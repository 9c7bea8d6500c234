use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::models::{Conversation, Message, PropertySummary, UserSummary};

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct CreateConversationRequest {
    /// Other participants; the caller is always added.
    #[validate(length(min = 1, message = "At least one other participant is required"))]
    pub participants: Vec<i64>,
    pub property_id: Option<i64>,
    #[validate(length(min = 1, max = 1000))]
    pub initial_message: Option<String>,
}

#[derive(Debug, Clone, Deserialize, ToSchema, Validate)]
pub struct SendMessageRequest {
    #[validate(length(min = 1, max = 1000, message = "Message must be between 1 and 1000 characters"))]
    pub content: String,
    pub message_type: Option<String>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ConversationOverview {
    #[serde(flatten)]
    pub conversation: Conversation,
    pub other_participants: Vec<UserSummary>,
    pub property: Option<PropertySummary>,
    pub last_message: Option<Message>,
    pub unread_count: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MessageWithSender {
    #[serde(flatten)]
    pub message: Message,
    pub sender: Option<UserSummary>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct MarkedRead {
    pub updated: usize,
}
