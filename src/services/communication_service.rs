use std::collections::{BTreeSet, HashMap};

use chrono::Utc;
use validator::Validate;

use crate::{
    dto::messages::{
        ConversationOverview, CreateConversationRequest, MarkedRead, MessageWithSender,
        SendMessageRequest,
    },
    error::{AppError, AppResult},
    models::{
        Conversation, Message, NotificationKind, Property, PropertySummary, User, UserSummary,
    },
    services::{base::BaseService, notification_service::NotificationService},
    store::DataStore,
};

const MAX_MESSAGE_LEN: usize = 1000;
const PREVIEW_LEN: usize = 80;

fn preview(content: &str) -> String {
    if content.chars().count() <= PREVIEW_LEN {
        return content.to_string();
    }
    let cut: String = content.chars().take(PREVIEW_LEN).collect();
    format!("{cut}...")
}

fn same_members(conversation: &Conversation, members: &BTreeSet<i64>) -> bool {
    conversation.participants.iter().copied().collect::<BTreeSet<_>>() == *members
}

#[derive(Clone)]
pub struct CommunicationService {
    conversations: BaseService<Conversation>,
    messages: BaseService<Message>,
    users: BaseService<User>,
    properties: BaseService<Property>,
    notifications: NotificationService,
}

impl CommunicationService {
    pub fn new(store: &DataStore, notifications: NotificationService) -> Self {
        Self {
            conversations: BaseService::new(store, "conversation"),
            messages: BaseService::new(store, "message"),
            users: BaseService::new(store, "user"),
            properties: BaseService::new(store, "property"),
            notifications,
        }
    }

    /// Opens a conversation between `creator` and the requested users, or
    /// returns the one that already has exactly that participant set.
    pub async fn create_conversation(
        &self,
        creator: i64,
        req: CreateConversationRequest,
    ) -> AppResult<Conversation> {
        req.validate()?;
        let participants: BTreeSet<i64> =
            req.participants.iter().copied().chain([creator]).collect();
        if participants.len() < 2 {
            return Err(AppError::validation(
                "A conversation needs at least two distinct participants",
            ));
        }
        for id in &participants {
            if self.users.find(*id).await?.is_none() {
                return Err(AppError::validation(format!("User with ID {id} not found")));
            }
        }
        if let Some(property_id) = req.property_id {
            if self.properties.find(property_id).await?.is_none() {
                return Err(AppError::validation(format!(
                    "Property with ID {property_id} not found"
                )));
            }
        }

        let mut reused = None;
        let created = self
            .conversations
            .create_with(|existing| {
                if let Some(found) = existing.iter().find(|c| same_members(c, &participants)) {
                    reused = Some(found.clone());
                    return Err(AppError::conflict("Conversation already exists"));
                }
                Ok(Conversation {
                    id: 0,
                    participants: participants.iter().copied().collect(),
                    property_id: req.property_id,
                    status: "active".into(),
                    last_message_at: Utc::now(),
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            })
            .await;
        let conversation = match (created, reused) {
            (_, Some(conversation)) => conversation,
            (Ok(conversation), None) => {
                tracing::info!(conversation_id = conversation.id, creator, "conversation created");
                conversation
            }
            (Err(err), None) => return Err(err),
        };

        if let Some(text) = req.initial_message.filter(|m| !m.trim().is_empty()) {
            self.send_message(
                conversation.id,
                creator,
                SendMessageRequest {
                    content: text,
                    message_type: None,
                },
            )
            .await?;
        }
        Ok(conversation)
    }

    async fn participant_of(&self, conversation_id: i64, user_id: i64) -> AppResult<Conversation> {
        let conversation = self.conversations.get_by_id(conversation_id).await?;
        if !conversation.has_participant(user_id) {
            return Err(AppError::validation(
                "User does not have access to this conversation",
            ));
        }
        Ok(conversation)
    }

    pub async fn send_message(
        &self,
        conversation_id: i64,
        sender_id: i64,
        req: SendMessageRequest,
    ) -> AppResult<Message> {
        let conversation = self.conversations.get_by_id(conversation_id).await?;
        if !conversation.has_participant(sender_id) {
            return Err(AppError::validation(
                "Sender must be a participant in the conversation",
            ));
        }
        let content = req.content.trim().to_string();
        if content.is_empty() || content.chars().count() > MAX_MESSAGE_LEN {
            return Err(AppError::validation(
                "Message must be between 1 and 1000 characters",
            ));
        }
        let message_type = req.message_type.unwrap_or_else(|| "text".into());

        let message = self
            .messages
            .create_with(move |_| {
                Ok(Message {
                    id: 0,
                    conversation_id,
                    sender_id,
                    content,
                    message_type,
                    status: "sent".into(),
                    read_by: vec![sender_id],
                    read_at: None,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
            })
            .await?;

        let sent_at = message.created_at;
        self.conversations
            .update(conversation_id, move |c| {
                c.last_message_at = sent_at;
                Ok(())
            })
            .await?;

        let sender_name = self
            .users
            .find(sender_id)
            .await?
            .map(|u| u.first_name)
            .unwrap_or_else(|| "Someone".into());
        for recipient in conversation.participants.iter().filter(|id| **id != sender_id) {
            self.notifications
                .notify(
                    *recipient,
                    NotificationKind::Message,
                    format!("New message from {sender_name}"),
                    preview(&message.content),
                    Some(conversation_id),
                )
                .await;
        }

        tracing::debug!(message_id = message.id, conversation_id, sender_id, "message sent");
        Ok(message)
    }

    pub async fn get_user_conversations(&self, user_id: i64) -> AppResult<Vec<ConversationOverview>> {
        let mut conversations = self
            .conversations
            .find_by(|c| c.has_participant(user_id))
            .await?;
        conversations.sort_by(|a, b| b.last_message_at.cmp(&a.last_message_at));

        let ids: BTreeSet<i64> = conversations.iter().map(|c| c.id).collect();
        let messages = self
            .messages
            .find_by(|m| ids.contains(&m.conversation_id))
            .await?;
        let users: HashMap<i64, User> =
            self.users.all().await?.into_iter().map(|u| (u.id, u)).collect();
        let properties: HashMap<i64, Property> =
            self.properties.all().await?.into_iter().map(|p| (p.id, p)).collect();

        Ok(conversations
            .into_iter()
            .map(|conversation| {
                let thread: Vec<&Message> = messages
                    .iter()
                    .filter(|m| m.conversation_id == conversation.id)
                    .collect();
                let last_message = thread
                    .iter()
                    .max_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)))
                    .map(|m| (*m).clone());
                let unread_count = thread
                    .iter()
                    .filter(|m| m.sender_id != user_id && !m.read_by.contains(&user_id))
                    .count();
                ConversationOverview {
                    other_participants: conversation
                        .participants
                        .iter()
                        .filter(|id| **id != user_id)
                        .filter_map(|id| users.get(id).map(UserSummary::from))
                        .collect(),
                    property: conversation
                        .property_id
                        .and_then(|id| properties.get(&id))
                        .map(PropertySummary::from),
                    last_message,
                    unread_count,
                    conversation,
                }
            })
            .collect())
    }

    pub async fn get_conversation_messages(
        &self,
        conversation_id: i64,
        user_id: i64,
    ) -> AppResult<Vec<MessageWithSender>> {
        self.participant_of(conversation_id, user_id).await?;
        let mut messages = self
            .messages
            .find_by(|m| m.conversation_id == conversation_id)
            .await?;
        messages.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

        let users: HashMap<i64, User> =
            self.users.all().await?.into_iter().map(|u| (u.id, u)).collect();
        Ok(messages
            .into_iter()
            .map(|message| MessageWithSender {
                sender: users.get(&message.sender_id).map(UserSummary::from),
                message,
            })
            .collect())
    }

    /// Marks every message from other participants as read by `user_id`.
    pub async fn mark_messages_as_read(
        &self,
        conversation_id: i64,
        user_id: i64,
    ) -> AppResult<MarkedRead> {
        self.participant_of(conversation_id, user_id).await?;
        let now = Utc::now();
        let updated = self
            .messages
            .update_where(
                |m| {
                    m.conversation_id == conversation_id
                        && m.sender_id != user_id
                        && !m.read_by.contains(&user_id)
                },
                |m| {
                    m.read_by.push(user_id);
                    m.status = "read".into();
                    m.read_at = Some(now);
                    true
                },
            )
            .await?;
        Ok(MarkedRead { updated })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Notification;

    async fn fixture() -> anyhow::Result<(CommunicationService, DataStore, std::path::PathBuf)> {
        let dir = std::env::temp_dir().join(format!("stayhub_chat_{}", uuid::Uuid::new_v4()));
        let store = DataStore::open(&dir).await?;
        for (email, name) in [("ana@example.com", "Ana"), ("bo@example.com", "Bo"), ("cy@example.com", "Cy")] {
            store
                .collection::<User>()
                .create(User {
                    id: 0,
                    email: email.into(),
                    password_hash: String::new(),
                    first_name: name.into(),
                    last_name: "Test".into(),
                    phone: None,
                    avatar: None,
                    bio: None,
                    is_host: false,
                    is_verified: false,
                    is_active: true,
                    created_at: Utc::now(),
                    updated_at: Utc::now(),
                })
                .await?;
        }
        let service = CommunicationService::new(&store, NotificationService::new(&store));
        Ok((service, store, dir))
    }

    fn open(participants: Vec<i64>, initial: Option<&str>) -> CreateConversationRequest {
        CreateConversationRequest {
            participants,
            property_id: None,
            initial_message: initial.map(str::to_string),
        }
    }

    fn text(content: &str) -> SendMessageRequest {
        SendMessageRequest {
            content: content.into(),
            message_type: None,
        }
    }

    #[tokio::test]
    async fn conversations_are_deduplicated_by_participants() -> anyhow::Result<()> {
        let (service, _store, dir) = fixture().await?;

        let first = service.create_conversation(1, open(vec![2], Some("Hi Bo"))).await?;
        let again = service.create_conversation(2, open(vec![1, 1], None)).await?;
        assert_eq!(first.id, again.id);

        let group = service.create_conversation(1, open(vec![2, 3], None)).await?;
        assert_ne!(group.id, first.id);

        assert!(matches!(
            service.create_conversation(1, open(vec![1], None)).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.create_conversation(1, open(vec![99], None)).await,
            Err(AppError::Validation(_))
        ));

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test]
    async fn messages_flow_between_participants() -> anyhow::Result<()> {
        let (service, store, dir) = fixture().await?;
        let conversation = service.create_conversation(1, open(vec![2], Some("Hello"))).await?;
        service.send_message(conversation.id, 2, text("Hi there")).await?;
        service.send_message(conversation.id, 1, text("Is the flat free in May?")).await?;

        assert!(matches!(
            service.send_message(conversation.id, 3, text("intruder")).await,
            Err(AppError::Validation(msg)) if msg == "Sender must be a participant in the conversation"
        ));
        assert!(matches!(
            service.send_message(conversation.id, 1, text("   ")).await,
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            service.get_conversation_messages(conversation.id, 3).await,
            Err(AppError::Validation(_))
        ));

        let thread = service.get_conversation_messages(conversation.id, 2).await?;
        let contents: Vec<&str> = thread.iter().map(|m| m.message.content.as_str()).collect();
        assert_eq!(contents, vec!["Hello", "Hi there", "Is the flat free in May?"]);
        assert_eq!(thread[1].sender.as_ref().map(|s| s.first_name.as_str()), Some("Bo"));

        let overview = service.get_user_conversations(2).await?;
        assert_eq!(overview.len(), 1);
        assert_eq!(overview[0].unread_count, 2);
        assert_eq!(overview[0].other_participants.len(), 1);
        assert_eq!(
            overview[0].last_message.as_ref().map(|m| m.content.as_str()),
            Some("Is the flat free in May?")
        );

        let marked = service.mark_messages_as_read(conversation.id, 2).await?;
        assert_eq!(marked.updated, 2);
        assert_eq!(service.get_user_conversations(2).await?[0].unread_count, 0);
        assert_eq!(service.mark_messages_as_read(conversation.id, 2).await?.updated, 0);

        let inbox = store
            .collection::<Notification>()
            .find_by(|n| n.user_id == 2 && n.kind == NotificationKind::Message)
            .await?;
        assert_eq!(inbox.len(), 2);

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_opens_share_one_conversation() -> anyhow::Result<()> {
        let (service, store, dir) = fixture().await?;

        let mut handles = Vec::new();
        for creator in [1, 2, 1, 2] {
            let service = service.clone();
            let other = if creator == 1 { 2 } else { 1 };
            handles.push(tokio::spawn(async move {
                service.create_conversation(creator, open(vec![other], None)).await
            }));
        }
        let mut ids = BTreeSet::new();
        for handle in handles {
            ids.insert(handle.await??.id);
        }
        assert_eq!(ids.len(), 1);
        assert_eq!(store.collection::<Conversation>().load().await?.len(), 1);

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }
}
