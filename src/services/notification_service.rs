use crate::{
    error::{AppError, AppResult},
    models::{Notification, NotificationKind},
    response::Page,
    routes::params::Pagination,
    services::base::BaseService,
    store::DataStore,
};

#[derive(Clone)]
pub struct NotificationService {
    base: BaseService<Notification>,
}

impl NotificationService {
    pub fn new(store: &DataStore) -> Self {
        Self {
            base: BaseService::new(store, "notification"),
        }
    }

    /// Best effort: a failed write is logged and otherwise ignored.
    pub async fn notify(
        &self,
        user_id: i64,
        kind: NotificationKind,
        title: impl Into<String>,
        message: impl Into<String>,
        related_id: Option<i64>,
    ) {
        let title = title.into();
        let message = message.into();
        let result = self
            .base
            .create_with(move |_| {
                Ok(Notification {
                    id: 0,
                    user_id,
                    kind,
                    title,
                    message,
                    related_id,
                    is_read: false,
                    created_at: chrono::Utc::now(),
                    updated_at: chrono::Utc::now(),
                })
            })
            .await;

        if let Err(err) = result {
            tracing::warn!(error = %err, user_id, kind = ?kind, "notification failed");
        }
    }

    pub async fn list(
        &self,
        user_id: i64,
        is_read: Option<bool>,
        pagination: Pagination,
    ) -> AppResult<Page<Notification>> {
        let mut items = self
            .base
            .find_by(|n| n.user_id == user_id && is_read.is_none_or(|read| n.is_read == read))
            .await?;
        items.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));

        let (skip, limit) = pagination.window();
        Ok(Page::slice(items, skip, limit))
    }

    pub async fn unread_count(&self, user_id: i64) -> AppResult<usize> {
        Ok(self
            .base
            .find_by(|n| n.user_id == user_id && !n.is_read)
            .await?
            .len())
    }

    /// A notification owned by someone else reads as missing.
    pub async fn get(&self, user_id: i64, id: i64) -> AppResult<Notification> {
        let notification = self.base.get_by_id(id).await?;
        if notification.user_id != user_id {
            return Err(AppError::not_found(self.base.domain(), id));
        }
        Ok(notification)
    }

    pub async fn mark_read(&self, user_id: i64, id: i64) -> AppResult<Notification> {
        self.get(user_id, id).await?;
        self.base
            .update(id, |n| {
                n.is_read = true;
                Ok(())
            })
            .await
    }

    pub async fn mark_all_read(&self, user_id: i64) -> AppResult<usize> {
        let updated = self
            .base
            .update_where(
                |n| n.user_id == user_id && !n.is_read,
                |n| {
                    n.is_read = true;
                    true
                },
            )
            .await?;
        tracing::info!(user_id, updated, "notifications marked read");
        Ok(updated)
    }

    pub async fn delete(&self, user_id: i64, id: i64) -> AppResult<()> {
        self.get(user_id, id).await?;
        self.base.delete(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn service() -> anyhow::Result<(NotificationService, std::path::PathBuf)> {
        let dir = std::env::temp_dir().join(format!("stayhub_notify_{}", uuid::Uuid::new_v4()));
        let store = DataStore::open(&dir).await?;
        Ok((NotificationService::new(&store), dir))
    }

    #[tokio::test]
    async fn notifications_are_scoped_to_their_owner() -> anyhow::Result<()> {
        let (service, dir) = service().await?;
        service.notify(1, NotificationKind::Booking, "Booked", "Your stay is booked", Some(7)).await;
        service.notify(1, NotificationKind::Payment, "Paid", "Payment received", Some(3)).await;
        service.notify(2, NotificationKind::Message, "Hi", "New message", None).await;

        let page = service.list(1, None, Pagination::default()).await?;
        assert_eq!(page.total, 2);
        assert_eq!(page.items[0].title, "Paid");
        assert_eq!(service.unread_count(1).await?, 2);

        let first = page.items[1].id;
        assert!(matches!(service.get(2, first).await, Err(AppError::NotFound(_))));

        service.mark_read(1, first).await?;
        assert_eq!(service.unread_count(1).await?, 1);
        let unread = service.list(1, Some(false), Pagination::default()).await?;
        assert_eq!(unread.total, 1);

        assert_eq!(service.mark_all_read(1).await?, 1);
        assert_eq!(service.unread_count(1).await?, 0);
        assert_eq!(service.unread_count(2).await?, 1);

        service.delete(1, first).await?;
        assert_eq!(service.list(1, None, Pagination::default()).await?.total, 1);

        let _ = tokio::fs::remove_dir_all(dir).await;
        Ok(())
    }
}
