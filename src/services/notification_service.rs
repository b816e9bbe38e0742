use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        notification::{Notification, NotificationType},
        pagination::{PagedResult, PaginationParams},
        user::Actor,
    },
    repositories::notification_repository::NotificationRepository,
};

#[derive(Clone)]
pub struct NotificationService {
    repo: Arc<dyn NotificationRepository>,
}

impl NotificationService {
    pub fn new(repo: Arc<dyn NotificationRepository>) -> Self {
        Self { repo }
    }

    pub async fn notify(
        &self,
        user_id: Uuid,
        notification_type: NotificationType,
        title: &str,
        message: &str,
    ) -> Result<Notification, AppError> {
        self.repo
            .create(Notification::new(user_id, notification_type, title, message))
            .await
    }

    /// Sends the same notification to every user in `user_ids`.
    pub async fn notify_many(
        &self,
        user_ids: &[Uuid],
        notification_type: NotificationType,
        title: &str,
        message: &str,
    ) -> Result<(), AppError> {
        if user_ids.is_empty() {
            return Ok(());
        }
        let notifications = user_ids
            .iter()
            .map(|id| Notification::new(*id, notification_type, title, message))
            .collect();
        self.repo.create_many(notifications).await?;

        tracing::debug!("Sent {} '{}' notifications", user_ids.len(), title);
        Ok(())
    }

    pub async fn list(
        &self,
        user_id: Uuid,
        unread_only: bool,
        params: PaginationParams,
    ) -> Result<PagedResult<Notification>, AppError> {
        let page = params.resolve()?;
        let items = self
            .repo
            .list_by_user(user_id, unread_only, page.limit(), page.offset())
            .await?;
        let total = self.repo.count_by_user(user_id, unread_only).await?;
        Ok(PagedResult::new(items, total, page))
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64, AppError> {
        self.repo.count_by_user(user_id, true).await
    }

    pub async fn mark_read(&self, actor: &Actor, id: Uuid) -> Result<Notification, AppError> {
        self.owned(actor, id).await?;
        self.repo.mark_read(id, Utc::now()).await
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, AppError> {
        self.repo.mark_all_read(user_id, Utc::now()).await
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        self.owned(actor, id).await?;
        self.repo.delete(id).await
    }

    async fn owned(&self, actor: &Actor, id: Uuid) -> Result<Notification, AppError> {
        let notification = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Notification not found".to_string()))?;
        if notification.user_id != actor.id {
            return Err(AppError::Forbidden(
                "You can only manage your own notifications".to_string(),
            ));
        }
        Ok(notification)
    }
}
