use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppError, models::notification::Notification};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, AppError>;

    async fn create(&self, notification: Notification) -> Result<Notification, AppError>;

    async fn create_many(&self, notifications: Vec<Notification>) -> Result<(), AppError>;

    /// Newest first.
    async fn list_by_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, AppError>;

    async fn count_by_user(&self, user_id: Uuid, unread_only: bool) -> Result<i64, AppError>;

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> Result<Notification, AppError>;

    /// Returns the number of notifications that changed.
    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgNotificationRepository {
    pool: PgPool,
}

impl PgNotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INSERT_NOTIFICATION_SQL: &str = r#"
    INSERT INTO notifications
        (id, user_id, notification_type, title, message, is_read, created_at, read_at)
    VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
    RETURNING *
"#;

#[async_trait]
impl NotificationRepository for PgNotificationRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Notification>, AppError> {
        let notification =
            sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(notification)
    }

    async fn create(&self, notification: Notification) -> Result<Notification, AppError> {
        let created = sqlx::query_as::<_, Notification>(INSERT_NOTIFICATION_SQL)
            .bind(notification.id)
            .bind(notification.user_id)
            .bind(notification.notification_type)
            .bind(&notification.title)
            .bind(&notification.message)
            .bind(notification.is_read)
            .bind(notification.created_at)
            .bind(notification.read_at)
            .fetch_one(&self.pool)
            .await?;
        Ok(created)
    }

    async fn create_many(&self, notifications: Vec<Notification>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        for notification in &notifications {
            sqlx::query(INSERT_NOTIFICATION_SQL)
                .bind(notification.id)
                .bind(notification.user_id)
                .bind(notification.notification_type)
                .bind(&notification.title)
                .bind(&notification.message)
                .bind(notification.is_read)
                .bind(notification.created_at)
                .bind(notification.read_at)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Notification>, AppError> {
        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(notifications)
    }

    async fn count_by_user(&self, user_id: Uuid, unread_only: bool) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM notifications WHERE user_id = $1 AND (NOT $2 OR NOT is_read)",
        )
        .bind(user_id)
        .bind(unread_only)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn mark_read(&self, id: Uuid, at: DateTime<Utc>) -> Result<Notification, AppError> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications SET
                is_read = TRUE,
                read_at = COALESCE(read_at, $2)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Notification not found".to_string()))?;
        Ok(notification)
    }

    async fn mark_all_read(&self, user_id: Uuid, at: DateTime<Utc>) -> Result<u64, AppError> {
        let result = sqlx::query(
            "UPDATE notifications SET is_read = TRUE, read_at = $2 WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .bind(at)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected())
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Notification not found".to_string()));
        }
        Ok(())
    }
}
