use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::comment::{Comment, CommentResponse},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, AppError>;

    /// Comment joined with its author, if not deleted.
    async fn find_response(&self, id: Uuid) -> Result<Option<CommentResponse>, AppError>;

    async fn create(&self, comment: Comment) -> Result<Comment, AppError>;

    async fn update_content(&self, id: Uuid, content: String) -> Result<Comment, AppError>;

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Top-level comments of a quiz set, newest first.
    async fn list_top_level(
        &self,
        quiz_set_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentResponse>, AppError>;

    async fn count_top_level(&self, quiz_set_id: Uuid) -> Result<i64, AppError>;

    /// Direct replies, oldest first.
    async fn list_replies(&self, parent_id: Uuid) -> Result<Vec<CommentResponse>, AppError>;
}

#[derive(Clone)]
pub struct PgCommentRepository {
    pool: PgPool,
}

impl PgCommentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const COMMENT_RESPONSE_SELECT: &str = r#"
    SELECT c.id, c.quiz_set_id, c.user_id, u.username, c.content, c.parent_id,
           (SELECT COUNT(*) FROM comments r
             WHERE r.parent_id = c.id AND r.deleted_at IS NULL) AS reply_count,
           c.created_at, c.updated_at
    FROM comments c
    JOIN users u ON u.id = c.user_id
"#;

#[async_trait]
impl CommentRepository for PgCommentRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Comment>, AppError> {
        let comment = sqlx::query_as::<_, Comment>("SELECT * FROM comments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn find_response(&self, id: Uuid) -> Result<Option<CommentResponse>, AppError> {
        let sql = format!("{COMMENT_RESPONSE_SELECT} WHERE c.id = $1 AND c.deleted_at IS NULL");
        let comment = sqlx::query_as::<_, CommentResponse>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(comment)
    }

    async fn create(&self, comment: Comment) -> Result<Comment, AppError> {
        let created = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (id, user_id, quiz_set_id, parent_id, content, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING *
            "#,
        )
        .bind(comment.id)
        .bind(comment.user_id)
        .bind(comment.quiz_set_id)
        .bind(comment.parent_id)
        .bind(&comment.content)
        .bind(comment.created_at)
        .bind(comment.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create comment: {:?}", e);
            AppError::from(e)
        })?;
        Ok(created)
    }

    async fn update_content(&self, id: Uuid, content: String) -> Result<Comment, AppError> {
        let updated = sqlx::query_as::<_, Comment>(
            "UPDATE comments SET content = $2, updated_at = NOW() WHERE id = $1 RETURNING *",
        )
        .bind(id)
        .bind(content)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Comment not found".to_string()))?;
        Ok(updated)
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE comments SET deleted_at = $2, updated_at = $2 WHERE id = $1")
                .bind(id)
                .bind(at)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Comment not found".to_string()));
        }
        Ok(())
    }

    async fn list_top_level(
        &self,
        quiz_set_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<CommentResponse>, AppError> {
        let sql = format!(
            "{COMMENT_RESPONSE_SELECT}
             WHERE c.quiz_set_id = $1 AND c.parent_id IS NULL AND c.deleted_at IS NULL
             ORDER BY c.created_at DESC
             LIMIT $2 OFFSET $3"
        );
        let comments = sqlx::query_as::<_, CommentResponse>(&sql)
            .bind(quiz_set_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }

    async fn count_top_level(&self, quiz_set_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM comments
            WHERE quiz_set_id = $1 AND parent_id IS NULL AND deleted_at IS NULL
            "#,
        )
        .bind(quiz_set_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_replies(&self, parent_id: Uuid) -> Result<Vec<CommentResponse>, AppError> {
        let sql = format!(
            "{COMMENT_RESPONSE_SELECT}
             WHERE c.parent_id = $1 AND c.deleted_at IS NULL
             ORDER BY c.created_at ASC"
        );
        let comments = sqlx::query_as::<_, CommentResponse>(&sql)
            .bind(parent_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(comments)
    }
}
