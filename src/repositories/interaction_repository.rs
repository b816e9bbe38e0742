use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{error::AppError, models::interaction::FavoriteQuizSetResponse};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LikeRepository: Send + Sync {
    async fn exists(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<bool, AppError>;

    async fn add(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<(), AppError>;

    async fn remove(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<(), AppError>;

    async fn count_for_quiz_set(&self, quiz_set_id: Uuid) -> Result<i64, AppError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait FavoriteRepository: Send + Sync {
    async fn exists(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<bool, AppError>;

    async fn add(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<(), AppError>;

    async fn remove(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<(), AppError>;

    /// Favorited quiz sets that are not deleted, newest favorite first.
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FavoriteQuizSetResponse>, AppError>;

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, AppError>;
}

#[derive(Clone)]
pub struct PgLikeRepository {
    pool: PgPool,
}

impl PgLikeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LikeRepository for PgLikeRepository {
    async fn exists(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM quiz_set_likes WHERE user_id = $1 AND quiz_set_id = $2)",
        )
        .bind(user_id)
        .bind(quiz_set_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn add(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO quiz_set_likes (user_id, quiz_set_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(quiz_set_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM quiz_set_likes WHERE user_id = $1 AND quiz_set_id = $2")
            .bind(user_id)
            .bind(quiz_set_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn count_for_quiz_set(&self, quiz_set_id: Uuid) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quiz_set_likes WHERE quiz_set_id = $1")
                .bind(quiz_set_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}

#[derive(Clone)]
pub struct PgFavoriteRepository {
    pool: PgPool,
}

impl PgFavoriteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FavoriteRepository for PgFavoriteRepository {
    async fn exists(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<bool, AppError> {
        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS(SELECT 1 FROM quiz_set_favorites WHERE user_id = $1 AND quiz_set_id = $2)",
        )
        .bind(user_id)
        .bind(quiz_set_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(exists)
    }

    async fn add(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO quiz_set_favorites (user_id, quiz_set_id) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(user_id)
        .bind(quiz_set_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<(), AppError> {
        sqlx::query("DELETE FROM quiz_set_favorites WHERE user_id = $1 AND quiz_set_id = $2")
            .bind(user_id)
            .bind(quiz_set_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<FavoriteQuizSetResponse>, AppError> {
        let favorites = sqlx::query_as::<_, FavoriteQuizSetResponse>(
            r#"
            SELECT qs.id AS quiz_set_id, qs.title, qs.quiz_type, qs.cover_image_url,
                   f.created_at AS favorited_at
            FROM quiz_set_favorites f
            JOIN quiz_sets qs ON qs.id = f.quiz_set_id
            WHERE f.user_id = $1 AND qs.deleted_at IS NULL
            ORDER BY f.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(favorites)
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM quiz_set_favorites f
            JOIN quiz_sets qs ON qs.id = f.quiz_set_id
            WHERE f.user_id = $1 AND qs.deleted_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }
}
