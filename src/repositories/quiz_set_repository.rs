use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::quiz_set::{QuizSet, QuizSetFilter},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizSetRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<QuizSet>, AppError>;

    /// Case-insensitive title lookup among non-deleted sets.
    async fn find_by_title(&self, title: &str) -> Result<Option<QuizSet>, AppError>;

    async fn create(&self, quiz_set: QuizSet) -> Result<QuizSet, AppError>;

    async fn update(&self, quiz_set: QuizSet) -> Result<QuizSet, AppError>;

    async fn list(
        &self,
        filter: QuizSetFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QuizSet>, AppError>;

    async fn count(&self, filter: QuizSetFilter) -> Result<i64, AppError>;

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    async fn restore(&self, id: Uuid) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgQuizSetRepository {
    pool: PgPool,
}

impl PgQuizSetRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Appends the WHERE clause shared by `list` and `count`.
fn push_filter(builder: &mut QueryBuilder<'_, Postgres>, filter: &QuizSetFilter) {
    builder.push(" WHERE deleted_at IS NULL");

    if filter.published_only {
        builder.push(" AND is_published = TRUE");
    }
    if let Some(quiz_type) = filter.quiz_type {
        builder.push(" AND quiz_type = ").push_bind(quiz_type);
    }
    if let Some(created_by) = filter.created_by {
        builder.push(" AND created_by = ").push_bind(created_by);
    }
    if let Some(q) = filter.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        builder
            .push(" AND title ILIKE ")
            .push_bind(format!("%{}%", q));
    }
}

#[async_trait]
impl QuizSetRepository for PgQuizSetRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<QuizSet>, AppError> {
        let quiz_set = sqlx::query_as::<_, QuizSet>("SELECT * FROM quiz_sets WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(quiz_set)
    }

    async fn find_by_title(&self, title: &str) -> Result<Option<QuizSet>, AppError> {
        let quiz_set = sqlx::query_as::<_, QuizSet>(
            "SELECT * FROM quiz_sets WHERE LOWER(title) = LOWER($1) AND deleted_at IS NULL",
        )
        .bind(title)
        .fetch_optional(&self.pool)
        .await?;
        Ok(quiz_set)
    }

    async fn create(&self, quiz_set: QuizSet) -> Result<QuizSet, AppError> {
        let created = sqlx::query_as::<_, QuizSet>(
            r#"
            INSERT INTO quiz_sets
                (id, title, description, quiz_type, cover_image_url, is_published,
                 is_premium_only, created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(quiz_set.id)
        .bind(&quiz_set.title)
        .bind(&quiz_set.description)
        .bind(quiz_set.quiz_type)
        .bind(&quiz_set.cover_image_url)
        .bind(quiz_set.is_published)
        .bind(quiz_set.is_premium_only)
        .bind(quiz_set.created_by)
        .bind(quiz_set.created_at)
        .bind(quiz_set.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create quiz set: {:?}", e);
            AppError::from(e)
        })?;
        Ok(created)
    }

    async fn update(&self, quiz_set: QuizSet) -> Result<QuizSet, AppError> {
        let updated = sqlx::query_as::<_, QuizSet>(
            r#"
            UPDATE quiz_sets SET
                title = $2,
                description = $3,
                quiz_type = $4,
                cover_image_url = $5,
                is_published = $6,
                is_premium_only = $7,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(quiz_set.id)
        .bind(&quiz_set.title)
        .bind(&quiz_set.description)
        .bind(quiz_set.quiz_type)
        .bind(&quiz_set.cover_image_url)
        .bind(quiz_set.is_published)
        .bind(quiz_set.is_premium_only)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Quiz set not found".to_string()))?;
        Ok(updated)
    }

    async fn list(
        &self,
        filter: QuizSetFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QuizSet>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT * FROM quiz_sets");
        push_filter(&mut builder, &filter);
        builder
            .push(" ORDER BY created_at DESC LIMIT ")
            .push_bind(limit)
            .push(" OFFSET ")
            .push_bind(offset);

        let sets = builder
            .build_query_as::<QuizSet>()
            .fetch_all(&self.pool)
            .await?;
        Ok(sets)
    }

    async fn count(&self, filter: QuizSetFilter) -> Result<i64, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM quiz_sets");
        push_filter(&mut builder, &filter);

        let count: i64 = builder
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE quiz_sets SET deleted_at = $2, updated_at = $2 WHERE id = $1")
                .bind(id)
                .bind(at)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Quiz set not found".to_string()));
        }
        Ok(())
    }

    async fn restore(&self, id: Uuid) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE quiz_sets SET deleted_at = NULL, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Quiz set not found".to_string()));
        }
        Ok(())
    }
}
