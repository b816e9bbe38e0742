use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::mistake::{UserMistake, UserMistakeDetail, WeakPoint},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait MistakeRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserMistake>, AppError>;

    async fn find_by_user_and_quiz(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Option<UserMistake>, AppError>;

    /// Inserts a fresh mistake or bumps both counters of the existing one,
    /// leaving it unresolved.
    async fn upsert_wrong(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<UserMistake, AppError>;

    /// Bumps `times_attempted` and marks the mistake resolved.
    async fn mark_resolved(&self, id: Uuid, at: DateTime<Utc>) -> Result<UserMistake, AppError>;

    async fn list_by_user(
        &self,
        user_id: Uuid,
        include_resolved: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserMistakeDetail>, AppError>;

    async fn count_by_user(&self, user_id: Uuid, include_resolved: bool) -> Result<i64, AppError>;

    async fn list_unresolved(&self, user_id: Uuid) -> Result<Vec<UserMistakeDetail>, AppError>;

    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeakPointRepository: Send + Sync {
    /// Drops the user's stored weak points and writes `points` in their place.
    async fn replace_for_user(&self, user_id: Uuid, points: Vec<WeakPoint>) -> Result<(), AppError>;

    /// Sorted by mistake count descending, then topic.
    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<WeakPoint>, AppError>;
}

#[derive(Clone)]
pub struct PgMistakeRepository {
    pool: PgPool,
}

impl PgMistakeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const MISTAKE_DETAIL_SELECT: &str = r#"
    SELECT m.id, m.quiz_id, q.question_text, q.topic,
           m.times_wrong, m.times_attempted, m.is_resolved, m.last_attempted_at
    FROM user_mistakes m
    JOIN quizzes q ON q.id = m.quiz_id
"#;

/// Mistake upsert on a caller-provided connection, so attempt completion can
/// run it inside its own transaction.
pub(crate) async fn upsert_wrong_in(
    conn: &mut PgConnection,
    user_id: Uuid,
    quiz_id: Uuid,
    at: DateTime<Utc>,
) -> Result<UserMistake, AppError> {
    let mistake = sqlx::query_as::<_, UserMistake>(
        r#"
        INSERT INTO user_mistakes
            (id, user_id, quiz_id, times_wrong, times_attempted, is_resolved,
             last_attempted_at, created_at, updated_at)
        VALUES ($1, $2, $3, 1, 1, FALSE, $4, $4, $4)
        ON CONFLICT (user_id, quiz_id) DO UPDATE SET
            times_wrong = user_mistakes.times_wrong + 1,
            times_attempted = user_mistakes.times_attempted + 1,
            is_resolved = FALSE,
            last_attempted_at = EXCLUDED.last_attempted_at,
            updated_at = EXCLUDED.updated_at
        RETURNING *
        "#,
    )
    .bind(Uuid::new_v4())
    .bind(user_id)
    .bind(quiz_id)
    .bind(at)
    .fetch_one(&mut *conn)
    .await?;
    Ok(mistake)
}

/// Resolves the user's mistake on `quiz_id`, if one exists.
pub(crate) async fn resolve_in(
    conn: &mut PgConnection,
    user_id: Uuid,
    quiz_id: Uuid,
    at: DateTime<Utc>,
) -> Result<(), AppError> {
    sqlx::query(
        r#"
        UPDATE user_mistakes SET
            times_attempted = times_attempted + 1,
            is_resolved = TRUE,
            last_attempted_at = $3,
            updated_at = $3
        WHERE user_id = $1 AND quiz_id = $2
        "#,
    )
    .bind(user_id)
    .bind(quiz_id)
    .bind(at)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

#[async_trait]
impl MistakeRepository for PgMistakeRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<UserMistake>, AppError> {
        let mistake = sqlx::query_as::<_, UserMistake>("SELECT * FROM user_mistakes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(mistake)
    }

    async fn find_by_user_and_quiz(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
    ) -> Result<Option<UserMistake>, AppError> {
        let mistake = sqlx::query_as::<_, UserMistake>(
            "SELECT * FROM user_mistakes WHERE user_id = $1 AND quiz_id = $2",
        )
        .bind(user_id)
        .bind(quiz_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(mistake)
    }

    async fn upsert_wrong(
        &self,
        user_id: Uuid,
        quiz_id: Uuid,
        at: DateTime<Utc>,
    ) -> Result<UserMistake, AppError> {
        let mut conn = self.pool.acquire().await?;
        upsert_wrong_in(&mut *conn, user_id, quiz_id, at).await
    }

    async fn mark_resolved(&self, id: Uuid, at: DateTime<Utc>) -> Result<UserMistake, AppError> {
        let mistake = sqlx::query_as::<_, UserMistake>(
            r#"
            UPDATE user_mistakes SET
                times_attempted = times_attempted + 1,
                is_resolved = TRUE,
                last_attempted_at = $2,
                updated_at = $2
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(at)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Mistake not found".to_string()))?;
        Ok(mistake)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        include_resolved: bool,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<UserMistakeDetail>, AppError> {
        let sql = format!(
            "{MISTAKE_DETAIL_SELECT}
             WHERE m.user_id = $1 AND ($2 OR NOT m.is_resolved)
             ORDER BY m.last_attempted_at DESC
             LIMIT $3 OFFSET $4"
        );
        let mistakes = sqlx::query_as::<_, UserMistakeDetail>(&sql)
            .bind(user_id)
            .bind(include_resolved)
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;
        Ok(mistakes)
    }

    async fn count_by_user(&self, user_id: Uuid, include_resolved: bool) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM user_mistakes WHERE user_id = $1 AND ($2 OR NOT is_resolved)",
        )
        .bind(user_id)
        .bind(include_resolved)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn list_unresolved(&self, user_id: Uuid) -> Result<Vec<UserMistakeDetail>, AppError> {
        let sql = format!(
            "{MISTAKE_DETAIL_SELECT}
             WHERE m.user_id = $1 AND NOT m.is_resolved AND q.deleted_at IS NULL"
        );
        let mistakes = sqlx::query_as::<_, UserMistakeDetail>(&sql)
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(mistakes)
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM user_mistakes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Mistake not found".to_string()));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct PgWeakPointRepository {
    pool: PgPool,
}

impl PgWeakPointRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl WeakPointRepository for PgWeakPointRepository {
    async fn replace_for_user(&self, user_id: Uuid, points: Vec<WeakPoint>) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM user_weak_points WHERE user_id = $1")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for point in &points {
            sqlx::query(
                r#"
                INSERT INTO user_weak_points (id, user_id, topic, mistake_count, quiz_count, updated_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(point.id)
            .bind(point.user_id)
            .bind(&point.topic)
            .bind(point.mistake_count)
            .bind(point.quiz_count)
            .bind(point.updated_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_by_user(&self, user_id: Uuid) -> Result<Vec<WeakPoint>, AppError> {
        let points = sqlx::query_as::<_, WeakPoint>(
            r#"
            SELECT * FROM user_weak_points
            WHERE user_id = $1
            ORDER BY mistake_count DESC, topic ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(points)
    }
}
