use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::quiz::{Quiz, QuizQuizSet},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Quiz>, AppError>;

    async fn create(&self, quiz: Quiz) -> Result<Quiz, AppError>;

    async fn update(&self, quiz: Quiz) -> Result<Quiz, AppError>;

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError>;

    /// Non-deleted quizzes of a set, in `order_index` order.
    async fn list_by_quiz_set(&self, quiz_set_id: Uuid) -> Result<Vec<Quiz>, AppError>;

    async fn count_by_quiz_set(&self, quiz_set_id: Uuid) -> Result<i64, AppError>;

    async fn find_link(
        &self,
        quiz_id: Uuid,
        quiz_set_id: Uuid,
    ) -> Result<Option<QuizQuizSet>, AppError>;

    /// One past the highest `order_index` of the set, 0 for an empty set.
    async fn next_order_index(&self, quiz_set_id: Uuid) -> Result<i32, AppError>;

    async fn add_link(&self, link: QuizQuizSet) -> Result<(), AppError>;

    /// Returns false when no such link existed.
    async fn remove_link(&self, quiz_id: Uuid, quiz_set_id: Uuid) -> Result<bool, AppError>;
}

#[derive(Clone)]
pub struct PgQuizRepository {
    pool: PgPool,
}

impl PgQuizRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl QuizRepository for PgQuizRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Quiz>, AppError> {
        let quiz = sqlx::query_as::<_, Quiz>("SELECT * FROM quizzes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(quiz)
    }

    async fn create(&self, quiz: Quiz) -> Result<Quiz, AppError> {
        let created = sqlx::query_as::<_, Quiz>(
            r#"
            INSERT INTO quizzes
                (id, question_text, options, correct_answer, explanation, topic,
                 created_by, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING *
            "#,
        )
        .bind(quiz.id)
        .bind(&quiz.question_text)
        .bind(&quiz.options)
        .bind(&quiz.correct_answer)
        .bind(&quiz.explanation)
        .bind(&quiz.topic)
        .bind(quiz.created_by)
        .bind(quiz.created_at)
        .bind(quiz.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create quiz: {:?}", e);
            AppError::from(e)
        })?;
        Ok(created)
    }

    async fn update(&self, quiz: Quiz) -> Result<Quiz, AppError> {
        let updated = sqlx::query_as::<_, Quiz>(
            r#"
            UPDATE quizzes SET
                question_text = $2,
                options = $3,
                correct_answer = $4,
                explanation = $5,
                topic = $6,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(quiz.id)
        .bind(&quiz.question_text)
        .bind(&quiz.options)
        .bind(&quiz.correct_answer)
        .bind(&quiz.explanation)
        .bind(&quiz.topic)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Quiz not found".to_string()))?;
        Ok(updated)
    }

    async fn soft_delete(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE quizzes SET deleted_at = $2, updated_at = $2 WHERE id = $1")
                .bind(id)
                .bind(at)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Quiz not found".to_string()));
        }
        Ok(())
    }

    async fn list_by_quiz_set(&self, quiz_set_id: Uuid) -> Result<Vec<Quiz>, AppError> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT q.* FROM quizzes q
            JOIN quiz_quiz_sets l ON l.quiz_id = q.id
            WHERE l.quiz_set_id = $1 AND q.deleted_at IS NULL
            ORDER BY l.order_index ASC, q.created_at ASC
            "#,
        )
        .bind(quiz_set_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(quizzes)
    }

    async fn count_by_quiz_set(&self, quiz_set_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM quizzes q
            JOIN quiz_quiz_sets l ON l.quiz_id = q.id
            WHERE l.quiz_set_id = $1 AND q.deleted_at IS NULL
            "#,
        )
        .bind(quiz_set_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count)
    }

    async fn find_link(
        &self,
        quiz_id: Uuid,
        quiz_set_id: Uuid,
    ) -> Result<Option<QuizQuizSet>, AppError> {
        let link = sqlx::query_as::<_, QuizQuizSet>(
            "SELECT * FROM quiz_quiz_sets WHERE quiz_id = $1 AND quiz_set_id = $2",
        )
        .bind(quiz_id)
        .bind(quiz_set_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(link)
    }

    async fn next_order_index(&self, quiz_set_id: Uuid) -> Result<i32, AppError> {
        let next: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(order_index) + 1, 0) FROM quiz_quiz_sets WHERE quiz_set_id = $1",
        )
        .bind(quiz_set_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(next)
    }

    async fn add_link(&self, link: QuizQuizSet) -> Result<(), AppError> {
        sqlx::query(
            "INSERT INTO quiz_quiz_sets (quiz_id, quiz_set_id, order_index) VALUES ($1, $2, $3)",
        )
        .bind(link.quiz_id)
        .bind(link.quiz_set_id)
        .bind(link.order_index)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_link(&self, quiz_id: Uuid, quiz_set_id: Uuid) -> Result<bool, AppError> {
        let result =
            sqlx::query("DELETE FROM quiz_quiz_sets WHERE quiz_id = $1 AND quiz_set_id = $2")
                .bind(quiz_id)
                .bind(quiz_set_id)
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}
