use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        quiz::Quiz,
        quiz_attempt::{AttemptAnswer, BestScoreRow, QuizAttempt},
    },
    repositories::mistake_repository::{resolve_in, upsert_wrong_in},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait QuizAttemptRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<QuizAttempt>, AppError>;

    /// Inserts the attempt together with the ids of the questions served, in order.
    async fn create(&self, attempt: QuizAttempt, quiz_ids: Vec<Uuid>) -> Result<QuizAttempt, AppError>;

    /// Questions served when the attempt started, in serving order. Includes
    /// quizzes deleted or detached since.
    async fn served_quizzes(&self, attempt_id: Uuid) -> Result<Vec<Quiz>, AppError>;

    /// Writes an in-progress attempt back. `InvalidOperation` when it is no
    /// longer in progress.
    async fn update(&self, attempt: QuizAttempt) -> Result<QuizAttempt, AppError>;

    /// In one transaction: completes the in-progress attempt, stores the
    /// answers and updates the owner's mistake log (wrong answers recorded,
    /// correct ones resolved). `InvalidOperation` when the attempt was
    /// already finished.
    async fn complete(
        &self,
        attempt: QuizAttempt,
        answers: Vec<AttemptAnswer>,
    ) -> Result<QuizAttempt, AppError>;

    /// Newest first.
    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QuizAttempt>, AppError>;

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, AppError>;

    async fn list_completed_by_user(&self, user_id: Uuid) -> Result<Vec<QuizAttempt>, AppError>;

    /// Highest-scoring completed attempt, earliest completion on ties.
    async fn find_best(
        &self,
        user_id: Uuid,
        quiz_set_id: Uuid,
    ) -> Result<Option<QuizAttempt>, AppError>;

    /// One row per user: their best completed attempt on the set.
    async fn best_scores_for_set(&self, quiz_set_id: Uuid) -> Result<Vec<BestScoreRow>, AppError>;

    /// Completed attempts by any of `user_ids` on any of `quiz_set_ids`
    /// whose completion falls inside `[from, to]`.
    async fn list_completed_in_window(
        &self,
        user_ids: Vec<Uuid>,
        quiz_set_ids: Vec<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<QuizAttempt>, AppError>;

    async fn count_completed(&self) -> Result<i64, AppError>;
}

#[derive(Clone)]
pub struct PgQuizAttemptRepository {
    pool: PgPool,
}

impl PgQuizAttemptRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const UPDATE_ATTEMPT_SQL: &str = r#"
    UPDATE quiz_attempts SET
        status = $2,
        total_questions = $3,
        correct_answers = $4,
        wrong_answers = $5,
        score = $6,
        accuracy = $7,
        completed_at = $8,
        updated_at = NOW()
    WHERE id = $1 AND status = 'in_progress'
    RETURNING *
"#;

fn already_finished() -> AppError {
    AppError::InvalidOperation("Attempt is already finished".to_string())
}

fn update_attempt_query(
    attempt: &QuizAttempt,
) -> sqlx::query::QueryAs<'_, sqlx::Postgres, QuizAttempt, sqlx::postgres::PgArguments> {
    sqlx::query_as::<_, QuizAttempt>(UPDATE_ATTEMPT_SQL)
        .bind(attempt.id)
        .bind(attempt.status)
        .bind(attempt.total_questions)
        .bind(attempt.correct_answers)
        .bind(attempt.wrong_answers)
        .bind(attempt.score)
        .bind(attempt.accuracy)
        .bind(attempt.completed_at)
}

#[async_trait]
impl QuizAttemptRepository for PgQuizAttemptRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<QuizAttempt>, AppError> {
        let attempt = sqlx::query_as::<_, QuizAttempt>("SELECT * FROM quiz_attempts WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(attempt)
    }

    async fn create(&self, attempt: QuizAttempt, quiz_ids: Vec<Uuid>) -> Result<QuizAttempt, AppError> {
        let mut tx = self.pool.begin().await?;

        let created = sqlx::query_as::<_, QuizAttempt>(
            r#"
            INSERT INTO quiz_attempts
                (id, user_id, quiz_set_id, status, total_questions, correct_answers,
                 wrong_answers, score, accuracy, started_at, completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING *
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.user_id)
        .bind(attempt.quiz_set_id)
        .bind(attempt.status)
        .bind(attempt.total_questions)
        .bind(attempt.correct_answers)
        .bind(attempt.wrong_answers)
        .bind(attempt.score)
        .bind(attempt.accuracy)
        .bind(attempt.started_at)
        .bind(attempt.completed_at)
        .bind(attempt.created_at)
        .bind(attempt.updated_at)
        .fetch_one(&mut *tx)
        .await?;

        sqlx::query(
            r#"
            INSERT INTO attempt_questions (attempt_id, quiz_id, position)
            SELECT $1, served.quiz_id, (served.ord - 1)::INTEGER
            FROM UNNEST($2::UUID[]) WITH ORDINALITY AS served(quiz_id, ord)
            "#,
        )
        .bind(created.id)
        .bind(quiz_ids)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(created)
    }

    async fn served_quizzes(&self, attempt_id: Uuid) -> Result<Vec<Quiz>, AppError> {
        let quizzes = sqlx::query_as::<_, Quiz>(
            r#"
            SELECT q.* FROM attempt_questions aq
            JOIN quizzes q ON q.id = aq.quiz_id
            WHERE aq.attempt_id = $1
            ORDER BY aq.position ASC
            "#,
        )
        .bind(attempt_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(quizzes)
    }

    async fn update(&self, attempt: QuizAttempt) -> Result<QuizAttempt, AppError> {
        update_attempt_query(&attempt)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(already_finished)
    }

    async fn complete(
        &self,
        attempt: QuizAttempt,
        answers: Vec<AttemptAnswer>,
    ) -> Result<QuizAttempt, AppError> {
        let mut tx = self.pool.begin().await?;

        // Row lock first: a concurrent submit waits here, then sees the new status.
        let updated = update_attempt_query(&attempt)
            .fetch_optional(&mut *tx)
            .await?
            .ok_or_else(already_finished)?;

        for answer in &answers {
            sqlx::query(
                r#"
                INSERT INTO attempt_answers (id, attempt_id, quiz_id, user_answer, is_correct, created_at)
                VALUES ($1, $2, $3, $4, $5, $6)
                "#,
            )
            .bind(answer.id)
            .bind(answer.attempt_id)
            .bind(answer.quiz_id)
            .bind(&answer.user_answer)
            .bind(answer.is_correct)
            .bind(answer.created_at)
            .execute(&mut *tx)
            .await?;

            if answer.is_correct {
                resolve_in(&mut *tx, updated.user_id, answer.quiz_id, answer.created_at).await?;
            } else {
                upsert_wrong_in(&mut *tx, updated.user_id, answer.quiz_id, answer.created_at).await?;
            }
        }

        tx.commit().await?;
        Ok(updated)
    }

    async fn list_by_user(
        &self,
        user_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<QuizAttempt>, AppError> {
        let attempts = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT * FROM quiz_attempts
            WHERE user_id = $1
            ORDER BY started_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn count_by_user(&self, user_id: Uuid) -> Result<i64, AppError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    async fn list_completed_by_user(&self, user_id: Uuid) -> Result<Vec<QuizAttempt>, AppError> {
        let attempts = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT * FROM quiz_attempts
            WHERE user_id = $1 AND status = 'completed'
            ORDER BY completed_at ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn find_best(
        &self,
        user_id: Uuid,
        quiz_set_id: Uuid,
    ) -> Result<Option<QuizAttempt>, AppError> {
        let attempt = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT * FROM quiz_attempts
            WHERE user_id = $1 AND quiz_set_id = $2 AND status = 'completed'
            ORDER BY score DESC, completed_at ASC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .bind(quiz_set_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(attempt)
    }

    async fn best_scores_for_set(&self, quiz_set_id: Uuid) -> Result<Vec<BestScoreRow>, AppError> {
        let rows = sqlx::query_as::<_, BestScoreRow>(
            r#"
            SELECT DISTINCT ON (a.user_id)
                a.user_id, u.username, a.score, a.accuracy, a.completed_at
            FROM quiz_attempts a
            JOIN users u ON u.id = a.user_id
            WHERE a.quiz_set_id = $1
              AND a.status = 'completed'
              AND a.completed_at IS NOT NULL
              AND u.deleted_at IS NULL
            ORDER BY a.user_id, a.score DESC, a.completed_at ASC
            "#,
        )
        .bind(quiz_set_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows)
    }

    async fn list_completed_in_window(
        &self,
        user_ids: Vec<Uuid>,
        quiz_set_ids: Vec<Uuid>,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<QuizAttempt>, AppError> {
        let attempts = sqlx::query_as::<_, QuizAttempt>(
            r#"
            SELECT * FROM quiz_attempts
            WHERE user_id = ANY($1)
              AND quiz_set_id = ANY($2)
              AND status = 'completed'
              AND completed_at BETWEEN $3 AND $4
            "#,
        )
        .bind(user_ids)
        .bind(quiz_set_ids)
        .bind(from)
        .bind(to)
        .fetch_all(&self.pool)
        .await?;
        Ok(attempts)
    }

    async fn count_completed(&self) -> Result<i64, AppError> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM quiz_attempts WHERE status = 'completed'")
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }
}
