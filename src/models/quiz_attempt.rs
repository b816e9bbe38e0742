// src/models/quiz_attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::quiz::QuizPublicDto;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "attempt_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum AttemptStatus {
    InProgress,
    Completed,
    Abandoned,
}

/// Represents the 'quiz_attempts' table in the database.
/// Stores one run of a user through a quiz set.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizAttempt {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_set_id: Uuid,
    pub status: AttemptStatus,
    pub total_questions: i32,
    pub correct_answers: i32,
    pub wrong_answers: i32,
    pub score: i32,
    /// Percentage in [0, 100], two decimals.
    pub accuracy: f64,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QuizAttempt {
    pub fn start(user_id: Uuid, quiz_set_id: Uuid, total_questions: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            user_id,
            quiz_set_id,
            status: AttemptStatus::InProgress,
            total_questions,
            correct_answers: 0,
            wrong_answers: 0,
            score: 0,
            accuracy: 0.0,
            started_at: now,
            completed_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Represents the 'attempt_answers' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct AttemptAnswer {
    pub id: Uuid,
    pub attempt_id: Uuid,
    pub quiz_id: Uuid,
    pub user_answer: Option<String>,
    pub is_correct: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartAttemptRequest {
    pub quiz_set_id: Uuid,
}

#[derive(Debug, Serialize)]
pub struct StartAttemptResponse {
    pub attempt: QuizAttempt,
    pub questions: Vec<QuizPublicDto>,
}

/// DTO for submitting a quiz attempt.
#[derive(Debug, Clone, Deserialize)]
pub struct SubmitAttemptRequest {
    /// User's answers map.
    /// Key: Quiz ID
    /// Value: User's selected option
    pub answers: HashMap<Uuid, String>,
}

/// Per-question feedback returned after submission.
#[derive(Debug, Clone, Serialize)]
pub struct AnswerResultDto {
    pub quiz_id: Uuid,
    pub user_answer: Option<String>,
    pub correct_answer: String,
    pub is_correct: bool,
    pub explanation: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct AttemptResultDto {
    pub attempt: QuizAttempt,
    pub answers: Vec<AnswerResultDto>,
}

/// Aggregated statistics over a user's completed attempts.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct UserAttemptStats {
    pub total_attempts: i64,
    pub total_questions: i64,
    pub total_correct: i64,
    pub total_wrong: i64,
    pub average_score: f64,
    pub best_score: i32,
    pub overall_accuracy: f64,
    pub current_streak: u32,
    pub longest_streak: u32,
}

/// Best completed attempt of one user on a quiz set, joined with the username.
#[derive(Debug, Clone, FromRow)]
pub struct BestScoreRow {
    pub user_id: Uuid,
    pub username: String,
    pub score: i32,
    pub accuracy: f64,
    pub completed_at: DateTime<Utc>,
}

/// Aggregated struct for displaying a quiz set leaderboard.
#[derive(Debug, Clone, Serialize)]
pub struct LeaderboardEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub username: String,
    pub score: i32,
    pub accuracy: f64,
    pub achieved_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LeaderboardParams {
    pub limit: Option<usize>,
}
