use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Represents the 'user_mistakes' table.
/// One row per (user, quiz) the user has answered incorrectly at least once.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct UserMistake {
    pub id: Uuid,
    pub user_id: Uuid,
    pub quiz_id: Uuid,
    pub times_wrong: i32,
    pub times_attempted: i32,
    pub is_resolved: bool,
    pub last_attempted_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Mistake joined with the quiz it refers to.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserMistakeDetail {
    pub id: Uuid,
    pub quiz_id: Uuid,
    pub question_text: String,
    pub topic: Option<String>,
    pub times_wrong: i32,
    pub times_attempted: i32,
    pub is_resolved: bool,
    pub last_attempted_at: DateTime<Utc>,
}

/// Represents the 'user_weak_points' table.
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct WeakPoint {
    pub id: Uuid,
    pub user_id: Uuid,
    pub topic: String,
    pub mistake_count: i32,
    pub quiz_count: i32,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MistakeFilter {
    #[serde(default)]
    pub include_resolved: bool,
}
