use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Created -> Started -> Ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "tournament_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TournamentStatus {
    Created,
    Started,
    Ended,
}

impl TournamentStatus {
    pub fn can_transition_to(self, next: TournamentStatus) -> bool {
        matches!(
            (self, next),
            (TournamentStatus::Created, TournamentStatus::Started)
                | (TournamentStatus::Started, TournamentStatus::Ended)
        )
    }
}

/// Represents the 'tournaments' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Tournament {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_participants: i32,
    pub status: TournamentStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the 'tournament_quiz_sets' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TournamentQuizSet {
    pub tournament_id: Uuid,
    pub quiz_set_id: Uuid,
    /// Round (or day) in which this set is played, starting at 1.
    pub round_number: i32,
    pub created_at: DateTime<Utc>,
}

/// Represents the 'tournament_participants' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct TournamentParticipant {
    pub tournament_id: Uuid,
    pub participant_id: Uuid,
    pub joined_at: DateTime<Utc>,
}

/// Participant joined with the username.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct TournamentParticipantDetail {
    pub participant_id: Uuid,
    pub username: String,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
pub struct TournamentDetailDto {
    #[serde(flatten)]
    pub tournament: Tournament,
    pub quiz_sets: Vec<TournamentQuizSet>,
    pub participant_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct TournamentLeaderboardEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub username: String,
    pub total_score: i64,
    pub quiz_sets_completed: u32,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateTournamentRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[validate(range(min = 1, max = 100000, message = "Capacity must be at least 1"))]
    pub max_participants: i32,
}

/// DTO for updating a tournament. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateTournamentRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 100000))]
    pub max_participants: Option<i32>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddTournamentQuizSetRequest {
    pub quiz_set_id: Uuid,
    #[validate(range(min = 1, message = "Round number starts at 1"))]
    pub round_number: i32,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TournamentFilter {
    pub status: Option<TournamentStatus>,
}
