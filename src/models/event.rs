use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

/// Upcoming -> Active -> Ended. No other transitions exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "event_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    Upcoming,
    Active,
    Ended,
}

impl EventStatus {
    pub fn can_transition_to(self, next: EventStatus) -> bool {
        matches!(
            (self, next),
            (EventStatus::Upcoming, EventStatus::Active) | (EventStatus::Active, EventStatus::Ended)
        )
    }
}

/// Represents the 'events' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub quiz_set_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    pub max_participants: i32,
    pub status: EventStatus,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the 'event_participants' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct EventParticipant {
    pub event_id: Uuid,
    pub participant_id: Uuid,
    pub score: i32,
    pub accuracy: f64,
    pub final_rank: Option<i32>,
    pub joined_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl EventParticipant {
    pub fn new(event_id: Uuid, participant_id: Uuid) -> Self {
        Self {
            event_id,
            participant_id,
            score: 0,
            accuracy: 0.0,
            final_rank: None,
            joined_at: Utc::now(),
            finished_at: None,
        }
    }
}

/// Participant joined with the username, used for leaderboards.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EventParticipantDetail {
    pub participant_id: Uuid,
    pub username: String,
    pub score: i32,
    pub accuracy: f64,
    pub final_rank: Option<i32>,
    pub joined_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct EventDto {
    #[serde(flatten)]
    pub event: Event,
    pub participant_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct EventLeaderboardEntry {
    pub rank: u32,
    pub user_id: Uuid,
    pub username: String,
    pub score: i32,
    pub accuracy: f64,
    pub joined_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub quiz_set_id: Uuid,
    pub start_date: DateTime<Utc>,
    pub end_date: DateTime<Utc>,
    #[validate(range(min = 1, max = 100000, message = "Capacity must be at least 1"))]
    pub max_participants: i32,
}

/// DTO for updating an event. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateEventRequest {
    #[validate(length(min = 1, max = 200))]
    pub name: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub quiz_set_id: Option<Uuid>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 100000))]
    pub max_participants: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecordEventResultRequest {
    pub attempt_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventFilter {
    pub status: Option<EventStatus>,
}
