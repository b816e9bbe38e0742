use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use uuid::Uuid;

use crate::models::quiz_set::QuizSetType;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LikeToggleResponse {
    pub liked: bool,
    pub like_count: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FavoriteToggleResponse {
    pub favorited: bool,
}

/// DTO for a favorited quiz set, including joined quiz set info.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct FavoriteQuizSetResponse {
    pub quiz_set_id: Uuid,
    pub title: String,
    pub quiz_type: QuizSetType,
    pub cover_image_url: Option<String>,
    pub favorited_at: DateTime<Utc>,
}
