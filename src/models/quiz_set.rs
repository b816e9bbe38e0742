use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

use crate::models::user::Actor;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "quiz_set_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum QuizSetType {
    Practice,
    Placement,
    Event,
    Tournament,
}

/// Represents the 'quiz_sets' table in the database.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct QuizSet {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub quiz_type: QuizSetType,
    /// URL to the cover image.
    pub cover_image_url: Option<String>,
    pub is_published: bool,
    /// Only subscribers with premium access may start attempts.
    pub is_premium_only: bool,
    pub created_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl QuizSet {
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Author and moderators may see and change the set in any state.
    pub fn is_editable_by(&self, viewer: Option<&Actor>) -> bool {
        viewer.is_some_and(|actor| actor.is_owner_or_moderator(self.created_by))
    }

    /// Unpublished sets exist only for their editors.
    pub fn is_visible_to(&self, viewer: Option<&Actor>) -> bool {
        self.is_published || self.is_editable_by(viewer)
    }
}

/// Quiz set plus the counters shown on its detail page.
#[derive(Debug, Serialize)]
pub struct QuizSetDetailDto {
    #[serde(flatten)]
    pub quiz_set: QuizSet,
    pub quiz_count: i64,
    pub like_count: i64,
}

/// DTO for creating a new quiz set.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateQuizSetRequest {
    #[validate(length(min = 1, max = 200, message = "Title length must be between 1 and 200 chars"))]
    pub title: String,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub quiz_type: QuizSetType,
    #[validate(length(max = 500))]
    pub cover_image_url: Option<String>,
    #[serde(default)]
    pub is_premium_only: bool,
}

/// DTO for updating a quiz set. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateQuizSetRequest {
    #[validate(length(min = 1, max = 200, message = "Title length must be between 1 and 200 chars"))]
    pub title: Option<String>,
    #[validate(length(max = 5000))]
    pub description: Option<String>,
    pub quiz_type: Option<QuizSetType>,
    #[validate(length(max = 500))]
    pub cover_image_url: Option<String>,
    pub is_premium_only: Option<bool>,
}

/// Query parameters for listing quiz sets.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct QuizSetFilter {
    pub quiz_type: Option<QuizSetType>,
    /// Search keyword for title match.
    pub q: Option<String>,
    pub created_by: Option<Uuid>,
    /// Forced by the handler for anonymous listings.
    #[serde(skip)]
    pub published_only: bool,
}
