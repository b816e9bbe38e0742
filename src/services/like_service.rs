use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{interaction::LikeToggleResponse, user::Actor},
    repositories::{interaction_repository::LikeRepository, quiz_set_repository::QuizSetRepository},
};

#[derive(Clone)]
pub struct LikeService {
    likes: Arc<dyn LikeRepository>,
    quiz_sets: Arc<dyn QuizSetRepository>,
}

impl LikeService {
    pub fn new(likes: Arc<dyn LikeRepository>, quiz_sets: Arc<dyn QuizSetRepository>) -> Self {
        Self { likes, quiz_sets }
    }

    /// Likes the quiz set, or removes the like when one already exists.
    pub async fn toggle_like(
        &self,
        actor: &Actor,
        quiz_set_id: Uuid,
    ) -> Result<LikeToggleResponse, AppError> {
        self.quiz_sets
            .find_by_id(quiz_set_id)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or(AppError::NotFound("Quiz set not found".to_string()))?;

        let liked = if self.likes.exists(actor.id, quiz_set_id).await? {
            self.likes.remove(actor.id, quiz_set_id).await?;
            false
        } else {
            self.likes.add(actor.id, quiz_set_id).await?;
            true
        };
        let like_count = self.likes.count_for_quiz_set(quiz_set_id).await?;

        Ok(LikeToggleResponse { liked, like_count })
    }

    pub async fn like_count(&self, quiz_set_id: Uuid) -> Result<i64, AppError> {
        self.likes.count_for_quiz_set(quiz_set_id).await
    }

    pub async fn is_liked(&self, user_id: Uuid, quiz_set_id: Uuid) -> Result<bool, AppError> {
        self.likes.exists(user_id, quiz_set_id).await
    }

    /// Like state of a quiz set as seen by one user.
    pub async fn like_status(
        &self,
        user_id: Uuid,
        quiz_set_id: Uuid,
    ) -> Result<LikeToggleResponse, AppError> {
        Ok(LikeToggleResponse {
            liked: self.is_liked(user_id, quiz_set_id).await?,
            like_count: self.like_count(quiz_set_id).await?,
        })
    }
}
