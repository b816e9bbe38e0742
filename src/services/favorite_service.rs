use std::sync::Arc;

use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        interaction::{FavoriteQuizSetResponse, FavoriteToggleResponse},
        pagination::{PagedResult, PaginationParams},
        user::Actor,
    },
    repositories::{
        interaction_repository::FavoriteRepository, quiz_set_repository::QuizSetRepository,
    },
};

#[derive(Clone)]
pub struct FavoriteService {
    favorites: Arc<dyn FavoriteRepository>,
    quiz_sets: Arc<dyn QuizSetRepository>,
}

impl FavoriteService {
    pub fn new(favorites: Arc<dyn FavoriteRepository>, quiz_sets: Arc<dyn QuizSetRepository>) -> Self {
        Self { favorites, quiz_sets }
    }

    pub async fn toggle_favorite(
        &self,
        actor: &Actor,
        quiz_set_id: Uuid,
    ) -> Result<FavoriteToggleResponse, AppError> {
        self.quiz_sets
            .find_by_id(quiz_set_id)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or(AppError::NotFound("Quiz set not found".to_string()))?;

        if self.favorites.exists(actor.id, quiz_set_id).await? {
            self.favorites.remove(actor.id, quiz_set_id).await?;
            Ok(FavoriteToggleResponse { favorited: false })
        } else {
            self.favorites.add(actor.id, quiz_set_id).await?;
            Ok(FavoriteToggleResponse { favorited: true })
        }
    }

    /// Newest favorite first; deleted quiz sets are skipped.
    pub async fn list_favorites(
        &self,
        user_id: Uuid,
        params: PaginationParams,
    ) -> Result<PagedResult<FavoriteQuizSetResponse>, AppError> {
        let page = params.resolve()?;
        let items = self
            .favorites
            .list_by_user(user_id, page.limit(), page.offset())
            .await?;
        let total = self.favorites.count_by_user(user_id).await?;
        Ok(PagedResult::new(items, total, page))
    }
}
