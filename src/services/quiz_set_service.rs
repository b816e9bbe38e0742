use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        pagination::{PagedResult, PaginationParams},
        quiz_set::{
            CreateQuizSetRequest, QuizSet, QuizSetDetailDto, QuizSetFilter, UpdateQuizSetRequest,
        },
        user::Actor,
    },
    repositories::{
        interaction_repository::LikeRepository, quiz_repository::QuizRepository,
        quiz_set_repository::QuizSetRepository,
    },
    utils::{html::clean_optional, validation::ensure_http_url},
};

#[derive(Clone)]
pub struct QuizSetService {
    quiz_sets: Arc<dyn QuizSetRepository>,
    quizzes: Arc<dyn QuizRepository>,
    likes: Arc<dyn LikeRepository>,
}

impl QuizSetService {
    pub fn new(
        quiz_sets: Arc<dyn QuizSetRepository>,
        quizzes: Arc<dyn QuizRepository>,
        likes: Arc<dyn LikeRepository>,
    ) -> Self {
        Self {
            quiz_sets,
            quizzes,
            likes,
        }
    }

    pub async fn create(&self, actor: &Actor, req: CreateQuizSetRequest) -> Result<QuizSet, AppError> {
        let title = normalized_title(&req.title)?;
        if self.quiz_sets.find_by_title(&title).await?.is_some() {
            return Err(AppError::Conflict(format!("Quiz set '{title}' already exists")));
        }
        let cover_image_url = normalized_url(req.cover_image_url)?;

        let now = Utc::now();
        let quiz_set = QuizSet {
            id: Uuid::new_v4(),
            title,
            description: clean_optional(req.description.as_deref()),
            quiz_type: req.quiz_type,
            cover_image_url,
            is_published: false,
            is_premium_only: req.is_premium_only,
            created_by: actor.id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let created = self.quiz_sets.create(quiz_set).await?;
        tracing::info!("Quiz set created: {} by {}", created.title, actor.id);
        Ok(created)
    }

    /// Active quiz set, `NotFound` when missing or deleted.
    pub async fn find_active(&self, id: Uuid) -> Result<QuizSet, AppError> {
        self.quiz_sets
            .find_by_id(id)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or(AppError::NotFound("Quiz set not found".to_string()))
    }

    /// `NotFound` for unpublished sets unless `viewer` may edit them.
    pub async fn get(&self, viewer: Option<&Actor>, id: Uuid) -> Result<QuizSetDetailDto, AppError> {
        let quiz_set = self.find_active(id).await?;
        if !quiz_set.is_visible_to(viewer) {
            return Err(AppError::NotFound("Quiz set not found".to_string()));
        }
        let quiz_count = self.quizzes.count_by_quiz_set(id).await?;
        let like_count = self.likes.count_for_quiz_set(id).await?;
        Ok(QuizSetDetailDto {
            quiz_set,
            quiz_count,
            like_count,
        })
    }

    pub async fn list(
        &self,
        filter: QuizSetFilter,
        params: PaginationParams,
    ) -> Result<PagedResult<QuizSet>, AppError> {
        let page = params.resolve()?;
        let items = self
            .quiz_sets
            .list(filter.clone(), page.limit(), page.offset())
            .await?;
        let total = self.quiz_sets.count(filter).await?;
        Ok(PagedResult::new(items, total, page))
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        req: UpdateQuizSetRequest,
    ) -> Result<QuizSet, AppError> {
        let mut quiz_set = self.editable(actor, id).await?;

        if let Some(title) = req.title {
            let title = normalized_title(&title)?;
            if let Some(existing) = self.quiz_sets.find_by_title(&title).await? {
                if existing.id != id {
                    return Err(AppError::Conflict(format!("Quiz set '{title}' already exists")));
                }
            }
            quiz_set.title = title;
        }
        if let Some(description) = req.description {
            quiz_set.description = clean_optional(Some(&description));
        }
        if let Some(quiz_type) = req.quiz_type {
            quiz_set.quiz_type = quiz_type;
        }
        if req.cover_image_url.is_some() {
            quiz_set.cover_image_url = normalized_url(req.cover_image_url)?;
        }
        if let Some(premium) = req.is_premium_only {
            quiz_set.is_premium_only = premium;
        }

        self.quiz_sets.update(quiz_set).await
    }

    pub async fn publish(&self, actor: &Actor, id: Uuid) -> Result<QuizSet, AppError> {
        let mut quiz_set = self.editable(actor, id).await?;
        if self.quizzes.count_by_quiz_set(id).await? == 0 {
            return Err(AppError::InvalidOperation(
                "Cannot publish a quiz set without quizzes".to_string(),
            ));
        }
        quiz_set.is_published = true;
        let updated = self.quiz_sets.update(quiz_set).await?;
        tracing::info!("Quiz set published: {}", updated.id);
        Ok(updated)
    }

    pub async fn unpublish(&self, actor: &Actor, id: Uuid) -> Result<QuizSet, AppError> {
        let mut quiz_set = self.editable(actor, id).await?;
        quiz_set.is_published = false;
        self.quiz_sets.update(quiz_set).await
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        self.editable(actor, id).await?;
        self.quiz_sets.soft_delete(id, Utc::now()).await?;
        tracing::info!("Quiz set {} deleted by {}", id, actor.id);
        Ok(())
    }

    pub async fn restore(&self, actor: &Actor, id: Uuid) -> Result<QuizSet, AppError> {
        if !actor.can_moderate() {
            return Err(AppError::Forbidden("Moderator access required".to_string()));
        }
        let mut quiz_set = self
            .quiz_sets
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Quiz set not found".to_string()))?;
        if !quiz_set.is_deleted() {
            return Err(AppError::InvalidOperation("Quiz set is not deleted".to_string()));
        }
        if self.quiz_sets.find_by_title(&quiz_set.title).await?.is_some() {
            return Err(AppError::Conflict(format!(
                "Quiz set '{}' already exists",
                quiz_set.title
            )));
        }

        self.quiz_sets.restore(id).await?;
        quiz_set.deleted_at = None;
        Ok(quiz_set)
    }

    /// Owner, moderator or admin may modify a set.
    async fn editable(&self, actor: &Actor, id: Uuid) -> Result<QuizSet, AppError> {
        let quiz_set = self.find_active(id).await?;
        if !actor.is_owner_or_moderator(quiz_set.created_by) {
            return Err(AppError::Forbidden(
                "You do not have permission to modify this quiz set".to_string(),
            ));
        }
        Ok(quiz_set)
    }
}

fn normalized_title(title: &str) -> Result<String, AppError> {
    let title = title.trim();
    if title.is_empty() || title.chars().count() > 200 {
        return Err(AppError::BadRequest(
            "Title length must be between 1 and 200 chars".to_string(),
        ));
    }
    Ok(title.to_string())
}

fn normalized_url(url: Option<String>) -> Result<Option<String>, AppError> {
    match url.map(|u| u.trim().to_string()).filter(|u| !u.is_empty()) {
        Some(url) => {
            ensure_http_url("cover_image_url", &url)?;
            Ok(Some(url))
        }
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{quiz_set::QuizSetType, user::UserRole},
        repositories::{
            interaction_repository::MockLikeRepository, quiz_repository::MockQuizRepository,
            quiz_set_repository::MockQuizSetRepository,
        },
    };

    fn quiz_set(owner: Uuid) -> QuizSet {
        let now = Utc::now();
        QuizSet {
            id: Uuid::new_v4(),
            title: "Ownership basics".to_string(),
            description: None,
            quiz_type: QuizSetType::Practice,
            cover_image_url: None,
            is_published: false,
            is_premium_only: false,
            created_by: owner,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn service(
        sets: MockQuizSetRepository,
        quizzes: MockQuizRepository,
    ) -> QuizSetService {
        QuizSetService::new(Arc::new(sets), Arc::new(quizzes), Arc::new(MockLikeRepository::new()))
    }

    fn create_request(title: &str) -> CreateQuizSetRequest {
        CreateQuizSetRequest {
            title: title.to_string(),
            description: Some("<p>Borrowing</p><script>x()</script>".to_string()),
            quiz_type: QuizSetType::Practice,
            cover_image_url: Some("https://cdn.example.com/c.png".to_string()),
            is_premium_only: false,
        }
    }

    #[tokio::test]
    async fn create_sanitises_description_and_starts_unpublished() {
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);
        let mut sets = MockQuizSetRepository::new();
        sets.expect_find_by_title().times(1).returning(|_| Ok(None));
        sets.expect_create()
            .withf(|s| s.description.as_deref() == Some("<p>Borrowing</p>") && !s.is_published)
            .times(1)
            .returning(Ok);

        let created = service(sets, MockQuizRepository::new())
            .create(&actor, create_request("  Ownership basics "))
            .await
            .unwrap();
        assert_eq!(created.title, "Ownership basics");
        assert_eq!(created.created_by, actor.id);
    }

    #[tokio::test]
    async fn create_rejects_duplicate_title() {
        let existing = quiz_set(Uuid::new_v4());
        let mut sets = MockQuizSetRepository::new();
        sets.expect_find_by_title()
            .times(1)
            .return_once(move |_| Ok(Some(existing)));
        sets.expect_create().times(0);

        let err = service(sets, MockQuizRepository::new())
            .create(&Actor::new(Uuid::new_v4(), UserRole::User), create_request("Ownership basics"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[tokio::test]
    async fn create_rejects_blank_title() {
        let err = service(MockQuizSetRepository::new(), MockQuizRepository::new())
            .create(&Actor::new(Uuid::new_v4(), UserRole::User), create_request("   "))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn update_by_stranger_is_forbidden() {
        let set = quiz_set(Uuid::new_v4());
        let id = set.id;
        let mut sets = MockQuizSetRepository::new();
        sets.expect_find_by_id().times(1).return_once(move |_| Ok(Some(set)));
        sets.expect_update().times(0);

        let err = service(sets, MockQuizRepository::new())
            .update(
                &Actor::new(Uuid::new_v4(), UserRole::User),
                id,
                UpdateQuizSetRequest::default(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn publish_requires_quizzes() {
        let owner = Uuid::new_v4();
        let set = quiz_set(owner);
        let id = set.id;
        let mut sets = MockQuizSetRepository::new();
        sets.expect_find_by_id().times(1).return_once(move |_| Ok(Some(set)));
        sets.expect_update().times(0);
        let mut quizzes = MockQuizRepository::new();
        quizzes.expect_count_by_quiz_set().times(1).returning(|_| Ok(0));

        let err = service(sets, quizzes)
            .publish(&Actor::new(owner, UserRole::User), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn moderator_can_publish_foreign_set() {
        let set = quiz_set(Uuid::new_v4());
        let id = set.id;
        let mut sets = MockQuizSetRepository::new();
        sets.expect_find_by_id().times(1).return_once(move |_| Ok(Some(set)));
        sets.expect_update()
            .withf(|s| s.is_published)
            .times(1)
            .returning(Ok);
        let mut quizzes = MockQuizRepository::new();
        quizzes.expect_count_by_quiz_set().times(1).returning(|_| Ok(4));

        let published = service(sets, quizzes)
            .publish(&Actor::new(Uuid::new_v4(), UserRole::Moderator), id)
            .await
            .unwrap();
        assert!(published.is_published);
    }

    #[tokio::test]
    async fn deleted_set_is_not_found() {
        let mut set = quiz_set(Uuid::new_v4());
        set.deleted_at = Some(Utc::now());
        let mut sets = MockQuizSetRepository::new();
        sets.expect_find_by_id().times(1).return_once(move |_| Ok(Some(set)));

        let err = service(sets, MockQuizRepository::new())
            .get(None, Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn unpublished_set_is_not_found_for_other_viewers() {
        let set = quiz_set(Uuid::new_v4());
        let id = set.id;
        let mut sets = MockQuizSetRepository::new();
        sets.expect_find_by_id().times(2).returning(move |_| Ok(Some(set.clone())));
        let mut quizzes = MockQuizRepository::new();
        quizzes.expect_count_by_quiz_set().times(0);
        let service = service(sets, quizzes);

        let anonymous = service.get(None, id).await.unwrap_err();
        assert!(matches!(anonymous, AppError::NotFound(_)));

        let stranger = Actor::new(Uuid::new_v4(), UserRole::User);
        let err = service.get(Some(&stranger), id).await.unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn restore_is_moderator_only() {
        let err = service(MockQuizSetRepository::new(), MockQuizRepository::new())
            .restore(&Actor::new(Uuid::new_v4(), UserRole::User), Uuid::new_v4())
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
