use std::sync::Arc;

use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::MAX_COMMENT_LENGTH,
    error::AppError,
    models::{
        comment::{Comment, CommentResponse, CreateCommentRequest},
        notification::NotificationType,
        pagination::{PagedResult, PaginationParams},
        user::Actor,
    },
    repositories::{comment_repository::CommentRepository, quiz_set_repository::QuizSetRepository},
    services::notification_service::NotificationService,
    utils::html::clean_html,
};

#[derive(Clone)]
pub struct CommentService {
    comments: Arc<dyn CommentRepository>,
    quiz_sets: Arc<dyn QuizSetRepository>,
    notifications: Arc<NotificationService>,
}

impl CommentService {
    pub fn new(
        comments: Arc<dyn CommentRepository>,
        quiz_sets: Arc<dyn QuizSetRepository>,
        notifications: Arc<NotificationService>,
    ) -> Self {
        Self {
            comments,
            quiz_sets,
            notifications,
        }
    }

    pub async fn create(
        &self,
        actor: &Actor,
        quiz_set_id: Uuid,
        req: CreateCommentRequest,
    ) -> Result<CommentResponse, AppError> {
        let content = sanitized_content(&req.content)?;
        self.ensure_quiz_set(quiz_set_id).await?;

        // Replies must stay inside the same quiz set.
        let parent = match req.parent_id {
            Some(parent_id) => {
                let parent = self
                    .active(parent_id)
                    .await
                    .map_err(|_| AppError::NotFound("Parent comment not found".to_string()))?;
                if parent.quiz_set_id != quiz_set_id {
                    return Err(AppError::BadRequest(
                        "Parent comment belongs to another quiz set".to_string(),
                    ));
                }
                Some(parent)
            }
            None => None,
        };

        let now = Utc::now();
        let created = self
            .comments
            .create(Comment {
                id: Uuid::new_v4(),
                user_id: actor.id,
                quiz_set_id,
                parent_id: parent.as_ref().map(|p| p.id),
                content,
                created_at: now,
                updated_at: now,
                deleted_at: None,
            })
            .await?;

        if let Some(parent) = parent.filter(|p| p.user_id != actor.id) {
            self.notifications
                .notify(
                    parent.user_id,
                    NotificationType::Comment,
                    "New reply",
                    "Someone replied to your comment.",
                )
                .await?;
        }

        self.response(created.id).await
    }

    /// Top-level comments, newest first.
    pub async fn list_by_quiz_set(
        &self,
        quiz_set_id: Uuid,
        params: PaginationParams,
    ) -> Result<PagedResult<CommentResponse>, AppError> {
        let page = params.resolve()?;
        self.ensure_quiz_set(quiz_set_id).await?;

        let items = self
            .comments
            .list_top_level(quiz_set_id, page.limit(), page.offset())
            .await?;
        let total = self.comments.count_top_level(quiz_set_id).await?;
        Ok(PagedResult::new(items, total, page))
    }

    /// Replies, oldest first.
    pub async fn list_replies(&self, comment_id: Uuid) -> Result<Vec<CommentResponse>, AppError> {
        self.active(comment_id).await?;
        self.comments.list_replies(comment_id).await
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        content: &str,
    ) -> Result<CommentResponse, AppError> {
        let comment = self.active(id).await?;
        if comment.user_id != actor.id {
            return Err(AppError::Forbidden(
                "You can only edit your own comments".to_string(),
            ));
        }
        let content = sanitized_content(content)?;
        self.comments.update_content(id, content).await?;
        self.response(id).await
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        let comment = self.active(id).await?;
        if !actor.is_owner_or_moderator(comment.user_id) {
            return Err(AppError::Forbidden(
                "You can only delete your own comments".to_string(),
            ));
        }
        self.comments.soft_delete(id, Utc::now()).await?;
        tracing::info!("Comment {} deleted by {}", id, actor.id);
        Ok(())
    }

    async fn active(&self, id: Uuid) -> Result<Comment, AppError> {
        self.comments
            .find_by_id(id)
            .await?
            .filter(|c| !c.is_deleted())
            .ok_or(AppError::NotFound("Comment not found".to_string()))
    }

    async fn response(&self, id: Uuid) -> Result<CommentResponse, AppError> {
        self.comments
            .find_response(id)
            .await?
            .ok_or(AppError::NotFound("Comment not found".to_string()))
    }

    async fn ensure_quiz_set(&self, id: Uuid) -> Result<(), AppError> {
        self.quiz_sets
            .find_by_id(id)
            .await?
            .filter(|s| !s.is_deleted())
            .map(|_| ())
            .ok_or(AppError::NotFound("Quiz set not found".to_string()))
    }
}

/// Sanitises then checks the 1..=MAX_COMMENT_LENGTH character bound.
fn sanitized_content(raw: &str) -> Result<String, AppError> {
    let content = clean_html(raw).trim().to_string();
    let len = content.chars().count();
    if len == 0 || len > MAX_COMMENT_LENGTH {
        return Err(AppError::BadRequest(format!(
            "Comment must be between 1 and {MAX_COMMENT_LENGTH} characters"
        )));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        models::{
            quiz_set::{QuizSet, QuizSetType},
            user::UserRole,
        },
        repositories::{
            comment_repository::MockCommentRepository,
            notification_repository::MockNotificationRepository,
            quiz_set_repository::MockQuizSetRepository,
        },
    };

    struct Mocks {
        comments: MockCommentRepository,
        sets: MockQuizSetRepository,
        notifications: MockNotificationRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                comments: MockCommentRepository::new(),
                sets: MockQuizSetRepository::new(),
                notifications: MockNotificationRepository::new(),
            }
        }

        fn with_quiz_set(mut self) -> Self {
            self.sets.expect_find_by_id().returning(|id| {
                let now = Utc::now();
                Ok(Some(QuizSet {
                    id,
                    title: "Set".to_string(),
                    description: None,
                    quiz_type: QuizSetType::Practice,
                    cover_image_url: None,
                    is_published: true,
                    is_premium_only: false,
                    created_by: Uuid::new_v4(),
                    created_at: now,
                    updated_at: now,
                    deleted_at: None,
                }))
            });
            self
        }

        fn into_service(self) -> CommentService {
            CommentService::new(
                Arc::new(self.comments),
                Arc::new(self.sets),
                Arc::new(NotificationService::new(Arc::new(self.notifications))),
            )
        }
    }

    fn comment(user_id: Uuid, quiz_set_id: Uuid) -> Comment {
        let now = Utc::now();
        Comment {
            id: Uuid::new_v4(),
            user_id,
            quiz_set_id,
            parent_id: None,
            content: "Nice set".to_string(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn response_for(c: &Comment) -> CommentResponse {
        CommentResponse {
            id: c.id,
            quiz_set_id: c.quiz_set_id,
            user_id: c.user_id,
            username: "someone".to_string(),
            content: c.content.clone(),
            parent_id: c.parent_id,
            reply_count: 0,
            created_at: c.created_at,
            updated_at: c.updated_at,
        }
    }

    fn request(content: &str, parent_id: Option<Uuid>) -> CreateCommentRequest {
        CreateCommentRequest {
            content: content.to_string(),
            parent_id,
        }
    }

    #[test]
    fn content_is_sanitised_and_bounded() {
        assert_eq!(sanitized_content("<b>hi</b><script>x</script>").unwrap(), "<b>hi</b>");
        assert!(sanitized_content("<script>only</script>").is_err());
        assert!(sanitized_content(&"a".repeat(MAX_COMMENT_LENGTH)).is_ok());
        assert!(sanitized_content(&"a".repeat(MAX_COMMENT_LENGTH + 1)).is_err());
    }

    #[tokio::test]
    async fn reply_notifies_parent_author() {
        let set_id = Uuid::new_v4();
        let parent_author = Uuid::new_v4();
        let parent = comment(parent_author, set_id);
        let parent_id = parent.id;

        let mut m = Mocks::new().with_quiz_set();
        m.comments.expect_find_by_id().times(1).return_once(move |_| Ok(Some(parent)));
        m.comments.expect_create()
            .withf(move |c| c.parent_id == Some(parent_id))
            .times(1)
            .returning(Ok);
        m.notifications.expect_create()
            .withf(move |n| n.user_id == parent_author && n.notification_type == NotificationType::Comment)
            .times(1)
            .returning(Ok);
        m.comments.expect_find_response()
            .times(1)
            .returning(move |id| Ok(Some(response_for(&Comment { id, ..comment(Uuid::new_v4(), set_id) }))));

        let created = m
            .into_service()
            .create(&Actor::new(Uuid::new_v4(), UserRole::User), set_id, request("Agreed!", Some(parent_id)))
            .await
            .unwrap();
        assert_eq!(created.quiz_set_id, set_id);
    }

    #[tokio::test]
    async fn replying_to_self_sends_no_notification() {
        let set_id = Uuid::new_v4();
        let me = Uuid::new_v4();
        let parent = comment(me, set_id);
        let parent_id = parent.id;

        let mut m = Mocks::new().with_quiz_set();
        m.comments.expect_find_by_id().times(1).return_once(move |_| Ok(Some(parent)));
        m.comments.expect_create().times(1).returning(Ok);
        m.notifications.expect_create().times(0);
        m.comments.expect_find_response()
            .times(1)
            .returning(move |id| Ok(Some(response_for(&Comment { id, ..comment(me, set_id) }))));

        m.into_service()
            .create(&Actor::new(me, UserRole::User), set_id, request("Also...", Some(parent_id)))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn reply_to_comment_in_other_set_is_rejected() {
        let parent = comment(Uuid::new_v4(), Uuid::new_v4());
        let parent_id = parent.id;

        let mut m = Mocks::new().with_quiz_set();
        m.comments.expect_find_by_id().times(1).return_once(move |_| Ok(Some(parent)));
        m.comments.expect_create().times(0);

        let err = m
            .into_service()
            .create(&Actor::new(Uuid::new_v4(), UserRole::User), Uuid::new_v4(), request("Hi", Some(parent_id)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn reply_to_deleted_parent_is_not_found() {
        let set_id = Uuid::new_v4();
        let mut parent = comment(Uuid::new_v4(), set_id);
        parent.deleted_at = Some(Utc::now());
        let parent_id = parent.id;

        let mut m = Mocks::new().with_quiz_set();
        m.comments.expect_find_by_id().times(1).return_once(move |_| Ok(Some(parent)));

        let err = m
            .into_service()
            .create(&Actor::new(Uuid::new_v4(), UserRole::User), set_id, request("Hi", Some(parent_id)))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn update_by_other_user_is_forbidden() {
        let c = comment(Uuid::new_v4(), Uuid::new_v4());
        let id = c.id;
        let mut m = Mocks::new();
        m.comments.expect_find_by_id().times(1).return_once(move |_| Ok(Some(c)));
        m.comments.expect_update_content().times(0);

        let err = m
            .into_service()
            .update(&Actor::new(Uuid::new_v4(), UserRole::Admin), id, "edited")
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn moderator_can_delete_any_comment() {
        let c = comment(Uuid::new_v4(), Uuid::new_v4());
        let id = c.id;
        let mut m = Mocks::new();
        m.comments.expect_find_by_id().times(1).return_once(move |_| Ok(Some(c)));
        m.comments.expect_soft_delete()
            .withf(move |cid, _| *cid == id)
            .times(1)
            .returning(|_, _| Ok(()));

        m.into_service()
            .delete(&Actor::new(Uuid::new_v4(), UserRole::Moderator), id)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn regular_user_cannot_delete_others_comment() {
        let c = comment(Uuid::new_v4(), Uuid::new_v4());
        let id = c.id;
        let mut m = Mocks::new();
        m.comments.expect_find_by_id().times(1).return_once(move |_| Ok(Some(c)));
        m.comments.expect_soft_delete().times(0);

        let err = m
            .into_service()
            .delete(&Actor::new(Uuid::new_v4(), UserRole::User), id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }
}
