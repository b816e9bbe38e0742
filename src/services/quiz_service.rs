use std::sync::Arc;

use chrono::Utc;
use sqlx::types::Json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        quiz::{
            CreateQuizRequest, Quiz, QuizPublicDto, QuizQuizSet, QuizView, UpdateQuizRequest,
            answer_in_options,
        },
        quiz_set::QuizSet,
        user::Actor,
    },
    repositories::{quiz_repository::QuizRepository, quiz_set_repository::QuizSetRepository},
    services::subscription_service::SubscriptionService,
};

#[derive(Clone)]
pub struct QuizService {
    quizzes: Arc<dyn QuizRepository>,
    quiz_sets: Arc<dyn QuizSetRepository>,
    subscriptions: Arc<SubscriptionService>,
}

impl QuizService {
    pub fn new(
        quizzes: Arc<dyn QuizRepository>,
        quiz_sets: Arc<dyn QuizSetRepository>,
        subscriptions: Arc<SubscriptionService>,
    ) -> Self {
        Self {
            quizzes,
            quiz_sets,
            subscriptions,
        }
    }

    /// Creates the quiz and appends it to the end of `quiz_set_id`.
    pub async fn create(
        &self,
        actor: &Actor,
        quiz_set_id: Uuid,
        req: CreateQuizRequest,
    ) -> Result<Quiz, AppError> {
        self.editable_set(actor, quiz_set_id).await?;

        let options: Vec<String> = req.options.iter().map(|o| o.trim().to_string()).collect();
        let correct_answer = req.correct_answer.trim().to_string();
        if !answer_in_options(&options, &correct_answer) {
            return Err(AppError::BadRequest(
                "Correct answer must be one of the options".to_string(),
            ));
        }

        let now = Utc::now();
        let quiz = Quiz {
            id: Uuid::new_v4(),
            question_text: req.question_text.trim().to_string(),
            options: Json(options),
            correct_answer,
            explanation: req.explanation,
            topic: normalized_topic(req.topic),
            created_by: actor.id,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        };
        let created = self.quizzes.create(quiz).await?;

        let order_index = self.quizzes.next_order_index(quiz_set_id).await?;
        self.quizzes
            .add_link(QuizQuizSet {
                quiz_id: created.id,
                quiz_set_id,
                order_index,
            })
            .await?;

        tracing::info!("Quiz {} added to set {}", created.id, quiz_set_id);
        Ok(created)
    }

    pub async fn find_active(&self, id: Uuid) -> Result<Quiz, AppError> {
        self.quizzes
            .find_by_id(id)
            .await?
            .filter(|q| !q.is_deleted())
            .ok_or(AppError::NotFound("Quiz not found".to_string()))
    }

    /// Editors (author, moderators) see the answer; everyone else gets the public view.
    pub async fn get(&self, actor: &Actor, id: Uuid) -> Result<QuizView, AppError> {
        let quiz = self.find_active(id).await?;
        if actor.is_owner_or_moderator(quiz.created_by) {
            Ok(QuizView::Full(quiz))
        } else {
            Ok(QuizView::Public(quiz.into()))
        }
    }

    /// Questions of a set the viewer may see. Premium-only sets need a
    /// premium subscription unless the viewer edits the set.
    pub async fn list_by_quiz_set(
        &self,
        viewer: Option<&Actor>,
        quiz_set_id: Uuid,
    ) -> Result<Vec<QuizPublicDto>, AppError> {
        let set = self.active_set(quiz_set_id).await?;
        if !set.is_visible_to(viewer) {
            return Err(AppError::NotFound("Quiz set not found".to_string()));
        }
        if set.is_premium_only && !set.is_editable_by(viewer) {
            let Some(actor) = viewer else {
                return Err(AppError::AuthError(
                    "Sign in to view premium quiz sets".to_string(),
                ));
            };
            if !self.subscriptions.has_premium_access(actor.id).await? {
                return Err(AppError::Forbidden(
                    "This quiz set requires a premium subscription".to_string(),
                ));
            }
        }
        let quizzes = self.quizzes.list_by_quiz_set(quiz_set_id).await?;
        Ok(quizzes.into_iter().map(QuizPublicDto::from).collect())
    }

    pub async fn update(
        &self,
        actor: &Actor,
        id: Uuid,
        req: UpdateQuizRequest,
    ) -> Result<Quiz, AppError> {
        let mut quiz = self.editable_quiz(actor, id).await?;

        if let Some(text) = req.question_text {
            quiz.question_text = text.trim().to_string();
        }
        if let Some(options) = req.options {
            quiz.options = Json(options.iter().map(|o| o.trim().to_string()).collect());
        }
        if let Some(answer) = req.correct_answer {
            quiz.correct_answer = answer.trim().to_string();
        }
        if let Some(explanation) = req.explanation {
            quiz.explanation = Some(explanation).filter(|e| !e.trim().is_empty());
        }
        if req.topic.is_some() {
            quiz.topic = normalized_topic(req.topic);
        }

        if !answer_in_options(&quiz.options.0, &quiz.correct_answer) {
            return Err(AppError::BadRequest(
                "Correct answer must be one of the options".to_string(),
            ));
        }

        self.quizzes.update(quiz).await
    }

    pub async fn attach_to_set(
        &self,
        actor: &Actor,
        quiz_id: Uuid,
        quiz_set_id: Uuid,
    ) -> Result<QuizQuizSet, AppError> {
        self.find_active(quiz_id).await?;
        self.editable_set(actor, quiz_set_id).await?;

        if self.quizzes.find_link(quiz_id, quiz_set_id).await?.is_some() {
            return Err(AppError::Conflict(
                "Quiz is already part of this quiz set".to_string(),
            ));
        }

        let link = QuizQuizSet {
            quiz_id,
            quiz_set_id,
            order_index: self.quizzes.next_order_index(quiz_set_id).await?,
        };
        self.quizzes.add_link(link.clone()).await?;
        Ok(link)
    }

    pub async fn detach_from_set(
        &self,
        actor: &Actor,
        quiz_id: Uuid,
        quiz_set_id: Uuid,
    ) -> Result<(), AppError> {
        self.editable_set(actor, quiz_set_id).await?;
        if !self.quizzes.remove_link(quiz_id, quiz_set_id).await? {
            return Err(AppError::NotFound(
                "Quiz is not part of this quiz set".to_string(),
            ));
        }
        Ok(())
    }

    pub async fn delete(&self, actor: &Actor, id: Uuid) -> Result<(), AppError> {
        self.editable_quiz(actor, id).await?;
        self.quizzes.soft_delete(id, Utc::now()).await?;
        tracing::info!("Quiz {} deleted by {}", id, actor.id);
        Ok(())
    }

    async fn active_set(&self, id: Uuid) -> Result<QuizSet, AppError> {
        self.quiz_sets
            .find_by_id(id)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or(AppError::NotFound("Quiz set not found".to_string()))
    }

    async fn editable_set(&self, actor: &Actor, id: Uuid) -> Result<QuizSet, AppError> {
        let set = self.active_set(id).await?;
        if !actor.is_owner_or_moderator(set.created_by) {
            return Err(AppError::Forbidden(
                "You do not have permission to modify this quiz set".to_string(),
            ));
        }
        Ok(set)
    }

    async fn editable_quiz(&self, actor: &Actor, id: Uuid) -> Result<Quiz, AppError> {
        let quiz = self.find_active(id).await?;
        if !actor.is_owner_or_moderator(quiz.created_by) {
            return Err(AppError::Forbidden(
                "You do not have permission to modify this quiz".to_string(),
            ));
        }
        Ok(quiz)
    }
}

fn normalized_topic(topic: Option<String>) -> Option<String> {
    topic.map(|t| t.trim().to_string()).filter(|t| !t.is_empty())
}
