use std::{collections::HashSet, sync::Arc};

use chrono::Utc;
use uuid::Uuid;

use crate::{
    config::LEADERBOARD_DEFAULT_LIMIT,
    error::AppError,
    models::{
        pagination::{PagedResult, PaginationParams},
        quiz::QuizPublicDto,
        quiz_attempt::{
            AttemptAnswer, AttemptResultDto, AttemptStatus, LeaderboardEntry, QuizAttempt,
            StartAttemptResponse, SubmitAttemptRequest, UserAttemptStats,
        },
        quiz_set::QuizSet,
        user::Actor,
    },
    repositories::{
        quiz_attempt_repository::QuizAttemptRepository, quiz_repository::QuizRepository,
        quiz_set_repository::QuizSetRepository,
    },
    services::subscription_service::SubscriptionService,
    utils::{
        ranking::rank_by_score,
        scoring::{compute_stats, score_answers},
    },
};

#[derive(Clone)]
pub struct QuizAttemptService {
    attempts: Arc<dyn QuizAttemptRepository>,
    quiz_sets: Arc<dyn QuizSetRepository>,
    quizzes: Arc<dyn QuizRepository>,
    subscriptions: Arc<SubscriptionService>,
}

impl QuizAttemptService {
    pub fn new(
        attempts: Arc<dyn QuizAttemptRepository>,
        quiz_sets: Arc<dyn QuizSetRepository>,
        quizzes: Arc<dyn QuizRepository>,
        subscriptions: Arc<SubscriptionService>,
    ) -> Self {
        Self {
            attempts,
            quiz_sets,
            quizzes,
            subscriptions,
        }
    }

    pub async fn start_attempt(
        &self,
        actor: &Actor,
        quiz_set_id: Uuid,
    ) -> Result<StartAttemptResponse, AppError> {
        let quiz_set = self.active_set(quiz_set_id).await?;

        if !quiz_set.is_visible_to(Some(actor)) {
            return Err(AppError::InvalidOperation(
                "Quiz set is not published".to_string(),
            ));
        }
        if quiz_set.is_premium_only
            && !quiz_set.is_editable_by(Some(actor))
            && !self.subscriptions.has_premium_access(actor.id).await?
        {
            return Err(AppError::Forbidden(
                "This quiz set requires a premium subscription".to_string(),
            ));
        }

        let quizzes = self.quizzes.list_by_quiz_set(quiz_set_id).await?;
        if quizzes.is_empty() {
            return Err(AppError::InvalidOperation(
                "Quiz set has no quizzes".to_string(),
            ));
        }
        let total = i32::try_from(quizzes.len())
            .map_err(|_| AppError::InternalServerError("Too many quizzes in set".to_string()))?;

        let attempt = self
            .attempts
            .create(
                QuizAttempt::start(actor.id, quiz_set_id, total),
                quizzes.iter().map(|q| q.id).collect(),
            )
            .await?;
        tracing::info!("Attempt {} started by {} on {}", attempt.id, actor.id, quiz_set_id);

        Ok(StartAttemptResponse {
            attempt,
            questions: quizzes.into_iter().map(QuizPublicDto::from).collect(),
        })
    }

    /// Grades the questions served when the attempt started. The attempt and
    /// the user's mistake log are written in one transaction.
    pub async fn submit_attempt(
        &self,
        actor: &Actor,
        attempt_id: Uuid,
        req: SubmitAttemptRequest,
    ) -> Result<AttemptResultDto, AppError> {
        let mut attempt = self.owned_attempt(actor, attempt_id).await?;
        if attempt.status != AttemptStatus::InProgress {
            return Err(AppError::InvalidOperation(
                "Attempt is already finished".to_string(),
            ));
        }

        let mut quizzes = self.attempts.served_quizzes(attempt.id).await?;
        if quizzes.is_empty() {
            // Attempts started before questions were recorded.
            quizzes = self.quizzes.list_by_quiz_set(attempt.quiz_set_id).await?;
        }
        let known: HashSet<Uuid> = quizzes.iter().map(|q| q.id).collect();
        if let Some(stray) = req.answers.keys().find(|id| !known.contains(id)) {
            return Err(AppError::BadRequest(format!(
                "Quiz {stray} is not part of this attempt"
            )));
        }

        let scored = score_answers(&quizzes, &req.answers);
        let now = Utc::now();

        attempt.status = AttemptStatus::Completed;
        attempt.total_questions = i32::try_from(quizzes.len())
            .map_err(|_| AppError::InternalServerError("Too many quizzes in set".to_string()))?;
        attempt.correct_answers = scored.correct;
        attempt.wrong_answers = scored.wrong;
        attempt.score = scored.score;
        attempt.accuracy = scored.accuracy;
        attempt.completed_at = Some(now);

        let answers = scored
            .results
            .iter()
            .map(|r| AttemptAnswer {
                id: Uuid::new_v4(),
                attempt_id: attempt.id,
                quiz_id: r.quiz_id,
                user_answer: r.user_answer.clone(),
                is_correct: r.is_correct,
                created_at: now,
            })
            .collect();
        let attempt = self.attempts.complete(attempt, answers).await?;

        tracing::info!(
            "Attempt {} completed: {}/{} correct, score {}",
            attempt.id,
            attempt.correct_answers,
            attempt.total_questions,
            attempt.score
        );
        Ok(AttemptResultDto {
            attempt,
            answers: scored.results,
        })
    }

    pub async fn abandon_attempt(&self, actor: &Actor, attempt_id: Uuid) -> Result<QuizAttempt, AppError> {
        let mut attempt = self.owned_attempt(actor, attempt_id).await?;
        if attempt.status != AttemptStatus::InProgress {
            return Err(AppError::InvalidOperation(
                "Only in-progress attempts can be abandoned".to_string(),
            ));
        }
        attempt.status = AttemptStatus::Abandoned;
        self.attempts.update(attempt).await
    }

    pub async fn get_attempt(&self, actor: &Actor, id: Uuid) -> Result<QuizAttempt, AppError> {
        let attempt = self.find(id).await?;
        if !actor.is_owner_or_admin(attempt.user_id) {
            return Err(AppError::Forbidden(
                "You can only view your own attempts".to_string(),
            ));
        }
        Ok(attempt)
    }

    pub async fn list_user_attempts(
        &self,
        user_id: Uuid,
        params: PaginationParams,
    ) -> Result<PagedResult<QuizAttempt>, AppError> {
        let page = params.resolve()?;
        let items = self
            .attempts
            .list_by_user(user_id, page.limit(), page.offset())
            .await?;
        let total = self.attempts.count_by_user(user_id).await?;
        Ok(PagedResult::new(items, total, page))
    }

    pub async fn get_user_stats(&self, user_id: Uuid) -> Result<UserAttemptStats, AppError> {
        let completed = self.attempts.list_completed_by_user(user_id).await?;
        Ok(compute_stats(&completed, Utc::now().date_naive()))
    }

    pub async fn get_best_attempt(
        &self,
        user_id: Uuid,
        quiz_set_id: Uuid,
    ) -> Result<Option<QuizAttempt>, AppError> {
        self.attempts.find_best(user_id, quiz_set_id).await
    }

    /// Best completed score per user. Earlier completion wins a tie.
    pub async fn quiz_set_leaderboard(
        &self,
        quiz_set_id: Uuid,
        limit: Option<usize>,
    ) -> Result<Vec<LeaderboardEntry>, AppError> {
        self.active_set(quiz_set_id).await?;
        let rows = self.attempts.best_scores_for_set(quiz_set_id).await?;

        Ok(rank_by_score(rows, |r| i64::from(r.score), |r| r.completed_at)
            .into_iter()
            .take(limit.unwrap_or(LEADERBOARD_DEFAULT_LIMIT))
            .map(|(rank, row)| LeaderboardEntry {
                rank,
                user_id: row.user_id,
                username: row.username,
                score: row.score,
                accuracy: row.accuracy,
                achieved_at: row.completed_at,
            })
            .collect())
    }

    async fn find(&self, id: Uuid) -> Result<QuizAttempt, AppError> {
        self.attempts
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Attempt not found".to_string()))
    }

    async fn owned_attempt(&self, actor: &Actor, id: Uuid) -> Result<QuizAttempt, AppError> {
        let attempt = self.find(id).await?;
        if attempt.user_id != actor.id {
            return Err(AppError::Forbidden(
                "This attempt belongs to another user".to_string(),
            ));
        }
        Ok(attempt)
    }

    async fn active_set(&self, id: Uuid) -> Result<QuizSet, AppError> {
        self.quiz_sets
            .find_by_id(id)
            .await?
            .filter(|s| !s.is_deleted())
            .ok_or(AppError::NotFound("Quiz set not found".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Duration;
    use sqlx::types::Json;

    use super::*;
    use crate::{
        config::POINTS_PER_CORRECT_ANSWER,
        models::{
            quiz::Quiz,
            quiz_attempt::BestScoreRow,
            quiz_set::QuizSetType,
            user::UserRole,
        },
        repositories::{
            quiz_attempt_repository::MockQuizAttemptRepository,
            quiz_repository::MockQuizRepository,
            quiz_set_repository::MockQuizSetRepository,
            subscription_repository::{MockSubscriptionPlanRepository, MockSubscriptionRepository},
            user_repository::MockUserRepository,
        },
    };

    struct Mocks {
        attempts: MockQuizAttemptRepository,
        sets: MockQuizSetRepository,
        quizzes: MockQuizRepository,
        subscriptions: MockSubscriptionRepository,
    }

    impl Mocks {
        fn new() -> Self {
            Self {
                attempts: MockQuizAttemptRepository::new(),
                sets: MockQuizSetRepository::new(),
                quizzes: MockQuizRepository::new(),
                subscriptions: MockSubscriptionRepository::new(),
            }
        }

        fn into_service(self) -> QuizAttemptService {
            let subscriptions = SubscriptionService::new(
                Arc::new(MockSubscriptionPlanRepository::new()),
                Arc::new(self.subscriptions),
                Arc::new(MockUserRepository::new()),
            );
            QuizAttemptService::new(
                Arc::new(self.attempts),
                Arc::new(self.sets),
                Arc::new(self.quizzes),
                Arc::new(subscriptions),
            )
        }
    }

    fn quiz_set(published: bool, premium: bool) -> QuizSet {
        let now = Utc::now();
        QuizSet {
            id: Uuid::new_v4(),
            title: "Closures".to_string(),
            description: None,
            quiz_type: QuizSetType::Practice,
            cover_image_url: None,
            is_published: published,
            is_premium_only: premium,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    fn quiz(answer: &str) -> Quiz {
        let now = Utc::now();
        Quiz {
            id: Uuid::new_v4(),
            question_text: "Q".to_string(),
            options: Json(vec!["A".to_string(), "B".to_string()]),
            correct_answer: answer.to_string(),
            explanation: None,
            topic: None,
            created_by: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            deleted_at: None,
        }
    }

    #[tokio::test]
    async fn start_attempt_returns_public_questions() {
        let set = quiz_set(true, false);
        let set_id = set.id;
        let actor = Actor::new(Uuid::new_v4(), UserRole::User);

        let mut m = Mocks::new();
        m.sets.expect_find_by_id().times(1).return_once(move |_| Ok(Some(set)));
        m.quizzes.expect_list_by_quiz_set()
            .times(1)
            .returning(|_| Ok(vec![quiz("A"), quiz("B"), quiz("A")]));
        m.attempts.expect_create()
            .withf(|a, ids| {
                a.total_questions == 3 && a.status == AttemptStatus::InProgress && ids.len() == 3
            })
            .times(1)
            .returning(|a, _| Ok(a));

        let started = m.into_service().start_attempt(&actor, set_id).await.unwrap();
        assert_eq!(started.questions.len(), 3);
        assert_eq!(started.attempt.user_id, actor.id);
    }

    #[tokio::test]
    async fn start_on_unpublished_set_is_invalid_for_users() {
        let set = quiz_set(false, false);
        let set_id = set.id;
        let mut m = Mocks::new();
        m.sets.expect_find_by_id().times(1).return_once(move |_| Ok(Some(set)));
        m.attempts.expect_create().times(0);

        let err = m
            .into_service()
            .start_attempt(&Actor::new(Uuid::new_v4(), UserRole::User), set_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn premium_set_without_subscription_is_forbidden() {
        let set = quiz_set(true, true);
        let set_id = set.id;
        let mut m = Mocks::new();
        m.sets.expect_find_by_id().times(1).return_once(move |_| Ok(Some(set)));
        m.subscriptions.expect_find_active_for_user().times(1).returning(|_| Ok(None));
        m.attempts.expect_create().times(0);

        let err = m
            .into_service()
            .start_attempt(&Actor::new(Uuid::new_v4(), UserRole::User), set_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn start_on_empty_set_is_invalid() {
        let set = quiz_set(true, false);
        let set_id = set.id;
        let mut m = Mocks::new();
        m.sets.expect_find_by_id().times(1).return_once(move |_| Ok(Some(set)));
        m.quizzes.expect_list_by_quiz_set().times(1).returning(|_| Ok(Vec::new()));

        let err = m
            .into_service()
            .start_attempt(&Actor::new(Uuid::new_v4(), UserRole::User), set_id)
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn submit_scores_served_questions() {
        let user = Uuid::new_v4();
        let q1 = quiz("A");
        let q2 = quiz("B");
        let q3 = quiz("A");
        let (id1, id2, id3) = (q1.id, q2.id, q3.id);
        let attempt = QuizAttempt::start(user, Uuid::new_v4(), 3);
        let attempt_id = attempt.id;

        let mut m = Mocks::new();
        m.attempts.expect_find_by_id().times(1).return_once(move |_| Ok(Some(attempt)));
        m.attempts.expect_served_quizzes()
            .withf(move |id| *id == attempt_id)
            .times(1)
            .return_once(move |_| Ok(vec![q1, q2, q3]));
        m.quizzes.expect_list_by_quiz_set().times(0);
        m.attempts.expect_complete()
            .withf(move |a, answers| {
                a.status == AttemptStatus::Completed
                    && a.total_questions == 3
                    && a.correct_answers == 2
                    && a.wrong_answers == 1
                    && a.completed_at.is_some()
                    && answers.len() == 3
                    && answers.iter().any(|x| x.quiz_id == id3 && !x.is_correct)
            })
            .times(1)
            .returning(|a, _| Ok(a));

        let mut answers = HashMap::new();
        answers.insert(id1, "A".to_string());
        answers.insert(id2, " B ".to_string());
        answers.insert(id3, "B".to_string());

        let result = m
            .into_service()
            .submit_attempt(&Actor::new(user, UserRole::User), attempt_id, SubmitAttemptRequest { answers })
            .await
            .unwrap();
        assert_eq!(result.attempt.score, 2 * POINTS_PER_CORRECT_ANSWER);
        assert_eq!(result.attempt.accuracy, 66.67);
        assert_eq!(result.answers.len(), 3);
    }

    #[tokio::test]
    async fn submit_rejects_answers_for_foreign_quizzes() {
        let user = Uuid::new_v4();
        let attempt = QuizAttempt::start(user, Uuid::new_v4(), 1);
        let attempt_id = attempt.id;

        let mut m = Mocks::new();
        m.attempts.expect_find_by_id().times(1).return_once(move |_| Ok(Some(attempt)));
        m.attempts.expect_served_quizzes().times(1).returning(|_| Ok(vec![quiz("A")]));
        m.attempts.expect_complete().times(0);

        let mut answers = HashMap::new();
        answers.insert(Uuid::new_v4(), "A".to_string());
        let err = m
            .into_service()
            .submit_attempt(&Actor::new(user, UserRole::User), attempt_id, SubmitAttemptRequest { answers })
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[tokio::test]
    async fn quiz_added_mid_attempt_does_not_change_result() {
        let user = Uuid::new_v4();
        let q1 = quiz("A");
        let q2 = quiz("B");
        let (id1, id2) = (q1.id, q2.id);
        let attempt = QuizAttempt::start(user, Uuid::new_v4(), 2);
        let attempt_id = attempt.id;

        // The live set now holds a third quiz; only the two served ones count.
        let mut m = Mocks::new();
        m.attempts.expect_find_by_id().times(1).return_once(move |_| Ok(Some(attempt)));
        m.attempts.expect_served_quizzes().times(1).return_once(move |_| Ok(vec![q1, q2]));
        m.quizzes.expect_list_by_quiz_set().times(0);
        m.attempts.expect_complete()
            .withf(|a, answers| a.total_questions == 2 && answers.len() == 2)
            .times(1)
            .returning(|a, _| Ok(a));

        let mut answers = HashMap::new();
        answers.insert(id1, "A".to_string());
        answers.insert(id2, "B".to_string());

        let result = m
            .into_service()
            .submit_attempt(&Actor::new(user, UserRole::User), attempt_id, SubmitAttemptRequest { answers })
            .await
            .unwrap();
        assert_eq!(result.attempt.total_questions, 2);
        assert_eq!(result.attempt.correct_answers, 2);
        assert_eq!(result.attempt.accuracy, 100.0);
    }

    #[tokio::test]
    async fn submit_falls_back_to_live_set_without_recorded_questions() {
        let user = Uuid::new_v4();
        let q1 = quiz("A");
        let id1 = q1.id;
        let attempt = QuizAttempt::start(user, Uuid::new_v4(), 1);
        let attempt_id = attempt.id;

        let mut m = Mocks::new();
        m.attempts.expect_find_by_id().times(1).return_once(move |_| Ok(Some(attempt)));
        m.attempts.expect_served_quizzes().times(1).returning(|_| Ok(Vec::new()));
        m.quizzes.expect_list_by_quiz_set().times(1).return_once(move |_| Ok(vec![q1]));
        m.attempts.expect_complete().times(1).returning(|a, _| Ok(a));

        let mut answers = HashMap::new();
        answers.insert(id1, "A".to_string());
        let result = m
            .into_service()
            .submit_attempt(&Actor::new(user, UserRole::User), attempt_id, SubmitAttemptRequest { answers })
            .await
            .unwrap();
        assert_eq!(result.attempt.correct_answers, 1);
    }

    #[tokio::test]
    async fn concurrent_completion_surfaces_as_invalid_operation() {
        let user = Uuid::new_v4();
        let attempt = QuizAttempt::start(user, Uuid::new_v4(), 1);
        let attempt_id = attempt.id;

        // The row passed the status check here but another submit finished first.
        let mut m = Mocks::new();
        m.attempts.expect_find_by_id().times(1).return_once(move |_| Ok(Some(attempt)));
        m.attempts.expect_served_quizzes().times(1).returning(|_| Ok(vec![quiz("A")]));
        m.attempts.expect_complete().times(1).returning(|_, _| {
            Err(AppError::InvalidOperation("Attempt is already finished".to_string()))
        });

        let err = m
            .into_service()
            .submit_attempt(
                &Actor::new(user, UserRole::User),
                attempt_id,
                SubmitAttemptRequest { answers: HashMap::new() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn submit_twice_is_invalid() {
        let user = Uuid::new_v4();
        let mut attempt = QuizAttempt::start(user, Uuid::new_v4(), 1);
        attempt.status = AttemptStatus::Completed;
        let attempt_id = attempt.id;

        let mut m = Mocks::new();
        m.attempts.expect_find_by_id().times(1).return_once(move |_| Ok(Some(attempt)));

        let err = m
            .into_service()
            .submit_attempt(
                &Actor::new(user, UserRole::User),
                attempt_id,
                SubmitAttemptRequest { answers: HashMap::new() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::InvalidOperation(_)));
    }

    #[tokio::test]
    async fn submit_by_other_user_is_forbidden() {
        let attempt = QuizAttempt::start(Uuid::new_v4(), Uuid::new_v4(), 1);
        let attempt_id = attempt.id;
        let mut m = Mocks::new();
        m.attempts.expect_find_by_id().times(1).return_once(move |_| Ok(Some(attempt)));

        let err = m
            .into_service()
            .submit_attempt(
                &Actor::new(Uuid::new_v4(), UserRole::Admin),
                attempt_id,
                SubmitAttemptRequest { answers: HashMap::new() },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn leaderboard_ranks_ties_by_earlier_completion() {
        let set = quiz_set(true, false);
        let set_id = set.id;
        let base = Utc::now();
        let row = |name: &str, score: i32, minutes: i64| BestScoreRow {
            user_id: Uuid::new_v4(),
            username: name.to_string(),
            score,
            accuracy: f64::from(score),
            completed_at: base + Duration::minutes(minutes),
        };
        let rows = vec![row("late", 80, 5), row("low", 40, 0), row("early", 80, 1), row("top", 90, 9)];

        let mut m = Mocks::new();
        m.sets.expect_find_by_id().times(1).return_once(move |_| Ok(Some(set)));
        m.attempts.expect_best_scores_for_set().times(1).return_once(move |_| Ok(rows));

        let board = m.into_service().quiz_set_leaderboard(set_id, Some(3)).await.unwrap();
        let names: Vec<_> = board.iter().map(|e| (e.rank, e.username.as_str())).collect();
        assert_eq!(names, vec![(1, "top"), (2, "early"), (3, "late")]);
    }

    #[tokio::test]
    async fn best_attempt_is_optional() {
        let (user, set_id) = (Uuid::new_v4(), Uuid::new_v4());

        let mut m = Mocks::new();
        m.attempts.expect_find_best()
            .withf(move |u, s| *u == user && *s == set_id)
            .times(1)
            .returning(|_, _| Ok(None));

        let best = m.into_service().get_best_attempt(user, set_id).await.unwrap();
        assert!(best.is_none());
    }
}
