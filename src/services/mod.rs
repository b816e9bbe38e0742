// src/services/mod.rs

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    config::Config,
    repositories::{
        comment_repository::PgCommentRepository,
        event_repository::PgEventRepository,
        interaction_repository::{PgFavoriteRepository, PgLikeRepository},
        mistake_repository::{PgMistakeRepository, PgWeakPointRepository},
        notification_repository::PgNotificationRepository,
        quiz_attempt_repository::PgQuizAttemptRepository,
        quiz_repository::PgQuizRepository,
        quiz_set_repository::PgQuizSetRepository,
        subscription_repository::{PgSubscriptionPlanRepository, PgSubscriptionRepository},
        tournament_repository::PgTournamentRepository,
        user_repository::PgUserRepository,
    },
};

pub mod comment_service;
pub mod dashboard_service;
pub mod event_service;
pub mod favorite_service;
pub mod identity_service;
pub mod like_service;
pub mod mistake_service;
pub mod notification_service;
pub mod quiz_attempt_service;
pub mod quiz_service;
pub mod quiz_set_service;
pub mod subscription_service;
pub mod tournament_service;
pub mod user_service;

use comment_service::CommentService;
use dashboard_service::{DashboardService, OverviewSources};
use event_service::EventService;
use favorite_service::FavoriteService;
use identity_service::IdentityService;
use like_service::LikeService;
use mistake_service::MistakeService;
use notification_service::NotificationService;
use quiz_attempt_service::QuizAttemptService;
use quiz_service::QuizService;
use quiz_set_service::QuizSetService;
use subscription_service::SubscriptionService;
use tournament_service::TournamentService;
use user_service::UserService;

/// Every service, wired to the Postgres repositories.
#[derive(Clone)]
pub struct Services {
    pub identity: Arc<IdentityService>,
    pub users: Arc<UserService>,
    pub subscriptions: Arc<SubscriptionService>,
    pub quiz_sets: Arc<QuizSetService>,
    pub quizzes: Arc<QuizService>,
    pub attempts: Arc<QuizAttemptService>,
    pub mistakes: Arc<MistakeService>,
    pub events: Arc<EventService>,
    pub tournaments: Arc<TournamentService>,
    pub comments: Arc<CommentService>,
    pub likes: Arc<LikeService>,
    pub favorites: Arc<FavoriteService>,
    pub notifications: Arc<NotificationService>,
    pub dashboard: Arc<DashboardService>,
}

impl Services {
    pub fn new(pool: PgPool, config: &Config) -> Self {
        let user_repo = Arc::new(PgUserRepository::new(pool.clone()));
        let plan_repo = Arc::new(PgSubscriptionPlanRepository::new(pool.clone()));
        let subscription_repo = Arc::new(PgSubscriptionRepository::new(pool.clone()));
        let quiz_set_repo = Arc::new(PgQuizSetRepository::new(pool.clone()));
        let quiz_repo = Arc::new(PgQuizRepository::new(pool.clone()));
        let attempt_repo = Arc::new(PgQuizAttemptRepository::new(pool.clone()));
        let mistake_repo = Arc::new(PgMistakeRepository::new(pool.clone()));
        let weak_point_repo = Arc::new(PgWeakPointRepository::new(pool.clone()));
        let event_repo = Arc::new(PgEventRepository::new(pool.clone()));
        let tournament_repo = Arc::new(PgTournamentRepository::new(pool.clone()));
        let comment_repo = Arc::new(PgCommentRepository::new(pool.clone()));
        let like_repo = Arc::new(PgLikeRepository::new(pool.clone()));
        let favorite_repo = Arc::new(PgFavoriteRepository::new(pool.clone()));
        let notification_repo = Arc::new(PgNotificationRepository::new(pool));

        let notifications = Arc::new(NotificationService::new(notification_repo));
        let subscriptions = Arc::new(SubscriptionService::new(
            plan_repo,
            subscription_repo,
            user_repo.clone(),
        ));
        let mistakes = Arc::new(MistakeService::new(mistake_repo, weak_point_repo));
        let attempts = Arc::new(QuizAttemptService::new(
            attempt_repo.clone(),
            quiz_set_repo.clone(),
            quiz_repo.clone(),
            subscriptions.clone(),
        ));

        let dashboard = Arc::new(DashboardService::new(
            OverviewSources {
                users: user_repo.clone(),
                quiz_sets: quiz_set_repo.clone(),
                attempts: attempt_repo.clone(),
                events: event_repo.clone(),
                tournaments: tournament_repo.clone(),
            },
            attempts.clone(),
            mistakes.clone(),
            notifications.clone(),
            subscriptions.clone(),
        ));

        Self {
            identity: Arc::new(IdentityService::new(
                user_repo.clone(),
                subscriptions.clone(),
                config,
            )),
            users: Arc::new(UserService::new(user_repo)),
            quiz_sets: Arc::new(QuizSetService::new(
                quiz_set_repo.clone(),
                quiz_repo.clone(),
                like_repo.clone(),
            )),
            quizzes: Arc::new(QuizService::new(
                quiz_repo,
                quiz_set_repo.clone(),
                subscriptions.clone(),
            )),
            events: Arc::new(EventService::new(
                event_repo,
                quiz_set_repo.clone(),
                attempt_repo.clone(),
                notifications.clone(),
            )),
            tournaments: Arc::new(TournamentService::new(
                tournament_repo,
                quiz_set_repo.clone(),
                attempt_repo,
                notifications.clone(),
            )),
            comments: Arc::new(CommentService::new(
                comment_repo,
                quiz_set_repo.clone(),
                notifications.clone(),
            )),
            likes: Arc::new(LikeService::new(like_repo, quiz_set_repo.clone())),
            favorites: Arc::new(FavoriteService::new(favorite_repo, quiz_set_repo)),
            subscriptions,
            attempts,
            mistakes,
            notifications,
            dashboard,
        }
    }
}
