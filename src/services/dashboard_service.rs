use std::sync::Arc;

use uuid::Uuid;

use crate::{
    config::{DASHBOARD_RECENT_ATTEMPTS, DASHBOARD_TOP_WEAK_POINTS},
    error::AppError,
    models::{
        dashboard::{AdminOverview, UserDashboard},
        event::EventStatus,
        pagination::PaginationParams,
        quiz_set::QuizSetFilter,
        tournament::TournamentStatus,
        user::UserDto,
    },
    repositories::{
        event_repository::EventRepository, quiz_attempt_repository::QuizAttemptRepository,
        quiz_set_repository::QuizSetRepository, tournament_repository::TournamentRepository,
        user_repository::UserRepository,
    },
    services::{
        mistake_service::MistakeService, notification_service::NotificationService,
        quiz_attempt_service::QuizAttemptService, subscription_service::SubscriptionService,
    },
};

/// Repositories counted by the admin overview.
#[derive(Clone)]
pub struct OverviewSources {
    pub users: Arc<dyn UserRepository>,
    pub quiz_sets: Arc<dyn QuizSetRepository>,
    pub attempts: Arc<dyn QuizAttemptRepository>,
    pub events: Arc<dyn EventRepository>,
    pub tournaments: Arc<dyn TournamentRepository>,
}

#[derive(Clone)]
pub struct DashboardService {
    sources: OverviewSources,
    attempts: Arc<QuizAttemptService>,
    mistakes: Arc<MistakeService>,
    notifications: Arc<NotificationService>,
    subscriptions: Arc<SubscriptionService>,
}

impl DashboardService {
    pub fn new(
        sources: OverviewSources,
        attempts: Arc<QuizAttemptService>,
        mistakes: Arc<MistakeService>,
        notifications: Arc<NotificationService>,
        subscriptions: Arc<SubscriptionService>,
    ) -> Self {
        Self {
            sources,
            attempts,
            mistakes,
            notifications,
            subscriptions,
        }
    }

    pub async fn user_dashboard(&self, user_id: Uuid) -> Result<UserDashboard, AppError> {
        let user = self
            .sources
            .users
            .find_by_id(user_id)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or(AppError::NotFound("User not found".to_string()))?;

        let stats = self.attempts.get_user_stats(user_id).await?;
        let recent_attempts = self
            .attempts
            .list_user_attempts(user_id, PaginationParams::new(1, DASHBOARD_RECENT_ATTEMPTS))
            .await?
            .items;
        let mut weak_points = self.mistakes.list_weak_points(user_id).await?;
        weak_points.truncate(DASHBOARD_TOP_WEAK_POINTS);
        let unread_notifications = self.notifications.unread_count(user_id).await?;
        let subscription_plan = self
            .subscriptions
            .get_active_subscription(user_id)
            .await?
            .map(|s| s.plan_name);

        Ok(UserDashboard {
            user: UserDto::from(user),
            stats,
            recent_attempts,
            weak_points,
            unread_notifications,
            subscription_plan,
        })
    }

    pub async fn admin_overview(&self) -> Result<AdminOverview, AppError> {
        Ok(AdminOverview {
            total_users: self.sources.users.count(None).await?,
            total_quiz_sets: self.sources.quiz_sets.count(QuizSetFilter::default()).await?,
            completed_attempts: self.sources.attempts.count_completed().await?,
            active_events: self.sources.events.count(Some(EventStatus::Active)).await?,
            started_tournaments: self
                .sources
                .tournaments
                .count(Some(TournamentStatus::Started))
                .await?,
        })
    }
}
