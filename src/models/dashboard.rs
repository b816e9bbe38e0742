use serde::Serialize;

use crate::models::{
    mistake::WeakPoint,
    quiz_attempt::{QuizAttempt, UserAttemptStats},
    user::UserDto,
};

/// Aggregated home page data for the current user.
#[derive(Debug, Serialize)]
pub struct UserDashboard {
    pub user: UserDto,
    pub stats: UserAttemptStats,
    pub recent_attempts: Vec<QuizAttempt>,
    pub weak_points: Vec<WeakPoint>,
    pub unread_notifications: i64,
    pub subscription_plan: Option<String>,
}

/// Platform-wide counters for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AdminOverview {
    pub total_users: i64,
    pub total_quiz_sets: i64,
    pub completed_attempts: i64,
    pub active_events: i64,
    pub started_tournaments: i64,
}
