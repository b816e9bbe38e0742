use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "subscription_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionStatus {
    Active,
    Cancelled,
    Expired,
}

/// Represents the 'subscription_plans' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct SubscriptionPlan {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub price_cents: i64,
    /// Zero means the plan never expires.
    pub duration_days: i32,
    pub can_access_premium: bool,
    pub max_attempts_per_day: Option<i32>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Represents the 'subscriptions' table.
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub status: SubscriptionStatus,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// An active row whose end date has passed.
    pub fn is_lapsed(&self, now: DateTime<Utc>) -> bool {
        self.status == SubscriptionStatus::Active && self.ends_at.is_some_and(|end| end <= now)
    }
}

/// Subscription joined with the plan it refers to.
#[derive(Debug, Clone, Serialize)]
pub struct SubscriptionDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub plan_id: Uuid,
    pub plan_name: String,
    pub status: SubscriptionStatus,
    pub can_access_premium: bool,
    pub starts_at: DateTime<Utc>,
    pub ends_at: Option<DateTime<Utc>>,
}

impl SubscriptionDto {
    pub fn from_parts(subscription: Subscription, plan: &SubscriptionPlan) -> Self {
        Self {
            id: subscription.id,
            user_id: subscription.user_id,
            plan_id: subscription.plan_id,
            plan_name: plan.name.clone(),
            status: subscription.status,
            can_access_premium: plan.can_access_premium,
            starts_at: subscription.starts_at,
            ends_at: subscription.ends_at,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePlanRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0, message = "Price cannot be negative"))]
    pub price_cents: i64,
    #[validate(range(min = 0, max = 3650, message = "Duration must be between 0 and 3650 days"))]
    pub duration_days: i32,
    #[serde(default)]
    pub can_access_premium: bool,
    #[validate(range(min = 1))]
    pub max_attempts_per_day: Option<i32>,
}

/// DTO for updating a plan. Fields are optional.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePlanRequest {
    #[validate(length(min = 1, max = 100))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 0))]
    pub price_cents: Option<i64>,
    #[validate(range(min = 0, max = 3650))]
    pub duration_days: Option<i32>,
    pub can_access_premium: Option<bool>,
    /// `0` lifts the daily limit.
    #[validate(range(min = 0))]
    pub max_attempts_per_day: Option<i32>,
    pub is_active: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubscribeRequest {
    pub plan_id: Uuid,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PlanFilter {
    #[serde(default)]
    pub include_inactive: bool,
}
