use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::subscription::{Subscription, SubscriptionPlan, SubscriptionStatus},
};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionPlanRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionPlan>, AppError>;

    async fn find_by_name(&self, name: &str) -> Result<Option<SubscriptionPlan>, AppError>;

    async fn list(&self, include_inactive: bool) -> Result<Vec<SubscriptionPlan>, AppError>;

    async fn create(&self, plan: SubscriptionPlan) -> Result<SubscriptionPlan, AppError>;

    async fn update(&self, plan: SubscriptionPlan) -> Result<SubscriptionPlan, AppError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Subscription>, AppError>;

    /// Latest row with status `active`, regardless of its end date.
    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError>;

    async fn create(&self, subscription: Subscription) -> Result<Subscription, AppError>;

    async fn update_status(&self, id: Uuid, status: SubscriptionStatus) -> Result<(), AppError>;
}

#[derive(Clone)]
pub struct PgSubscriptionPlanRepository {
    pool: PgPool,
}

impl PgSubscriptionPlanRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionPlanRepository for PgSubscriptionPlanRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<SubscriptionPlan>, AppError> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>("SELECT * FROM subscription_plans WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(plan)
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<SubscriptionPlan>, AppError> {
        let plan = sqlx::query_as::<_, SubscriptionPlan>(
            "SELECT * FROM subscription_plans WHERE LOWER(name) = LOWER($1)",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;
        Ok(plan)
    }

    async fn list(&self, include_inactive: bool) -> Result<Vec<SubscriptionPlan>, AppError> {
        let plans = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            SELECT * FROM subscription_plans
            WHERE ($1 OR is_active)
            ORDER BY price_cents ASC, name ASC
            "#,
        )
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await?;
        Ok(plans)
    }

    async fn create(&self, plan: SubscriptionPlan) -> Result<SubscriptionPlan, AppError> {
        let created = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            INSERT INTO subscription_plans
                (id, name, description, price_cents, duration_days, can_access_premium,
                 max_attempts_per_day, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING *
            "#,
        )
        .bind(plan.id)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.price_cents)
        .bind(plan.duration_days)
        .bind(plan.can_access_premium)
        .bind(plan.max_attempts_per_day)
        .bind(plan.is_active)
        .bind(plan.created_at)
        .bind(plan.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update(&self, plan: SubscriptionPlan) -> Result<SubscriptionPlan, AppError> {
        let updated = sqlx::query_as::<_, SubscriptionPlan>(
            r#"
            UPDATE subscription_plans SET
                name = $2,
                description = $3,
                price_cents = $4,
                duration_days = $5,
                can_access_premium = $6,
                max_attempts_per_day = $7,
                is_active = $8,
                updated_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(plan.id)
        .bind(&plan.name)
        .bind(&plan.description)
        .bind(plan.price_cents)
        .bind(plan.duration_days)
        .bind(plan.can_access_premium)
        .bind(plan.max_attempts_per_day)
        .bind(plan.is_active)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(AppError::NotFound("Subscription plan not found".to_string()))?;
        Ok(updated)
    }
}

#[derive(Clone)]
pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>("SELECT * FROM subscriptions WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(subscription)
    }

    async fn find_active_for_user(&self, user_id: Uuid) -> Result<Option<Subscription>, AppError> {
        let subscription = sqlx::query_as::<_, Subscription>(
            r#"
            SELECT * FROM subscriptions
            WHERE user_id = $1 AND status = 'active'
            ORDER BY starts_at DESC
            LIMIT 1
            "#,
        )
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(subscription)
    }

    async fn create(&self, subscription: Subscription) -> Result<Subscription, AppError> {
        let created = sqlx::query_as::<_, Subscription>(
            r#"
            INSERT INTO subscriptions
                (id, user_id, plan_id, status, starts_at, ends_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(subscription.id)
        .bind(subscription.user_id)
        .bind(subscription.plan_id)
        .bind(subscription.status)
        .bind(subscription.starts_at)
        .bind(subscription.ends_at)
        .bind(subscription.created_at)
        .bind(subscription.updated_at)
        .fetch_one(&self.pool)
        .await?;
        Ok(created)
    }

    async fn update_status(&self, id: Uuid, status: SubscriptionStatus) -> Result<(), AppError> {
        let result =
            sqlx::query("UPDATE subscriptions SET status = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(status)
                .execute(&self.pool)
                .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Subscription not found".to_string()));
        }
        Ok(())
    }
}
