use std::sync::Arc;

use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::{
    config::FREE_PLAN_NAME,
    error::AppError,
    models::{
        subscription::{
            CreatePlanRequest, Subscription, SubscriptionDto, SubscriptionPlan, SubscriptionStatus,
            UpdatePlanRequest,
        },
        user::Actor,
    },
    repositories::{
        subscription_repository::{SubscriptionPlanRepository, SubscriptionRepository},
        user_repository::UserRepository,
    },
};

#[derive(Clone)]
pub struct SubscriptionService {
    plans: Arc<dyn SubscriptionPlanRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    users: Arc<dyn UserRepository>,
}

impl SubscriptionService {
    pub fn new(
        plans: Arc<dyn SubscriptionPlanRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            plans,
            subscriptions,
            users,
        }
    }

    pub async fn create_plan(&self, req: CreatePlanRequest) -> Result<SubscriptionPlan, AppError> {
        let name = req.name.trim().to_string();
        if name.is_empty() {
            return Err(AppError::BadRequest("Plan name is required".to_string()));
        }
        if req.price_cents < 0 || req.duration_days < 0 {
            return Err(AppError::BadRequest(
                "Price and duration cannot be negative".to_string(),
            ));
        }
        if self.plans.find_by_name(&name).await?.is_some() {
            return Err(AppError::Conflict(format!("Plan '{name}' already exists")));
        }

        let now = Utc::now();
        let plan = SubscriptionPlan {
            id: Uuid::new_v4(),
            name,
            description: req.description,
            price_cents: req.price_cents,
            duration_days: req.duration_days,
            can_access_premium: req.can_access_premium,
            max_attempts_per_day: req.max_attempts_per_day,
            is_active: true,
            created_at: now,
            updated_at: now,
        };
        let created = self.plans.create(plan).await?;
        tracing::info!("Subscription plan created: {}", created.name);
        Ok(created)
    }

    pub async fn list_plans(&self, include_inactive: bool) -> Result<Vec<SubscriptionPlan>, AppError> {
        self.plans.list(include_inactive).await
    }

    pub async fn get_plan(&self, id: Uuid) -> Result<SubscriptionPlan, AppError> {
        self.plans
            .find_by_id(id)
            .await?
            .ok_or(AppError::NotFound("Subscription plan not found".to_string()))
    }

    pub async fn update_plan(
        &self,
        id: Uuid,
        req: UpdatePlanRequest,
    ) -> Result<SubscriptionPlan, AppError> {
        let mut plan = self.get_plan(id).await?;

        if let Some(name) = req.name {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(AppError::BadRequest("Plan name is required".to_string()));
            }
            if let Some(existing) = self.plans.find_by_name(&name).await? {
                if existing.id != id {
                    return Err(AppError::Conflict(format!("Plan '{name}' already exists")));
                }
            }
            plan.name = name;
        }
        if let Some(description) = req.description {
            plan.description = Some(description);
        }
        if let Some(price) = req.price_cents {
            if price < 0 {
                return Err(AppError::BadRequest("Price cannot be negative".to_string()));
            }
            plan.price_cents = price;
        }
        if let Some(days) = req.duration_days {
            if days < 0 {
                return Err(AppError::BadRequest("Duration cannot be negative".to_string()));
            }
            plan.duration_days = days;
        }
        if let Some(premium) = req.can_access_premium {
            plan.can_access_premium = premium;
        }
        if let Some(limit) = req.max_attempts_per_day {
            if limit < 0 {
                return Err(AppError::BadRequest(
                    "Daily attempt limit cannot be negative".to_string(),
                ));
            }
            plan.max_attempts_per_day = (limit > 0).then_some(limit);
        }
        if let Some(active) = req.is_active {
            plan.is_active = active;
        }

        self.plans.update(plan).await
    }

    pub async fn deactivate_plan(&self, id: Uuid) -> Result<SubscriptionPlan, AppError> {
        let mut plan = self.get_plan(id).await?;
        plan.is_active = false;
        let updated = self.plans.update(plan).await?;
        tracing::info!("Subscription plan deactivated: {}", updated.name);
        Ok(updated)
    }

    /// Moves the user onto `plan_id`, cancelling whatever they held before.
    pub async fn subscribe(&self, user_id: Uuid, plan_id: Uuid) -> Result<SubscriptionDto, AppError> {
        let plan = self.get_plan(plan_id).await?;
        if !plan.is_active {
            return Err(AppError::InvalidOperation(
                "Subscription plan is not available".to_string(),
            ));
        }
        let user = self
            .users
            .find_by_id(user_id)
            .await?
            .filter(|u| !u.is_deleted())
            .ok_or(AppError::NotFound("User not found".to_string()))?;

        if let Some(current) = self.subscriptions.find_active_for_user(user.id).await? {
            self.subscriptions
                .update_status(current.id, SubscriptionStatus::Cancelled)
                .await?;
        }

        let now = Utc::now();
        let ends_at = (plan.duration_days > 0).then(|| now + Duration::days(i64::from(plan.duration_days)));
        let subscription = Subscription {
            id: Uuid::new_v4(),
            user_id: user.id,
            plan_id: plan.id,
            status: SubscriptionStatus::Active,
            starts_at: now,
            ends_at,
            created_at: now,
            updated_at: now,
        };
        let created = self.subscriptions.create(subscription).await?;

        tracing::info!("User {} subscribed to plan {}", user.id, plan.name);
        Ok(SubscriptionDto::from_parts(created, &plan))
    }

    /// The user's current subscription. A lapsed one is marked expired on read.
    pub async fn get_active_subscription(
        &self,
        user_id: Uuid,
    ) -> Result<Option<SubscriptionDto>, AppError> {
        let Some(subscription) = self.subscriptions.find_active_for_user(user_id).await? else {
            return Ok(None);
        };

        if subscription.is_lapsed(Utc::now()) {
            self.subscriptions
                .update_status(subscription.id, SubscriptionStatus::Expired)
                .await?;
            tracing::info!("Subscription {} expired", subscription.id);
            return Ok(None);
        }

        let plan = self.get_plan(subscription.plan_id).await?;
        Ok(Some(SubscriptionDto::from_parts(subscription, &plan)))
    }

    pub async fn cancel(&self, actor: &Actor, subscription_id: Uuid) -> Result<(), AppError> {
        let subscription = self
            .subscriptions
            .find_by_id(subscription_id)
            .await?
            .ok_or(AppError::NotFound("Subscription not found".to_string()))?;

        if !actor.is_owner_or_admin(subscription.user_id) {
            return Err(AppError::Forbidden(
                "You can only cancel your own subscription".to_string(),
            ));
        }
        if subscription.status != SubscriptionStatus::Active {
            return Err(AppError::InvalidOperation(
                "Only active subscriptions can be cancelled".to_string(),
            ));
        }

        self.subscriptions
            .update_status(subscription.id, SubscriptionStatus::Cancelled)
            .await?;
        tracing::info!("Subscription {} cancelled", subscription.id);
        Ok(())
    }

    /// Attaches the free plan to users without an active subscription.
    pub async fn ensure_free_subscription(&self, user_id: Uuid) -> Result<(), AppError> {
        if self.get_active_subscription(user_id).await?.is_some() {
            return Ok(());
        }
        let Some(plan) = self.plans.find_by_name(FREE_PLAN_NAME).await? else {
            tracing::warn!("Free plan '{}' is missing; user {} has no plan", FREE_PLAN_NAME, user_id);
            return Ok(());
        };
        self.subscribe(user_id, plan.id).await?;
        Ok(())
    }

    pub async fn has_premium_access(&self, user_id: Uuid) -> Result<bool, AppError> {
        Ok(self
            .get_active_subscription(user_id)
            .await?
            .is_some_and(|s| s.can_access_premium))
    }
}
