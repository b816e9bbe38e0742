// src/handlers/subscription.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{
        subscription::{CreatePlanRequest, PlanFilter, SubscribeRequest, UpdatePlanRequest},
        user::Actor,
    },
    services::Services,
};

pub async fn list_plans(
    State(services): State<Arc<Services>>,
    Query(filter): Query<PlanFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.subscriptions.list_plans(filter.include_inactive).await?))
}

pub async fn create_plan(
    State(services): State<Arc<Services>>,
    Json(payload): Json<CreatePlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let plan = services.subscriptions.create_plan(payload).await?;
    Ok((StatusCode::CREATED, Json(plan)))
}

pub async fn update_plan(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdatePlanRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(services.subscriptions.update_plan(id, payload).await?))
}

/// Plans are deactivated, never removed, so existing subscriptions keep their plan.
pub async fn deactivate_plan(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.subscriptions.deactivate_plan(id).await?))
}

pub async fn my_subscription(
    State(services): State<Arc<Services>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.subscriptions.get_active_subscription(actor.id).await?))
}

pub async fn subscribe(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Json(payload): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let subscription = services
        .subscriptions
        .subscribe(actor.id, payload.plan_id)
        .await?;
    Ok((StatusCode::CREATED, Json(subscription)))
}

pub async fn cancel(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.subscriptions.cancel(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
