// src/handlers/me.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{mistake::MistakeFilter, pagination::PaginationParams, user::Actor},
    services::Services,
};

pub async fn favorites(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.favorites.list_favorites(actor.id, params).await?))
}

pub async fn mistakes(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<MistakeFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        services
            .mistakes
            .list_mistakes(actor.id, filter.include_resolved, params)
            .await?,
    ))
}

pub async fn delete_mistake(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.mistakes.delete_mistake(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn weak_points(
    State(services): State<Arc<Services>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.mistakes.list_weak_points(actor.id).await?))
}

pub async fn refresh_weak_points(
    State(services): State<Arc<Services>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.mistakes.refresh_weak_points(actor.id).await?))
}

pub async fn dashboard(
    State(services): State<Arc<Services>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.dashboard.user_dashboard(actor.id).await?))
}
