// src/handlers/notification.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    error::AppError,
    models::{
        notification::{NotificationFilter, UnreadCountResponse},
        pagination::PaginationParams,
        user::Actor,
    },
    services::Services,
};

pub async fn list_notifications(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<NotificationFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        services
            .notifications
            .list(actor.id, filter.unread_only, params)
            .await?,
    ))
}

pub async fn unread_count(
    State(services): State<Arc<Services>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    let unread = services.notifications.unread_count(actor.id).await?;
    Ok(Json(UnreadCountResponse { unread }))
}

pub async fn mark_read(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.notifications.mark_read(&actor, id).await?))
}

pub async fn mark_all_read(
    State(services): State<Arc<Services>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    let updated = services.notifications.mark_all_read(actor.id).await?;
    Ok(Json(json!({ "updated": updated })))
}

pub async fn delete_notification(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.notifications.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
