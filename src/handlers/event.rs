// src/handlers/event.rs

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
        event::{CreateEventRequest, EventFilter, RecordEventResultRequest, UpdateEventRequest},
        pagination::PaginationParams,
        user::Actor,
    },
    services::Services,
};

pub async fn list_events(
    State(services): State<Arc<Services>>,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<EventFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.events.list(filter.status, params).await?))
}

pub async fn get_event(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.events.get(id).await?))
}

pub async fn leaderboard(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.events.leaderboard(id).await?))
}

pub async fn create_event(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Json(payload): Json<CreateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let event = services.events.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

pub async fn update_event(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateEventRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(services.events.update(&actor, id, payload).await?))
}

pub async fn delete_event(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.events.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_event(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.events.start(&actor, id).await?))
}

pub async fn end_event(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.events.end(&actor, id).await?))
}

pub async fn join_event(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let participant = services.events.join(&actor, id).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

pub async fn leave_event(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.events.leave(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Credits one of the caller's completed attempts to the event.
pub async fn record_result(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<RecordEventResultRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        services
            .events
            .record_attempt_result(&actor, id, payload.attempt_id)
            .await?,
    ))
}
