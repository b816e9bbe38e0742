// src/handlers/attempt.rs

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
    models::{
        pagination::PaginationParams,
        quiz_attempt::{StartAttemptRequest, SubmitAttemptRequest},
        user::Actor,
    },
    services::Services,
};

/// Starts an attempt and returns the questions to answer.
pub async fn start_attempt(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Json(payload): Json<StartAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    let started = services
        .attempts
        .start_attempt(&actor, payload.quiz_set_id)
        .await?;
    Ok((StatusCode::CREATED, Json(started)))
}

pub async fn my_attempts(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.attempts.list_user_attempts(actor.id, params).await?))
}

pub async fn my_stats(
    State(services): State<Arc<Services>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.attempts.get_user_stats(actor.id).await?))
}

/// Best completed attempt on one quiz set, or `null` when none exists.
pub async fn my_best_attempt(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(quiz_set_id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(
        services
            .attempts
            .get_best_attempt(actor.id, quiz_set_id)
            .await?,
    ))
}

pub async fn get_attempt(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.attempts.get_attempt(&actor, id).await?))
}

/// Grades the submission and returns per-question feedback.
pub async fn submit_attempt(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<SubmitAttemptRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.attempts.submit_attempt(&actor, id, payload).await?))
}

pub async fn abandon_attempt(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.attempts.abandon_attempt(&actor, id).await?))
}
