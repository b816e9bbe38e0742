// src/handlers/quiz.rs

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    error::AppError,
    models::{quiz::UpdateQuizRequest, user::Actor},
    services::Services,
};

/// Editors get the full quiz, everyone else the public view.
pub async fn get_quiz(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.quizzes.get(&actor, id).await?))
}

pub async fn update_quiz(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(services.quizzes.update(&actor, id, payload).await?))
}

pub async fn delete_quiz(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.quizzes.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
