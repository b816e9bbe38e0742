// src/handlers/comment.rs

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
    models::{comment::UpdateCommentRequest, user::Actor},
    services::Services,
};

pub async fn list_replies(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.comments.list_replies(id).await?))
}

pub async fn update_comment(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(services.comments.update(&actor, id, &payload.content).await?))
}

pub async fn delete_comment(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.comments.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
