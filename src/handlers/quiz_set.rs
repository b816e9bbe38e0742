// src/handlers/quiz_set.rs

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
        comment::CreateCommentRequest,
        pagination::PaginationParams,
        quiz::CreateQuizRequest,
        quiz_attempt::LeaderboardParams,
        quiz_set::{CreateQuizSetRequest, QuizSetFilter, UpdateQuizSetRequest},
        user::Actor,
    },
    services::Services,
};

/// Public listing. Only published quiz sets are returned.
pub async fn list_quiz_sets(
    State(services): State<Arc<Services>>,
    Query(params): Query<PaginationParams>,
    Query(mut filter): Query<QuizSetFilter>,
) -> Result<impl IntoResponse, AppError> {
    filter.published_only = true;
    Ok(Json(services.quiz_sets.list(filter, params).await?))
}

/// Signed-in editors also see their unpublished sets.
pub async fn get_quiz_set(
    State(services): State<Arc<Services>>,
    actor: Option<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.quiz_sets.get(actor.as_ref(), id).await?))
}

/// Questions without answers, in set order.
pub async fn list_quizzes(
    State(services): State<Arc<Services>>,
    actor: Option<Actor>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.quizzes.list_by_quiz_set(actor.as_ref(), id).await?))
}

pub async fn list_comments(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
    Query(params): Query<PaginationParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.comments.list_by_quiz_set(id, params).await?))
}

pub async fn leaderboard(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
    Query(params): Query<LeaderboardParams>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.attempts.quiz_set_leaderboard(id, params.limit).await?))
}

pub async fn create_quiz_set(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Json(payload): Json<CreateQuizSetRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let quiz_set = services.quiz_sets.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(quiz_set)))
}

pub async fn update_quiz_set(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateQuizSetRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(services.quiz_sets.update(&actor, id, payload).await?))
}

pub async fn delete_quiz_set(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.quiz_sets.delete(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn publish_quiz_set(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.quiz_sets.publish(&actor, id).await?))
}

pub async fn unpublish_quiz_set(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.quiz_sets.unpublish(&actor, id).await?))
}

pub async fn restore_quiz_set(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.quiz_sets.restore(&actor, id).await?))
}

/// Creates a quiz and appends it to the set.
pub async fn create_quiz(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateQuizRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let quiz = services.quizzes.create(&actor, id, payload).await?;
    Ok((StatusCode::CREATED, Json(quiz)))
}

pub async fn attach_quiz(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path((id, quiz_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    let link = services.quizzes.attach_to_set(&actor, quiz_id, id).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn detach_quiz(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path((id, quiz_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    services.quizzes.detach_from_set(&actor, quiz_id, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn create_comment(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<CreateCommentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let comment = services.comments.create(&actor, id, payload).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn toggle_like(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.likes.toggle_like(&actor, id).await?))
}

pub async fn like_status(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.likes.like_status(actor.id, id).await?))
}

pub async fn toggle_favorite(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.favorites.toggle_favorite(&actor, id).await?))
}
