// src/handlers/tournament.rs

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
        pagination::PaginationParams,
        tournament::{
            AddTournamentQuizSetRequest, CreateTournamentRequest, TournamentFilter,
            UpdateTournamentRequest,
        },
        user::Actor,
    },
    services::Services,
};

pub async fn list_tournaments(
    State(services): State<Arc<Services>>,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<TournamentFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.tournaments.list(filter.status, params).await?))
}

pub async fn get_tournament(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.tournaments.get(id).await?))
}

pub async fn leaderboard(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.tournaments.leaderboard(id).await?))
}

// Management routes below sit behind admin_middleware.

pub async fn create_tournament(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Json(payload): Json<CreateTournamentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let tournament = services.tournaments.create(&actor, payload).await?;
    Ok((StatusCode::CREATED, Json(tournament)))
}

pub async fn update_tournament(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateTournamentRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(services.tournaments.update(id, payload).await?))
}

pub async fn delete_tournament(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.tournaments.delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_quiz_set(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
    Json(payload): Json<AddTournamentQuizSetRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let link = services.tournaments.add_quiz_set(id, payload).await?;
    Ok((StatusCode::CREATED, Json(link)))
}

pub async fn remove_quiz_set(
    State(services): State<Arc<Services>>,
    Path((id, quiz_set_id)): Path<(Uuid, Uuid)>,
) -> Result<impl IntoResponse, AppError> {
    services.tournaments.remove_quiz_set(id, quiz_set_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn start_tournament(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.tournaments.start(id).await?))
}

pub async fn end_tournament(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.tournaments.end(id).await?))
}

pub async fn join_tournament(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    let participant = services.tournaments.join(&actor, id).await?;
    Ok((StatusCode::CREATED, Json(participant)))
}

pub async fn leave_tournament(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.tournaments.leave(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
