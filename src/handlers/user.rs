// src/handlers/user.rs

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
        user::{Actor, ChangeRoleRequest, UpdateProfileRequest, UserFilter},
    },
    services::Services,
};

/// Admin: paginated user list with optional `search` on username or email.
pub async fn list_users(
    State(services): State<Arc<Services>>,
    Query(params): Query<PaginationParams>,
    Query(filter): Query<UserFilter>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.users.list_users(params, filter.search).await?))
}

pub async fn get_user(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.users.get_user(id).await?))
}

pub async fn update_user(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(services.users.update_profile(&actor, id, payload).await?))
}

pub async fn delete_user(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    services.users.delete_user(&actor, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn restore_user(
    State(services): State<Arc<Services>>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.users.restore_user(id).await?))
}

pub async fn change_role(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Path(id): Path<Uuid>,
    Json(payload): Json<ChangeRoleRequest>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.users.change_role(&actor, id, payload.role).await?))
}
