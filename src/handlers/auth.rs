// src/handlers/auth.rs

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use validator::Validate;

use crate::{
    error::AppError,
    models::user::{Actor, ChangePasswordRequest, LoginRequest, RegisterRequest},
    services::Services,
};

/// Registers a new user.
///
/// Returns 201 Created and the user (without the password hash).
pub async fn register(
    State(services): State<Arc<Services>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    let user = services.identity.register(payload).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

/// Authenticates by username or email and returns a bearer token.
pub async fn login(
    State(services): State<Arc<Services>>,
    Json(payload): Json<LoginRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    Ok(Json(services.identity.login(payload).await?))
}

pub async fn me(
    State(services): State<Arc<Services>>,
    actor: Actor,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.identity.me(&actor).await?))
}

pub async fn change_password(
    State(services): State<Arc<Services>>,
    actor: Actor,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<impl IntoResponse, AppError> {
    payload.validate()?;
    services.identity.change_password(&actor, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}
