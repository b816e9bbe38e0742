// src/handlers/admin.rs

use std::sync::Arc;

use axum::{Json, extract::State, response::IntoResponse};

use crate::{error::AppError, services::Services};

/// Platform-wide counters.
pub async fn overview(
    State(services): State<Arc<Services>>,
) -> Result<impl IntoResponse, AppError> {
    Ok(Json(services.dashboard.admin_overview().await?))
}
