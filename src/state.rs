// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;

use crate::{config::Config, services::Services};

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub services: Arc<Services>,
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}

impl FromRef<AppState> for Arc<Services> {
    fn from_ref(state: &AppState) -> Self {
        state.services.clone()
    }
}
