// src/config.rs

use std::env;

use dotenvy::dotenv;

use crate::error::AppError;

/// Default page size when the client does not send one.
pub const DEFAULT_PAGE_SIZE: u32 = 10;
/// Upper bound accepted for `page_size`.
pub const MAX_PAGE_SIZE: u32 = 100;
/// Points awarded for each correctly answered question.
pub const POINTS_PER_CORRECT_ANSWER: i32 = 10;
/// Plan attached to every new account.
pub const FREE_PLAN_NAME: &str = "Free";
pub const LEADERBOARD_DEFAULT_LIMIT: usize = 10;
pub const DASHBOARD_RECENT_ATTEMPTS: u32 = 5;
pub const DASHBOARD_TOP_WEAK_POINTS: usize = 3;
pub const MAX_COMMENT_LENGTH: usize = 1000;
/// Topic assigned to quizzes that were created without one.
pub const GENERAL_TOPIC: &str = "General";

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    /// Token lifetime in seconds.
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub server_port: u16,
    pub cors_origins: Vec<String>,
    pub admin_username: Option<String>,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;

        let jwt_expiration = env::var("JWT_EXPIRATION")
            .ok()
            .map(|v| v.parse::<u64>())
            .transpose()
            .map_err(|e| AppError::InternalServerError(format!("JWT_EXPIRATION: {e}")))?
            .unwrap_or(86_400);

        let server_port = env::var("SERVER_PORT")
            .ok()
            .map(|v| v.parse::<u16>())
            .transpose()
            .map_err(|e| AppError::InternalServerError(format!("SERVER_PORT: {e}")))?
            .unwrap_or(3000);

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:5173".to_string())
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            server_port,
            cors_origins,
            admin_username: env::var("ADMIN_USERNAME").ok(),
            admin_email: env::var("ADMIN_EMAIL").ok(),
            admin_password: env::var("ADMIN_PASSWORD").ok(),
        })
    }
}

fn required(key: &str) -> Result<String, AppError> {
    env::var(key).map_err(|_| AppError::InternalServerError(format!("{key} must be set")))
}
