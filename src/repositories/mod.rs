// src/repositories/mod.rs

pub mod comment_repository;
pub mod event_repository;
pub mod interaction_repository;
pub mod mistake_repository;
pub mod notification_repository;
pub mod quiz_attempt_repository;
pub mod quiz_repository;
pub mod quiz_set_repository;
pub mod subscription_repository;
pub mod tournament_repository;
pub mod user_repository;
