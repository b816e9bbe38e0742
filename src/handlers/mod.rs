// src/handlers/mod.rs

pub mod admin;
pub mod attempt;
pub mod auth;
pub mod comment;
pub mod event;
pub mod me;
pub mod notification;
pub mod quiz;
pub mod quiz_set;
pub mod subscription;
pub mod tournament;
pub mod user;
