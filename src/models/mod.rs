// src/models/mod.rs

pub mod comment;
pub mod dashboard;
pub mod event;
pub mod interaction;
pub mod mistake;
pub mod notification;
pub mod pagination;
pub mod quiz;
pub mod quiz_attempt;
pub mod quiz_set;
pub mod subscription;
pub mod tournament;
pub mod user;
