//! HTTP handlers

mod auth;
mod health;

pub use auth::{login, logout, me, refresh, register};
pub use health::{health, ready};
