/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Session endpoints (register, login, logout, refresh, profile)
/// - `tasks`: Owner-scoped task CRUD, search/filter/sort, statistics

pub mod auth;
pub mod health;
pub mod tasks;
