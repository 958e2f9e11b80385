/// Middleware for the API server
///
/// - `auth`: Access-token verification; injects [`auth::AuthUser`] into
///   request extensions for protected routes
/// - `security`: Security-related response headers

pub mod auth;
pub mod security;
