//! # Taskhub Shared Library
//!
//! This crate contains the types and business logic shared between the
//! Taskhub API server and the client SDK.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, tasks) and their CRUD operations
//! - `auth`: Token issuing/verification and password hashing
//! - `db`: Connection pool and migration runner
//! - `dto`: Wire types (the JSON response envelope and public shapes)

pub mod auth;
pub mod db;
pub mod dto;
pub mod models;

/// Current version of the Taskhub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
