/// Authentication utilities
///
/// This module provides the building blocks for the Taskhub session flow:
///
/// - `jwt`: Access/refresh token issuing and verification (HS256)
/// - `password`: Argon2id password hashing and verification
///
/// Access and refresh tokens are signed with *separate* secrets, so a
/// compromised refresh secret never validates access tokens and vice versa.

pub mod jwt;
pub mod password;
