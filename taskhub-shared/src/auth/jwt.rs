/// JWT token generation and validation
///
/// This module issues and verifies the two credentials that make up a
/// Taskhub session:
///
/// - **Access token**: short-lived (minutes), sent as `Authorization:
///   Bearer <token>`, verified on every API request, never persisted.
/// - **Refresh token**: long-lived (days), transported only via an
///   HTTP-only cookie, used solely to mint new access tokens. The
///   currently valid value is also stored on the user row so the server
///   can revoke it.
///
/// Both are HS256-signed JWTs, but with **separate signing secrets**:
/// a token signed with one secret never validates under the other, and
/// the embedded `token_type` claim is checked as a second guard.
///
/// # Example
///
/// ```
/// use taskhub_shared::auth::jwt::{issue_access_token, verify_access_token};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let secret = "access-secret-at-least-32-bytes-long!!";
///
/// let token = issue_access_token(user_id, secret, Duration::minutes(15))?;
/// let claims = verify_access_token(&token, secret)?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```

use chrono::{Duration, Utc};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Issuer claim embedded in every token
const ISSUER: &str = "taskhub";

/// Error type for JWT operations
#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    /// Failed to create token
    #[error("Failed to create token: {0}")]
    CreateError(String),

    /// Token has expired
    #[error("Token has expired")]
    Expired,

    /// Signature, issuer, or structural validation failed
    #[error("Invalid token: {0}")]
    Invalid(String),

    /// Token is valid but of the wrong type (access vs refresh)
    #[error("Wrong token type: expected {expected}")]
    WrongTokenType { expected: &'static str },
}

/// Token type identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Access token (short-lived)
    Access,

    /// Refresh token (long-lived)
    Refresh,
}

impl TokenType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenType::Access => "access",
            TokenType::Refresh => "refresh",
        }
    }
}

/// JWT claims structure
///
/// Standard claims (`sub`, `iss`, `iat`, `exp`, `nbf`) plus the
/// `token_type` custom claim distinguishing access from refresh tokens.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject - user ID
    pub sub: Uuid,

    /// Issuer - always "taskhub"
    pub iss: String,

    /// Issued at (Unix timestamp)
    pub iat: i64,

    /// Expiration time (Unix timestamp)
    pub exp: i64,

    /// Not before (Unix timestamp)
    pub nbf: i64,

    /// Token type (custom claim)
    pub token_type: TokenType,
}

impl Claims {
    /// Creates claims for the given user, expiring after `ttl`
    pub fn new(user_id: Uuid, token_type: TokenType, ttl: Duration) -> Self {
        let now = Utc::now();
        let expiration = now + ttl;

        Self {
            sub: user_id,
            iss: ISSUER.to_string(),
            iat: now.timestamp(),
            exp: expiration.timestamp(),
            nbf: now.timestamp(),
            token_type,
        }
    }

    /// Checks if the token has expired
    pub fn is_expired(&self) -> bool {
        Utc::now().timestamp() >= self.exp
    }

    /// Gets time until expiration, or None if already expired
    pub fn time_until_expiration(&self) -> Option<Duration> {
        let now = Utc::now().timestamp();
        if self.exp > now {
            Some(Duration::seconds(self.exp - now))
        } else {
            None
        }
    }
}

/// Signs claims into a compact JWT string
fn sign(claims: &Claims, secret: &str) -> Result<String, JwtError> {
    let header = Header::new(Algorithm::HS256);
    let key = EncodingKey::from_secret(secret.as_bytes());

    encode(&header, claims, &key)
        .map_err(|e| JwtError::CreateError(format!("Token encoding failed: {}", e)))
}

/// Decodes and validates a token signed with `secret`
///
/// Verifies the signature, expiration, `nbf`, and issuer. Expected
/// failures come back as distinguishable `JwtError` variants rather
/// than panics: an expired or malformed token is a normal runtime
/// condition, not a bug.
fn verify(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let key = DecodingKey::from_secret(secret.as_bytes());

    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[ISSUER]);
    validation.validate_exp = true;
    validation.validate_nbf = true;

    let token_data = decode::<Claims>(token, &key, &validation).map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::Expired,
        _ => JwtError::Invalid(format!("Token validation failed: {}", e)),
    })?;

    Ok(token_data.claims)
}

/// Issues a short-lived access token for `user_id`
///
/// # Errors
///
/// Fails only if encoding fails; a misconfigured signing key is a
/// fatal startup condition, not a per-request error.
pub fn issue_access_token(
    user_id: Uuid,
    secret: &str,
    ttl: Duration,
) -> Result<String, JwtError> {
    sign(&Claims::new(user_id, TokenType::Access, ttl), secret)
}

/// Issues a long-lived refresh token for `user_id`
pub fn issue_refresh_token(
    user_id: Uuid,
    secret: &str,
    ttl: Duration,
) -> Result<String, JwtError> {
    sign(&Claims::new(user_id, TokenType::Refresh, ttl), secret)
}

/// Verifies an access token and returns its claims
///
/// Rejects refresh tokens even if they were (incorrectly) signed with
/// the access secret.
pub fn verify_access_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = verify(token, secret)?;

    if claims.token_type != TokenType::Access {
        return Err(JwtError::WrongTokenType { expected: "access" });
    }

    Ok(claims)
}

/// Verifies a refresh token and returns its claims
///
/// # Example
///
/// ```
/// use taskhub_shared::auth::jwt::{issue_refresh_token, verify_refresh_token};
/// use chrono::Duration;
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let user_id = Uuid::new_v4();
/// let token = issue_refresh_token(user_id, "refresh-secret", Duration::days(7))?;
/// let claims = verify_refresh_token(&token, "refresh-secret")?;
/// assert_eq!(claims.sub, user_id);
/// # Ok(())
/// # }
/// ```
pub fn verify_refresh_token(token: &str, secret: &str) -> Result<Claims, JwtError> {
    let claims = verify(token, secret)?;

    if claims.token_type != TokenType::Refresh {
        return Err(JwtError::WrongTokenType { expected: "refresh" });
    }

    Ok(claims)
}
