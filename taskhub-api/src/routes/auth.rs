/// Session endpoints
///
/// Implements the dual-token session flow:
///
/// - `POST /api/auth/register`: create account, return access token,
///   set refresh cookie
/// - `POST /api/auth/login`: authenticate by email *or* username
/// - `POST /api/auth/logout`: revoke the stored refresh token, clear
///   the cookie (idempotent)
/// - `POST /api/auth/refresh`: mint a new access token from the
///   refresh cookie
/// - `GET /api/auth/profile` / `PUT /api/auth/profile`
///
/// The refresh token travels only in an HTTP-only, SameSite=Strict
/// cookie and is additionally stored on the user row. Refresh checks
/// the presented cookie against the stored value, so a server-side
/// logout or a newer login immediately revokes older cookies even
/// before they expire. The refresh token itself is never rotated on
/// use; only login/register reassign it. That is a deliberate,
/// recorded trade-off: a stolen refresh token keeps working until its
/// natural expiry or the next logout/login.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    middleware::auth::AuthUser,
};
use axum::{extract::State, http::StatusCode, Extension, Json};
use axum_extra::extract::{
    cookie::{Cookie, CookieJar, SameSite},
    WithRejection,
};
use taskhub_shared::{
    auth::{jwt, password},
    dto::{
        ApiResponse, AuthData, LoginRequest, PublicUser, RefreshData, RegisterRequest,
        UpdateProfileRequest,
    },
    models::user::{CreateUser, UpdateProfile, User},
};
use validator::Validate;

/// Name of the refresh-token cookie
pub const REFRESH_COOKIE: &str = "refreshToken";

/// Cookie path: the refresh token is only ever read by auth endpoints,
/// so there is no reason to send it anywhere else
const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// Login failure message
///
/// Identical for "no such user" and "wrong password" to prevent
/// account enumeration.
const INVALID_CREDENTIALS: &str = "Invalid credentials";

/// Builds the refresh-token cookie
///
/// HTTP-only (invisible to page scripts), SameSite=Strict, Secure in
/// production, Max-Age matching the token's lifetime.
fn refresh_cookie(state: &AppState, token: String) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .path(REFRESH_COOKIE_PATH)
        .http_only(true)
        .same_site(SameSite::Strict)
        .secure(state.config.api.production)
        .max_age(time::Duration::days(state.config.jwt.refresh_ttl_days))
        .build()
}

/// Builds an expired cookie that removes the refresh token
fn removal_cookie(state: &AppState) -> Cookie<'static> {
    let mut cookie = refresh_cookie(state, String::new());
    cookie.make_removal();
    cookie
}

/// Issues both tokens for a user and persists the refresh token
///
/// Shared by register and login. Storing the refresh token overwrites
/// whatever was there before, so a second login invalidates the session
/// of the first (single active refresh token per user).
async fn establish_session(
    state: &AppState,
    user: &User,
) -> ApiResult<(String, Cookie<'static>)> {
    let jwt_config = &state.config.jwt;

    let access_token =
        jwt::issue_access_token(user.id, &jwt_config.access_secret, jwt_config.access_ttl())?;
    let refresh_token =
        jwt::issue_refresh_token(user.id, &jwt_config.refresh_secret, jwt_config.refresh_ttl())?;

    User::set_refresh_token(&state.db, user.id, Some(&refresh_token)).await?;

    Ok((access_token, refresh_cookie(state, refresh_token)))
}

/// Register a new user
///
/// # Errors
///
/// - `400 Bad Request`: validation failed
/// - `409 Conflict`: username or email already taken
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<RegisterRequest>, ApiError>,
) -> ApiResult<(StatusCode, CookieJar, Json<ApiResponse<AuthData>>)> {
    req.validate()?;

    // Explicit pre-checks give precise messages; the DB unique
    // constraints remain the backstop for races.
    if User::find_by_username(&state.db, &req.username)
        .await?
        .is_some()
    {
        return Err(ApiError::Conflict("Username already taken".to_string()));
    }
    if User::find_by_email(&state.db, &req.email).await?.is_some() {
        return Err(ApiError::Conflict("Email already registered".to_string()));
    }

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            username: req.username,
            email: req.email,
            password_hash,
            full_name: req.full_name,
        },
    )
    .await?;

    tracing::info!(user_id = %user.id, "User registered");

    let (access_token, cookie) = establish_session(&state, &user).await?;

    Ok((
        StatusCode::CREATED,
        jar.add(cookie),
        Json(ApiResponse::ok_with_message(
            "User registered successfully",
            AuthData {
                user: user.to_public(),
                access_token,
            },
        )),
    ))
}

/// Login with email or username
///
/// # Errors
///
/// - `401 Unauthorized`: unknown identifier or wrong password (same
///   message for both)
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(req), _): WithRejection<Json<LoginRequest>, ApiError>,
) -> ApiResult<(CookieJar, Json<ApiResponse<AuthData>>)> {
    req.validate()?;

    let user = User::find_by_identifier(&state.db, &req.identifier)
        .await?
        .ok_or_else(|| ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()))?;

    let valid = password::verify_password(&req.password, &user.password_hash)?;
    if !valid {
        return Err(ApiError::Unauthorized(INVALID_CREDENTIALS.to_string()));
    }

    tracing::info!(user_id = %user.id, "User logged in");

    // Overwrites any previously stored refresh token: earlier sessions
    // for this user can no longer refresh.
    let (access_token, cookie) = establish_session(&state, &user).await?;

    Ok((
        jar.add(cookie),
        Json(ApiResponse::ok_with_message(
            "Login successful",
            AuthData {
                user: user.to_public(),
                access_token,
            },
        )),
    ))
}

/// Logout: revoke the stored refresh token and clear the cookie
///
/// Idempotent: logging out twice clears an already-clear token.
pub async fn logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    jar: CookieJar,
) -> ApiResult<(CookieJar, Json<ApiResponse<()>>)> {
    User::set_refresh_token(&state.db, auth.user_id, None).await?;

    tracing::info!(user_id = %auth.user_id, "User logged out");

    Ok((
        jar.add(removal_cookie(&state)),
        Json(ApiResponse::ok_message("Logged out successfully")),
    ))
}

/// Issue a new access token from the refresh cookie
///
/// The token must verify against the refresh secret *and* equal the
/// value currently stored for that user; a cookie that outlived a
/// logout or a newer login fails the second check. The refresh token
/// is not rotated here.
///
/// # Errors
///
/// - `401 Unauthorized`: cookie absent, invalid, expired, or revoked
pub async fn refresh(
    State(state): State<AppState>,
    jar: CookieJar,
) -> ApiResult<Json<ApiResponse<RefreshData>>> {
    let presented = jar
        .get(REFRESH_COOKIE)
        .map(|c| c.value().to_string())
        .ok_or_else(|| ApiError::Unauthorized("Refresh token missing".to_string()))?;

    let claims = jwt::verify_refresh_token(&presented, &state.config.jwt.refresh_secret)?;

    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .ok_or_else(|| ApiError::Unauthorized("Invalid refresh token".to_string()))?;

    if user.refresh_token.as_deref() != Some(presented.as_str()) {
        return Err(ApiError::Unauthorized("Invalid refresh token".to_string()));
    }

    let access_token = jwt::issue_access_token(
        user.id,
        &state.config.jwt.access_secret,
        state.config.jwt.access_ttl(),
    )?;

    Ok(Json(ApiResponse::ok(RefreshData { access_token })))
}

/// Fetch the caller's profile
pub async fn get_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    let user = User::find_by_id(&state.db, auth.user_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::ok(user.to_public())))
}

/// Update the caller's username and/or full name
///
/// Partial update: only provided fields are touched.
///
/// # Errors
///
/// - `409 Conflict`: the new username belongs to a different user
pub async fn update_profile(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthUser>,
    WithRejection(Json(req), _): WithRejection<Json<UpdateProfileRequest>, ApiError>,
) -> ApiResult<Json<ApiResponse<PublicUser>>> {
    req.validate()?;

    if let Some(ref username) = req.username {
        if let Some(existing) = User::find_by_username(&state.db, username).await? {
            if existing.id != auth.user_id {
                return Err(ApiError::Conflict("Username already taken".to_string()));
            }
        }
    }

    let user = User::update_profile(
        &state.db,
        auth.user_id,
        UpdateProfile {
            username: req.username,
            full_name: req.full_name,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(ApiResponse::ok_with_message(
        "Profile updated successfully",
        user.to_public(),
    )))
}
