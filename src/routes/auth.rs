//! Account signup, login and logout

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;

use crate::crypto::{hash_password, verify_password};
use crate::error::ApiError;
use crate::media::MediaStore;
use crate::state::AppState;
use crate::store::{ListingStore, NewUser, ReviewStore, SessionStore, User, UserStore};

use super::session::{clear_session_cookie, set_session_cookie, PublicUser};

/// Default landing page when no redirect hint was stashed
const DEFAULT_REDIRECT: &str = "/listings";

/// Absent keys deserialize as empty and fail the blank-field checks, so
/// a missing field gets the same answer as a blank one
#[derive(Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
pub struct SignupResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
}

/// POST /signup
pub async fn signup<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
    cookies: Cookies,
    Json(req): Json<SignupRequest>,
) -> Result<(StatusCode, Json<SignupResponse>), ApiError>
where
    U: UserStore,
    S: SessionStore,
    L: ListingStore,
    R: ReviewStore,
    M: MediaStore,
{
    if req.username.trim().is_empty() {
        return Err(ApiError::validation("username", "username is required"));
    }
    if req.email.trim().is_empty() {
        return Err(ApiError::validation("email", "email is required"));
    }
    if req.password.is_empty() {
        return Err(ApiError::validation("password", "password is required"));
    }

    let password_hash =
        hash_password(&req.password).map_err(|e| ApiError::Internal(e.to_string()))?;

    let user = state.user_store.create_user(NewUser {
        username: req.username,
        email: req.email,
        password_hash,
    })?;

    // Auto-login: replace whatever session line the caller had
    if let Some(old) = super::session::session_from_cookies(&cookies, state.session_store.as_ref())
    {
        let _ = state.session_store.delete_session(&old.id);
    }
    let session = state.session_store.create_session(Some(user.id))?;
    set_session_cookie(&cookies, &session.id.0);

    Ok((
        StatusCode::CREATED,
        Json(SignupResponse {
            success: true,
            message: "Welcome to Stayfinder!".to_string(),
            user: PublicUser::from(&user),
        }),
    ))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub success: bool,
    pub message: String,
    pub user: PublicUser,
    pub redirect_url: String,
}

/// Check a username/password pair against the user store. Unknown
/// usernames and wrong passwords are indistinguishable to the caller.
pub fn verify_credentials<U: UserStore>(
    user_store: &U,
    username: &str,
    password: &str,
) -> Result<User, ApiError> {
    let user = user_store
        .get_user_by_username(username)?
        .ok_or(ApiError::InvalidCredentials)?;

    let valid = verify_password(password, &user.password_hash)
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    if !valid {
        return Err(ApiError::InvalidCredentials);
    }

    Ok(user)
}

/// POST /login
pub async fn login<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
    cookies: Cookies,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError>
where
    U: UserStore,
    S: SessionStore,
    L: ListingStore,
    R: ReviewStore,
    M: MediaStore,
{
    let user = verify_credentials(state.user_store.as_ref(), &req.username, &req.password)?;

    // Consume the redirect hint from the pre-login session, then rotate
    // the token so the anonymous session never survives authentication
    let old = super::session::session_from_cookies(&cookies, state.session_store.as_ref());
    let redirect = old.as_ref().and_then(|session| {
        state
            .session_store
            .take_redirect(&session.id)
            .ok()
            .flatten()
    });
    if let Some(old) = old {
        let _ = state.session_store.delete_session(&old.id);
    }

    let session = state.session_store.create_session(Some(user.id))?;
    set_session_cookie(&cookies, &session.id.0);

    Ok(Json(LoginResponse {
        success: true,
        message: "Welcome back to Stayfinder!".to_string(),
        user: PublicUser::from(&user),
        redirect_url: redirect.unwrap_or_else(|| DEFAULT_REDIRECT.to_string()),
    }))
}

#[derive(Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub message: String,
}

/// GET /logout
pub async fn logout<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
    cookies: Cookies,
) -> Result<Json<LogoutResponse>, ApiError>
where
    U: UserStore,
    S: SessionStore,
    L: ListingStore,
    R: ReviewStore,
    M: MediaStore,
{
    // Logging out without being logged in is a caller error, not a no-op.
    // Anonymous sessions (redirect stash only) do not count as logged in.
    let session = super::session::session_from_cookies(&cookies, state.session_store.as_ref())
        .filter(|session| session.user.is_some())
        .ok_or(ApiError::NotLoggedIn)?;

    state.session_store.delete_session(&session.id)?;
    clear_session_cookie(&cookies);

    Ok(Json(LogoutResponse {
        success: true,
        message: "You are logged out!".to_string(),
    }))
}
