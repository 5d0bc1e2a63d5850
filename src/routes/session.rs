//! Session helpers and the authentication status endpoint

use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tower_cookies::Cookies;

use crate::error::ApiError;
use crate::media::MediaStore;
use crate::state::AppState;
use crate::store::{
    ListingStore, ReviewStore, SessionId, SessionStore, User, UserId, UserStore,
};

pub const SESSION_COOKIE: &str = "stayfinder_session";

/// User shape exposed over the wire; never carries the password hash
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        PublicUser {
            id: user.id,
            username: user.username.clone(),
            email: user.email.clone(),
            created_at: user.created_at,
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckAuthResponse {
    pub is_authenticated: bool,
    pub user: Option<PublicUser>,
}

/// GET /check-auth
pub async fn check_auth<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
    cookies: Cookies,
) -> Json<CheckAuthResponse>
where
    U: UserStore,
    S: SessionStore,
    L: ListingStore,
    R: ReviewStore,
    M: MediaStore,
{
    let user = current_user(
        &cookies,
        state.session_store.as_ref(),
        state.user_store.as_ref(),
    );

    Json(CheckAuthResponse {
        is_authenticated: user.is_some(),
        user: user.as_ref().map(PublicUser::from),
    })
}

/// Helper to get the live session named by the request cookie, if any
pub fn session_from_cookies<S: SessionStore>(
    cookies: &Cookies,
    session_store: &S,
) -> Option<crate::store::Session> {
    cookies.get(SESSION_COOKIE).and_then(|c| {
        let session_id = SessionId(c.value().to_string());
        session_store.get_session(&session_id).ok().flatten()
    })
}

/// Helper to resolve the authenticated user behind the request cookie.
/// Anonymous sessions (redirect stash only) resolve to None.
pub fn current_user<S: SessionStore, U: UserStore>(
    cookies: &Cookies,
    session_store: &S,
    user_store: &U,
) -> Option<User> {
    session_from_cookies(cookies, session_store)
        .and_then(|session| session.user)
        .and_then(|id| user_store.get_user(id).ok().flatten())
}

/// Resolve the caller for a mutating endpoint. When nobody is logged in,
/// the attempted path is stashed as a redirect hint before the 401 goes
/// out, so the client can come back here after logging in.
pub fn require_auth_for_mutation<S: SessionStore, U: UserStore>(
    cookies: &Cookies,
    session_store: &S,
    user_store: &U,
    attempted_path: &str,
) -> Result<User, ApiError> {
    match current_user(cookies, session_store, user_store) {
        Some(user) => Ok(user),
        None => {
            stash_redirect(cookies, session_store, attempted_path);
            Err(ApiError::NotAuthenticated)
        }
    }
}

/// Remember `target` on the caller's session, creating an anonymous
/// session if the request carried no usable cookie. The hint is advisory;
/// failures are logged and dropped.
pub fn stash_redirect<S: SessionStore>(cookies: &Cookies, session_store: &S, target: &str) {
    let session = match session_from_cookies(cookies, session_store) {
        Some(session) => session,
        None => match session_store.create_session(None) {
            Ok(session) => {
                set_session_cookie(cookies, &session.id.0);
                session
            }
            Err(e) => {
                tracing::warn!("Failed to create session for redirect hint: {}", e);
                return;
            }
        },
    };

    if let Err(e) = session_store.set_redirect(&session.id, target) {
        tracing::warn!("Failed to stash redirect hint: {}", e);
    }
}

/// Helper to set session cookie
pub fn set_session_cookie(cookies: &Cookies, session_id: &str) {
    use tower_cookies::Cookie;
    let cookie = Cookie::build((SESSION_COOKIE, session_id.to_string()))
        .path("/")
        .http_only(true)
        .same_site(tower_cookies::cookie::SameSite::Lax)
        .build();
    cookies.add(cookie);
}

/// Helper to clear session cookie
pub fn clear_session_cookie(cookies: &Cookies) {
    use tower_cookies::Cookie;
    let cookie = Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .max_age(tower_cookies::cookie::time::Duration::ZERO)
        .build();
    cookies.add(cookie);
}
