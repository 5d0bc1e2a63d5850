//! HTTP routes for the marketplace API

mod auth;
mod listings;
mod reviews;
mod session;

use std::sync::Arc;

use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{delete, get, post};
use axum::Router;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::media::MediaStore;
use crate::state::AppState;
use crate::store::{ListingStore, ReviewStore, SessionStore, UserStore};

/// Image uploads beyond this are refused at the body layer
const MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

/// Create the router with all routes
pub fn create_router<U, S, L, R, M>(state: Arc<AppState<U, S, L, R, M>>) -> Router
where
    U: UserStore + 'static,
    S: SessionStore + 'static,
    L: ListingStore + 'static,
    R: ReviewStore + 'static,
    M: MediaStore + 'static,
{
    create_router_with_options(state, "media", "http://localhost:5173")
}

/// Create the router with explicit media directory and CORS origin
pub fn create_router_with_options<U, S, L, R, M>(
    state: Arc<AppState<U, S, L, R, M>>,
    media_path: &str,
    cors_origin: &str,
) -> Router
where
    U: UserStore + 'static,
    S: SessionStore + 'static,
    L: ListingStore + 'static,
    R: ReviewStore + 'static,
    M: MediaStore + 'static,
{
    // Credentialed CORS requires an exact origin; wildcard would make the
    // browser drop the session cookie
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers([header::CONTENT_TYPE])
        .allow_credentials(true);
    match HeaderValue::from_str(cors_origin) {
        Ok(origin) => cors = cors.allow_origin(origin),
        Err(_) => tracing::warn!(
            origin = %cors_origin,
            "Invalid CORS origin; cross-origin requests will be refused"
        ),
    }

    Router::new()
        .route("/listings", get(listings::index).post(listings::create))
        .route(
            "/listings/:id",
            get(listings::show)
                .put(listings::update)
                .delete(listings::remove),
        )
        .route("/listings/:id/reviews", post(reviews::create))
        .route(
            "/listings/:id/reviews/:review_id",
            delete(reviews::remove),
        )
        .route("/signup", post(auth::signup))
        .route("/login", post(auth::login))
        .route("/logout", get(auth::logout))
        .route("/check-auth", get(session::check_auth))
        .route("/user", get(listings::mine))
        // Serve uploaded listing images
        .nest_service("/media", ServeDir::new(media_path))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(CookieManagerLayer::new())
        .with_state(state)
}
