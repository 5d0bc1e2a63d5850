//! Common test utilities for marketplace integration tests

use std::sync::Arc;
use std::sync::RwLock;

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use chrono::Duration;
use serde_json::{json, Value};
use stayfinder::store::ImageRef;
use stayfinder::{
    routes, ApiError, AppState, InMemoryListingStore, InMemoryReviewStore, InMemorySessionStore,
    InMemoryUserStore, MediaStore,
};

pub const SESSION_COOKIE: &str = "stayfinder_session";

/// A couple of JPEG-ish bytes; nothing inspects the image content
pub const FAKE_JPEG: &[u8] = &[0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, 0x4A, 0x46, 0xFF, 0xD9];

/// One call made against the mock media store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaEvent {
    Stored(String),
    Deleted(String),
}

/// Mock media store that records stores and deletes in a single ordered
/// event log
#[derive(Default, Clone)]
pub struct MockMediaStore {
    pub events: Arc<RwLock<Vec<MediaEvent>>>,
}

impl MockMediaStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<MediaEvent> {
        self.events.read().unwrap().clone()
    }

    pub fn stored_handles(&self) -> Vec<String> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                MediaEvent::Stored(handle) => Some(handle.clone()),
                MediaEvent::Deleted(_) => None,
            })
            .collect()
    }

    pub fn deleted_handles(&self) -> Vec<String> {
        self.events
            .read()
            .unwrap()
            .iter()
            .filter_map(|event| match event {
                MediaEvent::Deleted(handle) => Some(handle.clone()),
                MediaEvent::Stored(_) => None,
            })
            .collect()
    }
}

impl MediaStore for MockMediaStore {
    fn store(&self, filename: &str, _bytes: &[u8]) -> Result<ImageRef, ApiError> {
        let mut events = self.events.write().unwrap();
        let n = events
            .iter()
            .filter(|event| matches!(event, MediaEvent::Stored(_)))
            .count();
        let handle = format!("img-{}-{}", n, filename);
        events.push(MediaEvent::Stored(handle.clone()));
        Ok(ImageRef {
            url: format!("/media/{}", handle),
            handle,
        })
    }

    fn delete(&self, handle: &str) -> Result<(), ApiError> {
        self.events
            .write()
            .unwrap()
            .push(MediaEvent::Deleted(handle.to_string()));
        Ok(())
    }
}

/// Concrete state type behind every test server
pub type TestState = AppState<
    InMemoryUserStore,
    InMemorySessionStore,
    InMemoryListingStore,
    InMemoryReviewStore,
    MockMediaStore,
>;

/// Create a test server over in-memory stores and a mock media store
pub fn create_test_server() -> (TestServer, MockMediaStore) {
    let (server, media, _) = create_test_server_with_state(Duration::hours(24));
    (server, media)
}

/// Same, with an explicit session TTL so expiry can be forced
pub fn create_test_server_with_ttl(ttl: Duration) -> (TestServer, MockMediaStore) {
    let (server, media, _) = create_test_server_with_state(ttl);
    (server, media)
}

/// Full harness: the server plus a handle on its stores for assertions
/// the API has no endpoint for
pub fn create_test_server_with_state(
    ttl: Duration,
) -> (TestServer, MockMediaStore, Arc<TestState>) {
    let media = MockMediaStore::new();

    let state = Arc::new(AppState::new(
        Arc::new(InMemoryUserStore::new()),
        Arc::new(InMemorySessionStore::new(ttl)),
        Arc::new(InMemoryListingStore::new()),
        Arc::new(InMemoryReviewStore::new()),
        Arc::new(media.clone()),
    ));

    let app = routes::create_router(state.clone());
    let server = TestServer::new(app).expect("Failed to create test server");

    (server, media, state)
}

/// Build the session cookie for a request
pub fn session_cookie(value: &str) -> cookie::Cookie<'static> {
    cookie::Cookie::new(SESSION_COOKIE.to_string(), value.to_string())
}

/// Helper to sign up a user and return the session cookie value
pub async fn signup_user(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post("/signup")
        .json(&json!({
            "username": username,
            "email": format!("{}@example.com", username),
            "password": password,
        }))
        .await;
    assert_eq!(response.status_code(), 201);

    response
        .maybe_cookie(SESSION_COOKIE)
        .expect("No session cookie")
        .value()
        .to_string()
}

/// Helper to log an existing user in and return the new session cookie value
pub async fn login_user(server: &TestServer, username: &str, password: &str) -> String {
    let response = server
        .post("/login")
        .json(&json!({
            "username": username,
            "password": password,
        }))
        .await;
    assert_eq!(response.status_code(), 200);

    response
        .maybe_cookie(SESSION_COOKIE)
        .expect("No session cookie")
        .value()
        .to_string()
}

/// A complete multipart listing form with the given title
pub fn listing_form(title: &str) -> MultipartForm {
    MultipartForm::new()
        .add_text("title", title)
        .add_text("description", "A fine place to stay")
        .add_text("price", "120")
        .add_text("location", "Somewhere")
        .add_text("country", "Somewhereland")
        .add_part(
            "image",
            Part::bytes(FAKE_JPEG.to_vec())
                .file_name("photo.jpg")
                .mime_type("image/jpeg"),
        )
}

/// Helper to create a listing as the given session; returns the listing id
pub async fn create_listing(server: &TestServer, session: &str, title: &str) -> String {
    let response = server
        .post("/listings")
        .add_cookie(session_cookie(session))
        .multipart(listing_form(title))
        .await;
    assert_eq!(response.status_code(), 201);

    let body: Value = response.json();
    body["listing"]["id"]
        .as_str()
        .expect("No listing id")
        .to_string()
}

/// Helper to post a review; returns the review id
pub async fn create_review(
    server: &TestServer,
    session: &str,
    listing_id: &str,
    comment: &str,
    rating: i32,
) -> String {
    let response = server
        .post(&format!("/listings/{}/reviews", listing_id))
        .add_cookie(session_cookie(session))
        .json(&json!({
            "review": { "comment": comment, "rating": rating }
        }))
        .await;
    assert_eq!(response.status_code(), 201);

    let body: Value = response.json();
    body["review"]["id"]
        .as_str()
        .expect("No review id")
        .to_string()
}
