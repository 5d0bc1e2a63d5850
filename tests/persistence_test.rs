//! SQLite-backed server flow and restart persistence

mod common;

use std::sync::Arc;

use axum_test::TestServer;
use chrono::Duration;
use common::{create_listing, create_review, session_cookie, signup_user, MockMediaStore};
use serde_json::Value;
use stayfinder::store::{ListingStore, ReviewStore};
use stayfinder::{routes, AppState, SqliteStore};

fn sqlite_server(path: &str) -> (TestServer, MockMediaStore) {
    let store = Arc::new(SqliteStore::open(path, Duration::hours(24)).expect("open store"));
    let media = MockMediaStore::new();

    let state = Arc::new(AppState::new(
        store.clone(),
        store.clone(),
        store.clone(),
        store.clone(),
        Arc::new(media.clone()),
    ));

    let server = TestServer::new(routes::create_router(state)).expect("test server");
    (server, media)
}

/// Test: the whole flow works with every store slot backed by one
/// SQLite database, and the data survives a restart
#[tokio::test]
async fn test_sqlite_backend_survives_restart() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("market.db");
    let path = path.to_str().expect("utf8 path");

    let listing_id;
    {
        let (server, _) = sqlite_server(path);

        let alice = signup_user(&server, "alice", "pw").await;
        let bob = signup_user(&server, "bob", "pw").await;

        listing_id = create_listing(&server, &alice, "Grain silo conversion").await;
        create_review(&server, &bob, &listing_id, "Echoey", 4).await;

        let detail: Value = server
            .get(&format!("/listings/{}", listing_id))
            .await
            .json();
        assert_eq!(detail["owner"]["username"], "alice");
        assert_eq!(detail["reviews"].as_array().expect("reviews").len(), 1);

        // The session survives in the same database
        let response = server
            .get("/check-auth")
            .add_cookie(session_cookie(&alice))
            .await;
        let body: Value = response.json();
        assert_eq!(body["isAuthenticated"], true);
    }

    // Reopen the same file cold
    let store = SqliteStore::open(path, Duration::hours(24)).expect("reopen");
    let listings = store.list_listings().expect("list");
    assert_eq!(listings.len(), 1);
    assert_eq!(listings[0].title, "Grain silo conversion");
    assert_eq!(listings[0].reviews.len(), 1);

    let reviews = store
        .reviews_by_listing(listings[0].id)
        .expect("reviews");
    assert_eq!(reviews.len(), 1);
    assert_eq!(reviews[0].comment, "Echoey");
}
