//! Listing CRUD, ownership and image lifecycle tests

mod common;

use axum_test::multipart::{MultipartForm, Part};
use common::{
    create_listing, create_test_server, listing_form, session_cookie, signup_user, FAKE_JPEG,
    MediaEvent,
};
use serde_json::{json, Value};

/// Test: the index is public and starts empty
#[tokio::test]
async fn test_index_is_public_and_starts_empty() {
    let (server, _) = create_test_server();

    let response = server.get("/listings").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body.as_array().expect("array body").len(), 0);
}

/// Test: creating a listing requires a logged-in caller
#[tokio::test]
async fn test_create_requires_auth() {
    let (server, media) = create_test_server();

    let response = server
        .post("/listings")
        .multipart(listing_form("Trullo in the olive grove"))
        .await;

    assert_eq!(response.status_code(), 401);
    let body: Value = response.json();
    assert_eq!(
        body["reason"],
        "You must be logged in to perform this action"
    );
    // The image was never stored
    assert!(media.stored_handles().is_empty());
}

/// Test: create then read back, raw and populated
#[tokio::test]
async fn test_create_and_show_listing() {
    let (server, _) = create_test_server();
    let alice = signup_user(&server, "alice", "pw").await;

    let response = server
        .post("/listings")
        .add_cookie(session_cookie(&alice))
        .multipart(listing_form("Lighthouse keeper's cottage"))
        .await;
    assert_eq!(response.status_code(), 201);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["listing"]["title"], "Lighthouse keeper's cottage");
    assert!(body["listing"]["image"]["url"].is_string());
    let id = body["listing"]["id"].as_str().expect("listing id").to_string();

    // Raw index: owner is an id, reviews are ids
    let response = server.get("/listings").await;
    let body: Value = response.json();
    let docs = body.as_array().expect("array body");
    assert_eq!(docs.len(), 1);
    assert!(docs[0]["owner"].is_string());
    assert_eq!(docs[0]["reviews"].as_array().expect("reviews").len(), 0);

    // Detail: owner is populated, anonymously too
    let response = server.get(&format!("/listings/{}", id)).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["title"], "Lighthouse keeper's cottage");
    assert_eq!(body["owner"]["username"], "alice");
    assert!(body["owner"]["id"].is_string());
    assert_eq!(body["reviews"].as_array().expect("reviews").len(), 0);
}

/// Test: the image part is mandatory on create
#[tokio::test]
async fn test_create_requires_image() {
    let (server, media) = create_test_server();
    let session = signup_user(&server, "gail", "pw").await;

    let form = MultipartForm::new()
        .add_text("title", "No photo yet")
        .add_text("description", "Trust me")
        .add_text("price", "50")
        .add_text("location", "Nowhere")
        .add_text("country", "Nowhereland");

    let response = server
        .post("/listings")
        .add_cookie(session_cookie(&session))
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 400);
    let body: Value = response.json();
    assert_eq!(body["field"], "image");
    assert!(media.stored_handles().is_empty());
}

/// Test: field validation names the offending field and stores nothing
#[tokio::test]
async fn test_create_validates_fields() {
    let (server, media) = create_test_server();
    let session = signup_user(&server, "hank", "pw").await;

    let cases = [
        ("", "120", "title"),
        ("A place", "not-a-number", "price"),
        ("A place", "-10", "price"),
        ("A place", "0", "price"),
    ];

    for (title, price, expected_field) in cases {
        let form = MultipartForm::new()
            .add_text("title", title)
            .add_text("description", "desc")
            .add_text("price", price)
            .add_text("location", "loc")
            .add_text("country", "ctry")
            .add_part(
                "image",
                Part::bytes(FAKE_JPEG.to_vec())
                    .file_name("photo.jpg")
                    .mime_type("image/jpeg"),
            );

        let response = server
            .post("/listings")
            .add_cookie(session_cookie(&session))
            .multipart(form)
            .await;

        assert_eq!(response.status_code(), 400, "case {title}/{price}");
        let body: Value = response.json();
        assert_eq!(body["field"], expected_field, "case {title}/{price}");
    }

    // None of the rejected forms stored bytes
    assert!(media.stored_handles().is_empty());
    let index: Value = server.get("/listings").await.json();
    assert_eq!(index.as_array().expect("array").len(), 0);
}

/// Test: the owner can edit fields without touching the image
#[tokio::test]
async fn test_update_own_listing_keeps_image() {
    let (server, media) = create_test_server();
    let alice = signup_user(&server, "alice", "pw").await;
    let id = create_listing(&server, &alice, "Boathouse").await;

    let form = MultipartForm::new()
        .add_text("title", "Boathouse with jetty")
        .add_text("description", "Now with somewhere to tie up")
        .add_text("price", "150")
        .add_text("location", "Somewhere")
        .add_text("country", "Somewhereland");

    let response = server
        .put(&format!("/listings/{}", id))
        .add_cookie(session_cookie(&alice))
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["listing"]["title"], "Boathouse with jetty");
    assert_eq!(body["listing"]["price"], 150.0);

    // No image came in, so nothing was stored or deleted
    assert_eq!(media.stored_handles().len(), 1);
    assert!(media.deleted_handles().is_empty());

    let detail: Value = server.get(&format!("/listings/{}", id)).await.json();
    assert_eq!(detail["title"], "Boathouse with jetty");
}

/// Test: replacing the image deletes the old bytes exactly once, after
/// the new reference is in place
#[tokio::test]
async fn test_update_replaces_image() {
    let (server, media) = create_test_server();
    let alice = signup_user(&server, "alice", "pw").await;
    let id = create_listing(&server, &alice, "Windmill").await;

    let old_handle = media.stored_handles()[0].clone();

    let form = MultipartForm::new()
        .add_text("title", "Windmill")
        .add_text("description", "Repainted sails")
        .add_text("price", "120")
        .add_text("location", "Somewhere")
        .add_text("country", "Somewhereland")
        .add_part(
            "image",
            Part::bytes(FAKE_JPEG.to_vec())
                .file_name("sails.jpg")
                .mime_type("image/jpeg"),
        );

    let response = server
        .put(&format!("/listings/{}", id))
        .add_cookie(session_cookie(&alice))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 200);

    let stored = media.stored_handles();
    assert_eq!(stored.len(), 2);

    // The old handle goes out after the replacement is stored, never before
    assert_eq!(
        media.events(),
        vec![
            MediaEvent::Stored(old_handle.clone()),
            MediaEvent::Stored(stored[1].clone()),
            MediaEvent::Deleted(old_handle.clone()),
        ]
    );

    // The listing now points at the replacement
    let detail: Value = server.get(&format!("/listings/{}", id)).await.json();
    let url = detail["image"]["url"].as_str().expect("image url");
    assert!(url.contains(&stored[1]));
    assert!(!url.contains(&old_handle));
}

/// Test: non-owners cannot edit, and the listing is untouched
#[tokio::test]
async fn test_update_requires_ownership() {
    let (server, _) = create_test_server();
    let alice = signup_user(&server, "alice", "pw").await;
    let bob = signup_user(&server, "bob", "pw").await;
    let id = create_listing(&server, &alice, "Orig title").await;

    let form = MultipartForm::new()
        .add_text("title", "Bob was here")
        .add_text("description", "desc")
        .add_text("price", "1")
        .add_text("location", "loc")
        .add_text("country", "ctry");

    let response = server
        .put(&format!("/listings/{}", id))
        .add_cookie(session_cookie(&bob))
        .multipart(form)
        .await;

    assert_eq!(response.status_code(), 403);
    let body: Value = response.json();
    assert_eq!(body["reason"], "You are not the owner of this listing");

    let detail: Value = server.get(&format!("/listings/{}", id)).await.json();
    assert_eq!(detail["title"], "Orig title");
}

/// Test: the owner can delete; the listing and its image go away
#[tokio::test]
async fn test_delete_own_listing() {
    let (server, media) = create_test_server();
    let alice = signup_user(&server, "alice", "pw").await;
    let id = create_listing(&server, &alice, "Condemned pier").await;
    let handle = media.stored_handles()[0].clone();

    let response = server
        .delete(&format!("/listings/{}", id))
        .add_cookie(session_cookie(&alice))
        .await;

    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["deleted"]["title"], "Condemned pier");

    assert_eq!(
        server.get(&format!("/listings/{}", id)).await.status_code(),
        404
    );
    let index: Value = server.get("/listings").await.json();
    assert_eq!(index.as_array().expect("array").len(), 0);
    assert_eq!(media.deleted_handles(), vec![handle]);
}

/// Test: non-owners cannot delete
#[tokio::test]
async fn test_delete_requires_ownership() {
    let (server, _) = create_test_server();
    let alice = signup_user(&server, "alice", "pw").await;
    let bob = signup_user(&server, "bob", "pw").await;
    let id = create_listing(&server, &alice, "Keep out").await;

    let response = server
        .delete(&format!("/listings/{}", id))
        .add_cookie(session_cookie(&bob))
        .await;
    assert_eq!(response.status_code(), 403);

    // Still there
    assert_eq!(
        server.get(&format!("/listings/{}", id)).await.status_code(),
        200
    );
}

/// Test: unknown and malformed ids both read as not found
#[tokio::test]
async fn test_unknown_and_malformed_ids() {
    let (server, _) = create_test_server();
    let session = signup_user(&server, "ida", "pw").await;

    let unknown = "0b879bf2-8354-4fb3-9f22-5b6ef4562d7e";
    for id in [unknown, "not-a-uuid"] {
        let response = server.get(&format!("/listings/{}", id)).await;
        assert_eq!(response.status_code(), 404, "id {id}");
        let body: Value = response.json();
        assert_eq!(body["success"], false);
    }

    let response = server
        .delete(&format!("/listings/{}", unknown))
        .add_cookie(session_cookie(&session))
        .await;
    assert_eq!(response.status_code(), 404);
}

/// Test: GET /user returns only the caller's listings
#[tokio::test]
async fn test_user_endpoint_lists_own_listings() {
    let (server, _) = create_test_server();

    let response = server.get("/user").await;
    assert_eq!(response.status_code(), 401);

    let alice = signup_user(&server, "alice", "pw").await;
    let bob = signup_user(&server, "bob", "pw").await;
    create_listing(&server, &alice, "Alice one").await;
    create_listing(&server, &alice, "Alice two").await;
    create_listing(&server, &bob, "Bob one").await;

    let response = server.get("/user").add_cookie(session_cookie(&alice)).await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    let docs = body.as_array().expect("array body");
    assert_eq!(docs.len(), 2);

    let mut titles: Vec<&str> = docs
        .iter()
        .map(|doc| doc["title"].as_str().expect("title"))
        .collect();
    titles.sort_unstable();
    assert_eq!(titles, vec!["Alice one", "Alice two"]);
}

/// Test: the whole happy path, two users end to end
#[tokio::test]
async fn test_marketplace_end_to_end() {
    let (server, _) = create_test_server();

    // Alice signs up and logs in properly
    let response = server
        .post("/signup")
        .json(&json!({
            "username": "alice",
            "email": "alice@example.com",
            "password": "p1",
        }))
        .await;
    assert_eq!(response.status_code(), 201);

    let response = server
        .post("/login")
        .json(&json!({ "username": "alice", "password": "p1" }))
        .await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["redirectUrl"], "/listings");
    let alice = response
        .maybe_cookie(common::SESSION_COOKIE)
        .expect("cookie")
        .value()
        .to_string();

    // She creates a listing and owns it
    let id = create_listing(&server, &alice, "Fisherman's hut").await;
    let detail: Value = server.get(&format!("/listings/{}", id)).await.json();
    assert_eq!(detail["owner"]["username"], "alice");

    // Bob cannot edit it
    let bob = signup_user(&server, "bob", "p2").await;
    let form = MultipartForm::new()
        .add_text("title", "Bob's hut now")
        .add_text("description", "d")
        .add_text("price", "1")
        .add_text("location", "l")
        .add_text("country", "c");
    let response = server
        .put(&format!("/listings/{}", id))
        .add_cookie(session_cookie(&bob))
        .multipart(form)
        .await;
    assert_eq!(response.status_code(), 403);

    // Alice deletes it
    let response = server
        .delete(&format!("/listings/{}", id))
        .add_cookie(session_cookie(&alice))
        .await;
    assert_eq!(response.status_code(), 200);
}
