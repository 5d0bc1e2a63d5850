//! Data models for the marketplace collections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique user identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

/// Unique listing identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ListingId(pub Uuid);

/// Unique review identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ReviewId(pub Uuid);

/// Unique session identifier (the opaque cookie token)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for ListingId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

impl std::fmt::Display for ReviewId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user account.
///
/// The credential record is internal to the store layer and is never
/// serialized into a response.
#[derive(Debug, Clone)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Fields required to register a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

/// Reference to an image held by the media collaborator.
///
/// `url` is what clients fetch; `handle` is the opaque key used to delete
/// the stored bytes later.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageRef {
    pub url: String,
    pub handle: String,
}

/// A rentable property listing.
///
/// `reviews` is the reference set of the consistency protocol: it must match
/// the review documents whose `listing` back-reference points here, except
/// in the documented degraded states.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub country: String,
    pub image: Option<ImageRef>,
    pub owner: UserId,
    pub reviews: Vec<ReviewId>,
}

/// Fields required to create a listing
#[derive(Debug, Clone)]
pub struct NewListing {
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub country: String,
    pub image: Option<ImageRef>,
    pub owner: UserId,
}

/// One user's rating and comment on one listing
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Review {
    pub id: ReviewId,
    pub listing: ListingId,
    pub comment: String,
    pub rating: i32,
    pub author: UserId,
    pub created_at: DateTime<Utc>,
}

/// Fields required to create a review
#[derive(Debug, Clone)]
pub struct NewReview {
    pub listing: ListingId,
    pub comment: String,
    pub rating: i32,
    pub author: UserId,
}

/// A server-side session record.
///
/// `user` is `None` for an anonymous session that only carries a
/// post-login redirect hint. Expired sessions are treated as absent.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: SessionId,
    pub user: Option<UserId>,
    pub redirect_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}
