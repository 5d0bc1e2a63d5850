//! Storage abstractions for the marketplace collections

pub mod memory;
pub mod models;
pub mod sqlite;

pub use memory::{
    InMemoryListingStore, InMemoryReviewStore, InMemorySessionStore, InMemoryUserStore,
};
pub use models::*;
pub use sqlite::SqliteStore;

use crate::error::ApiError;

/// Result type for store operations
pub type StoreResult<T> = Result<T, ApiError>;

/// Trait for user account storage
pub trait UserStore: Send + Sync {
    /// Register a new user; fails with `DuplicateUsername` if the
    /// (case-sensitive) username is already taken
    fn create_user(&self, new: NewUser) -> StoreResult<User>;

    /// Get a user by ID
    fn get_user(&self, id: UserId) -> StoreResult<Option<User>>;

    /// Get a user by exact username
    fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>>;
}

/// Trait for session storage.
///
/// Sessions are a key-value map from opaque token to an optional identity
/// plus a one-shot redirect hint. Entries expire after the store's TTL and
/// an expired entry behaves exactly like a missing one.
pub trait SessionStore: Send + Sync {
    /// Create a new session; `user` is `None` for an anonymous session that
    /// only carries a redirect hint
    fn create_session(&self, user: Option<UserId>) -> StoreResult<Session>;

    /// Get a live session by token; expired sessions resolve to `None`
    fn get_session(&self, id: &SessionId) -> StoreResult<Option<Session>>;

    /// Delete a session
    fn delete_session(&self, id: &SessionId) -> StoreResult<()>;

    /// Stash the post-login redirect target on a session; a missing
    /// session is a no-op (the hint is advisory state)
    fn set_redirect(&self, id: &SessionId, target: &str) -> StoreResult<()>;

    /// Read and clear the redirect target (read-once semantics)
    fn take_redirect(&self, id: &SessionId) -> StoreResult<Option<String>>;
}

/// Trait for listing storage.
///
/// The review reference set is mutated only through [`add_review_ref`] and
/// [`remove_review_ref`]; both are atomic with respect to concurrent calls,
/// so two simultaneous reviews never lose each other's reference.
/// [`update_listing`] deliberately leaves the reference set untouched.
///
/// [`add_review_ref`]: ListingStore::add_review_ref
/// [`remove_review_ref`]: ListingStore::remove_review_ref
/// [`update_listing`]: ListingStore::update_listing
pub trait ListingStore: Send + Sync {
    /// Persist a new listing with an empty reference set
    fn create_listing(&self, new: NewListing) -> StoreResult<Listing>;

    /// Get a listing by ID
    fn get_listing(&self, id: ListingId) -> StoreResult<Option<Listing>>;

    /// All listings
    fn list_listings(&self) -> StoreResult<Vec<Listing>>;

    /// Listings owned by the given user
    fn listings_by_owner(&self, owner: UserId) -> StoreResult<Vec<Listing>>;

    /// Persist field and image changes; the reference set is not written
    fn update_listing(&self, listing: &Listing) -> StoreResult<()>;

    /// Delete a listing, returning the removed document
    fn remove_listing(&self, id: ListingId) -> StoreResult<Option<Listing>>;

    /// Atomically append a review reference; fails with `NotFound` if the
    /// listing no longer exists
    fn add_review_ref(&self, listing: ListingId, review: ReviewId) -> StoreResult<()>;

    /// Atomically remove a review reference; a missing listing or an absent
    /// reference is a no-op
    fn remove_review_ref(&self, listing: ListingId, review: ReviewId) -> StoreResult<()>;
}

/// Trait for review storage
pub trait ReviewStore: Send + Sync {
    /// Persist a new review
    fn create_review(&self, new: NewReview) -> StoreResult<Review>;

    /// Get a review by ID
    fn get_review(&self, id: ReviewId) -> StoreResult<Option<Review>>;

    /// Resolve a set of review IDs, skipping any that no longer exist
    fn reviews_by_ids(&self, ids: &[ReviewId]) -> StoreResult<Vec<Review>>;

    /// All reviews whose back-reference points at the given listing
    fn reviews_by_listing(&self, listing: ListingId) -> StoreResult<Vec<Review>>;

    /// Delete a review, returning the removed document
    fn remove_review(&self, id: ReviewId) -> StoreResult<Option<Review>>;

    /// Delete every review for a listing, returning how many were removed
    fn remove_reviews_by_listing(&self, listing: ListingId) -> StoreResult<u64>;
}
