//! In-memory storage implementations

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{Duration, Utc};
use uuid::Uuid;

use super::{
    Listing, ListingId, ListingStore, NewListing, NewReview, NewUser, Review, ReviewId,
    ReviewStore, Session, SessionId, SessionStore, StoreResult, User, UserId, UserStore,
};
use crate::error::ApiError;

/// In-memory user store
pub struct InMemoryUserStore {
    users: RwLock<HashMap<UserId, User>>,
    by_username: RwLock<HashMap<String, UserId>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
            by_username: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl UserStore for InMemoryUserStore {
    fn create_user(&self, new: NewUser) -> StoreResult<User> {
        // Username uniqueness is case-sensitive; the index lock is held
        // across the check and the insert so two racing signups cannot both
        // claim the same name.
        let mut by_username = self.by_username.write().unwrap();
        if by_username.contains_key(&new.username) {
            return Err(ApiError::DuplicateUsername);
        }

        let user = User {
            id: UserId(Uuid::new_v4()),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        };
        by_username.insert(user.username.clone(), user.id);
        self.users.write().unwrap().insert(user.id, user.clone());
        Ok(user)
    }

    fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        Ok(self.users.read().unwrap().get(&id).cloned())
    }

    fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let by_username = self.by_username.read().unwrap();
        match by_username.get(username) {
            Some(id) => Ok(self.users.read().unwrap().get(id).cloned()),
            None => Ok(None),
        }
    }
}

/// In-memory session store with lazy TTL expiry
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<SessionId, Session>>,
    ttl: Duration,
}

impl InMemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }
}

impl SessionStore for InMemorySessionStore {
    fn create_session(&self, user: Option<UserId>) -> StoreResult<Session> {
        let now = Utc::now();
        let session = Session {
            id: SessionId(Uuid::new_v4().to_string()),
            user,
            redirect_to: None,
            created_at: now,
            expires_at: now + self.ttl,
        };
        self.sessions
            .write()
            .unwrap()
            .insert(session.id.clone(), session.clone());
        Ok(session)
    }

    fn get_session(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        let mut sessions = self.sessions.write().unwrap();
        match sessions.get(id) {
            Some(session) if session.expires_at <= Utc::now() => {
                sessions.remove(id);
                Ok(None)
            }
            Some(session) => Ok(Some(session.clone())),
            None => Ok(None),
        }
    }

    fn delete_session(&self, id: &SessionId) -> StoreResult<()> {
        self.sessions.write().unwrap().remove(id);
        Ok(())
    }

    fn set_redirect(&self, id: &SessionId, target: &str) -> StoreResult<()> {
        let mut sessions = self.sessions.write().unwrap();
        if let Some(session) = sessions.get_mut(id) {
            session.redirect_to = Some(target.to_string());
        }
        Ok(())
    }

    fn take_redirect(&self, id: &SessionId) -> StoreResult<Option<String>> {
        let mut sessions = self.sessions.write().unwrap();
        Ok(sessions.get_mut(id).and_then(|s| s.redirect_to.take()))
    }
}

/// In-memory listing store
pub struct InMemoryListingStore {
    listings: RwLock<HashMap<ListingId, Listing>>,
}

impl InMemoryListingStore {
    pub fn new() -> Self {
        Self {
            listings: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryListingStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ListingStore for InMemoryListingStore {
    fn create_listing(&self, new: NewListing) -> StoreResult<Listing> {
        let listing = Listing {
            id: ListingId(Uuid::new_v4()),
            title: new.title,
            description: new.description,
            price: new.price,
            location: new.location,
            country: new.country,
            image: new.image,
            owner: new.owner,
            reviews: Vec::new(),
        };
        self.listings
            .write()
            .unwrap()
            .insert(listing.id, listing.clone());
        Ok(listing)
    }

    fn get_listing(&self, id: ListingId) -> StoreResult<Option<Listing>> {
        Ok(self.listings.read().unwrap().get(&id).cloned())
    }

    fn list_listings(&self) -> StoreResult<Vec<Listing>> {
        Ok(self.listings.read().unwrap().values().cloned().collect())
    }

    fn listings_by_owner(&self, owner: UserId) -> StoreResult<Vec<Listing>> {
        Ok(self
            .listings
            .read()
            .unwrap()
            .values()
            .filter(|l| l.owner == owner)
            .cloned()
            .collect())
    }

    fn update_listing(&self, listing: &Listing) -> StoreResult<()> {
        let mut listings = self.listings.write().unwrap();
        match listings.get_mut(&listing.id) {
            Some(stored) => {
                // Reference set stays as stored; a concurrent review must
                // not be lost by a field update.
                stored.title = listing.title.clone();
                stored.description = listing.description.clone();
                stored.price = listing.price;
                stored.location = listing.location.clone();
                stored.country = listing.country.clone();
                stored.image = listing.image.clone();
                Ok(())
            }
            None => Err(ApiError::not_found("Listing", listing.id)),
        }
    }

    fn remove_listing(&self, id: ListingId) -> StoreResult<Option<Listing>> {
        Ok(self.listings.write().unwrap().remove(&id))
    }

    fn add_review_ref(&self, listing: ListingId, review: ReviewId) -> StoreResult<()> {
        let mut listings = self.listings.write().unwrap();
        match listings.get_mut(&listing) {
            Some(stored) => {
                if !stored.reviews.contains(&review) {
                    stored.reviews.push(review);
                }
                Ok(())
            }
            None => Err(ApiError::not_found("Listing", listing)),
        }
    }

    fn remove_review_ref(&self, listing: ListingId, review: ReviewId) -> StoreResult<()> {
        let mut listings = self.listings.write().unwrap();
        if let Some(stored) = listings.get_mut(&listing) {
            stored.reviews.retain(|r| *r != review);
        }
        Ok(())
    }
}

/// In-memory review store
pub struct InMemoryReviewStore {
    reviews: RwLock<HashMap<ReviewId, Review>>,
}

impl InMemoryReviewStore {
    pub fn new() -> Self {
        Self {
            reviews: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryReviewStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ReviewStore for InMemoryReviewStore {
    fn create_review(&self, new: NewReview) -> StoreResult<Review> {
        let review = Review {
            id: ReviewId(Uuid::new_v4()),
            listing: new.listing,
            comment: new.comment,
            rating: new.rating,
            author: new.author,
            created_at: Utc::now(),
        };
        self.reviews
            .write()
            .unwrap()
            .insert(review.id, review.clone());
        Ok(review)
    }

    fn get_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        Ok(self.reviews.read().unwrap().get(&id).cloned())
    }

    fn reviews_by_ids(&self, ids: &[ReviewId]) -> StoreResult<Vec<Review>> {
        let reviews = self.reviews.read().unwrap();
        Ok(ids.iter().filter_map(|id| reviews.get(id)).cloned().collect())
    }

    fn reviews_by_listing(&self, listing: ListingId) -> StoreResult<Vec<Review>> {
        Ok(self
            .reviews
            .read()
            .unwrap()
            .values()
            .filter(|r| r.listing == listing)
            .cloned()
            .collect())
    }

    fn remove_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        Ok(self.reviews.write().unwrap().remove(&id))
    }

    fn remove_reviews_by_listing(&self, listing: ListingId) -> StoreResult<u64> {
        let mut reviews = self.reviews.write().unwrap();
        let before = reviews.len();
        reviews.retain(|_, r| r.listing != listing);
        Ok((before - reviews.len()) as u64)
    }
}
