//! Stayfinder Marketplace API
//!
//! A listings-and-reviews marketplace backend: cookie-session accounts,
//! owner-gated CRUD on property listings, and per-listing reviews kept
//! consistent without multi-document transactions.

pub mod config;
pub mod crypto;
pub mod error;
pub mod guard;
pub mod media;
pub mod routes;
pub mod seed;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::ApiError;
pub use media::{DiskMediaStore, MediaStore};
pub use state::AppState;
pub use store::{
    InMemoryListingStore, InMemoryReviewStore, InMemorySessionStore, InMemoryUserStore,
    ListingStore, ReviewStore, SessionStore, SqliteStore, UserStore,
};
