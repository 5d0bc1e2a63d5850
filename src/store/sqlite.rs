//! SQLite-based storage implementation

use std::sync::Mutex;

use chrono::{DateTime, Duration, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use uuid::Uuid;

use super::{
    ImageRef, Listing, ListingId, ListingStore, NewListing, NewReview, NewUser, Review, ReviewId,
    ReviewStore, Session, SessionId, SessionStore, StoreResult, User, UserId, UserStore,
};
use crate::error::ApiError;

/// Current schema version
const SCHEMA_VERSION: i32 = 1;

/// SQLite-based store implementing all four collection traits.
///
/// The single connection is mutex-guarded, so every store call is one
/// serialized unit of work; the reference-set statements in particular are
/// single SQL statements and cannot interleave.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    session_ttl: Duration,
}

impl SqliteStore {
    /// Open or create a SQLite database at the given path
    pub fn open(path: &str, session_ttl: Duration) -> Result<Self, ApiError> {
        let conn = Connection::open(path).map_err(|e| ApiError::Storage(e.to_string()))?;

        Self::migrate(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            session_ttl,
        })
    }

    /// Run database migrations
    fn migrate(conn: &Connection) -> Result<(), ApiError> {
        let current_version = Self::get_schema_version(conn)?;

        if current_version < SCHEMA_VERSION {
            tracing::info!(
                current = current_version,
                target = SCHEMA_VERSION,
                "Running database migrations"
            );

            if current_version < 1 {
                Self::migrate_v1(conn)?;
            }

            conn.execute(
                "INSERT OR REPLACE INTO schema_version (version) VALUES (?1)",
                params![SCHEMA_VERSION],
            )
            .map_err(|e| ApiError::Storage(e.to_string()))?;

            tracing::info!("Database migrations complete");
        }

        Ok(())
    }

    /// Get current schema version (0 if no schema exists)
    fn get_schema_version(conn: &Connection) -> Result<i32, ApiError> {
        let table_exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
                [],
                |row| row.get(0),
            )
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        if !table_exists {
            return Ok(0);
        }

        conn.query_row("SELECT MAX(version) FROM schema_version", [], |row| {
            row.get::<_, Option<i32>>(0).map(|v| v.unwrap_or(0))
        })
        .map_err(|e| ApiError::Storage(e.to_string()))
    }

    /// Migration to version 1: initial schema.
    ///
    /// `listing_reviews` carries no foreign keys on purpose: the
    /// application-level consistency protocol owns the reference set, and
    /// its documented degraded states (orphan review, dangling reference)
    /// must remain representable.
    fn migrate_v1(conn: &Connection) -> Result<(), ApiError> {
        conn.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            );

            -- User accounts; usernames are unique and case-sensitive
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL,
                password_hash TEXT NOT NULL,
                created_at TEXT NOT NULL
            );

            -- Property listings
            CREATE TABLE IF NOT EXISTS listings (
                id TEXT PRIMARY KEY,
                title TEXT NOT NULL,
                description TEXT NOT NULL,
                price REAL NOT NULL,
                location TEXT NOT NULL,
                country TEXT NOT NULL,
                image_url TEXT,
                image_handle TEXT,
                owner_id TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_listings_owner ON listings(owner_id);

            -- Review reference set of each listing
            CREATE TABLE IF NOT EXISTS listing_reviews (
                listing_id TEXT NOT NULL,
                review_id TEXT NOT NULL,
                PRIMARY KEY (listing_id, review_id)
            );

            -- Review documents with their listing back-reference
            CREATE TABLE IF NOT EXISTS reviews (
                id TEXT PRIMARY KEY,
                listing_id TEXT NOT NULL,
                comment TEXT NOT NULL,
                rating INTEGER NOT NULL,
                author_id TEXT NOT NULL,
                created_at TEXT NOT NULL
            );
            CREATE INDEX IF NOT EXISTS idx_reviews_listing ON reviews(listing_id);

            -- Sessions (token -> optional identity + one-shot redirect hint)
            CREATE TABLE IF NOT EXISTS sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT,
                redirect_to TEXT,
                created_at TEXT NOT NULL,
                expires_at TEXT NOT NULL
            );
            "#,
        )
        .map_err(|e| ApiError::Storage(e.to_string()))
    }

    /// Review references for one listing, oldest first, under an
    /// already-held connection
    fn review_refs(conn: &Connection, listing: &str) -> rusqlite::Result<Vec<ReviewId>> {
        let mut stmt = conn
            .prepare("SELECT review_id FROM listing_reviews WHERE listing_id = ?1 ORDER BY rowid")?;
        let ids = stmt
            .query_map(params![listing], |row| {
                let id: String = row.get(0)?;
                parse_uuid(0, id).map(ReviewId)
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    fn listing_from_row(conn: &Connection, row: &rusqlite::Row<'_>) -> rusqlite::Result<Listing> {
        let id: String = row.get(0)?;
        let title: String = row.get(1)?;
        let description: String = row.get(2)?;
        let price: f64 = row.get(3)?;
        let location: String = row.get(4)?;
        let country: String = row.get(5)?;
        let image_url: Option<String> = row.get(6)?;
        let image_handle: Option<String> = row.get(7)?;
        let owner_id: String = row.get(8)?;

        let reviews = Self::review_refs(conn, &id)?;

        Ok(Listing {
            id: ListingId(parse_uuid(0, id)?),
            title,
            description,
            price,
            location,
            country,
            image: match (image_url, image_handle) {
                (Some(url), Some(handle)) => Some(ImageRef { url, handle }),
                _ => None,
            },
            owner: UserId(parse_uuid(8, owner_id)?),
            reviews,
        })
    }

    fn review_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Review> {
        let id: String = row.get(0)?;
        let listing_id: String = row.get(1)?;
        let comment: String = row.get(2)?;
        let rating: i32 = row.get(3)?;
        let author_id: String = row.get(4)?;
        let created_at: String = row.get(5)?;

        Ok(Review {
            id: ReviewId(parse_uuid(0, id)?),
            listing: ListingId(parse_uuid(1, listing_id)?),
            comment,
            rating,
            author: UserId(parse_uuid(4, author_id)?),
            created_at: parse_timestamp(5, &created_at)?,
        })
    }
}

/// Strict UUID parse inside a row mapper
fn parse_uuid(idx: usize, value: String) -> rusqlite::Result<Uuid> {
    Uuid::parse_str(&value).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
    })
}

/// Strict rfc3339 parse inside a row mapper
fn parse_timestamp(idx: usize, value: &str) -> rusqlite::Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
        })
}

impl UserStore for SqliteStore {
    fn create_user(&self, new: NewUser) -> StoreResult<User> {
        let conn = self.conn.lock().unwrap();
        let user = User {
            id: UserId(Uuid::new_v4()),
            username: new.username,
            email: new.email,
            password_hash: new.password_hash,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO users (id, username, email, password_hash, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                user.id.to_string(),
                user.username,
                user.email,
                user.password_hash,
                user.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| {
            if let rusqlite::Error::SqliteFailure(ref err, _) = e {
                if err.code == rusqlite::ErrorCode::ConstraintViolation {
                    return ApiError::DuplicateUsername;
                }
            }
            ApiError::Storage(e.to_string())
        })?;

        Ok(user)
    }

    fn get_user(&self, id: UserId) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE id = ?1",
            params![id.to_string()],
            user_from_row,
        )
        .optional()
        .map_err(|e| ApiError::Storage(e.to_string()))
    }

    fn get_user_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, username, email, password_hash, created_at FROM users WHERE username = ?1",
            params![username],
            user_from_row,
        )
        .optional()
        .map_err(|e| ApiError::Storage(e.to_string()))
    }
}

fn user_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id: String = row.get(0)?;
    let username: String = row.get(1)?;
    let email: String = row.get(2)?;
    let password_hash: String = row.get(3)?;
    let created_at: String = row.get(4)?;

    Ok(User {
        id: UserId(parse_uuid(0, id)?),
        username,
        email,
        password_hash,
        created_at: parse_timestamp(4, &created_at)?,
    })
}

impl SessionStore for SqliteStore {
    fn create_session(&self, user: Option<UserId>) -> StoreResult<Session> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let session = Session {
            id: SessionId(Uuid::new_v4().to_string()),
            user,
            redirect_to: None,
            created_at: now,
            expires_at: now + self.session_ttl,
        };

        conn.execute(
            "INSERT INTO sessions (id, user_id, redirect_to, created_at, expires_at)
             VALUES (?1, ?2, NULL, ?3, ?4)",
            params![
                session.id.0,
                session.user.map(|u| u.to_string()),
                session.created_at.to_rfc3339(),
                session.expires_at.to_rfc3339(),
            ],
        )
        .map_err(|e| ApiError::Storage(e.to_string()))?;

        Ok(session)
    }

    fn get_session(&self, id: &SessionId) -> StoreResult<Option<Session>> {
        let conn = self.conn.lock().unwrap();

        let session = conn
            .query_row(
                "SELECT id, user_id, redirect_to, created_at, expires_at
                 FROM sessions WHERE id = ?1",
                params![id.0],
                |row| {
                    let id: String = row.get(0)?;
                    let user_id: Option<String> = row.get(1)?;
                    let redirect_to: Option<String> = row.get(2)?;
                    let created_at: String = row.get(3)?;
                    let expires_at: String = row.get(4)?;

                    let user = match user_id {
                        Some(u) => Some(UserId(parse_uuid(1, u)?)),
                        None => None,
                    };

                    Ok(Session {
                        id: SessionId(id),
                        user,
                        redirect_to,
                        created_at: parse_timestamp(3, &created_at)?,
                        expires_at: parse_timestamp(4, &expires_at)?,
                    })
                },
            )
            .optional()
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        match session {
            Some(s) if s.expires_at <= Utc::now() => {
                conn.execute("DELETE FROM sessions WHERE id = ?1", params![id.0])
                    .map_err(|e| ApiError::Storage(e.to_string()))?;
                Ok(None)
            }
            other => Ok(other),
        }
    }

    fn delete_session(&self, id: &SessionId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![id.0])
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        Ok(())
    }

    fn set_redirect(&self, id: &SessionId, target: &str) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();
        conn.execute(
            "UPDATE sessions SET redirect_to = ?1 WHERE id = ?2",
            params![target, id.0],
        )
        .map_err(|e| ApiError::Storage(e.to_string()))?;
        Ok(())
    }

    fn take_redirect(&self, id: &SessionId) -> StoreResult<Option<String>> {
        let conn = self.conn.lock().unwrap();

        let redirect: Option<Option<String>> = conn
            .query_row(
                "SELECT redirect_to FROM sessions WHERE id = ?1",
                params![id.0],
                |row| row.get(0),
            )
            .optional()
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        let redirect = redirect.flatten();
        if redirect.is_some() {
            conn.execute(
                "UPDATE sessions SET redirect_to = NULL WHERE id = ?1",
                params![id.0],
            )
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        }

        Ok(redirect)
    }
}

impl ListingStore for SqliteStore {
    fn create_listing(&self, new: NewListing) -> StoreResult<Listing> {
        let conn = self.conn.lock().unwrap();
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

        conn.execute(
            "INSERT INTO listings (id, title, description, price, location, country,
                                   image_url, image_handle, owner_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                listing.id.to_string(),
                listing.title,
                listing.description,
                listing.price,
                listing.location,
                listing.country,
                listing.image.as_ref().map(|i| i.url.clone()),
                listing.image.as_ref().map(|i| i.handle.clone()),
                listing.owner.to_string(),
            ],
        )
        .map_err(|e| ApiError::Storage(e.to_string()))?;

        Ok(listing)
    }

    fn get_listing(&self, id: ListingId) -> StoreResult<Option<Listing>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, title, description, price, location, country,
                    image_url, image_handle, owner_id
             FROM listings WHERE id = ?1",
            params![id.to_string()],
            |row| Self::listing_from_row(&conn, row),
        )
        .optional()
        .map_err(|e| ApiError::Storage(e.to_string()))
    }

    fn list_listings(&self) -> StoreResult<Vec<Listing>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, title, description, price, location, country,
                        image_url, image_handle, owner_id
                 FROM listings",
            )
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        let listings = stmt
            .query_map([], |row| Self::listing_from_row(&conn, row))
            .map_err(|e| ApiError::Storage(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        Ok(listings)
    }

    fn listings_by_owner(&self, owner: UserId) -> StoreResult<Vec<Listing>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, title, description, price, location, country,
                        image_url, image_handle, owner_id
                 FROM listings WHERE owner_id = ?1",
            )
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        let listings = stmt
            .query_map(params![owner.to_string()], |row| {
                Self::listing_from_row(&conn, row)
            })
            .map_err(|e| ApiError::Storage(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        Ok(listings)
    }

    fn update_listing(&self, listing: &Listing) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        // The reference set lives in listing_reviews and is not written here.
        let rows_affected = conn
            .execute(
                "UPDATE listings
                 SET title = ?1, description = ?2, price = ?3, location = ?4,
                     country = ?5, image_url = ?6, image_handle = ?7
                 WHERE id = ?8",
                params![
                    listing.title,
                    listing.description,
                    listing.price,
                    listing.location,
                    listing.country,
                    listing.image.as_ref().map(|i| i.url.clone()),
                    listing.image.as_ref().map(|i| i.handle.clone()),
                    listing.id.to_string(),
                ],
            )
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        if rows_affected == 0 {
            return Err(ApiError::not_found("Listing", listing.id));
        }

        Ok(())
    }

    fn remove_listing(&self, id: ListingId) -> StoreResult<Option<Listing>> {
        let conn = self.conn.lock().unwrap();

        let listing = conn
            .query_row(
                "SELECT id, title, description, price, location, country,
                        image_url, image_handle, owner_id
                 FROM listings WHERE id = ?1",
                params![id.to_string()],
                |row| Self::listing_from_row(&conn, row),
            )
            .optional()
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        if listing.is_some() {
            conn.execute("DELETE FROM listings WHERE id = ?1", params![id.to_string()])
                .map_err(|e| ApiError::Storage(e.to_string()))?;
            conn.execute(
                "DELETE FROM listing_reviews WHERE listing_id = ?1",
                params![id.to_string()],
            )
            .map_err(|e| ApiError::Storage(e.to_string()))?;
        }

        Ok(listing)
    }

    fn add_review_ref(&self, listing: ListingId, review: ReviewId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM listings WHERE id = ?1)",
                params![listing.to_string()],
                |row| row.get(0),
            )
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        if !exists {
            return Err(ApiError::not_found("Listing", listing));
        }

        conn.execute(
            "INSERT OR IGNORE INTO listing_reviews (listing_id, review_id) VALUES (?1, ?2)",
            params![listing.to_string(), review.to_string()],
        )
        .map_err(|e| ApiError::Storage(e.to_string()))?;

        Ok(())
    }

    fn remove_review_ref(&self, listing: ListingId, review: ReviewId) -> StoreResult<()> {
        let conn = self.conn.lock().unwrap();

        conn.execute(
            "DELETE FROM listing_reviews WHERE listing_id = ?1 AND review_id = ?2",
            params![listing.to_string(), review.to_string()],
        )
        .map_err(|e| ApiError::Storage(e.to_string()))?;

        Ok(())
    }
}

impl ReviewStore for SqliteStore {
    fn create_review(&self, new: NewReview) -> StoreResult<Review> {
        let conn = self.conn.lock().unwrap();
        let review = Review {
            id: ReviewId(Uuid::new_v4()),
            listing: new.listing,
            comment: new.comment,
            rating: new.rating,
            author: new.author,
            created_at: Utc::now(),
        };

        conn.execute(
            "INSERT INTO reviews (id, listing_id, comment, rating, author_id, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                review.id.to_string(),
                review.listing.to_string(),
                review.comment,
                review.rating,
                review.author.to_string(),
                review.created_at.to_rfc3339(),
            ],
        )
        .map_err(|e| ApiError::Storage(e.to_string()))?;

        Ok(review)
    }

    fn get_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        let conn = self.conn.lock().unwrap();

        conn.query_row(
            "SELECT id, listing_id, comment, rating, author_id, created_at
             FROM reviews WHERE id = ?1",
            params![id.to_string()],
            Self::review_from_row,
        )
        .optional()
        .map_err(|e| ApiError::Storage(e.to_string()))
    }

    fn reviews_by_ids(&self, ids: &[ReviewId]) -> StoreResult<Vec<Review>> {
        let conn = self.conn.lock().unwrap();

        let mut reviews = Vec::with_capacity(ids.len());
        for id in ids {
            let review = conn
                .query_row(
                    "SELECT id, listing_id, comment, rating, author_id, created_at
                     FROM reviews WHERE id = ?1",
                    params![id.to_string()],
                    Self::review_from_row,
                )
                .optional()
                .map_err(|e| ApiError::Storage(e.to_string()))?;
            if let Some(review) = review {
                reviews.push(review);
            }
        }

        Ok(reviews)
    }

    fn reviews_by_listing(&self, listing: ListingId) -> StoreResult<Vec<Review>> {
        let conn = self.conn.lock().unwrap();

        let mut stmt = conn
            .prepare(
                "SELECT id, listing_id, comment, rating, author_id, created_at
                 FROM reviews WHERE listing_id = ?1 ORDER BY rowid",
            )
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        let reviews = stmt
            .query_map(params![listing.to_string()], Self::review_from_row)
            .map_err(|e| ApiError::Storage(e.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        Ok(reviews)
    }

    fn remove_review(&self, id: ReviewId) -> StoreResult<Option<Review>> {
        let conn = self.conn.lock().unwrap();

        let review = conn
            .query_row(
                "SELECT id, listing_id, comment, rating, author_id, created_at
                 FROM reviews WHERE id = ?1",
                params![id.to_string()],
                Self::review_from_row,
            )
            .optional()
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        if review.is_some() {
            conn.execute("DELETE FROM reviews WHERE id = ?1", params![id.to_string()])
                .map_err(|e| ApiError::Storage(e.to_string()))?;
        }

        Ok(review)
    }

    fn remove_reviews_by_listing(&self, listing: ListingId) -> StoreResult<u64> {
        let conn = self.conn.lock().unwrap();

        let rows_affected = conn
            .execute(
                "DELETE FROM reviews WHERE listing_id = ?1",
                params![listing.to_string()],
            )
            .map_err(|e| ApiError::Storage(e.to_string()))?;

        Ok(rows_affected as u64)
    }
}
