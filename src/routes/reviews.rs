//! Review endpoints, nested under their listing

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::{StatusCode, Uri};
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::error::ApiError;
use crate::guard::can_mutate;
use crate::media::MediaStore;
use crate::state::AppState;
use crate::store::{
    ListingId, ListingStore, NewReview, Review, ReviewId, ReviewStore, SessionStore, UserId,
    UserStore,
};

use super::session::require_auth_for_mutation;

const NOT_AUTHOR: &str = "You are not the author of this review";

/// Populated user reference (`{id, username}`) embedded in listing and
/// review payloads
#[derive(Serialize)]
pub struct UserRef {
    pub id: UserId,
    pub username: String,
}

/// Review with its author populated
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewDetail {
    pub id: ReviewId,
    pub listing: ListingId,
    pub comment: String,
    pub rating: i32,
    pub author: Option<UserRef>,
    pub created_at: DateTime<Utc>,
}

/// Resolve the author reference on a review. An author that no longer
/// exists serializes as null rather than failing the whole response.
pub fn review_detail<U: UserStore>(
    user_store: &U,
    review: Review,
) -> Result<ReviewDetail, ApiError> {
    let author = user_store.get_user(review.author)?.map(|u| UserRef {
        id: u.id,
        username: u.username,
    });

    Ok(ReviewDetail {
        id: review.id,
        listing: review.listing,
        comment: review.comment,
        rating: review.rating,
        author,
        created_at: review.created_at,
    })
}

#[derive(Deserialize)]
pub struct CreateReviewRequest {
    #[serde(default)]
    pub review: Option<ReviewFields>,
}

#[derive(Deserialize, Default)]
pub struct ReviewFields {
    #[serde(default)]
    pub comment: Option<String>,
    /// Accepted as any JSON number; integer-ness is checked explicitly so
    /// a fractional rating names the offending field instead of bouncing
    /// the whole body
    #[serde(default)]
    pub rating: Option<f64>,
}

#[derive(Serialize)]
pub struct ReviewCreatedResponse {
    pub message: String,
    pub review: ReviewDetail,
}

/// POST /listings/:id/reviews
pub async fn create<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
    cookies: Cookies,
    Path(listing_id): Path<String>,
    uri: Uri,
    Json(req): Json<CreateReviewRequest>,
) -> Result<(StatusCode, Json<ReviewCreatedResponse>), ApiError>
where
    U: UserStore,
    S: SessionStore,
    L: ListingStore,
    R: ReviewStore,
    M: MediaStore,
{
    let user = require_auth_for_mutation(
        &cookies,
        state.session_store.as_ref(),
        state.user_store.as_ref(),
        uri.path(),
    )?;

    let listing_id = super::listings::parse_listing_id(&listing_id)?;
    if state.listing_store.get_listing(listing_id)?.is_none() {
        return Err(ApiError::not_found("Listing", listing_id));
    }

    let fields = req.review.unwrap_or_default();

    let comment = fields
        .comment
        .as_deref()
        .map(str::trim)
        .unwrap_or_default();
    if comment.is_empty() {
        return Err(ApiError::validation("comment", "comment must not be empty"));
    }

    let rating = fields
        .rating
        .ok_or_else(|| ApiError::validation("rating", "rating is required"))?;
    if rating.fract() != 0.0 {
        return Err(ApiError::validation("rating", "rating must be an integer"));
    }
    let rating = rating as i32;
    if !(1..=5).contains(&rating) {
        return Err(ApiError::validation(
            "rating",
            "rating must be between 1 and 5",
        ));
    }

    let review = state.review_store.create_review(NewReview {
        listing: listing_id,
        comment: comment.to_string(),
        rating,
        author: user.id,
    })?;

    // If the append fails after the document write, the review is left
    // unreferenced; nothing here rolls the document back
    state.listing_store.add_review_ref(listing_id, review.id)?;

    let author = Some(UserRef {
        id: user.id,
        username: user.username,
    });

    Ok((
        StatusCode::CREATED,
        Json(ReviewCreatedResponse {
            message: "New review created!".to_string(),
            review: ReviewDetail {
                id: review.id,
                listing: review.listing,
                comment: review.comment,
                rating: review.rating,
                author,
                created_at: review.created_at,
            },
        }),
    ))
}

#[derive(Serialize)]
pub struct ReviewDeletedResponse {
    pub message: String,
}

/// DELETE /listings/:id/reviews/:review_id
pub async fn remove<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
    cookies: Cookies,
    Path((_listing_id, review_id)): Path<(String, String)>,
    uri: Uri,
) -> Result<Json<ReviewDeletedResponse>, ApiError>
where
    U: UserStore,
    S: SessionStore,
    L: ListingStore,
    R: ReviewStore,
    M: MediaStore,
{
    let user = require_auth_for_mutation(
        &cookies,
        state.session_store.as_ref(),
        state.user_store.as_ref(),
        uri.path(),
    )?;

    let review_id = Uuid::parse_str(&review_id)
        .map(ReviewId)
        .map_err(|_| ApiError::not_found("Review", &review_id))?;
    let review = state
        .review_store
        .get_review(review_id)?
        .ok_or_else(|| ApiError::not_found("Review", review_id))?;

    can_mutate(Some(user.id), review.author).require(NOT_AUTHOR)?;

    // The review's own back-reference names the parent, not the URL; the
    // reference comes out before the document so a crash in between
    // leaves an orphan review, never a dangling reference
    state
        .listing_store
        .remove_review_ref(review.listing, review.id)?;
    state.review_store.remove_review(review.id)?;

    Ok(Json(ReviewDeletedResponse {
        message: "Review deleted!".to_string(),
    }))
}
