//! Listing CRUD endpoints

use std::sync::Arc;

use axum::extract::{Multipart, Path, State};
use axum::http::{StatusCode, Uri};
use axum::Json;
use serde::Serialize;
use tower_cookies::Cookies;
use uuid::Uuid;

use crate::error::ApiError;
use crate::guard::can_mutate;
use crate::media::MediaStore;
use crate::state::AppState;
use crate::store::{
    ImageRef, Listing, ListingId, ListingStore, NewListing, ReviewStore, SessionStore, UserStore,
};

use super::reviews::{review_detail, ReviewDetail, UserRef};
use super::session::{current_user, require_auth_for_mutation};

const NOT_OWNER: &str = "You are not the owner of this listing";

/// Listing with owner and review authors populated for the detail page
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingDetail {
    pub id: ListingId,
    pub title: String,
    pub description: String,
    pub price: f64,
    pub location: String,
    pub country: String,
    pub image: Option<ImageRef>,
    pub owner: Option<UserRef>,
    pub reviews: Vec<ReviewDetail>,
}

#[derive(Serialize)]
pub struct ListingEnvelope {
    pub success: bool,
    pub message: String,
    pub listing: Listing,
}

#[derive(Serialize)]
pub struct DeletedEnvelope {
    pub success: bool,
    pub message: String,
    pub deleted: Listing,
}

/// An unparsable id can name no listing, so it gets the same answer as an
/// unknown one
pub(crate) fn parse_listing_id(raw: &str) -> Result<ListingId, ApiError> {
    Uuid::parse_str(raw)
        .map(ListingId)
        .map_err(|_| ApiError::not_found("Listing", raw))
}

/// Fields common to create and update, gathered from the multipart body
#[derive(Default)]
struct ListingForm {
    title: Option<String>,
    description: Option<String>,
    price: Option<String>,
    location: Option<String>,
    country: Option<String>,
    image: Option<(String, Vec<u8>)>,
}

async fn field_text(
    field: axum::extract::multipart::Field<'_>,
    name: &'static str,
) -> Result<String, ApiError> {
    field
        .text()
        .await
        .map_err(|e| ApiError::validation(name, e.to_string()))
}

async fn read_form(multipart: &mut Multipart) -> Result<ListingForm, ApiError> {
    let mut form = ListingForm::default();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::validation("body", e.to_string()))?
    {
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        match name.as_str() {
            "title" => form.title = Some(field_text(field, "title").await?),
            "description" => form.description = Some(field_text(field, "description").await?),
            "price" => form.price = Some(field_text(field, "price").await?),
            "location" => form.location = Some(field_text(field, "location").await?),
            "country" => form.country = Some(field_text(field, "country").await?),
            "image" => {
                let filename = field
                    .file_name()
                    .map(str::to_string)
                    .unwrap_or_else(|| "upload".to_string());
                let bytes = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::validation("image", e.to_string()))?;
                form.image = Some((filename, bytes.to_vec()));
            }
            // Unknown fields are dropped, not errors
            _ => {}
        }
    }

    Ok(form)
}

struct ListingFields {
    title: String,
    description: String,
    price: f64,
    location: String,
    country: String,
}

fn required(value: &Option<String>, field: &'static str) -> Result<String, ApiError> {
    match value.as_deref().map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        _ => Err(ApiError::validation(field, format!("{} is required", field))),
    }
}

fn validate_fields(form: &ListingForm) -> Result<ListingFields, ApiError> {
    let title = required(&form.title, "title")?;
    let description = required(&form.description, "description")?;
    let location = required(&form.location, "location")?;
    let country = required(&form.country, "country")?;

    let price_text = required(&form.price, "price")?;
    let price: f64 = price_text
        .parse()
        .map_err(|_| ApiError::validation("price", "price must be a number"))?;
    if !price.is_finite() || price <= 0.0 {
        return Err(ApiError::validation(
            "price",
            "price must be greater than zero",
        ));
    }

    Ok(ListingFields {
        title,
        description,
        price,
        location,
        country,
    })
}

/// Resolve owner and review references into embedded documents. Broken
/// references are skipped, so a listing in a degraded state still renders.
fn populate<U: UserStore, R: ReviewStore>(
    user_store: &U,
    review_store: &R,
    listing: Listing,
) -> Result<ListingDetail, ApiError> {
    let owner = user_store.get_user(listing.owner)?.map(|u| UserRef {
        id: u.id,
        username: u.username,
    });

    let mut reviews = Vec::with_capacity(listing.reviews.len());
    for review in review_store.reviews_by_ids(&listing.reviews)? {
        reviews.push(review_detail(user_store, review)?);
    }

    Ok(ListingDetail {
        id: listing.id,
        title: listing.title,
        description: listing.description,
        price: listing.price,
        location: listing.location,
        country: listing.country,
        image: listing.image,
        owner,
        reviews,
    })
}

/// GET /listings
pub async fn index<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
) -> Result<Json<Vec<Listing>>, ApiError>
where
    U: UserStore,
    S: SessionStore,
    L: ListingStore,
    R: ReviewStore,
    M: MediaStore,
{
    Ok(Json(state.listing_store.list_listings()?))
}

/// GET /listings/:id
pub async fn show<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
    Path(id): Path<String>,
) -> Result<Json<ListingDetail>, ApiError>
where
    U: UserStore,
    S: SessionStore,
    L: ListingStore,
    R: ReviewStore,
    M: MediaStore,
{
    let listing_id = parse_listing_id(&id)?;
    let listing = state
        .listing_store
        .get_listing(listing_id)?
        .ok_or_else(|| ApiError::not_found("Listing", &id))?;

    Ok(Json(populate(
        state.user_store.as_ref(),
        state.review_store.as_ref(),
        listing,
    )?))
}

/// POST /listings
pub async fn create<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
    cookies: Cookies,
    uri: Uri,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ListingEnvelope>), ApiError>
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

    let mut form = read_form(&mut multipart).await?;
    let fields = validate_fields(&form)?;
    let (filename, bytes) = form
        .image
        .take()
        .ok_or_else(|| ApiError::validation("image", "image upload is required"))?;

    // Checks are done; bytes go out before the document so the listing
    // never points at an image that was not stored
    let image = state.media_store.store(&filename, &bytes)?;

    let listing = state.listing_store.create_listing(NewListing {
        title: fields.title,
        description: fields.description,
        price: fields.price,
        location: fields.location,
        country: fields.country,
        image: Some(image),
        owner: user.id,
    })?;

    Ok((
        StatusCode::CREATED,
        Json(ListingEnvelope {
            success: true,
            message: "New listing created!".to_string(),
            listing,
        }),
    ))
}

/// PUT /listings/:id
pub async fn update<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
    cookies: Cookies,
    Path(id): Path<String>,
    uri: Uri,
    mut multipart: Multipart,
) -> Result<Json<ListingEnvelope>, ApiError>
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

    let listing_id = parse_listing_id(&id)?;
    let mut listing = state
        .listing_store
        .get_listing(listing_id)?
        .ok_or_else(|| ApiError::not_found("Listing", &id))?;

    can_mutate(Some(user.id), listing.owner).require(NOT_OWNER)?;

    let mut form = read_form(&mut multipart).await?;
    let fields = validate_fields(&form)?;

    listing.title = fields.title;
    listing.description = fields.description;
    listing.price = fields.price;
    listing.location = fields.location;
    listing.country = fields.country;

    // New bytes first, then the document, then the old bytes; a failure
    // part-way leaves the listing pointing at an image that still exists
    let replaced = match form.image.take() {
        Some((filename, bytes)) => {
            let image = state.media_store.store(&filename, &bytes)?;
            listing.image.replace(image)
        }
        None => None,
    };

    state.listing_store.update_listing(&listing)?;

    if let Some(old) = replaced {
        if let Err(e) = state.media_store.delete(&old.handle) {
            tracing::warn!(handle = %old.handle, "Failed to delete replaced image: {}", e);
        }
    }

    Ok(Json(ListingEnvelope {
        success: true,
        message: "Listing updated!".to_string(),
        listing,
    }))
}

/// DELETE /listings/:id
pub async fn remove<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
    cookies: Cookies,
    Path(id): Path<String>,
    uri: Uri,
) -> Result<Json<DeletedEnvelope>, ApiError>
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

    let listing_id = parse_listing_id(&id)?;
    let listing = state
        .listing_store
        .get_listing(listing_id)?
        .ok_or_else(|| ApiError::not_found("Listing", &id))?;

    can_mutate(Some(user.id), listing.owner).require(NOT_OWNER)?;

    let deleted = state
        .listing_store
        .remove_listing(listing_id)?
        .ok_or_else(|| ApiError::not_found("Listing", &id))?;

    // Reviews go with their parent; unreferenced documents would be
    // unreachable through the API anyway
    let removed = state.review_store.remove_reviews_by_listing(listing_id)?;
    if removed > 0 {
        tracing::debug!(listing = %listing_id, reviews = removed, "Cascaded review delete");
    }

    if let Some(image) = &deleted.image {
        if let Err(e) = state.media_store.delete(&image.handle) {
            tracing::warn!(handle = %image.handle, "Failed to delete listing image: {}", e);
        }
    }

    Ok(Json(DeletedEnvelope {
        success: true,
        message: "Listing deleted!".to_string(),
        deleted,
    }))
}

/// GET /user, the caller's own listings.
pub async fn mine<U, S, L, R, M>(
    State(state): State<Arc<AppState<U, S, L, R, M>>>,
    cookies: Cookies,
) -> Result<Json<Vec<Listing>>, ApiError>
where
    U: UserStore,
    S: SessionStore,
    L: ListingStore,
    R: ReviewStore,
    M: MediaStore,
{
    let user = current_user(
        &cookies,
        state.session_store.as_ref(),
        state.user_store.as_ref(),
    )
    .ok_or(ApiError::NotAuthenticated)?;

    Ok(Json(state.listing_store.listings_by_owner(user.id)?))
}
