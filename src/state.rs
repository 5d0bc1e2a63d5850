use std::sync::Arc;

/// Shared application state, generic over the storage and media backends
/// so tests can substitute in-memory and mock implementations.
///
/// The store slots are separate `Arc`s because a single backend (the
/// SQLite store) may sit behind several of them at once.
pub struct AppState<U, S, L, R, M> {
    pub user_store: Arc<U>,
    pub session_store: Arc<S>,
    pub listing_store: Arc<L>,
    pub review_store: Arc<R>,
    pub media_store: Arc<M>,
}

impl<U, S, L, R, M> AppState<U, S, L, R, M> {
    pub fn new(
        user_store: Arc<U>,
        session_store: Arc<S>,
        listing_store: Arc<L>,
        review_store: Arc<R>,
        media_store: Arc<M>,
    ) -> Self {
        Self {
            user_store,
            session_store,
            listing_store,
            review_store,
            media_store,
        }
    }
}
