//! Ownership checks for mutating operations

use crate::error::ApiError;
use crate::store::UserId;

/// Why a mutation was refused
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    /// No authenticated caller
    NotAuthenticated,
    /// Caller is authenticated but does not own the resource
    NotOwner,
}

/// Outcome of an ownership check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny(DenyReason),
}

impl Access {
    /// Map a denial onto the API error space. `forbidden` is the message
    /// returned when the caller is authenticated but not the owner.
    pub fn require(self, forbidden: &str) -> Result<(), ApiError> {
        match self {
            Access::Allow => Ok(()),
            Access::Deny(DenyReason::NotAuthenticated) => Err(ApiError::NotAuthenticated),
            Access::Deny(DenyReason::NotOwner) => Err(ApiError::Forbidden(forbidden.to_string())),
        }
    }
}

/// Decide whether `caller` may mutate a resource owned by `owner`.
///
/// Identity is checked before ownership, so an anonymous caller is told to
/// authenticate rather than told it is the wrong user.
pub fn can_mutate(caller: Option<UserId>, owner: UserId) -> Access {
    match caller {
        None => Access::Deny(DenyReason::NotAuthenticated),
        Some(id) if id == owner => Access::Allow,
        Some(_) => Access::Deny(DenyReason::NotOwner),
    }
}
