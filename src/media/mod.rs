//! Image storage abstractions

pub mod disk;

pub use disk::DiskMediaStore;

use crate::error::ApiError;
use crate::store::ImageRef;

/// Trait for storing listing images.
///
/// The marketplace only ever sees the returned `{url, handle}` pair: `url`
/// is what browsers fetch, `handle` is the opaque key for a later delete.
pub trait MediaStore: Send + Sync {
    /// Store image bytes under a fresh handle
    fn store(&self, filename: &str, bytes: &[u8]) -> Result<ImageRef, ApiError>;

    /// Delete previously stored bytes; deleting an already-gone handle
    /// succeeds
    fn delete(&self, handle: &str) -> Result<(), ApiError>;
}

/// Allow using Box<dyn MediaStore> as a MediaStore
impl MediaStore for Box<dyn MediaStore> {
    fn store(&self, filename: &str, bytes: &[u8]) -> Result<ImageRef, ApiError> {
        (**self).store(filename, bytes)
    }

    fn delete(&self, handle: &str) -> Result<(), ApiError> {
        (**self).delete(handle)
    }
}
