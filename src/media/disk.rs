use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use uuid::Uuid;

use crate::error::ApiError;
use crate::media::MediaStore;
use crate::store::ImageRef;

/// Local-filesystem image store.
///
/// Files land under `root` with a UUID-prefixed name; the handle is the
/// file name and the URL is `/media/<handle>`, served by the static file
/// route.
pub struct DiskMediaStore {
    root: PathBuf,
}

impl DiskMediaStore {
    pub fn new(root: impl Into<PathBuf>) -> Result<Self, ApiError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .map_err(|e| ApiError::Storage(format!("Failed to create media directory: {}", e)))?;
        Ok(Self { root })
    }

    /// Handles are single path components; anything else is rejected
    /// before it reaches the filesystem.
    fn resolve(&self, handle: &str) -> Result<PathBuf, ApiError> {
        if handle.is_empty()
            || handle.contains('/')
            || handle.contains('\\')
            || handle.contains("..")
        {
            return Err(ApiError::Storage(format!("Invalid media handle: {}", handle)));
        }
        Ok(self.root.join(handle))
    }
}

/// Keep the original extension readable but strip anything that could not
/// safely appear in a file name.
fn sanitize_filename(filename: &str) -> String {
    let safe: String = filename
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '.' || c == '-' || c == '_' {
                c
            } else {
                '-'
            }
        })
        .collect();
    let safe = safe.replace("..", "--");
    if safe.trim_matches('-').is_empty() {
        "upload".to_string()
    } else {
        safe
    }
}

impl MediaStore for DiskMediaStore {
    fn store(&self, filename: &str, bytes: &[u8]) -> Result<ImageRef, ApiError> {
        let handle = format!("{}-{}", Uuid::new_v4(), sanitize_filename(filename));
        let path = self.resolve(&handle)?;
        fs::write(&path, bytes)
            .map_err(|e| ApiError::Storage(format!("Failed to write image: {}", e)))?;
        tracing::debug!(handle = %handle, size = bytes.len(), "Stored image");
        Ok(ImageRef {
            url: format!("/media/{}", handle),
            handle,
        })
    }

    fn delete(&self, handle: &str) -> Result<(), ApiError> {
        let path = self.resolve(handle)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!(handle = %handle, "Deleted image");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApiError::Storage(format!("Failed to delete image: {}", e))),
        }
    }
}
