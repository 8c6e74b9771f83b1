//! Image persistence.

use crate::error::StoreError;
use bytes::Bytes;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Persists an opaque image blob and returns its assigned id.
#[async_trait::async_trait]
pub trait ImageStore: Send + Sync {
    async fn save(
        &self,
        laptop_id: &str,
        image_type: &str,
        data: Bytes,
    ) -> Result<String, StoreError>;
}

/// Metadata kept for each stored image.
#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub laptop_id: String,
    pub image_type: String,
    pub path: PathBuf,
}

/// Stores image bytes on disk and their info in memory.
///
/// Files are written as `{image_dir}/{image_id}{image_type}`; the map lock
/// is taken only after the write completes, never across the I/O.
pub struct DiskImageStore {
    image_dir: PathBuf,
    images: Mutex<HashMap<String, ImageInfo>>,
}

impl DiskImageStore {
    pub fn new(image_dir: impl AsRef<Path>) -> Self {
        Self {
            image_dir: image_dir.as_ref().to_owned(),
            images: Mutex::new(HashMap::new()),
        }
    }

    /// Info for a stored image, if any.
    pub fn info(&self, image_id: &str) -> Option<ImageInfo> {
        self.images.lock().get(image_id).cloned()
    }
}

#[async_trait::async_trait]
impl ImageStore for DiskImageStore {
    async fn save(
        &self,
        laptop_id: &str,
        image_type: &str,
        data: Bytes,
    ) -> Result<String, StoreError> {
        let image_id = Uuid::new_v4().to_string();
        let path = self.image_dir.join(format!("{image_id}{image_type}"));

        tokio::fs::write(&path, &data).await?;

        self.images.lock().insert(
            image_id.clone(),
            ImageInfo {
                laptop_id: laptop_id.to_owned(),
                image_type: image_type.to_owned(),
                path,
            },
        );

        Ok(image_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_writes_the_blob_and_records_info() {
        let dir = tempfile::tempdir().unwrap();
        let store = DiskImageStore::new(dir.path());

        let id = store
            .save("laptop-1", ".jpg", Bytes::from_static(b"fake image bytes"))
            .await
            .unwrap();

        assert!(Uuid::parse_str(&id).is_ok());
        let info = store.info(&id).unwrap();
        assert_eq!(info.laptop_id, "laptop-1");
        assert_eq!(info.image_type, ".jpg");
        assert_eq!(std::fs::read(&info.path).unwrap(), b"fake image bytes");
    }

    #[tokio::test]
    async fn save_fails_when_the_directory_is_missing() {
        let store = DiskImageStore::new("/nonexistent/image/dir");
        let err = store
            .save("laptop-1", ".jpg", Bytes::from_static(b"bytes"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Io(_)));
    }
}
