/// Disk-based object storage backend
use crate::{
    error::{AppError, AppResult},
    storage::{AssetPart, ObjectStore, UploadLocation, UploadSigner},
};
use async_trait::async_trait;
use chrono::Utc;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Disk storage backend
///
/// Objects live under `{base}/{path}`. Upload locations point at this
/// server's `/uploads/{path}` receiver and carry an HMAC over the path and
/// expiry, so only the holder of a freshly issued location can write.
#[derive(Clone)]
pub struct DiskObjectStore {
    base_path: PathBuf,
    public_url: String,
    signer: UploadSigner,
    upload_ttl: Duration,
}

impl DiskObjectStore {
    /// Create a new disk storage backend
    pub fn new(
        base_path: PathBuf,
        public_url: impl Into<String>,
        signer: UploadSigner,
        upload_ttl: Duration,
    ) -> Self {
        Self {
            base_path,
            public_url: public_url.into().trim_end_matches('/').to_string(),
            signer,
            upload_ttl,
        }
    }

    /// Resolve an object path, refusing anything that escapes the base directory
    fn get_object_path(&self, path: &str) -> AppResult<PathBuf> {
        let relative = Path::new(path);
        let escapes = path.is_empty()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)));

        if escapes {
            return Err(AppError::InvalidArgument(format!(
                "Invalid object path: {}",
                path
            )));
        }

        Ok(self.base_path.join(relative))
    }

    fn part_for(path: &str) -> AssetPart {
        if path.starts_with("thumbnails/") {
            AssetPart::Thumbnail
        } else {
            AssetPart::Video
        }
    }
}

#[async_trait]
impl ObjectStore for DiskObjectStore {
    async fn request_upload_location(&self, path: &str) -> AppResult<UploadLocation> {
        // Validate before signing
        self.get_object_path(path)?;

        let ttl = chrono::Duration::from_std(self.upload_ttl)
            .map_err(|e| AppError::Internal(format!("Invalid upload TTL: {}", e)))?;
        let expires_at = Utc::now() + ttl;
        let signature = self.signer.sign(path, expires_at);

        Ok(UploadLocation {
            part: Self::part_for(path),
            path: path.to_string(),
            url: format!(
                "{}/uploads/{}?expires={}&signature={}",
                self.public_url,
                path,
                expires_at.timestamp(),
                signature
            ),
            expires_at,
        })
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        let object_path = self.get_object_path(path)?;

        match fs::metadata(&object_path).await {
            Ok(metadata) => Ok(metadata.is_file()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(AppError::Unavailable(format!(
                "Failed to stat object {}: {}",
                path, e
            ))),
        }
    }

    async fn delete(&self, path: &str) -> AppResult<()> {
        let object_path = self.get_object_path(path)?;

        match fs::remove_file(&object_path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AppError::Unavailable(format!(
                "Failed to delete object {}: {}",
                path, e
            ))),
        }
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> AppResult<()> {
        let object_path = self.get_object_path(path)?;
        if let Some(parent) = object_path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                AppError::Unavailable(format!("Failed to create object directory: {}", e))
            })?;
        }

        fs::write(&object_path, data).await.map_err(|e| {
            AppError::Unavailable(format!("Failed to write object {}: {}", path, e))
        })?;

        Ok(())
    }
}
