/// Object storage
///
/// The publication protocol only needs three capabilities from object
/// storage: hand out a time-boxed write location, answer whether an object
/// exists, and delete an object. Clients upload asset bytes directly to the
/// write location; the server never proxies them through the core.

pub mod disk;
pub mod signing;

pub use disk::DiskObjectStore;
pub use signing::UploadSigner;

use crate::error::AppResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Object storage backend trait
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Issue a write location for `path` that stops working at `expires_at`
    async fn request_upload_location(&self, path: &str) -> AppResult<UploadLocation>;

    /// Check if an object exists
    async fn exists(&self, path: &str) -> AppResult<bool>;

    /// Delete an object; deleting an absent object succeeds
    async fn delete(&self, path: &str) -> AppResult<()>;

    /// Store object bytes (the receiving side of an upload location)
    async fn put(&self, path: &str, data: Vec<u8>) -> AppResult<()>;
}

/// A time-boxed write location for one asset part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadLocation {
    pub part: AssetPart,
    pub path: String,
    pub url: String,
    pub expires_at: DateTime<Utc>,
}

/// Asset parts that make up one content item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetPart {
    Video,
    Thumbnail,
}

impl AssetPart {
    /// Every part that must exist before a content item can be published
    pub const REQUIRED: [AssetPart; 2] = [AssetPart::Video, AssetPart::Thumbnail];

    /// Fixed path convention; reads go through this path, never a stored URL
    pub fn path(&self, content_id: &str) -> String {
        match self {
            AssetPart::Video => format!("videos/{}", content_id),
            AssetPart::Thumbnail => format!("thumbnails/videos/{}.jpg", content_id),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetPart::Video => "video",
            AssetPart::Thumbnail => "thumbnail",
        }
    }
}
