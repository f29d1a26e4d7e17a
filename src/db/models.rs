/// Row models for the content store
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::types::Json;
use sqlx::FromRow;

/// Registered user
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub username: String,
    pub total_videos: i64,
    pub created_at: DateTime<Utc>,
}

/// Upload slot that has not been acknowledged yet
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct StagedContent {
    pub content_id: String,
    pub owner_id: String,
    pub owner_username: String,
    pub video_path: String,
    pub thumbnail_path: String,
    pub title: String,
    pub description: String,
    pub tags: Json<Vec<String>>,
    pub created_at: DateTime<Utc>,
}

/// Confirmed, world-visible content item
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct PublishedContent {
    pub content_id: String,
    pub owner_id: String,
    pub owner_username: String,
    pub video_path: String,
    pub thumbnail_path: String,
    pub title: String,
    pub description: String,
    pub tags: Json<Vec<String>>,
    pub view_count: i64,
    pub upvote_count: i64,
    pub downvote_count: i64,
    pub comment_count: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Comment {
    pub comment_id: String,
    pub content_id: String,
    pub author_id: String,
    pub body: String,
    pub reply_count: i64,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Reply {
    pub reply_id: String,
    pub comment_id: String,
    pub author_id: String,
    pub body: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Global entity counts held in the aggregate cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, FromRow, Serialize, Deserialize)]
pub struct CounterTotals {
    pub users_count: i64,
    pub videos_count: i64,
    pub comments_count: i64,
    pub replies_count: i64,
    pub upvotes_count: i64,
    pub downvotes_count: i64,
    pub views_count: i64,
}

/// Snapshot of the aggregate cache row
#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct CounterSnapshot {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub totals: CounterTotals,
    pub updated_at: DateTime<Utc>,
}
