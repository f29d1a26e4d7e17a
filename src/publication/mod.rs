/// Publication protocol
///
/// Moves a content item from the staging ledger into published content.
/// A content id lives in at most one of `staged_content` and
/// `published_content`; the promotion happens in one transaction, and the
/// external side effects (index notification, asset cleanup) are dispatched
/// only after it commits.

mod metadata;

pub use metadata::ContentMetadata;

use crate::{
    admin::{AdminRoleManager, Role},
    db::models::{PublishedContent, StagedContent},
    error::{AppError, AppResult},
    metrics,
    search::{DocumentKind, IndexNotifier},
    storage::{AssetPart, ObjectStore, UploadLocation},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use sqlx::types::Json;
use sqlx::SqlitePool;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use validator::Validate;

/// Upper bound on a detached asset cleanup run
const ASSET_CLEANUP_TIMEOUT: Duration = Duration::from_secs(60);

/// Generate an unguessable id from the actor, a nanosecond timestamp and a
/// random nonce
pub(crate) fn generate_id(actor_id: &str) -> String {
    let nonce: [u8; 16] = rand::random();
    let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();

    let mut hasher = Sha256::new();
    hasher.update(actor_id.as_bytes());
    hasher.update(nanos.to_be_bytes());
    hasher.update(nonce);
    hex::encode(hasher.finalize())
}

/// Result of `begin_upload`: the new id and one write location per asset part
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StagedUpload {
    pub content_id: String,
    pub upload_locations: Vec<UploadLocation>,
}

/// Publication protocol service
pub struct PublicationService {
    db: SqlitePool,
    storage: Arc<dyn ObjectStore>,
    notifier: IndexNotifier,
    roles: AdminRoleManager,
}

impl PublicationService {
    pub fn new(
        db: SqlitePool,
        storage: Arc<dyn ObjectStore>,
        notifier: IndexNotifier,
        roles: AdminRoleManager,
    ) -> Self {
        Self {
            db,
            storage,
            notifier,
            roles,
        }
    }

    /// Create a staging slot and hand out write locations for every asset part
    pub async fn begin_upload(
        &self,
        owner_id: &str,
        metadata: ContentMetadata,
    ) -> AppResult<StagedUpload> {
        metadata
            .validate()
            .map_err(|e| AppError::InvalidArgument(e.to_string()))?;

        let owner_username: String =
            sqlx::query_scalar("SELECT username FROM users WHERE uid = ?1")
                .bind(owner_id)
                .fetch_optional(&self.db)
                .await?
                .ok_or_else(|| AppError::NotFound(format!("User not found: {}", owner_id)))?;

        let content_id = generate_id(owner_id);

        let mut upload_locations = Vec::with_capacity(AssetPart::REQUIRED.len());
        for part in AssetPart::REQUIRED {
            let location = self
                .storage
                .request_upload_location(&part.path(&content_id))
                .await?;
            upload_locations.push(location);
        }

        sqlx::query(
            r#"
            INSERT INTO staged_content (
                content_id, owner_id, owner_username, video_path, thumbnail_path,
                title, description, tags, created_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&content_id)
        .bind(owner_id)
        .bind(&owner_username)
        .bind(AssetPart::Video.path(&content_id))
        .bind(AssetPart::Thumbnail.path(&content_id))
        .bind(&metadata.title)
        .bind(&metadata.description)
        .bind(Json(&metadata.tags))
        .bind(Utc::now())
        .execute(&self.db)
        .await?;

        metrics::record_publication("begun");
        info!(content_id = %content_id, owner_id, "staged upload");

        Ok(StagedUpload {
            content_id,
            upload_locations,
        })
    }

    /// Promote a staged item once every asset part is present in storage
    pub async fn acknowledge(&self, content_id: &str, actor_id: &str) -> AppResult<PublishedContent> {
        let staged = sqlx::query_as::<_, StagedContent>(
            r#"
            SELECT content_id, owner_id, owner_username, video_path, thumbnail_path,
                   title, description, tags, created_at
            FROM staged_content
            WHERE content_id = ?1
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Staged upload not found: {}", content_id)))?;

        if staged.owner_id != actor_id {
            return Err(AppError::Forbidden(
                "Only the uploader can acknowledge an upload".to_string(),
            ));
        }

        for part in AssetPart::REQUIRED {
            let path = part.path(content_id);
            let present = self.storage.exists(&path).await.map_err(|e| match e {
                AppError::Unavailable(_) => e,
                other => AppError::Unavailable(format!("Object store check failed: {}", other)),
            })?;

            if !present {
                return Err(AppError::AssetMissing(format!(
                    "{} has not been uploaded for {}",
                    part.as_str(),
                    content_id
                )));
            }
        }

        let mut tx = self.db.begin().await?;

        // Consuming the staged row first takes the write lock and settles
        // concurrent acknowledgements: only one caller gets the row back
        let staged = sqlx::query_as::<_, StagedContent>(
            r#"
            DELETE FROM staged_content
            WHERE content_id = ?1
            RETURNING content_id, owner_id, owner_username, video_path, thumbnail_path,
                      title, description, tags, created_at
            "#,
        )
        .bind(content_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Staged upload not found: {}", content_id)))?;

        let now = Utc::now();
        let published = PublishedContent {
            content_id: staged.content_id,
            owner_id: staged.owner_id,
            owner_username: staged.owner_username,
            video_path: staged.video_path,
            thumbnail_path: staged.thumbnail_path,
            title: staged.title,
            description: staged.description,
            tags: staged.tags,
            view_count: 0,
            upvote_count: 0,
            downvote_count: 0,
            comment_count: 0,
            created_at: now,
            updated_at: now,
        };

        sqlx::query(
            r#"
            INSERT INTO published_content (
                content_id, owner_id, owner_username, video_path, thumbnail_path,
                title, description, tags, view_count, upvote_count, downvote_count,
                comment_count, created_at, updated_at
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, 0, 0, 0, 0, ?9, ?10)
            "#,
        )
        .bind(&published.content_id)
        .bind(&published.owner_id)
        .bind(&published.owner_username)
        .bind(&published.video_path)
        .bind(&published.thumbnail_path)
        .bind(&published.title)
        .bind(&published.description)
        .bind(&published.tags)
        .bind(published.created_at)
        .bind(published.updated_at)
        .execute(&mut *tx)
        .await?;

        sqlx::query("UPDATE users SET total_videos = total_videos + 1 WHERE uid = ?1")
            .bind(&published.owner_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        metrics::record_publication("published");
        info!(content_id = %published.content_id, owner_id = %published.owner_id, "published content");

        self.notifier.upsert(
            DocumentKind::Video,
            published.content_id.clone(),
            serde_json::json!({
                "video_id": published.content_id,
                "title": published.title,
                "description": published.description,
                "tags": published.tags.0,
                "user_username": published.owner_username,
                "created_at": published.created_at,
            }),
        );

        Ok(published)
    }

    /// Read a published item
    pub async fn get(&self, content_id: &str) -> AppResult<PublishedContent> {
        sqlx::query_as::<_, PublishedContent>(
            r#"
            SELECT content_id, owner_id, owner_username, video_path, thumbnail_path,
                   title, description, tags, view_count, upvote_count, downvote_count,
                   comment_count, created_at, updated_at
            FROM published_content
            WHERE content_id = ?1
            "#,
        )
        .bind(content_id)
        .fetch_optional(&self.db)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Content not found: {}", content_id)))
    }

    /// Delete a published item on behalf of its owner
    pub async fn delete(&self, content_id: &str, actor_id: &str) -> AppResult<()> {
        self.remove(content_id, Some(actor_id)).await?;
        Ok(())
    }

    /// Delete any published item on behalf of an administrator
    pub async fn delete_as_admin(&self, content_id: &str, admin_id: &str) -> AppResult<()> {
        self.roles.require_role(admin_id, Role::Admin).await?;

        let owner_id = self.remove(content_id, None).await?;

        let details = format!("owner={}", owner_id);
        if let Err(e) = self
            .roles
            .log_action(admin_id, "delete_content", Some(content_id), Some(&details))
            .await
        {
            warn!(content_id, admin_id, error = %e, "failed to write audit log entry");
        }

        Ok(())
    }

    /// Remove the row (cascading to reactions, comments, replies and views),
    /// then run the best-effort follow-ups. Returns the owner id.
    async fn remove(&self, content_id: &str, required_owner: Option<&str>) -> AppResult<String> {
        let mut tx = self.db.begin().await?;

        let owner_id: String = sqlx::query_scalar(
            "DELETE FROM published_content WHERE content_id = ?1 RETURNING owner_id",
        )
        .bind(content_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Content not found: {}", content_id)))?;

        if let Some(actor_id) = required_owner {
            if actor_id != owner_id {
                tx.rollback().await?;
                return Err(AppError::Forbidden(
                    "Only the owner can delete this content".to_string(),
                ));
            }
        }

        tx.commit().await?;

        metrics::record_publication("deleted");
        info!(content_id, owner_id = %owner_id, "deleted content");

        // Drift here is repaired by reconciliation
        if let Err(e) =
            sqlx::query("UPDATE users SET total_videos = MAX(total_videos - 1, 0) WHERE uid = ?1")
                .bind(&owner_id)
                .execute(&self.db)
                .await
        {
            metrics::record_side_effect_failure("owner_counter");
            warn!(content_id, owner_id = %owner_id, error = %e, "failed to decrement owner content counter");
        }

        self.spawn_asset_cleanup(content_id.to_string());
        self.notifier.delete(DocumentKind::Video, content_id);

        Ok(owner_id)
    }

    /// Delete every asset part of a content item in the background and
    /// verify it is gone. Orphaned objects are tolerated; failures are logged.
    fn spawn_asset_cleanup(&self, content_id: String) -> JoinHandle<()> {
        let storage = Arc::clone(&self.storage);

        tokio::spawn(async move {
            let cleanup = async {
                for part in AssetPart::REQUIRED {
                    let path = part.path(&content_id);
                    if let Err(e) = delete_and_verify(storage.as_ref(), &path).await {
                        metrics::record_side_effect_failure("asset_cleanup");
                        error!(content_id = %content_id, path = %path, error = %e, "critical: failed to delete asset");
                    }
                }
            };

            if tokio::time::timeout(ASSET_CLEANUP_TIMEOUT, cleanup).await.is_err() {
                metrics::record_side_effect_failure("asset_cleanup");
                error!(content_id = %content_id, "critical: asset cleanup timed out");
            }
        })
    }

    /// Discard staged rows older than `ttl`, then best-effort delete any
    /// partially uploaded objects. Returns the number of rows discarded.
    pub async fn sweep_abandoned(&self, ttl: Duration) -> AppResult<u64> {
        let ttl = chrono::Duration::from_std(ttl)
            .map_err(|e| AppError::InvalidArgument(format!("Invalid staging TTL: {}", e)))?;
        let cutoff = Utc::now() - ttl;

        let discarded: Vec<String> = sqlx::query_scalar(
            "DELETE FROM staged_content WHERE created_at < ?1 RETURNING content_id",
        )
        .bind(cutoff)
        .fetch_all(&self.db)
        .await?;

        for content_id in &discarded {
            for part in AssetPart::REQUIRED {
                let path = part.path(content_id);
                if let Err(e) = self.storage.delete(&path).await {
                    metrics::record_side_effect_failure("asset_cleanup");
                    warn!(content_id = %content_id, path = %path, error = %e, "failed to delete abandoned upload");
                }
            }
            debug!(content_id = %content_id, "discarded abandoned upload");
        }

        let count = discarded.len() as u64;
        if count > 0 {
            metrics::record_publications("discarded", count);
            info!(count, "swept abandoned uploads");
        }

        Ok(count)
    }
}

async fn delete_and_verify(storage: &dyn ObjectStore, path: &str) -> AppResult<()> {
    storage.delete(path).await?;

    if storage.exists(path).await? {
        return Err(AppError::Unavailable(format!(
            "Object still present after delete: {}",
            path
        )));
    }

    Ok(())
}
