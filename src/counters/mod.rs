/// Counter reconciler
///
/// `system_counters` is a cache of global entity counts. Nothing keeps it in
/// lock-step with the tables it summarizes; [`CounterReconciler::reconcile`]
/// is the single repair path, and it also rewrites any per-row counters that
/// drifted from their edge tables.

use crate::{
    db::models::CounterSnapshot,
    error::{AppError, AppResult},
    metrics,
};
use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

const SELECT_SNAPSHOT: &str = r#"
    SELECT users_count, videos_count, comments_count, replies_count,
           upvotes_count, downvotes_count, views_count, updated_at
    FROM system_counters
    WHERE id = 1
"#;

const REFRESH_TOTALS: &str = r#"
    UPDATE system_counters SET
        users_count = (SELECT COUNT(*) FROM users),
        videos_count = (SELECT COUNT(*) FROM published_content),
        comments_count = (SELECT COUNT(*) FROM comments),
        replies_count = (SELECT COUNT(*) FROM replies),
        upvotes_count = (SELECT COUNT(*) FROM reactions WHERE kind = 'up'),
        downvotes_count = (SELECT COUNT(*) FROM reactions WHERE kind = 'down'),
        views_count = (SELECT COUNT(*) FROM views),
        updated_at = ?1
    WHERE id = 1
"#;

const REPAIR_CONTENT: &str = r#"
    WITH live AS (
        SELECT p.content_id,
               (SELECT COUNT(*) FROM reactions r WHERE r.content_id = p.content_id AND r.kind = 'up') AS ups,
               (SELECT COUNT(*) FROM reactions r WHERE r.content_id = p.content_id AND r.kind = 'down') AS downs,
               (SELECT COUNT(*) FROM comments c WHERE c.content_id = p.content_id) AS comments,
               (SELECT COUNT(*) FROM views v WHERE v.content_id = p.content_id) AS views
        FROM published_content p
    )
    UPDATE published_content SET
        upvote_count = live.ups,
        downvote_count = live.downs,
        comment_count = live.comments,
        view_count = live.views
    FROM live
    WHERE live.content_id = published_content.content_id
      AND (upvote_count != live.ups
           OR downvote_count != live.downs
           OR comment_count != live.comments
           OR view_count != live.views)
"#;

const REPAIR_COMMENTS: &str = r#"
    UPDATE comments SET
        reply_count = (SELECT COUNT(*) FROM replies r WHERE r.comment_id = comments.comment_id)
    WHERE reply_count != (SELECT COUNT(*) FROM replies r WHERE r.comment_id = comments.comment_id)
"#;

const REPAIR_USERS: &str = r#"
    UPDATE users SET
        total_videos = (SELECT COUNT(*) FROM published_content p WHERE p.owner_id = users.uid)
    WHERE total_videos != (SELECT COUNT(*) FROM published_content p WHERE p.owner_id = users.uid)
"#;

/// Rows rewritten by one reconciliation, per table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepairReport {
    pub content: u64,
    pub comments: u64,
    pub users: u64,
}

impl RepairReport {
    pub fn total(&self) -> u64 {
        self.content + self.comments + self.users
    }
}

/// Counter reconciliation service
pub struct CounterReconciler {
    db: SqlitePool,
}

impl CounterReconciler {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Recompute every cached counter from its source table
    pub async fn reconcile(&self) -> AppResult<CounterSnapshot> {
        let now = Utc::now();
        let mut tx = self.db.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO system_counters (id, users_count, videos_count, comments_count,
                replies_count, upvotes_count, downvotes_count, views_count, updated_at)
            VALUES (1, 0, 0, 0, 0, 0, 0, 0, ?1)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query(REFRESH_TOTALS).bind(now).execute(&mut *tx).await?;

        let report = RepairReport {
            content: sqlx::query(REPAIR_CONTENT)
                .execute(&mut *tx)
                .await?
                .rows_affected(),
            comments: sqlx::query(REPAIR_COMMENTS)
                .execute(&mut *tx)
                .await?
                .rows_affected(),
            users: sqlx::query(REPAIR_USERS)
                .execute(&mut *tx)
                .await?
                .rows_affected(),
        };

        let snapshot = sqlx::query_as::<_, CounterSnapshot>(SELECT_SNAPSHOT)
            .fetch_one(&mut *tx)
            .await?;

        tx.commit().await?;

        if report.total() > 0 {
            metrics::record_counter_repairs("content", report.content);
            metrics::record_counter_repairs("comments", report.comments);
            metrics::record_counter_repairs("users", report.users);
            warn!(
                content = report.content,
                comments = report.comments,
                users = report.users,
                "repaired drifted counters"
            );
        }

        info!(totals = ?snapshot.totals, "counters reconciled");

        Ok(snapshot)
    }

    /// Read the cached counters without recomputing them
    pub async fn read_counters(&self) -> AppResult<CounterSnapshot> {
        sqlx::query_as::<_, CounterSnapshot>(SELECT_SNAPSHOT)
            .fetch_optional(&self.db)
            .await?
            .ok_or(AppError::NotInitialized)
    }
}
