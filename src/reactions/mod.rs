/// Reaction state machine
///
/// Votes, comments, replies and views. Every mutation runs in one
/// transaction whose first statement writes the target row: that takes the
/// SQLite write lock before anything is read and doubles as the existence
/// check. The unique keys on `reactions(actor_id, content_id)` and
/// `replies(author_id, comment_id)` arbitrate the rest.

use crate::{
    admin::{AdminRoleManager, Role},
    db::models::{Comment, Reply},
    error::{AppError, AppResult},
    metrics,
    publication::generate_id,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, info, warn};

/// Longest accepted comment or reply body, in characters
pub const MAX_BODY_CHARS: usize = 10_000;

/// The two mutually exclusive vote kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteKind {
    Up,
    Down,
}

impl VoteKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteKind::Up => "up",
            VoteKind::Down => "down",
        }
    }

    fn opposite(&self) -> VoteKind {
        match self {
            VoteKind::Up => VoteKind::Down,
            VoteKind::Down => VoteKind::Up,
        }
    }

    /// Counter column on `published_content`
    fn counter_column(&self) -> &'static str {
        match self {
            VoteKind::Up => "upvote_count",
            VoteKind::Down => "downvote_count",
        }
    }

    fn parse(s: &str) -> AppResult<Self> {
        match s {
            "up" => Ok(VoteKind::Up),
            "down" => Ok(VoteKind::Down),
            other => Err(AppError::Internal(format!("Unknown reaction kind: {}", other))),
        }
    }
}

/// What a vote request did to the stored state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOutcome {
    /// New edge inserted
    Created,
    /// Opposite edge replaced
    Switched,
    /// Edge of the requested kind already existed
    Unchanged,
}

impl VoteOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteOutcome::Created => "created",
            VoteOutcome::Switched => "switched",
            VoteOutcome::Unchanged => "unchanged",
        }
    }
}

/// Reply after the upsert, and whether it was a new row
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplyOutcome {
    pub reply: Reply,
    pub created: bool,
}

/// Reaction service
pub struct ReactionService {
    db: SqlitePool,
    roles: AdminRoleManager,
}

impl ReactionService {
    pub fn new(db: SqlitePool, roles: AdminRoleManager) -> Self {
        Self { db, roles }
    }

    pub async fn set_upvote(&self, actor_id: &str, target_id: &str) -> AppResult<VoteOutcome> {
        self.set_vote(actor_id, target_id, VoteKind::Up).await
    }

    pub async fn set_downvote(&self, actor_id: &str, target_id: &str) -> AppResult<VoteOutcome> {
        self.set_vote(actor_id, target_id, VoteKind::Down).await
    }

    /// Make `kind` the actor's single reaction on the target
    pub async fn set_vote(
        &self,
        actor_id: &str,
        target_id: &str,
        kind: VoteKind,
    ) -> AppResult<VoteOutcome> {
        let mut tx = self.db.begin().await?;

        lock_content(&mut tx, target_id).await?;

        let prior: Option<String> = sqlx::query_scalar(
            "SELECT kind FROM reactions WHERE actor_id = ?1 AND content_id = ?2",
        )
        .bind(actor_id)
        .bind(target_id)
        .fetch_optional(&mut *tx)
        .await?;

        let prior = prior.as_deref().map(VoteKind::parse).transpose()?;

        let outcome = match prior {
            Some(existing) if existing == kind => VoteOutcome::Unchanged,
            Some(_) => {
                sqlx::query(
                    r#"
                    UPDATE reactions SET kind = ?3, created_at = ?4
                    WHERE actor_id = ?1 AND content_id = ?2
                    "#,
                )
                .bind(actor_id)
                .bind(target_id)
                .bind(kind.as_str())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;

                let switch = format!(
                    "UPDATE published_content SET {inc} = {inc} + 1, {dec} = MAX({dec} - 1, 0) WHERE content_id = ?1",
                    inc = kind.counter_column(),
                    dec = kind.opposite().counter_column(),
                );
                sqlx::query(&switch).bind(target_id).execute(&mut *tx).await?;

                VoteOutcome::Switched
            }
            None => {
                let inserted = sqlx::query(
                    r#"
                    INSERT INTO reactions (actor_id, content_id, kind, created_at)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(actor_id, content_id) DO NOTHING
                    "#,
                )
                .bind(actor_id)
                .bind(target_id)
                .bind(kind.as_str())
                .bind(Utc::now())
                .execute(&mut *tx)
                .await?;

                if inserted.rows_affected() == 1 {
                    let bump = format!(
                        "UPDATE published_content SET {col} = {col} + 1 WHERE content_id = ?1",
                        col = kind.counter_column(),
                    );
                    sqlx::query(&bump).bind(target_id).execute(&mut *tx).await?;
                    VoteOutcome::Created
                } else {
                    VoteOutcome::Unchanged
                }
            }
        };

        tx.commit().await?;

        metrics::record_reaction(kind.as_str(), outcome.as_str());
        debug!(actor_id, target_id, kind = kind.as_str(), outcome = outcome.as_str(), "vote applied");

        Ok(outcome)
    }

    /// Add a comment to published content
    pub async fn comment(&self, actor_id: &str, target_id: &str, body: &str) -> AppResult<Comment> {
        let body = validate_body(body)?;

        let mut tx = self.db.begin().await?;

        let bumped = sqlx::query(
            "UPDATE published_content SET comment_count = comment_count + 1 WHERE content_id = ?1",
        )
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        if bumped.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Content not found: {}", target_id)));
        }

        let comment = sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (comment_id, content_id, author_id, body, reply_count, created_at)
            VALUES (?1, ?2, ?3, ?4, 0, ?5)
            RETURNING comment_id, content_id, author_id, body, reply_count, created_at
            "#,
        )
        .bind(generate_id(actor_id))
        .bind(target_id)
        .bind(actor_id)
        .bind(body)
        .bind(Utc::now())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::record_reaction("comment", "created");
        debug!(actor_id, target_id, comment_id = %comment.comment_id, "comment added");

        Ok(comment)
    }

    /// Reply to a comment; an actor's second reply overwrites the first
    pub async fn reply(
        &self,
        actor_id: &str,
        comment_id: &str,
        body: &str,
    ) -> AppResult<ReplyOutcome> {
        let body = validate_body(body)?;

        let mut tx = self.db.begin().await?;

        let touched = sqlx::query("UPDATE comments SET reply_count = reply_count WHERE comment_id = ?1")
            .bind(comment_id)
            .execute(&mut *tx)
            .await?;

        if touched.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Comment not found: {}", comment_id)));
        }

        let candidate_id = generate_id(actor_id);
        let now = Utc::now();

        let reply = sqlx::query_as::<_, Reply>(
            r#"
            INSERT INTO replies (reply_id, comment_id, author_id, body, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?5)
            ON CONFLICT(author_id, comment_id) DO UPDATE SET
                body = excluded.body,
                updated_at = excluded.updated_at
            RETURNING reply_id, comment_id, author_id, body, created_at, updated_at
            "#,
        )
        .bind(&candidate_id)
        .bind(comment_id)
        .bind(actor_id)
        .bind(body)
        .bind(now)
        .fetch_one(&mut *tx)
        .await?;

        let created = reply.reply_id == candidate_id;
        if created {
            sqlx::query("UPDATE comments SET reply_count = reply_count + 1 WHERE comment_id = ?1")
                .bind(comment_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        metrics::record_reaction("reply", if created { "created" } else { "updated" });
        debug!(actor_id, comment_id, created, "reply stored");

        Ok(ReplyOutcome { reply, created })
    }

    /// Count a view; no deduplication
    pub async fn record_view(&self, target_id: &str, viewer_id: Option<&str>) -> AppResult<()> {
        let mut tx = self.db.begin().await?;

        let bumped = sqlx::query(
            "UPDATE published_content SET view_count = view_count + 1 WHERE content_id = ?1",
        )
        .bind(target_id)
        .execute(&mut *tx)
        .await?;

        if bumped.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Content not found: {}", target_id)));
        }

        sqlx::query("INSERT INTO views (content_id, viewer_id, viewed_at) VALUES (?1, ?2, ?3)")
            .bind(target_id)
            .bind(viewer_id)
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        metrics::record_reaction("view", "created");

        Ok(())
    }
}

impl ReactionService {
    /// Remove a comment and its replies on behalf of an administrator
    pub async fn delete_comment_as_admin(&self, comment_id: &str, admin_id: &str) -> AppResult<()> {
        self.roles.require_role(admin_id, Role::Admin).await?;

        let mut tx = self.db.begin().await?;

        let content_id: String = sqlx::query_scalar(
            "DELETE FROM comments WHERE comment_id = ?1 RETURNING content_id",
        )
        .bind(comment_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Comment not found: {}", comment_id)))?;

        sqlx::query(
            "UPDATE published_content SET comment_count = MAX(comment_count - 1, 0) WHERE content_id = ?1",
        )
        .bind(&content_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        metrics::record_reaction("comment", "deleted");
        info!(comment_id, content_id = %content_id, admin_id, "deleted comment");

        let details = format!("content={}", content_id);
        self.audit(admin_id, "delete_comment", comment_id, &details).await;

        Ok(())
    }

    /// Remove a single reply on behalf of an administrator
    pub async fn delete_reply_as_admin(&self, reply_id: &str, admin_id: &str) -> AppResult<()> {
        self.roles.require_role(admin_id, Role::Admin).await?;

        let mut tx = self.db.begin().await?;

        let comment_id: String = sqlx::query_scalar(
            "DELETE FROM replies WHERE reply_id = ?1 RETURNING comment_id",
        )
        .bind(reply_id)
        .fetch_optional(&mut *tx)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Reply not found: {}", reply_id)))?;

        sqlx::query("UPDATE comments SET reply_count = MAX(reply_count - 1, 0) WHERE comment_id = ?1")
            .bind(&comment_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;

        metrics::record_reaction("reply", "deleted");
        info!(reply_id, comment_id = %comment_id, admin_id, "deleted reply");

        let details = format!("comment={}", comment_id);
        self.audit(admin_id, "delete_reply", reply_id, &details).await;

        Ok(())
    }

    async fn audit(&self, admin_id: &str, action: &str, subject: &str, details: &str) {
        if let Err(e) = self
            .roles
            .log_action(admin_id, action, Some(subject), Some(details))
            .await
        {
            warn!(admin_id, action, subject, error = %e, "failed to write audit log entry");
        }
    }
}

/// Write-lock a content row without changing it
async fn lock_content(tx: &mut Transaction<'_, Sqlite>, content_id: &str) -> AppResult<()> {
    let touched = sqlx::query("UPDATE published_content SET updated_at = updated_at WHERE content_id = ?1")
        .bind(content_id)
        .execute(&mut **tx)
        .await?;

    if touched.rows_affected() == 0 {
        return Err(AppError::NotFound(format!("Content not found: {}", content_id)));
    }

    Ok(())
}

fn validate_body(body: &str) -> AppResult<&str> {
    let body = body.trim();

    if body.is_empty() {
        return Err(AppError::InvalidArgument("Body must not be empty".to_string()));
    }

    if body.chars().count() > MAX_BODY_CHARS {
        return Err(AppError::InvalidArgument(format!(
            "Body must be at most {} characters",
            MAX_BODY_CHARS
        )));
    }

    Ok(body)
}
