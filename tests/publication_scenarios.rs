/// End-to-end scenarios over the library API
///
/// Each test builds a full context on a scratch directory: SQLite file,
/// disk object store and a disabled (or stubbed) search index.
use async_trait::async_trait;
use clipstream::{
    admin::AdminRoleManager,
    config::ServerConfig,
    context::AppContext,
    db::models::PublishedContent,
    error::{AppError, AppResult},
    publication::{ContentMetadata, PublicationService},
    search::{DocumentKind, IndexNotifier, SearchIndex},
    storage::{AssetPart, ObjectStore, UploadLocation},
};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

async fn setup() -> (TempDir, AppContext) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::new(ServerConfig::for_tests(dir.path()))
        .await
        .unwrap();
    (dir, ctx)
}

fn metadata() -> ContentMetadata {
    ContentMetadata {
        title: "holiday".to_string(),
        description: "beach footage".to_string(),
        tags: vec!["summer".to_string()],
    }
}

async fn upload_everything(storage: &dyn ObjectStore, content_id: &str) {
    for part in AssetPart::REQUIRED {
        storage
            .put(&part.path(content_id), b"asset".to_vec())
            .await
            .unwrap();
    }
}

async fn publish(ctx: &AppContext, owner: &str) -> PublishedContent {
    let staged = ctx
        .publication
        .begin_upload(owner, metadata())
        .await
        .unwrap();
    upload_everything(ctx.storage.as_ref(), &staged.content_id).await;
    ctx.publication
        .acknowledge(&staged.content_id, owner)
        .await
        .unwrap()
}

async fn membership(ctx: &AppContext, content_id: &str) -> (i64, i64) {
    sqlx::query_as(
        r#"
        SELECT (SELECT COUNT(*) FROM staged_content WHERE content_id = ?1),
               (SELECT COUNT(*) FROM published_content WHERE content_id = ?1)
        "#,
    )
    .bind(content_id)
    .fetch_one(&ctx.db)
    .await
    .unwrap()
}

#[tokio::test]
async fn alice_stages_uploads_and_publishes_once() {
    let (_dir, ctx) = setup().await;
    ctx.accounts.register("alice", "alice").await.unwrap();

    let staged = ctx
        .publication
        .begin_upload("alice", metadata())
        .await
        .unwrap();
    let c1 = staged.content_id.clone();
    assert_eq!(staged.upload_locations.len(), 2);
    assert_eq!(membership(&ctx, &c1).await, (1, 0));

    assert!(matches!(
        ctx.publication.acknowledge(&c1, "alice").await,
        Err(AppError::AssetMissing(_))
    ));
    assert_eq!(membership(&ctx, &c1).await, (1, 0));

    upload_everything(ctx.storage.as_ref(), &c1).await;

    let published = ctx.publication.acknowledge(&c1, "alice").await.unwrap();
    assert_eq!(
        (
            published.view_count,
            published.upvote_count,
            published.downvote_count,
            published.comment_count
        ),
        (0, 0, 0, 0)
    );
    assert_eq!(membership(&ctx, &c1).await, (0, 1));

    assert!(matches!(
        ctx.publication.acknowledge(&c1, "alice").await,
        Err(AppError::NotFound(_))
    ));
}

#[tokio::test]
async fn non_owner_cannot_delete() {
    let (_dir, ctx) = setup().await;
    ctx.accounts.register("alice", "alice").await.unwrap();
    let content = publish(&ctx, "alice").await;

    assert!(matches!(
        ctx.publication.delete(&content.content_id, "bob").await,
        Err(AppError::Forbidden(_))
    ));

    let unchanged = ctx.publication.get(&content.content_id).await.unwrap();
    assert_eq!(unchanged.title, content.title);
    assert_eq!(unchanged.updated_at, content.updated_at);
}

#[tokio::test]
async fn fifty_concurrent_upvotes_leave_one_edge() {
    let (_dir, ctx) = setup().await;
    ctx.accounts.register("alice", "alice").await.unwrap();
    let content = publish(&ctx, "alice").await;
    let c1 = content.content_id.as_str();

    let handles: Vec<_> = (0..50)
        .map(|_| {
            let reactions = Arc::clone(&ctx.reactions);
            let target = c1.to_string();
            tokio::spawn(async move { reactions.set_upvote("u1", &target).await })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let edges: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM reactions WHERE actor_id = 'u1' AND content_id = ?1")
            .bind(c1)
            .fetch_one(&ctx.db)
            .await
            .unwrap();
    assert_eq!(edges, 1);
    assert_eq!(ctx.publication.get(c1).await.unwrap().upvote_count, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn interleaved_vote_switches_keep_counters_on_edges() {
    let (_dir, ctx) = setup().await;
    ctx.accounts.register("alice", "alice").await.unwrap();
    let content = publish(&ctx, "alice").await;
    let c1 = content.content_id.as_str();

    let handles: Vec<_> = (0..60)
        .map(|i| {
            let reactions = Arc::clone(&ctx.reactions);
            let target = c1.to_string();
            let actor = format!("voter{}", i % 3);
            tokio::spawn(async move {
                if i % 2 == 0 {
                    reactions.set_upvote(&actor, &target).await
                } else {
                    reactions.set_downvote(&actor, &target).await
                }
            })
        })
        .collect();

    for handle in handles {
        handle.await.unwrap().unwrap();
    }

    let (ups, downs): (i64, i64) = sqlx::query_as(
        r#"
        SELECT (SELECT COUNT(*) FROM reactions WHERE content_id = ?1 AND kind = 'up'),
               (SELECT COUNT(*) FROM reactions WHERE content_id = ?1 AND kind = 'down')
        "#,
    )
    .bind(c1)
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!(ups + downs, 3);

    let content = ctx.publication.get(c1).await.unwrap();
    assert_eq!((content.upvote_count, content.downvote_count), (ups, downs));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_replies_by_one_author_store_one_row() {
    let (_dir, ctx) = setup().await;
    ctx.accounts.register("alice", "alice").await.unwrap();
    let content = publish(&ctx, "alice").await;
    let comment = ctx
        .reactions
        .comment("bob", &content.content_id, "great")
        .await
        .unwrap();

    let handles: Vec<_> = (0..30)
        .map(|i| {
            let reactions = Arc::clone(&ctx.reactions);
            let comment_id = comment.comment_id.clone();
            tokio::spawn(async move {
                reactions
                    .reply("alice", &comment_id, &format!("thanks #{}", i))
                    .await
            })
        })
        .collect();

    let mut created = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap().created {
            created += 1;
        }
    }
    assert_eq!(created, 1);

    let (rows, reply_count): (i64, i64) = sqlx::query_as(
        r#"
        SELECT (SELECT COUNT(*) FROM replies WHERE comment_id = ?1),
               (SELECT reply_count FROM comments WHERE comment_id = ?1)
        "#,
    )
    .bind(&comment.comment_id)
    .fetch_one(&ctx.db)
    .await
    .unwrap();
    assert_eq!((rows, reply_count), (1, 1));
}

#[tokio::test]
async fn vote_sequences_end_in_the_last_choice() {
    let (_dir, ctx) = setup().await;
    ctx.accounts.register("alice", "alice").await.unwrap();
    let content = publish(&ctx, "alice").await;
    let c1 = content.content_id.as_str();

    ctx.reactions.set_upvote("u1", c1).await.unwrap();
    ctx.reactions.set_downvote("u1", c1).await.unwrap();
    ctx.reactions.set_downvote("u1", c1).await.unwrap();
    ctx.reactions.set_upvote("u1", c1).await.unwrap();
    ctx.reactions.set_downvote("u1", c1).await.unwrap();

    let kinds: Vec<String> =
        sqlx::query_scalar("SELECT kind FROM reactions WHERE actor_id = 'u1' AND content_id = ?1")
            .bind(c1)
            .fetch_all(&ctx.db)
            .await
            .unwrap();
    assert_eq!(kinds, vec!["down".to_string()]);

    let content = ctx.publication.get(c1).await.unwrap();
    assert_eq!((content.upvote_count, content.downvote_count), (0, 1));
}

#[tokio::test]
async fn reconcile_twice_gives_identical_totals() {
    let (_dir, ctx) = setup().await;
    ctx.accounts.register("alice", "alice").await.unwrap();
    let content = publish(&ctx, "alice").await;
    let comment = ctx
        .reactions
        .comment("bob", &content.content_id, "great")
        .await
        .unwrap();
    ctx.reactions
        .reply("alice", &comment.comment_id, "thanks")
        .await
        .unwrap();
    ctx.reactions
        .reply("alice", &comment.comment_id, "thanks!")
        .await
        .unwrap();

    let first = ctx.counters.reconcile().await.unwrap();
    let second = ctx.counters.reconcile().await.unwrap();

    assert_eq!(first.totals, second.totals);
    assert_eq!(first.totals.replies_count, 1);
    assert_eq!(first.totals.comments_count, 1);
}

/// Store whose deletes always fail
struct UndeletableStore {
    inner: Arc<dyn ObjectStore>,
}

#[async_trait]
impl ObjectStore for UndeletableStore {
    async fn request_upload_location(&self, path: &str) -> AppResult<UploadLocation> {
        self.inner.request_upload_location(path).await
    }

    async fn exists(&self, path: &str) -> AppResult<bool> {
        self.inner.exists(path).await
    }

    async fn delete(&self, _path: &str) -> AppResult<()> {
        Err(AppError::Unavailable("object store offline".to_string()))
    }

    async fn put(&self, path: &str, data: Vec<u8>) -> AppResult<()> {
        self.inner.put(path, data).await
    }
}

/// Index that rejects every call
struct OfflineIndex;

#[async_trait]
impl SearchIndex for OfflineIndex {
    async fn upsert_document(
        &self,
        _kind: DocumentKind,
        _id: &str,
        _fields: serde_json::Value,
    ) -> AppResult<()> {
        Err(AppError::Unavailable("index offline".to_string()))
    }

    async fn delete_document(&self, _kind: DocumentKind, _id: &str) -> AppResult<()> {
        Err(AppError::Unavailable("index offline".to_string()))
    }
}

#[tokio::test]
async fn side_effect_failures_never_fail_the_caller() {
    let (_dir, ctx) = setup().await;
    ctx.accounts.register("alice", "alice").await.unwrap();

    let store = Arc::new(UndeletableStore {
        inner: Arc::clone(&ctx.storage),
    });
    let publication = PublicationService::new(
        ctx.db.clone(),
        store.clone(),
        IndexNotifier::new(Arc::new(OfflineIndex), Duration::from_millis(200)),
        AdminRoleManager::new(ctx.db.clone(), Vec::new()),
    );

    let staged = publication.begin_upload("alice", metadata()).await.unwrap();
    upload_everything(store.as_ref(), &staged.content_id).await;

    // Index notification fails in the background; publication still succeeds
    let published = publication
        .acknowledge(&staged.content_id, "alice")
        .await
        .unwrap();

    // Asset deletion fails in the background; the row is still removed
    publication
        .delete(&published.content_id, "alice")
        .await
        .unwrap();

    assert_eq!(membership(&ctx, &published.content_id).await, (0, 0));
    assert!(store
        .exists(&AssetPart::Video.path(&published.content_id))
        .await
        .unwrap());
}

#[tokio::test]
async fn dropped_operation_leaves_no_partial_state() {
    let (_dir, ctx) = setup().await;
    ctx.accounts.register("alice", "alice").await.unwrap();
    let content = publish(&ctx, "alice").await;

    // Hold the write lock so the vote blocks inside its transaction
    let mut blocker = ctx.db.begin().await.unwrap();
    sqlx::query("UPDATE users SET total_videos = total_videos WHERE uid = 'alice'")
        .execute(&mut *blocker)
        .await
        .unwrap();

    let result = clipstream::db::with_deadline(
        Duration::from_millis(100),
        ctx.reactions.set_upvote("u1", &content.content_id),
    )
    .await;
    assert!(matches!(result, Err(AppError::DeadlineExceeded(_))));

    blocker.rollback().await.unwrap();

    let after = ctx.publication.get(&content.content_id).await.unwrap();
    assert_eq!(after.upvote_count, 0);
    let edges: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM reactions")
        .fetch_one(&ctx.db)
        .await
        .unwrap();
    assert_eq!(edges, 0);
}
