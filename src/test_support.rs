/// Shared fixtures for unit tests
use crate::{
    config::ServerConfig,
    context::AppContext,
    db::models::{PublishedContent, User},
    publication::ContentMetadata,
    storage::AssetPart,
};
use std::time::Duration;
use tempfile::TempDir;

/// Context backed by a fresh database and object directory
pub(crate) async fn context() -> (TempDir, AppContext) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = AppContext::new(ServerConfig::for_tests(dir.path()))
        .await
        .unwrap();
    (dir, ctx)
}

/// Register `uid` with the same string as its username
pub(crate) async fn register(ctx: &AppContext, uid: &str) -> User {
    ctx.accounts.register(uid, uid).await.unwrap()
}

/// Write every asset part the way a client would after `begin_upload`
pub(crate) async fn upload_assets(ctx: &AppContext, content_id: &str) {
    for part in AssetPart::REQUIRED {
        ctx.storage
            .put(&part.path(content_id), part.as_str().as_bytes().to_vec())
            .await
            .unwrap();
    }
}

/// Register `owner` and publish one item for them
pub(crate) async fn publish(ctx: &AppContext, owner: &str) -> PublishedContent {
    if ctx.accounts.get(owner).await.is_err() {
        register(ctx, owner).await;
    }

    let staged = ctx
        .publication
        .begin_upload(
            owner,
            ContentMetadata {
                title: "clip".to_string(),
                description: String::new(),
                tags: Vec::new(),
            },
        )
        .await
        .unwrap();
    upload_assets(ctx, &staged.content_id).await;

    ctx.publication
        .acknowledge(&staged.content_id, owner)
        .await
        .unwrap()
}

/// Poll until the detached cleanup has removed `path`
pub(crate) async fn wait_until_absent(ctx: &AppContext, path: &str) {
    for _ in 0..100 {
        if !ctx.storage.exists(path).await.unwrap() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("object {} still present", path);
}
