/// Background task implementations
use crate::{context::AppContext, error::AppResult};

/// Discard staged uploads older than the configured TTL
pub async fn sweep_abandoned_uploads(ctx: &AppContext) -> AppResult<u64> {
    ctx.publication
        .sweep_abandoned(ctx.config.staging.ttl)
        .await
}

/// Health check - verify all systems are operational
pub async fn health_check(ctx: &AppContext) -> AppResult<()> {
    sqlx::query("SELECT 1").fetch_one(&ctx.db).await?;

    // An absent probe object is the expected answer
    ctx.storage.exists(".health").await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support;

    #[tokio::test]
    async fn test_health_check_passes() {
        let (_dir, ctx) = test_support::context().await;
        health_check(&ctx).await.unwrap();
    }

    #[tokio::test]
    async fn test_sweep_keeps_fresh_uploads() {
        let (_dir, ctx) = test_support::context().await;
        test_support::register(&ctx, "alice").await;
        ctx.publication
            .begin_upload(
                "alice",
                crate::publication::ContentMetadata {
                    title: "fresh".to_string(),
                    description: String::new(),
                    tags: Vec::new(),
                },
            )
            .await
            .unwrap();

        assert_eq!(sweep_abandoned_uploads(&ctx).await.unwrap(), 0);
    }
}
