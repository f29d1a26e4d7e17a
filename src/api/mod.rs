/// API routes and handlers
///
/// Thin layer over the core services: each handler resolves the actor,
/// runs one service call under the configured request deadline and maps
/// the result to JSON.
pub mod admin;
pub mod content;
pub mod health;
pub mod middleware;
pub mod social;
pub mod uploads;
pub mod users;

use crate::{context::AppContext, db, error::AppResult};
use axum::Router;
use std::future::Future;

/// Build API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .merge(health::routes())
        .merge(content::routes())
        .merge(social::routes())
        .merge(users::routes())
        .merge(admin::routes())
        .merge(uploads::routes())
}

/// Run a core call under the per-request deadline
pub(crate) async fn within_deadline<T, F>(ctx: &AppContext, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    db::with_deadline(ctx.config.service.request_timeout, fut).await
}
