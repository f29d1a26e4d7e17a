/// Content endpoints: staged upload, acknowledge, read, delete, views
use crate::{
    api::within_deadline,
    auth::{Actor, OptionalActor},
    context::AppContext,
    db::models::PublishedContent,
    error::AppResult,
    publication::{ContentMetadata, StagedUpload},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/videos/upload", post(begin_upload))
        .route("/videos/upload/ack/:id", post(acknowledge))
        .route("/videos/:id", get(get_content).delete(delete_content))
        .route("/videos/:id/view", post(record_view))
}

async fn begin_upload(
    State(ctx): State<AppContext>,
    actor: Actor,
    Json(metadata): Json<ContentMetadata>,
) -> AppResult<(StatusCode, Json<StagedUpload>)> {
    let staged = within_deadline(&ctx, ctx.publication.begin_upload(&actor.uid, metadata)).await?;
    Ok((StatusCode::CREATED, Json(staged)))
}

async fn acknowledge(
    State(ctx): State<AppContext>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<Json<PublishedContent>> {
    let published = within_deadline(&ctx, ctx.publication.acknowledge(&id, &actor.uid)).await?;
    Ok(Json(published))
}

/// Reading an item also counts a view; a failed view never fails the read
async fn get_content(
    State(ctx): State<AppContext>,
    OptionalActor(actor): OptionalActor,
    Path(id): Path<String>,
) -> AppResult<Json<PublishedContent>> {
    let viewer = actor.as_ref().map(|a| a.uid.as_str());

    if let Err(e) = within_deadline(&ctx, ctx.reactions.record_view(&id, viewer)).await {
        if e.is_internal() {
            tracing::warn!(content_id = %id, error = %e, "failed to record view");
        } else {
            tracing::debug!(content_id = %id, error = %e, "view not recorded");
        }
    }

    let content = within_deadline(&ctx, ctx.publication.get(&id)).await?;
    Ok(Json(content))
}

async fn delete_content(
    State(ctx): State<AppContext>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    within_deadline(&ctx, ctx.publication.delete(&id, &actor.uid)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn record_view(
    State(ctx): State<AppContext>,
    OptionalActor(actor): OptionalActor,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    let viewer = actor.as_ref().map(|a| a.uid.as_str());
    within_deadline(&ctx, ctx.reactions.record_view(&id, viewer)).await?;
    Ok(StatusCode::NO_CONTENT)
}
