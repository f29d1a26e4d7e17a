/// Social endpoints: votes, comments and replies
use crate::{
    api::within_deadline,
    auth::Actor,
    context::AppContext,
    db::models::Comment,
    error::AppResult,
    reactions::{ReplyOutcome, VoteKind, VoteOutcome},
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::post,
    Json, Router,
};
use serde::{Deserialize, Serialize};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/social/videos/upvote/:id", post(upvote))
        .route("/social/videos/downvote/:id", post(downvote))
        .route("/social/videos/comment/:id", post(comment))
        .route("/social/videos/reply/:comment_id", post(reply))
}

#[derive(Debug, Deserialize)]
struct BodyRequest {
    body: String,
}

#[derive(Debug, Serialize)]
struct VoteResponse {
    kind: VoteKind,
    outcome: VoteOutcome,
}

async fn upvote(
    State(ctx): State<AppContext>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<Json<VoteResponse>> {
    let outcome = within_deadline(&ctx, ctx.reactions.set_upvote(&actor.uid, &id)).await?;
    Ok(Json(VoteResponse {
        kind: VoteKind::Up,
        outcome,
    }))
}

async fn downvote(
    State(ctx): State<AppContext>,
    actor: Actor,
    Path(id): Path<String>,
) -> AppResult<Json<VoteResponse>> {
    let outcome = within_deadline(&ctx, ctx.reactions.set_downvote(&actor.uid, &id)).await?;
    Ok(Json(VoteResponse {
        kind: VoteKind::Down,
        outcome,
    }))
}

async fn comment(
    State(ctx): State<AppContext>,
    actor: Actor,
    Path(id): Path<String>,
    Json(req): Json<BodyRequest>,
) -> AppResult<(StatusCode, Json<Comment>)> {
    let comment = within_deadline(&ctx, ctx.reactions.comment(&actor.uid, &id, &req.body)).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

async fn reply(
    State(ctx): State<AppContext>,
    actor: Actor,
    Path(comment_id): Path<String>,
    Json(req): Json<BodyRequest>,
) -> AppResult<(StatusCode, Json<ReplyOutcome>)> {
    let outcome =
        within_deadline(&ctx, ctx.reactions.reply(&actor.uid, &comment_id, &req.body)).await?;

    let status = if outcome.created {
        StatusCode::CREATED
    } else {
        StatusCode::OK
    };
    Ok((status, Json(outcome)))
}
