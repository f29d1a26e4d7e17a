/// User directory endpoints
use crate::{
    account::RegisterRequest,
    api::within_deadline,
    auth::Actor,
    context::AppContext,
    db::models::User,
    error::AppResult,
};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/users/register", post(register))
        .route("/users/:uid", get(get_user))
}

/// Register the token's subject under a chosen username
async fn register(
    State(ctx): State<AppContext>,
    actor: Actor,
    Json(req): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<User>)> {
    let user = within_deadline(&ctx, ctx.accounts.register(&actor.uid, &req.username)).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(State(ctx): State<AppContext>, Path(uid): Path<String>) -> AppResult<Json<User>> {
    let user = within_deadline(&ctx, ctx.accounts.get(&uid)).await?;
    Ok(Json(user))
}
