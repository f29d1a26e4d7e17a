/// Admin API Endpoints
use crate::{
    admin::{AdminRole, AuditLogEntry, Role},
    api::within_deadline,
    auth::AdminActor,
    context::AppContext,
    db::models::CounterSnapshot,
    error::AppResult,
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use serde::Deserialize;

/// Build admin API routes
pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/admin/videos/:id", delete(delete_content))
        .route("/admin/comments/:id", delete(delete_comment))
        .route("/admin/replies/:id", delete(delete_reply))
        .route("/admin/counters", get(read_counters))
        .route("/admin/counters/resync", post(resync_counters))
        // Role management
        .route("/admin/roles/grant", post(grant_role))
        .route("/admin/roles/revoke", post(revoke_role))
        .route("/admin/audit-log", get(audit_log))
}

async fn delete_content(
    State(ctx): State<AppContext>,
    auth: AdminActor,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    within_deadline(&ctx, ctx.publication.delete_as_admin(&id, &auth.uid)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_comment(
    State(ctx): State<AppContext>,
    auth: AdminActor,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    within_deadline(&ctx, ctx.reactions.delete_comment_as_admin(&id, &auth.uid)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_reply(
    State(ctx): State<AppContext>,
    auth: AdminActor,
    Path(id): Path<String>,
) -> AppResult<StatusCode> {
    within_deadline(&ctx, ctx.reactions.delete_reply_as_admin(&id, &auth.uid)).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn read_counters(
    State(ctx): State<AppContext>,
    _auth: AdminActor,
) -> AppResult<Json<CounterSnapshot>> {
    let snapshot = within_deadline(&ctx, ctx.counters.read_counters()).await?;
    Ok(Json(snapshot))
}

async fn resync_counters(
    State(ctx): State<AppContext>,
    auth: AdminActor,
) -> AppResult<Json<CounterSnapshot>> {
    auth.require(Role::Admin)?;

    let snapshot = within_deadline(&ctx, ctx.counters.reconcile()).await?;

    if let Err(e) = ctx
        .roles
        .log_action(&auth.uid, "counters.resync", None, None)
        .await
    {
        tracing::warn!(admin_uid = %auth.uid, error = %e, "failed to write audit log entry");
    }

    Ok(Json(snapshot))
}

#[derive(Debug, Deserialize)]
struct GrantRoleRequest {
    uid: String,
    role: String,
    notes: Option<String>,
}

/// Grant a role (SuperAdmin only)
async fn grant_role(
    State(ctx): State<AppContext>,
    auth: AdminActor,
    Json(req): Json<GrantRoleRequest>,
) -> AppResult<(StatusCode, Json<AdminRole>)> {
    auth.require(Role::SuperAdmin)?;

    let role = Role::parse(&req.role)?;
    let granted = ctx
        .roles
        .grant_role(&req.uid, role, &auth.uid, req.notes)
        .await?;

    let details = format!("role={}", role.as_str());
    if let Err(e) = ctx
        .roles
        .log_action(&auth.uid, "role.grant", Some(&req.uid), Some(&details))
        .await
    {
        tracing::warn!(admin_uid = %auth.uid, error = %e, "failed to write audit log entry");
    }

    Ok((StatusCode::CREATED, Json(granted)))
}

#[derive(Debug, Deserialize)]
struct RevokeRoleRequest {
    uid: String,
    reason: Option<String>,
}

/// Revoke a role (SuperAdmin only)
async fn revoke_role(
    State(ctx): State<AppContext>,
    auth: AdminActor,
    Json(req): Json<RevokeRoleRequest>,
) -> AppResult<StatusCode> {
    auth.require(Role::SuperAdmin)?;

    ctx.roles
        .revoke_role(&req.uid, &auth.uid, req.reason.clone())
        .await?;

    if let Err(e) = ctx
        .roles
        .log_action(&auth.uid, "role.revoke", Some(&req.uid), req.reason.as_deref())
        .await
    {
        tracing::warn!(admin_uid = %auth.uid, error = %e, "failed to write audit log entry");
    }

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Deserialize)]
struct AuditLogQuery {
    limit: Option<i64>,
}

async fn audit_log(
    State(ctx): State<AppContext>,
    _auth: AdminActor,
    Query(query): Query<AuditLogQuery>,
) -> AppResult<Json<Vec<AuditLogEntry>>> {
    let limit = query.limit.unwrap_or(50).clamp(1, 500);
    let entries = ctx.roles.recent_actions(limit).await?;
    Ok(Json(entries))
}
