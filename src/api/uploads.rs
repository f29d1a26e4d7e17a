/// Receiving side of signed upload locations for the disk backend
use crate::{context::AppContext, error::AppResult};
use axum::{
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State},
    http::StatusCode,
    routing::put,
    Router,
};
use chrono::Utc;
use serde::Deserialize;

/// Largest accepted asset upload
const MAX_UPLOAD_BYTES: usize = 512 * 1024 * 1024;

pub fn routes() -> Router<AppContext> {
    Router::new()
        .route("/uploads/*path", put(receive_upload))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
}

#[derive(Debug, Deserialize)]
struct UploadQuery {
    expires: i64,
    signature: String,
}

async fn receive_upload(
    State(ctx): State<AppContext>,
    Path(path): Path<String>,
    Query(query): Query<UploadQuery>,
    body: Bytes,
) -> AppResult<StatusCode> {
    ctx.upload_signer
        .verify(&path, query.expires, &query.signature, Utc::now())?;

    let size = body.len();
    ctx.storage.put(&path, body.to_vec()).await?;

    tracing::debug!(path = %path, size, "stored uploaded object");

    Ok(StatusCode::CREATED)
}
