//! REST API module.
//!
//! Every response carries the ledger revision so the client can tell whether
//! its copy of the feed is stale.

mod alerts;
mod comments;
mod identity;
mod posts;
mod topics;

pub use alerts::*;
pub use comments::*;
pub use identity::*;
pub use posts::*;
pub use topics::*;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::errors::{AppError, AppErrorWithRevision};
use crate::models::Post;
use crate::AppState;

/// Success response envelope.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiResponse<T: Serialize> {
    pub success: bool,
    pub data: T,
    pub revision_id: i64,
}

impl<T: Serialize> ApiResponse<T> {
    pub fn new(data: T, revision_id: i64) -> Self {
        Self {
            success: true,
            data,
            revision_id,
        }
    }
}

impl<T: Serialize> IntoResponse for ApiResponse<T> {
    fn into_response(self) -> Response {
        (StatusCode::OK, Json(self)).into_response()
    }
}

/// Response type that can be either success or error.
pub type ApiResult<T> = Result<ApiResponse<T>, AppErrorWithRevision>;

/// Create a successful API response.
pub fn success<T: Serialize>(data: T, revision_id: i64) -> ApiResult<T> {
    Ok(ApiResponse::new(data, revision_id))
}

/// Create an error API response.
pub fn error<T: Serialize>(err: AppError, revision_id: i64) -> ApiResult<T> {
    Err(AppErrorWithRevision {
        error: err,
        revision_id,
    })
}

/// Wrap an operation result in the matching envelope.
pub fn respond<T: Serialize>(result: Result<T, AppError>, revision_id: i64) -> ApiResult<T> {
    match result {
        Ok(data) => success(data, revision_id),
        Err(e) => error(e, revision_id),
    }
}

/// Best-effort write of a changed post to the configured source.
async fn write_through(state: &AppState, post: &Post) {
    let saved = state.source.save_post(post).await;
    warn_unsaved(state, post, saved);
}

/// Log a failed source write; the in-memory change stands either way.
fn warn_unsaved(state: &AppState, post: &Post, saved: Result<(), AppError>) {
    if let Err(e) = saved {
        tracing::warn!(
            "Failed to save post {} to {} source: {}",
            post.id,
            state.source.name(),
            e
        );
    }
}
