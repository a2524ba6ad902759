//! Comment endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;

use super::{error, respond, success, warn_unsaved, ApiResult};
use crate::models::{Comment, CreateCommentRequest};
use crate::AppState;

/// GET /api/posts/:id/comments - Comments on a post, newest first.
pub async fn list_comments(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Vec<Comment>> {
    let session = state.session.lock().await;
    respond(session.comments_for(&id), session.revision())
}

/// POST /api/posts/:id/comments - Comment on a post as the current viewer.
pub async fn create_comment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<CreateCommentRequest>,
) -> ApiResult<Comment> {
    let (result, revision_id) = {
        let mut session = state.session.lock().await;
        let result = session.add_comment(&id, &request.content, Utc::now());
        (result, session.revision())
    };

    match result {
        Ok((comment, post)) => {
            let saved = state.source.save_comment(&post, &comment).await;
            warn_unsaved(&state, &post, saved);
            success(comment, revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}
