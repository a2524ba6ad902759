//! Topic following endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;

use super::{error, respond, success, ApiResult};
use crate::errors::AppError;
use crate::models::{FollowTopicRequest, FollowedTopic, TopicType};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct FollowResponse {
    pub topic: FollowedTopic,
    /// False when the topic was already followed.
    pub added: bool,
}

#[derive(Debug, Serialize)]
pub struct UnfollowResponse {
    pub removed: bool,
}

/// GET /api/topics - Followed topics.
pub async fn list_topics(State(state): State<AppState>) -> ApiResult<Vec<FollowedTopic>> {
    let session = state.session.lock().await;
    success(session.following().topics().to_vec(), session.revision())
}

/// POST /api/topics - Follow a topic.
pub async fn follow_topic(
    State(state): State<AppState>,
    Json(request): Json<FollowTopicRequest>,
) -> ApiResult<FollowResponse> {
    let mut session = state.session.lock().await;
    let revision_id = session.revision();
    let result = session
        .following_mut()
        .follow(request)
        .map(|(topic, added)| FollowResponse { topic, added });
    respond(result, revision_id)
}

/// DELETE /api/topics/:type/:value - Stop following a topic.
pub async fn unfollow_topic(
    State(state): State<AppState>,
    Path((topic_type, value)): Path<(String, String)>,
) -> ApiResult<UnfollowResponse> {
    let mut session = state.session.lock().await;
    let revision_id = session.revision();

    let Some(topic_type) = TopicType::parse(&topic_type) else {
        return error(
            AppError::BadRequest(format!("Unknown topic type '{}'", topic_type)),
            revision_id,
        );
    };

    let removed = session.following_mut().unfollow(topic_type, &value);
    success(UnfollowResponse { removed }, revision_id)
}
