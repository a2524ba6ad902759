//! Report feed and voting endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use super::{error, respond, success, warn_unsaved, write_through, ApiResult};
use crate::alerts::matches_followed;
use crate::errors::AppError;
use crate::models::{
    Category, ListPostsQuery, Post, PostDraft, PostFilter, Severity, SortOrder, VoteRequest,
    VoteState,
};
use crate::session::SubmittedReport;
use crate::AppState;

/// Post after a vote toggle together with the viewer's resulting vote.
#[derive(Debug, Serialize)]
pub struct VoteResponse {
    pub post: Post,
    pub vote: VoteState,
}

/// Turn the raw query string into a filter and sort order.
pub fn parse_list_query(query: &ListPostsQuery) -> Result<(PostFilter, SortOrder), AppError> {
    fn present(value: &Option<String>) -> Option<&str> {
        value.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    let category = present(&query.category)
        .map(|c| {
            Category::parse(c).ok_or_else(|| AppError::BadRequest(format!("Unknown category '{}'", c)))
        })
        .transpose()?;
    let severity = present(&query.severity)
        .map(|s| {
            Severity::parse(s).ok_or_else(|| AppError::BadRequest(format!("Unknown severity '{}'", s)))
        })
        .transpose()?;
    let sort = present(&query.sort)
        .map(|s| {
            SortOrder::parse(s).ok_or_else(|| AppError::BadRequest(format!("Unknown sort '{}'", s)))
        })
        .transpose()?
        .unwrap_or_default();

    Ok((PostFilter { category, severity }, sort))
}

/// GET /api/posts - List the feed.
pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<ListPostsQuery>,
) -> ApiResult<Vec<Post>> {
    let session = state.session.lock().await;
    let revision_id = session.revision();

    let (filter, sort) = match parse_list_query(&query) {
        Ok(parsed) => parsed,
        Err(e) => return error(e, revision_id),
    };

    let mut posts = session.ledger().list(filter, sort);
    if query.followed.unwrap_or(false) {
        let topics = session.following().topics();
        posts.retain(|p| matches_followed(p, topics));
    }
    success(posts, revision_id)
}

/// GET /api/posts/:id - Get a single post.
pub async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Post> {
    let session = state.session.lock().await;
    let revision_id = session.revision();

    match session.ledger().get(&id) {
        Some(post) => success(post.clone(), revision_id),
        None => error(
            AppError::NotFound(format!("Post {} not found", id)),
            revision_id,
        ),
    }
}

/// POST /api/posts - Submit a report.
pub async fn create_post(
    State(state): State<AppState>,
    Json(draft): Json<PostDraft>,
) -> ApiResult<SubmittedReport> {
    let (result, revision_id) = {
        let mut session = state.session.lock().await;
        let result = session.submit_report(draft, Utc::now());
        (result, session.revision())
    };

    match result {
        Ok(report) => {
            tracing::info!(post_id = %report.post.id, category = report.post.category.as_str(), "Report submitted");
            write_through(&state, &report.post).await;
            success(report, revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}

/// GET /api/posts/:id/vote - The current viewer's vote on a post.
pub async fn get_vote(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<VoteState> {
    let mut session = state.session.lock().await;
    let revision_id = session.revision();
    respond(session.vote_state(&id), revision_id)
}

/// POST /api/posts/:id/vote - Toggle the current viewer's vote.
pub async fn toggle_vote(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<VoteRequest>,
) -> ApiResult<VoteResponse> {
    let (result, viewer, revision_id) = {
        let mut session = state.session.lock().await;
        let viewer = session.pseudonym();
        let result = session.toggle_vote(&id, request.vote);
        (result, viewer, session.revision())
    };

    match result {
        Ok((post, vote)) => {
            let saved = state.source.save_vote(&post, &viewer, vote.current_vote).await;
            warn_unsaved(&state, &post, saved);
            success(VoteResponse { post, vote }, revision_id)
        }
        Err(e) => error(e, revision_id),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(category: Option<&str>, severity: Option<&str>, sort: Option<&str>) -> ListPostsQuery {
        ListPostsQuery {
            category: category.map(str::to_string),
            severity: severity.map(str::to_string),
            sort: sort.map(str::to_string),
            followed: None,
        }
    }

    #[test]
    fn test_parse_list_query_defaults() {
        let (filter, sort) = parse_list_query(&query(None, Some(""), None)).unwrap();
        assert_eq!(filter, PostFilter::default());
        assert_eq!(sort, SortOrder::Recent);
    }

    #[test]
    fn test_parse_list_query_values() {
        let (filter, sort) =
            parse_list_query(&query(Some("fraud"), Some("critical"), Some("trending"))).unwrap();
        assert_eq!(filter.category, Some(Category::Fraud));
        assert_eq!(filter.severity, Some(Severity::Critical));
        assert_eq!(sort, SortOrder::Trending);
    }

    #[test]
    fn test_parse_list_query_rejects_unknown() {
        assert!(matches!(
            parse_list_query(&query(Some("weather"), None, None)),
            Err(AppError::BadRequest(_))
        ));
        assert!(matches!(
            parse_list_query(&query(None, None, Some("oldest"))),
            Err(AppError::BadRequest(_))
        ));
    }
}
