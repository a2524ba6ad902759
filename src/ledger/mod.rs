//! Post/vote ledger.
//!
//! Holds submitted reports most-recent-first together with each viewer's
//! vote on each post. Vote counters are recomputed synchronously on every
//! toggle; a viewer holds at most one of credible or suspicious per post.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::{Post, PostDraft, PostFilter, SortOrder, ViewerVote, Vote, VoteState};

/// In-memory collection of posts and per-viewer votes.
#[derive(Debug, Default)]
pub struct PostLedger {
    /// Head is the most recently inserted post.
    posts: Vec<Post>,
    /// (post id, viewer pseudonym) -> vote held.
    votes: HashMap<(String, String), Vote>,
    revision: i64,
}

impl PostLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with posts and held votes loaded from a data
    /// source. The loaded counters already include the loaded votes.
    pub fn seed(&mut self, mut posts: Vec<Post>, votes: Vec<ViewerVote>) {
        posts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        self.posts = posts;
        self.votes.clear();
        for held in votes {
            if self.get(&held.post_id).is_none() {
                tracing::debug!(post_id = %held.post_id, "Dropping vote on unknown post");
                continue;
            }
            self.votes.insert((held.post_id, held.anonymous_id), held.vote);
        }
        self.revision += 1;
    }

    /// Monotonic counter bumped on every mutation.
    pub fn revision(&self) -> i64 {
        self.revision
    }

    pub fn get(&self, post_id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == post_id)
    }

    /// Validate a draft and prepend it as a new post authored by `author`.
    pub fn create_post(
        &mut self,
        draft: PostDraft,
        author: &str,
        now: DateTime<Utc>,
    ) -> Result<Post, AppError> {
        let content = draft.content.trim();
        if content.is_empty() {
            return Err(AppError::Validation("Report content is required".to_string()));
        }

        let post = Post {
            id: uuid::Uuid::new_v4().to_string(),
            anonymous_id: author.to_string(),
            content: content.to_string(),
            category: draft.category,
            severity: draft.severity,
            evidence_type: draft.evidence_type,
            location: non_blank(draft.location),
            image_url: non_blank(draft.image_url),
            created_at: now,
            credible_votes: 0,
            suspicious_votes: 0,
            comment_count: 0,
            version: 1,
        };

        self.posts.insert(0, post.clone());
        self.revision += 1;
        Ok(post)
    }

    /// Toggle `viewer`'s vote on a post.
    ///
    /// Casting the vote already held clears it; casting the other one moves
    /// the count across.
    pub fn toggle_vote(
        &mut self,
        post_id: &str,
        viewer: &str,
        vote: Vote,
    ) -> Result<(Post, VoteState), AppError> {
        let post = self
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;

        let key = (post_id.to_string(), viewer.to_string());
        let previous = self.votes.get(&key).copied();

        if let Some(old) = previous {
            match old {
                Vote::Credible => post.credible_votes = post.credible_votes.saturating_sub(1),
                Vote::Suspicious => post.suspicious_votes = post.suspicious_votes.saturating_sub(1),
            }
        }

        let current = if previous == Some(vote) {
            self.votes.remove(&key);
            None
        } else {
            match vote {
                Vote::Credible => post.credible_votes += 1,
                Vote::Suspicious => post.suspicious_votes += 1,
            }
            self.votes.insert(key, vote);
            Some(vote)
        };

        post.version += 1;
        let post = post.clone();
        self.revision += 1;

        Ok((
            post,
            VoteState {
                post_id: post_id.to_string(),
                current_vote: current,
            },
        ))
    }

    /// The vote `viewer` currently holds on a post.
    pub fn vote_state(&self, post_id: &str, viewer: &str) -> Result<VoteState, AppError> {
        if self.get(post_id).is_none() {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }
        let current_vote = self
            .votes
            .get(&(post_id.to_string(), viewer.to_string()))
            .copied();
        Ok(VoteState {
            post_id: post_id.to_string(),
            current_vote,
        })
    }

    /// Count one more comment on a post.
    pub fn record_comment(&mut self, post_id: &str) -> Result<Post, AppError> {
        let post = self
            .posts
            .iter_mut()
            .find(|p| p.id == post_id)
            .ok_or_else(|| AppError::NotFound(format!("Post {} not found", post_id)))?;
        post.comment_count += 1;
        post.version += 1;
        let post = post.clone();
        self.revision += 1;
        Ok(post)
    }

    /// Filtered, ordered view of the feed.
    pub fn list(&self, filter: PostFilter, sort: SortOrder) -> Vec<Post> {
        let mut result: Vec<Post> = self
            .posts
            .iter()
            .filter(|p| filter.matches(p))
            .cloned()
            .collect();

        match sort {
            SortOrder::Recent => result.sort_by(|a, b| {
                b.created_at
                    .cmp(&a.created_at)
                    .then_with(|| a.id.cmp(&b.id))
            }),
            SortOrder::Trending => result.sort_by(|a, b| {
                b.engagement()
                    .cmp(&a.engagement())
                    .then_with(|| b.created_at.cmp(&a.created_at))
                    .then_with(|| a.id.cmp(&b.id))
            }),
        }

        result
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
