//! One viewer's session.
//!
//! Wires the identity provider into the ledger, following set, inbox and
//! comments so every write is attributed to the current pseudonym. The API
//! holds the session behind a single mutex, so writes are serialized.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::alerts::{on_post_created_or_updated, AlertInbox, TopicFollowing};
use crate::comments::CommentBook;
use crate::errors::AppError;
use crate::identity::IdentityProvider;
use crate::ledger::PostLedger;
use crate::models::{Alert, Comment, Post, PostDraft, PublicIdentity, Vote, VoteState};
use crate::source::Feed;

/// Result of submitting a report.
#[derive(Debug, Clone, Serialize)]
pub struct SubmittedReport {
    pub post: Post,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alert: Option<Alert>,
}

pub struct Session {
    identity: IdentityProvider,
    ledger: PostLedger,
    following: TopicFollowing,
    inbox: AlertInbox,
    comments: CommentBook,
}

impl Session {
    pub fn new(identity: IdentityProvider) -> Self {
        Self {
            identity,
            ledger: PostLedger::new(),
            following: TopicFollowing::new(),
            inbox: AlertInbox::new(),
            comments: CommentBook::new(),
        }
    }

    /// Session over a feed loaded from a data source.
    pub fn from_feed(identity: IdentityProvider, feed: Feed) -> Self {
        let mut session = Self::new(identity);
        session.ledger.seed(feed.posts, feed.votes);
        session.comments.seed(feed.comments);
        session
    }

    pub fn revision(&self) -> i64 {
        self.ledger.revision()
    }

    pub fn ledger(&self) -> &PostLedger {
        &self.ledger
    }

    pub fn following(&self) -> &TopicFollowing {
        &self.following
    }

    pub fn following_mut(&mut self) -> &mut TopicFollowing {
        &mut self.following
    }

    pub fn inbox(&self) -> &AlertInbox {
        &self.inbox
    }

    pub fn inbox_mut(&mut self) -> &mut AlertInbox {
        &mut self.inbox
    }

    /// Pseudonym of the current identity, creating one if needed.
    pub fn pseudonym(&mut self) -> String {
        self.identity.get_or_create_identity().id
    }

    pub fn public_identity(&mut self) -> PublicIdentity {
        self.identity.get_or_create_identity().public()
    }

    /// Drop the current identity and return its replacement.
    ///
    /// Content authored so far keeps the old pseudonym.
    pub fn rotate_identity(&mut self) -> PublicIdentity {
        self.identity.clear_identity();
        self.public_identity()
    }

    /// Create a post as the current identity and raise an alert if it
    /// matches a followed topic.
    pub fn submit_report(
        &mut self,
        draft: PostDraft,
        now: DateTime<Utc>,
    ) -> Result<SubmittedReport, AppError> {
        let author = self.pseudonym();
        let post = self.ledger.create_post(draft, &author, now)?;

        let alert = on_post_created_or_updated(&post, self.following.topics(), now);
        if let Some(alert) = &alert {
            tracing::debug!(post_id = %post.id, alert_id = %alert.id, "Report matched a followed topic");
            self.inbox.push(alert.clone());
        }

        Ok(SubmittedReport { post, alert })
    }

    pub fn toggle_vote(&mut self, post_id: &str, vote: Vote) -> Result<(Post, VoteState), AppError> {
        let viewer = self.pseudonym();
        self.ledger.toggle_vote(post_id, &viewer, vote)
    }

    pub fn vote_state(&mut self, post_id: &str) -> Result<VoteState, AppError> {
        let viewer = self.pseudonym();
        self.ledger.vote_state(post_id, &viewer)
    }

    pub fn comments_for(&self, post_id: &str) -> Result<Vec<Comment>, AppError> {
        if self.ledger.get(post_id).is_none() {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }
        Ok(self.comments.comments_for(post_id))
    }

    /// Add a comment as the current identity; returns it with the updated post.
    pub fn add_comment(
        &mut self,
        post_id: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<(Comment, Post), AppError> {
        if self.ledger.get(post_id).is_none() {
            return Err(AppError::NotFound(format!("Post {} not found", post_id)));
        }
        let author = self.pseudonym();
        let comment = self.comments.add_comment(post_id, &author, content, now)?;
        let post = self.ledger.record_comment(post_id)?;
        Ok((comment, post))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::{KeyValueStore, MemoryStore, SESSION_KEY};
    use crate::models::{
        AnonymousIdentity, Category, FollowTopicRequest, Severity, TopicType, ViewerVote,
    };

    fn draft(category: Category, location: Option<&str>) -> PostDraft {
        PostDraft {
            content: "Street lights out for six months".to_string(),
            category,
            severity: Severity::Medium,
            evidence_type: None,
            location: location.map(str::to_string),
            image_url: None,
        }
    }

    #[test]
    fn test_report_is_stamped_with_current_pseudonym() {
        let mut session = Session::new(IdentityProvider::in_memory());
        let pseudonym = session.pseudonym();
        let report = session
            .submit_report(draft(Category::Infrastructure, None), Utc::now())
            .unwrap();
        assert_eq!(report.post.anonymous_id, pseudonym);
        assert!(report.alert.is_none());
        assert!(session.inbox().alerts().is_empty());
    }

    #[test]
    fn test_matching_report_lands_in_inbox() {
        let mut session = Session::new(IdentityProvider::in_memory());
        session
            .following_mut()
            .follow(FollowTopicRequest {
                topic_type: TopicType::Location,
                value: "Riverside Colony".to_string(),
                label: None,
            })
            .unwrap();

        let report = session
            .submit_report(
                draft(Category::Infrastructure, Some("riverside colony")),
                Utc::now(),
            )
            .unwrap();

        let alert = report.alert.unwrap();
        assert_eq!(alert.incident_id.as_deref(), Some(report.post.id.as_str()));
        assert_eq!(session.inbox().unread_count(), 1);
    }

    #[test]
    fn test_rotated_identity_votes_afresh() {
        let mut session = Session::new(IdentityProvider::in_memory());
        let report = session
            .submit_report(draft(Category::Fraud, None), Utc::now())
            .unwrap();
        let old_author = report.post.anonymous_id.clone();

        session.toggle_vote(&report.post.id, Vote::Credible).unwrap();
        let new_identity = session.rotate_identity();
        assert_ne!(new_identity.id, old_author);

        assert_eq!(session.vote_state(&report.post.id).unwrap().current_vote, None);
        let (post, _) = session.toggle_vote(&report.post.id, Vote::Credible).unwrap();
        assert_eq!(post.credible_votes, 2);
        assert_eq!(post.anonymous_id, old_author);
    }

    #[test]
    fn test_loaded_feed_restores_viewer_state() {
        let mut earlier = Session::new(IdentityProvider::in_memory());
        let report = earlier
            .submit_report(draft(Category::Fraud, None), Utc::now())
            .unwrap();
        let viewer = earlier.pseudonym();
        earlier.toggle_vote(&report.post.id, Vote::Credible).unwrap();
        let (comment, post) = earlier
            .add_comment(&report.post.id, "Seen it too", Utc::now())
            .unwrap();
        assert_eq!(post.credible_votes, 1);

        let feed = Feed {
            posts: vec![post.clone()],
            votes: vec![ViewerVote {
                post_id: post.id.clone(),
                anonymous_id: viewer.clone(),
                vote: Vote::Credible,
            }],
            comments: vec![comment.clone()],
        };

        let identity = AnonymousIdentity {
            id: viewer.clone(),
            token: "ab".repeat(32),
        };
        let mut store = MemoryStore::new();
        store
            .set(SESSION_KEY, &serde_json::to_string(&identity).unwrap())
            .unwrap();

        let mut session = Session::from_feed(IdentityProvider::new(store), feed);
        assert_eq!(session.pseudonym(), viewer);
        assert_eq!(
            session.vote_state(&post.id).unwrap().current_vote,
            Some(Vote::Credible)
        );
        assert_eq!(session.comments_for(&post.id).unwrap(), vec![comment]);

        let (post, _) = session.toggle_vote(&post.id, Vote::Credible).unwrap();
        assert_eq!(post.credible_votes, 0);
    }

    #[test]
    fn test_comment_updates_count() {
        let mut session = Session::new(IdentityProvider::in_memory());
        let report = session
            .submit_report(draft(Category::Fraud, None), Utc::now())
            .unwrap();

        let (comment, post) = session
            .add_comment(&report.post.id, "I saw this too", Utc::now())
            .unwrap();
        assert_eq!(post.comment_count, 1);
        assert_eq!(comment.anonymous_id, report.post.anonymous_id);
        assert_eq!(session.comments_for(&report.post.id).unwrap().len(), 1);

        assert!(matches!(
            session.add_comment("missing", "hello", Utc::now()),
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            session.add_comment(&report.post.id, "", Utc::now()),
            Err(AppError::Validation(_))
        ));
        assert_eq!(session.ledger().get(&report.post.id).unwrap().comment_count, 1);
    }
}
