//! Pluggable origin of the report feed.
//!
//! The ledger is always the working copy; a source only supplies the initial
//! feed and receives best-effort write-through of changes. A source that
//! keeps post counters also keeps the votes and comments behind them, so a
//! reloaded feed never counts one viewer twice.

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{Category, Comment, EvidenceType, Post, Severity, ViewerVote, Vote};

/// Everything a source hands the session at startup.
#[derive(Debug, Default)]
pub struct Feed {
    pub posts: Vec<Post>,
    pub votes: Vec<ViewerVote>,
    pub comments: Vec<Comment>,
}

#[async_trait]
pub trait PostSource: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    async fn load_feed(&self) -> Result<Feed, AppError>;

    /// Store a new or changed post.
    async fn save_post(&self, post: &Post) -> Result<(), AppError>;

    /// Store a post after a vote toggle together with `viewer`'s resulting
    /// vote; `None` means the viewer holds no vote.
    async fn save_vote(&self, post: &Post, viewer: &str, vote: Option<Vote>) -> Result<(), AppError>;

    /// Store a new comment together with the post it was counted on.
    async fn save_comment(&self, post: &Post, comment: &Comment) -> Result<(), AppError>;
}

/// Static demo feed. Saves are discarded.
#[derive(Debug, Default, Clone)]
pub struct FixtureSource;

#[async_trait]
impl PostSource for FixtureSource {
    fn name(&self) -> &'static str {
        "fixtures"
    }

    async fn load_feed(&self) -> Result<Feed, AppError> {
        Ok(Feed {
            posts: fixture_posts(Utc::now()),
            ..Feed::default()
        })
    }

    async fn save_post(&self, _post: &Post) -> Result<(), AppError> {
        Ok(())
    }

    async fn save_vote(&self, _post: &Post, _viewer: &str, _vote: Option<Vote>) -> Result<(), AppError> {
        Ok(())
    }

    async fn save_comment(&self, _post: &Post, _comment: &Comment) -> Result<(), AppError> {
        Ok(())
    }
}

/// Feed persisted in the SQLite repository.
#[derive(Clone)]
pub struct SqliteSource {
    repo: Repository,
}

impl SqliteSource {
    pub fn new(repo: Repository) -> Self {
        Self { repo }
    }
}

#[async_trait]
impl PostSource for SqliteSource {
    fn name(&self) -> &'static str {
        "sqlite"
    }

    async fn load_feed(&self) -> Result<Feed, AppError> {
        Ok(Feed {
            posts: self.repo.list_posts().await?,
            votes: self.repo.list_votes().await?,
            comments: self.repo.list_comments().await?,
        })
    }

    async fn save_post(&self, post: &Post) -> Result<(), AppError> {
        if !self.repo.upsert_post(post).await? {
            tracing::debug!(post_id = %post.id, version = post.version, "Stored post is newer, skipped write");
        }
        Ok(())
    }

    async fn save_vote(&self, post: &Post, viewer: &str, vote: Option<Vote>) -> Result<(), AppError> {
        if !self.repo.record_vote(post, viewer, vote).await? {
            tracing::debug!(post_id = %post.id, version = post.version, "Stored post is newer, skipped vote write");
        }
        Ok(())
    }

    async fn save_comment(&self, post: &Post, comment: &Comment) -> Result<(), AppError> {
        self.repo.record_comment(post, comment).await
    }
}

/// The demo reports, timestamped relative to `now`.
pub fn fixture_posts(now: DateTime<Utc>) -> Vec<Post> {
    let fixture = |anonymous_id: &str,
                   content: &str,
                   category: Category,
                   severity: Severity,
                   evidence_type: Option<EvidenceType>,
                   location: Option<&str>,
                   hours_ago: i64,
                   votes: (u32, u32),
                   comment_count: u32| Post {
        id: uuid::Uuid::new_v4().to_string(),
        anonymous_id: anonymous_id.to_string(),
        content: content.to_string(),
        category,
        severity,
        evidence_type,
        location: location.map(str::to_string),
        image_url: None,
        created_at: now - Duration::hours(hours_ago),
        credible_votes: votes.0,
        suspicious_votes: votes.1,
        comment_count,
        version: 1,
    };

    let mut posts = vec![
        fixture(
            "Anon_X7K2M9",
            "Witnessed fraudulent billing practices at the municipal water department. Citizens are being charged for services not rendered. Have documented evidence spanning 3 months.",
            Category::Fraud,
            Severity::High,
            Some(EvidenceType::Document),
            Some("Metro District"),
            2,
            (47, 3),
            12,
        ),
        fixture(
            "Anon_P3F8N1",
            "Road construction materials being diverted from public project. Contractors using substandard materials while billing for premium. Infrastructure safety concern.",
            Category::Corruption,
            Severity::Critical,
            Some(EvidenceType::Photo),
            Some("Highway 47 Section"),
            5,
            (89, 7),
            34,
        ),
        fixture(
            "Anon_Q9T4L6",
            "Hospital emergency response times have increased significantly. Ambulances taking 40+ minutes for critical cases. Lives at risk.",
            Category::Healthcare,
            Severity::Critical,
            Some(EvidenceType::Witness),
            Some("Central Hospital"),
            8,
            (124, 11),
            56,
        ),
        fixture(
            "Anon_W2R7H5",
            "Street lights in residential area have been non-functional for 6 months despite multiple complaints. Safety hazard for pedestrians.",
            Category::Infrastructure,
            Severity::Medium,
            None,
            Some("Riverside Colony"),
            12,
            (31, 2),
            8,
        ),
        fixture(
            "Anon_K8M3V2",
            "Public tender process manipulated. Same company winning all contracts with suspiciously similar bid amounts. Pattern suggests coordination.",
            Category::Governance,
            Severity::High,
            Some(EvidenceType::Document),
            None,
            24,
            (67, 15),
            23,
        ),
    ];
    posts[1].image_url = Some(
        "https://images.unsplash.com/photo-1504307651254-35680f356dfd?w=800&q=80".to_string(),
    );
    posts
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::is_valid_pseudonym;
    use tempfile::TempDir;

    #[test]
    fn test_fixture_posts_are_well_formed() {
        let now = Utc::now();
        let posts = fixture_posts(now);
        assert_eq!(posts.len(), 5);
        for post in &posts {
            assert!(is_valid_pseudonym(&post.anonymous_id));
            assert!(post.created_at < now);
            assert!(!post.content.trim().is_empty());
        }
        assert!(posts.windows(2).all(|w| w[0].created_at > w[1].created_at));
    }

    #[tokio::test]
    async fn test_sqlite_source_round_trip_keeps_newest_version() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("feed.sqlite")).await.unwrap();
        let source = SqliteSource::new(Repository::new(pool));

        let mut post = fixture_posts(Utc::now()).remove(0);
        source.save_post(&post).await.unwrap();

        post.credible_votes += 1;
        post.version = 2;
        source.save_post(&post).await.unwrap();

        let mut stale = post.clone();
        stale.credible_votes = 0;
        stale.version = 1;
        source.save_post(&stale).await.unwrap();

        let loaded = source.load_feed().await.unwrap().posts;
        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded[0].credible_votes, 48);
        assert_eq!(loaded[0].version, 2);
        assert_eq!(loaded[0].created_at.timestamp(), post.created_at.timestamp());
        assert_eq!(loaded[0].location.as_deref(), Some("Metro District"));
        assert_eq!(loaded[0].evidence_type, Some(EvidenceType::Document));
    }

    #[tokio::test]
    async fn test_sqlite_source_keeps_votes_behind_counters() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("feed.sqlite")).await.unwrap();
        let source = SqliteSource::new(Repository::new(pool));

        let mut post = fixture_posts(Utc::now()).remove(0);
        source.save_post(&post).await.unwrap();

        post.credible_votes += 1;
        post.version = 2;
        source.save_vote(&post, "Anon_VOTER1", Some(Vote::Credible)).await.unwrap();

        // A stale toggle must not leave its vote row behind.
        let mut stale = post.clone();
        stale.credible_votes -= 1;
        stale.version = 1;
        source.save_vote(&stale, "Anon_VOTER1", None).await.unwrap();

        let feed = source.load_feed().await.unwrap();
        assert_eq!(feed.posts[0].credible_votes, 48);
        assert_eq!(
            feed.votes,
            vec![ViewerVote {
                post_id: post.id.clone(),
                anonymous_id: "Anon_VOTER1".to_string(),
                vote: Vote::Credible,
            }]
        );

        post.credible_votes -= 1;
        post.version = 3;
        source.save_vote(&post, "Anon_VOTER1", None).await.unwrap();
        let feed = source.load_feed().await.unwrap();
        assert!(feed.votes.is_empty());
        assert_eq!(feed.posts[0].credible_votes, 47);
    }

    #[tokio::test]
    async fn test_sqlite_source_keeps_comments_behind_count() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("feed.sqlite")).await.unwrap();
        let source = SqliteSource::new(Repository::new(pool));

        let mut post = fixture_posts(Utc::now()).remove(0);
        source.save_post(&post).await.unwrap();

        post.comment_count += 1;
        post.version = 2;
        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            post_id: post.id.clone(),
            anonymous_id: "Anon_WRITER".to_string(),
            content: "Same billing problem on our street".to_string(),
            created_at: Utc::now(),
        };
        source.save_comment(&post, &comment).await.unwrap();

        let feed = source.load_feed().await.unwrap();
        assert_eq!(feed.posts[0].comment_count, 13);
        assert_eq!(feed.comments.len(), 1);
        assert_eq!(feed.comments[0].id, comment.id);
        assert_eq!(feed.comments[0].content, comment.content);
        assert_eq!(feed.comments[0].created_at.timestamp(), comment.created_at.timestamp());
    }
}
