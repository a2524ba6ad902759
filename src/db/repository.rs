//! Post, vote and comment repository.
//!
//! Post writes are version-guarded upserts: a stored row is only replaced by
//! a post carrying a higher version.

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::{Row, SqliteConnection, SqlitePool};

use crate::errors::AppError;
use crate::models::{Category, Comment, EvidenceType, Post, Severity, ViewerVote, Vote};

/// Database repository for report data.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// List all posts, most recent first.
    pub async fn list_posts(&self) -> Result<Vec<Post>, AppError> {
        let rows = sqlx::query(
            "SELECT id, anonymous_id, content, category, severity, evidence_type, location, image_url, created_at, credible_votes, suspicious_votes, comment_count, version FROM posts ORDER BY created_at DESC"
        )
        .fetch_all(&self.pool)
        .await?;

        let mut posts = Vec::with_capacity(rows.len());
        for row in &rows {
            match post_from_row(row) {
                Ok(post) => posts.push(post),
                Err(e) => tracing::warn!("Skipping unreadable post row: {}", e),
            }
        }
        Ok(posts)
    }

    /// All held votes.
    pub async fn list_votes(&self) -> Result<Vec<ViewerVote>, AppError> {
        let rows = sqlx::query("SELECT post_id, anonymous_id, vote FROM votes")
            .fetch_all(&self.pool)
            .await?;

        let mut votes = Vec::with_capacity(rows.len());
        for row in &rows {
            let raw: String = row.get("vote");
            match Vote::parse(&raw) {
                Some(vote) => votes.push(ViewerVote {
                    post_id: row.get("post_id"),
                    anonymous_id: row.get("anonymous_id"),
                    vote,
                }),
                None => tracing::warn!("Skipping vote row with unknown vote '{}'", raw),
            }
        }
        Ok(votes)
    }

    /// All comments, newest first.
    pub async fn list_comments(&self) -> Result<Vec<Comment>, AppError> {
        let rows = sqlx::query(
            "SELECT id, post_id, anonymous_id, content, created_at FROM comments ORDER BY created_at DESC"
        )
        .fetch_all(&self.pool)
        .await?;

        let mut comments = Vec::with_capacity(rows.len());
        for row in &rows {
            match comment_from_row(row) {
                Ok(comment) => comments.push(comment),
                Err(e) => tracing::warn!("Skipping unreadable comment row: {}", e),
            }
        }
        Ok(comments)
    }

    /// Insert a post, or update the stored row if this copy is newer.
    ///
    /// Returns whether a row was written.
    pub async fn upsert_post(&self, post: &Post) -> Result<bool, AppError> {
        let mut conn = self.pool.acquire().await?;
        write_post(&mut *conn, post).await
    }

    /// Store the post after a vote toggle and `viewer`'s resulting vote in
    /// one transaction. The vote row is only touched when the post write
    /// wins the version check, so it always matches the stored counters.
    ///
    /// Returns whether anything was written.
    pub async fn record_vote(
        &self,
        post: &Post,
        viewer: &str,
        vote: Option<Vote>,
    ) -> Result<bool, AppError> {
        let mut tx = self.pool.begin().await?;

        if !write_post(&mut *tx, post).await? {
            return Ok(false);
        }

        match vote {
            Some(vote) => {
                sqlx::query(
                    r#"
                    INSERT INTO votes (post_id, anonymous_id, vote) VALUES (?, ?, ?)
                    ON CONFLICT(post_id, anonymous_id) DO UPDATE SET vote = excluded.vote
                    "#,
                )
                .bind(&post.id)
                .bind(viewer)
                .bind(vote.as_str())
                .execute(&mut *tx)
                .await?;
            }
            None => {
                sqlx::query("DELETE FROM votes WHERE post_id = ? AND anonymous_id = ?")
                    .bind(&post.id)
                    .bind(viewer)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;
        Ok(true)
    }

    /// Store a new comment and the post carrying its count in one
    /// transaction. Comments are append-only, so the comment row is written
    /// even when a newer copy of the post is already stored.
    pub async fn record_comment(&self, post: &Post, comment: &Comment) -> Result<(), AppError> {
        let mut tx = self.pool.begin().await?;

        write_post(&mut *tx, post).await?;

        sqlx::query(
            r#"
            INSERT INTO comments (id, post_id, anonymous_id, content, created_at)
            VALUES (?, ?, ?, ?, ?)
            ON CONFLICT(id) DO NOTHING
            "#,
        )
        .bind(&comment.id)
        .bind(&comment.post_id)
        .bind(&comment.anonymous_id)
        .bind(&comment.content)
        .bind(timestamp(&comment.created_at))
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }
}

/// Version-guarded upsert of one post row.
async fn write_post(conn: &mut SqliteConnection, post: &Post) -> Result<bool, AppError> {
    let result = sqlx::query(
        r#"
        INSERT INTO posts (id, anonymous_id, content, category, severity, evidence_type, location, image_url, created_at, credible_votes, suspicious_votes, comment_count, version)
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
        ON CONFLICT(id) DO UPDATE SET
            credible_votes = excluded.credible_votes,
            suspicious_votes = excluded.suspicious_votes,
            comment_count = excluded.comment_count,
            version = excluded.version
        WHERE excluded.version > posts.version
        "#,
    )
    .bind(&post.id)
    .bind(&post.anonymous_id)
    .bind(&post.content)
    .bind(post.category.as_str())
    .bind(post.severity.as_str())
    .bind(post.evidence_type.map(|e| e.as_str()))
    .bind(&post.location)
    .bind(&post.image_url)
    .bind(timestamp(&post.created_at))
    .bind(i64::from(post.credible_votes))
    .bind(i64::from(post.suspicious_votes))
    .bind(i64::from(post.comment_count))
    .bind(post.version)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

/// Fixed-width RFC 3339 so stored timestamps sort as text.
fn timestamp(at: &DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Micros, true)
}

// Helper functions for row conversion

fn post_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Post, AppError> {
    let id: String = row.get("id");
    let category: String = row.get("category");
    let severity: String = row.get("severity");
    let evidence_type: Option<String> = row.get("evidence_type");
    let created_at: String = row.get("created_at");

    let category = Category::parse(&category)
        .ok_or_else(|| AppError::Database(format!("Post {} has unknown category '{}'", id, category)))?;
    let severity = Severity::parse(&severity)
        .ok_or_else(|| AppError::Database(format!("Post {} has unknown severity '{}'", id, severity)))?;
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| AppError::Database(format!("Post {} has bad timestamp: {}", id, e)))?
        .with_timezone(&Utc);

    Ok(Post {
        anonymous_id: row.get("anonymous_id"),
        content: row.get("content"),
        category,
        severity,
        evidence_type: evidence_type.as_deref().and_then(EvidenceType::parse),
        location: row.get("location"),
        image_url: row.get("image_url"),
        created_at,
        credible_votes: counter(row, &id, "credible_votes")?,
        suspicious_votes: counter(row, &id, "suspicious_votes")?,
        comment_count: counter(row, &id, "comment_count")?,
        version: row.get("version"),
        id,
    })
}

fn counter(row: &sqlx::sqlite::SqliteRow, id: &str, column: &str) -> Result<u32, AppError> {
    let value: i64 = row.get(column);
    u32::try_from(value)
        .map_err(|_| AppError::Database(format!("Post {} has out-of-range {} {}", id, column, value)))
}

fn comment_from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Comment, AppError> {
    let id: String = row.get("id");
    let created_at: String = row.get("created_at");
    let created_at = DateTime::parse_from_rfc3339(&created_at)
        .map_err(|e| AppError::Database(format!("Comment {} has bad timestamp: {}", id, e)))?
        .with_timezone(&Utc);

    Ok(Comment {
        post_id: row.get("post_id"),
        anonymous_id: row.get("anonymous_id"),
        content: row.get("content"),
        created_at,
        id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use tempfile::TempDir;

    async fn insert_raw(pool: &SqlitePool, id: &str, credible_votes: i64) {
        sqlx::query(
            "INSERT INTO posts (id, anonymous_id, content, category, severity, created_at, credible_votes) VALUES (?, 'Anon_AAAAAA', 'x', 'fraud', 'low', '2024-01-01T00:00:00.000000Z', ?)",
        )
        .bind(id)
        .bind(credible_votes)
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_out_of_range_counter_skips_row() {
        let dir = TempDir::new().unwrap();
        let pool = init_database(&dir.path().join("repo.sqlite")).await.unwrap();
        insert_raw(&pool, "negative", -1).await;
        insert_raw(&pool, "too-big", i64::from(u32::MAX) + 1).await;
        insert_raw(&pool, "fine", 4).await;

        let posts = Repository::new(pool).list_posts().await.unwrap();
        assert_eq!(posts.len(), 1);
        assert_eq!(posts[0].id, "fine");
        assert_eq!(posts[0].credible_votes, 4);
    }

    #[test]
    fn test_timestamps_sort_as_text() {
        let early = DateTime::parse_from_rfc3339("2024-01-01T00:00:00Z").unwrap().with_timezone(&Utc);
        let late = early + chrono::Duration::microseconds(1500);
        assert!(timestamp(&early) < timestamp(&late));
        assert_eq!(timestamp(&early), "2024-01-01T00:00:00.000000Z");
    }
}
