//! Anonymous comments on reports.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::{Comment, MAX_COMMENT_CHARS};

/// Comments grouped by post, newest first within each post.
#[derive(Debug, Default)]
pub struct CommentBook {
    by_post: HashMap<String, Vec<Comment>>,
}

impl CommentBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the contents with comments loaded from a data source.
    pub fn seed(&mut self, comments: Vec<Comment>) {
        self.by_post.clear();
        for comment in comments {
            self.by_post
                .entry(comment.post_id.clone())
                .or_default()
                .push(comment);
        }
        for thread in self.by_post.values_mut() {
            thread.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        }
    }

    /// Validate and store a comment. The caller checks the post exists.
    pub fn add_comment(
        &mut self,
        post_id: &str,
        author: &str,
        content: &str,
        now: DateTime<Utc>,
    ) -> Result<Comment, AppError> {
        let content = validate_content(content)?;

        let comment = Comment {
            id: uuid::Uuid::new_v4().to_string(),
            post_id: post_id.to_string(),
            anonymous_id: author.to_string(),
            content: content.to_string(),
            created_at: now,
        };

        self.by_post
            .entry(post_id.to_string())
            .or_default()
            .insert(0, comment.clone());
        Ok(comment)
    }

    pub fn comments_for(&self, post_id: &str) -> Vec<Comment> {
        self.by_post.get(post_id).cloned().unwrap_or_default()
    }
}

/// Trimmed content, non-empty and at most [`MAX_COMMENT_CHARS`] characters.
pub fn validate_content(content: &str) -> Result<&str, AppError> {
    let content = content.trim();
    if content.is_empty() {
        return Err(AppError::Validation("Please enter a comment".to_string()));
    }
    if content.chars().count() > MAX_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "Comment must be at most {} characters",
            MAX_COMMENT_CHARS
        )));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_are_newest_first() {
        let mut book = CommentBook::new();
        let now = Utc::now();
        book.add_comment("p", "Anon_A", "first", now).unwrap();
        book.add_comment("p", "Anon_B", "second", now).unwrap();

        let comments = book.comments_for("p");
        assert_eq!(comments.len(), 2);
        assert_eq!(comments[0].content, "second");
        assert_eq!(comments[1].anonymous_id, "Anon_A");
        assert!(book.comments_for("other").is_empty());
    }

    #[test]
    fn test_seed_groups_by_post_newest_first() {
        let now = Utc::now();
        let comment = |id: &str, post_id: &str, minutes_ago: i64| Comment {
            id: id.to_string(),
            post_id: post_id.to_string(),
            anonymous_id: "Anon_A".to_string(),
            content: "seen it".to_string(),
            created_at: now - chrono::Duration::minutes(minutes_ago),
        };

        let mut book = CommentBook::new();
        book.add_comment("p", "Anon_B", "dropped on seed", now).unwrap();
        book.seed(vec![comment("old", "p", 30), comment("other", "q", 5), comment("new", "p", 1)]);

        let ids: Vec<String> = book.comments_for("p").into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["new", "old"]);
        assert_eq!(book.comments_for("q").len(), 1);
    }

    #[test]
    fn test_length_limit_counts_characters() {
        let exactly = "é".repeat(MAX_COMMENT_CHARS);
        assert!(validate_content(&exactly).is_ok());

        let over = "a".repeat(MAX_COMMENT_CHARS + 1);
        assert!(matches!(
            validate_content(&over),
            Err(AppError::Validation(_))
        ));
    }

    #[test]
    fn test_blank_comment_is_rejected() {
        let mut book = CommentBook::new();
        assert!(matches!(
            book.add_comment("p", "Anon_A", "   ", Utc::now()),
            Err(AppError::Validation(_))
        ));
        assert!(book.comments_for("p").is_empty());
    }
}
