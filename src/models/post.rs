//! Incident report model and the enumerations it is built from.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Incident category.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    Fraud,
    Violence,
    Corruption,
    Governance,
    Safety,
    Healthcare,
    Infrastructure,
    Other,
}

impl Category {
    pub const ALL: [Category; 8] = [
        Category::Fraud,
        Category::Violence,
        Category::Corruption,
        Category::Governance,
        Category::Safety,
        Category::Healthcare,
        Category::Infrastructure,
        Category::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Fraud => "fraud",
            Category::Violence => "violence",
            Category::Corruption => "corruption",
            Category::Governance => "governance",
            Category::Safety => "safety",
            Category::Healthcare => "healthcare",
            Category::Infrastructure => "infrastructure",
            Category::Other => "other",
        }
    }

    /// Human-readable label shown next to a report.
    pub fn label(&self) -> &'static str {
        match self {
            Category::Fraud => "Fraud",
            Category::Violence => "Violence",
            Category::Corruption => "Corruption",
            Category::Governance => "Governance",
            Category::Safety => "Public Safety",
            Category::Healthcare => "Healthcare",
            Category::Infrastructure => "Infrastructure",
            Category::Other => "Other",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.as_str() == s)
    }
}

/// Reported severity of an incident.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

/// Kind of evidence attached to a report.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum EvidenceType {
    Photo,
    Video,
    Document,
    Witness,
}

impl EvidenceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvidenceType::Photo => "photo",
            EvidenceType::Video => "video",
            EvidenceType::Document => "document",
            EvidenceType::Witness => "witness",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "photo" => Some(EvidenceType::Photo),
            "video" => Some(EvidenceType::Video),
            "document" => Some(EvidenceType::Document),
            "witness" => Some(EvidenceType::Witness),
            _ => None,
        }
    }
}

/// A submitted incident report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: String,
    /// Pseudonym of the author at submission time.
    pub anonymous_id: String,
    pub content: String,
    pub category: Category,
    pub severity: Severity,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub evidence_type: Option<EvidenceType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub credible_votes: u32,
    pub suspicious_votes: u32,
    pub comment_count: u32,
    /// Bumped on every mutation; used to merge writes into a data source.
    /// Never part of an API response.
    #[serde(default, skip_serializing)]
    pub version: i64,
}

impl Post {
    /// Engagement score used by the trending sort.
    pub fn engagement(&self) -> u64 {
        u64::from(self.credible_votes) + u64::from(self.comment_count)
    }
}

/// Request body for submitting a new report.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDraft {
    pub content: String,
    pub category: Category,
    pub severity: Severity,
    #[serde(default)]
    pub evidence_type: Option<EvidenceType>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

/// A viewer's vote on a post.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Credible,
    Suspicious,
}

impl Vote {
    pub fn as_str(&self) -> &'static str {
        match self {
            Vote::Credible => "credible",
            Vote::Suspicious => "suspicious",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "credible" => Some(Vote::Credible),
            "suspicious" => Some(Vote::Suspicious),
            _ => None,
        }
    }
}

/// The vote one pseudonym holds on one post, as kept by a data source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ViewerVote {
    pub post_id: String,
    pub anonymous_id: String,
    pub vote: Vote,
}

/// Request body for toggling a vote.
#[derive(Debug, Clone, Deserialize)]
pub struct VoteRequest {
    pub vote: Vote,
}

/// The vote a viewer currently holds on a post. `None` serializes as `"none"`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct VoteState {
    pub post_id: String,
    #[serde(serialize_with = "serialize_current_vote")]
    pub current_vote: Option<Vote>,
}

fn serialize_current_vote<S>(vote: &Option<Vote>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match vote {
        Some(Vote::Credible) => serializer.serialize_str("credible"),
        Some(Vote::Suspicious) => serializer.serialize_str("suspicious"),
        None => serializer.serialize_str("none"),
    }
}

/// Feed ordering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Recent,
    Trending,
}

impl SortOrder {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "recent" => Some(SortOrder::Recent),
            "trending" => Some(SortOrder::Trending),
            _ => None,
        }
    }
}

/// Feed filter. Both fields set means both must match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PostFilter {
    pub category: Option<Category>,
    pub severity: Option<Severity>,
}

impl PostFilter {
    pub fn matches(&self, post: &Post) -> bool {
        self.category.is_none_or(|c| post.category == c)
            && self.severity.is_none_or(|s| post.severity == s)
    }
}

/// Raw feed query string, validated into a filter and sort order.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPostsQuery {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub severity: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    /// Only posts matching a followed topic.
    #[serde(default)]
    pub followed: Option<bool>,
}
