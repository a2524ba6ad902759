//! Followed topic model.

use serde::{Deserialize, Serialize};

/// What a followed topic keys on.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum TopicType {
    Location,
    Category,
}

impl TopicType {
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "location" => Some(TopicType::Location),
            "category" => Some(TopicType::Category),
            _ => None,
        }
    }
}

/// A location or category the viewer receives alerts for.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FollowedTopic {
    #[serde(rename = "type")]
    pub topic_type: TopicType,
    /// Normalized lowercase key.
    pub value: String,
    pub label: String,
}

impl FollowedTopic {
    pub fn same_key(&self, topic_type: TopicType, value: &str) -> bool {
        self.topic_type == topic_type && self.value == value
    }
}

/// Request body for following a topic. `value` is normalized on follow.
#[derive(Debug, Clone, Deserialize)]
pub struct FollowTopicRequest {
    #[serde(rename = "type")]
    pub topic_type: TopicType,
    pub value: String,
    #[serde(default)]
    pub label: Option<String>,
}
