//! Topic following and alert matching.
//!
//! A viewer follows locations and categories. Each newly submitted report is
//! checked against that follow set and, on a match, produces an unread
//! `new_incident` alert in the viewer's inbox. Alerts move one way from
//! unread to read and are removed only by dismissal.

use chrono::{DateTime, Utc};

use crate::errors::AppError;
use crate::models::{
    Alert, AlertType, Category, FollowTopicRequest, FollowedTopic, IngestAlertRequest, Post,
    TopicType,
};

/// The viewer's followed topics, unique per `(type, value)`.
#[derive(Debug, Default)]
pub struct TopicFollowing {
    topics: Vec<FollowedTopic>,
}

impl TopicFollowing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn topics(&self) -> &[FollowedTopic] {
        &self.topics
    }

    /// Follow a topic. Returns the stored topic and whether it was newly added.
    pub fn follow(&mut self, request: FollowTopicRequest) -> Result<(FollowedTopic, bool), AppError> {
        let topic = normalize_topic(request)?;

        if let Some(existing) = self
            .topics
            .iter()
            .find(|t| t.same_key(topic.topic_type, &topic.value))
        {
            return Ok((existing.clone(), false));
        }

        self.topics.push(topic.clone());
        Ok((topic, true))
    }

    /// Stop following a topic. Returns whether anything was removed.
    pub fn unfollow(&mut self, topic_type: TopicType, value: &str) -> bool {
        let value = normalize_value(value);
        let before = self.topics.len();
        self.topics.retain(|t| !t.same_key(topic_type, &value));
        self.topics.len() != before
    }
}

fn normalize_value(value: &str) -> String {
    value.trim().to_lowercase()
}

fn normalize_topic(request: FollowTopicRequest) -> Result<FollowedTopic, AppError> {
    let value = normalize_value(&request.value);
    let label = request
        .label
        .map(|l| l.trim().to_string())
        .filter(|l| !l.is_empty());

    match request.topic_type {
        TopicType::Category => {
            let category = Category::parse(&value).ok_or_else(|| {
                AppError::Validation(format!("Unknown category '{}'", request.value.trim()))
            })?;
            Ok(FollowedTopic {
                topic_type: TopicType::Category,
                value,
                label: label.unwrap_or_else(|| category.label().to_string()),
            })
        }
        TopicType::Location => {
            if value.is_empty() {
                return Err(AppError::Validation("Location is required".to_string()));
            }
            Ok(FollowedTopic {
                topic_type: TopicType::Location,
                value,
                label: label.unwrap_or_else(|| request.value.trim().to_string()),
            })
        }
    }
}

/// First followed topic, in follow order, that the post matches.
pub fn matching_topic<'a>(post: &Post, followed: &'a [FollowedTopic]) -> Option<&'a FollowedTopic> {
    let location = post
        .location
        .as_deref()
        .map(normalize_value)
        .filter(|l| !l.is_empty());

    followed.iter().find(|topic| match topic.topic_type {
        TopicType::Category => topic.value == post.category.as_str(),
        TopicType::Location => location.as_deref() == Some(topic.value.as_str()),
    })
}

pub fn matches_followed(post: &Post, followed: &[FollowedTopic]) -> bool {
    matching_topic(post, followed).is_some()
}

/// Build the alert a new or updated post raises for this follow set, if any.
pub fn on_post_created_or_updated(
    post: &Post,
    followed: &[FollowedTopic],
    now: DateTime<Utc>,
) -> Option<Alert> {
    let topic = matching_topic(post, followed)?;
    let category = post.category.label().to_lowercase();

    let (title, description) = match topic.topic_type {
        TopicType::Location => (
            format!("New incident in {}", topic.label),
            format!(
                "A new {} report has been submitted in your followed area.",
                category
            ),
        ),
        TopicType::Category => (
            format!("New {} report", category),
            format!(
                "A new {} report has been submitted in a category you follow.",
                category
            ),
        ),
    };

    Some(Alert {
        id: uuid::Uuid::new_v4().to_string(),
        alert_type: AlertType::NewIncident,
        title,
        description,
        timestamp: now,
        read: false,
        topic: Some(topic.clone()),
        incident_id: Some(post.id.clone()),
    })
}

/// The viewer's alerts, newest first.
#[derive(Debug, Default)]
pub struct AlertInbox {
    alerts: Vec<Alert>,
}

impl AlertInbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, alert: Alert) {
        self.alerts.insert(0, alert);
    }

    /// Accept an alert formed by another subsystem (status change, follow-up).
    pub fn ingest(&mut self, request: IngestAlertRequest, now: DateTime<Utc>) -> Result<Alert, AppError> {
        let title = request.title.trim();
        if title.is_empty() {
            return Err(AppError::Validation("Alert title is required".to_string()));
        }

        let alert = Alert {
            id: uuid::Uuid::new_v4().to_string(),
            alert_type: request.alert_type,
            title: title.to_string(),
            description: request.description.trim().to_string(),
            timestamp: now,
            read: false,
            topic: request.topic,
            incident_id: request.incident_id,
        };
        self.push(alert.clone());
        Ok(alert)
    }

    pub fn alerts(&self) -> &[Alert] {
        &self.alerts
    }

    pub fn unread_count(&self) -> usize {
        self.alerts.iter().filter(|a| !a.read).count()
    }

    pub fn mark_read(&mut self, alert_id: &str) -> Result<Alert, AppError> {
        let alert = self
            .alerts
            .iter_mut()
            .find(|a| a.id == alert_id)
            .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", alert_id)))?;
        alert.read = true;
        Ok(alert.clone())
    }

    /// Returns how many alerts changed from unread to read.
    pub fn mark_all_read(&mut self) -> usize {
        let mut changed = 0;
        for alert in self.alerts.iter_mut().filter(|a| !a.read) {
            alert.read = true;
            changed += 1;
        }
        changed
    }

    /// Remove an alert permanently.
    pub fn dismiss(&mut self, alert_id: &str) -> Result<Alert, AppError> {
        let idx = self
            .alerts
            .iter()
            .position(|a| a.id == alert_id)
            .ok_or_else(|| AppError::NotFound(format!("Alert {} not found", alert_id)))?;
        Ok(self.alerts.remove(idx))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Severity;

    fn post(category: Category, location: Option<&str>) -> Post {
        Post {
            id: "post-1".to_string(),
            anonymous_id: "Anon_AAAAAA".to_string(),
            content: "x".to_string(),
            category,
            severity: Severity::High,
            evidence_type: None,
            location: location.map(str::to_string),
            image_url: None,
            created_at: Utc::now(),
            credible_votes: 0,
            suspicious_votes: 0,
            comment_count: 0,
            version: 1,
        }
    }

    fn follow_request(topic_type: TopicType, value: &str) -> FollowTopicRequest {
        FollowTopicRequest {
            topic_type,
            value: value.to_string(),
            label: None,
        }
    }

    #[test]
    fn test_follow_twice_keeps_one_topic() {
        let mut following = TopicFollowing::new();
        let (_, added) = following
            .follow(follow_request(TopicType::Category, "fraud"))
            .unwrap();
        assert!(added);
        let (topic, added) = following
            .follow(follow_request(TopicType::Category, "fraud"))
            .unwrap();
        assert!(!added);
        assert_eq!(topic.label, "Fraud");
        assert_eq!(following.topics().len(), 1);
    }

    #[test]
    fn test_follow_location_normalizes_value() {
        let mut following = TopicFollowing::new();
        let (topic, _) = following
            .follow(follow_request(TopicType::Location, "  Metro District "))
            .unwrap();
        assert_eq!(topic.value, "metro district");
        assert_eq!(topic.label, "Metro District");

        let (_, added) = following
            .follow(follow_request(TopicType::Location, "METRO DISTRICT"))
            .unwrap();
        assert!(!added);
        assert_eq!(following.topics().len(), 1);
    }

    #[test]
    fn test_follow_rejects_malformed_topics() {
        let mut following = TopicFollowing::new();
        assert!(matches!(
            following.follow(follow_request(TopicType::Category, "weather")),
            Err(AppError::Validation(_))
        ));
        assert!(matches!(
            following.follow(follow_request(TopicType::Location, "   ")),
            Err(AppError::Validation(_))
        ));
        assert!(following.topics().is_empty());
    }

    #[test]
    fn test_unfollow() {
        let mut following = TopicFollowing::new();
        following
            .follow(follow_request(TopicType::Category, "fraud"))
            .unwrap();
        assert!(!following.unfollow(TopicType::Location, "fraud"));
        assert!(following.unfollow(TopicType::Category, "Fraud"));
        assert!(following.topics().is_empty());
    }

    #[test]
    fn test_matches_followed_category() {
        let mut following = TopicFollowing::new();
        following
            .follow(follow_request(TopicType::Category, "fraud"))
            .unwrap();
        assert!(matches_followed(&post(Category::Fraud, None), following.topics()));
        assert!(!matches_followed(&post(Category::Violence, None), following.topics()));
    }

    #[test]
    fn test_location_topic_never_matches_missing_location() {
        let mut following = TopicFollowing::new();
        following
            .follow(follow_request(TopicType::Location, "metro"))
            .unwrap();
        assert!(!matches_followed(&post(Category::Fraud, None), following.topics()));
        assert!(!matches_followed(&post(Category::Fraud, Some("  ")), following.topics()));
        assert!(matches_followed(
            &post(Category::Fraud, Some(" METRO ")),
            following.topics()
        ));
    }

    #[test]
    fn test_alert_references_first_matching_topic() {
        let mut following = TopicFollowing::new();
        following
            .follow(follow_request(TopicType::Location, "Metro District"))
            .unwrap();
        following
            .follow(follow_request(TopicType::Category, "fraud"))
            .unwrap();

        let now = Utc::now();
        let p = post(Category::Fraud, Some("metro district"));
        let alert = on_post_created_or_updated(&p, following.topics(), now).unwrap();

        assert_eq!(alert.alert_type, AlertType::NewIncident);
        assert!(!alert.read);
        assert_eq!(alert.timestamp, now);
        assert_eq!(alert.incident_id.as_deref(), Some("post-1"));
        assert_eq!(alert.topic.unwrap().topic_type, TopicType::Location);
        assert_eq!(alert.title, "New incident in Metro District");
    }

    #[test]
    fn test_no_alert_without_match() {
        let p = post(Category::Healthcare, Some("Central Hospital"));
        assert!(on_post_created_or_updated(&p, &[], Utc::now()).is_none());
    }

    #[test]
    fn test_inbox_transitions() {
        let mut inbox = AlertInbox::new();
        let mut following = TopicFollowing::new();
        following
            .follow(follow_request(TopicType::Category, "fraud"))
            .unwrap();
        for _ in 0..3 {
            let alert =
                on_post_created_or_updated(&post(Category::Fraud, None), following.topics(), Utc::now())
                    .unwrap();
            inbox.push(alert);
        }
        assert_eq!(inbox.unread_count(), 3);

        let first = inbox.alerts()[0].id.clone();
        assert!(inbox.mark_read(&first).unwrap().read);
        assert_eq!(inbox.unread_count(), 2);

        // Read is one-way: marking again leaves it read.
        assert!(inbox.mark_read(&first).unwrap().read);

        assert_eq!(inbox.mark_all_read(), 2);
        assert_eq!(inbox.unread_count(), 0);

        inbox.dismiss(&first).unwrap();
        assert_eq!(inbox.alerts().len(), 2);
        assert!(matches!(inbox.dismiss(&first), Err(AppError::NotFound(_))));
        assert!(matches!(inbox.mark_read(&first), Err(AppError::NotFound(_))));
    }

    #[test]
    fn test_ingest_external_alert() {
        let mut inbox = AlertInbox::new();
        let alert = inbox
            .ingest(
                IngestAlertRequest {
                    alert_type: AlertType::StatusChange,
                    title: "Incident status updated".to_string(),
                    description: "Escalated to under review".to_string(),
                    topic: None,
                    incident_id: Some("456".to_string()),
                },
                Utc::now(),
            )
            .unwrap();
        assert_eq!(alert.alert_type, AlertType::StatusChange);
        assert_eq!(inbox.unread_count(), 1);

        let blank = IngestAlertRequest {
            alert_type: AlertType::FollowUp,
            title: "  ".to_string(),
            description: String::new(),
            topic: None,
            incident_id: None,
        };
        assert!(matches!(
            inbox.ingest(blank, Utc::now()),
            Err(AppError::Validation(_))
        ));
    }
}
