//! Alert model.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::FollowedTopic;

/// Why an alert was raised.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    NewIncident,
    StatusChange,
    FollowUp,
}

/// An entry in the viewer's alert inbox.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub title: String,
    pub description: String,
    pub timestamp: DateTime<Utc>,
    pub read: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic: Option<FollowedTopic>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub incident_id: Option<String>,
}

/// Request body for ingesting an alert formed by another subsystem.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestAlertRequest {
    #[serde(rename = "type")]
    pub alert_type: AlertType,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub topic: Option<FollowedTopic>,
    #[serde(default)]
    pub incident_id: Option<String>,
}

/// Alert listing with the unread badge count.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertList {
    pub unread_count: usize,
    pub alerts: Vec<Alert>,
}
