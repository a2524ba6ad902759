//! Alert inbox endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use serde::Serialize;

use super::{respond, success, ApiResult};
use crate::models::{Alert, AlertList, IngestAlertRequest};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MarkAllReadResponse {
    pub updated: usize,
}

/// GET /api/alerts - Alerts, newest first, with the unread count.
pub async fn list_alerts(State(state): State<AppState>) -> ApiResult<AlertList> {
    let session = state.session.lock().await;
    let inbox = session.inbox();
    let list = AlertList {
        unread_count: inbox.unread_count(),
        alerts: inbox.alerts().to_vec(),
    };
    success(list, session.revision())
}

/// POST /api/alerts - Ingest an alert raised by another subsystem.
pub async fn ingest_alert(
    State(state): State<AppState>,
    Json(request): Json<IngestAlertRequest>,
) -> ApiResult<Alert> {
    let mut session = state.session.lock().await;
    let revision_id = session.revision();
    respond(session.inbox_mut().ingest(request, Utc::now()), revision_id)
}

/// POST /api/alerts/:id/read - Mark one alert read.
pub async fn mark_alert_read(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Alert> {
    let mut session = state.session.lock().await;
    let revision_id = session.revision();
    respond(session.inbox_mut().mark_read(&id), revision_id)
}

/// POST /api/alerts/read-all - Mark every alert read.
pub async fn mark_all_alerts_read(State(state): State<AppState>) -> ApiResult<MarkAllReadResponse> {
    let mut session = state.session.lock().await;
    let updated = session.inbox_mut().mark_all_read();
    success(MarkAllReadResponse { updated }, session.revision())
}

/// DELETE /api/alerts/:id - Dismiss an alert permanently.
pub async fn dismiss_alert(State(state): State<AppState>, Path(id): Path<String>) -> ApiResult<Alert> {
    let mut session = state.session.lock().await;
    let revision_id = session.revision();
    respond(session.inbox_mut().dismiss(&id), revision_id)
}
