//! Anonymous identity endpoints. The secret token never leaves the process.

use axum::extract::State;

use super::{success, ApiResult};
use crate::models::PublicIdentity;
use crate::AppState;

/// GET /api/identity - The current pseudonym.
pub async fn get_identity(State(state): State<AppState>) -> ApiResult<PublicIdentity> {
    let mut session = state.session.lock().await;
    let identity = session.public_identity();
    success(identity, session.revision())
}

/// DELETE /api/identity - Forget the current identity and start a new one.
pub async fn rotate_identity(State(state): State<AppState>) -> ApiResult<PublicIdentity> {
    let mut session = state.session.lock().await;
    let identity = session.rotate_identity();
    tracing::info!("Anonymous identity cleared");
    success(identity, session.revision())
}
