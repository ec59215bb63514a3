use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiSuccess;
use crate::inbound::http::router::AppState;

/// Liveness plus whether the collaborators answered the startup handshake.
pub async fn health(State(state): State<AppState>) -> ApiSuccess<HealthResponseData> {
    let ready = state.readiness.is_ready();

    ApiSuccess::new(
        StatusCode::OK,
        HealthResponseData {
            status: if ready { "ready" } else { "starting" },
            sessions: state.sessions.count().await,
        },
    )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthResponseData {
    pub status: &'static str,
    pub sessions: usize,
}
