use axum::extract::Path;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Serialize;

use super::ApiSuccess;
use crate::domain::session::models::AvailabilityReport;
use crate::inbound::http::router::AppState;

/// Live feedback while a username is typed. Always answers 200; an
/// unreachable store shows up as the `uncertain` status.
pub async fn check_availability(
    State(state): State<AppState>,
    Path(candidate): Path<String>,
) -> ApiSuccess<AvailabilityResponseData> {
    let report = state.auth_service.check_availability(&candidate).await;

    ApiSuccess::new(StatusCode::OK, AvailabilityResponseData::from(&report))
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AvailabilityResponseData {
    pub canonical: String,
    pub status: &'static str,
    pub message: String,
}

impl From<&AvailabilityReport> for AvailabilityResponseData {
    fn from(report: &AvailabilityReport) -> Self {
        Self {
            canonical: report.canonical.clone(),
            status: report.availability.status(),
            message: report.availability.message(),
        }
    }
}
