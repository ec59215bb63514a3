use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use serde::Deserialize;
use serde::Serialize;

use super::ApiError;
use super::ApiSuccess;
use crate::inbound::http::router::AppState;

/// Needs no session: the page offers reset from the signed-out login form.
pub async fn reset_password(
    State(state): State<AppState>,
    Json(body): Json<PasswordResetRequestBody>,
) -> Result<ApiSuccess<PasswordResetResponseData>, ApiError> {
    state
        .auth_service
        .reset_password(&body.email)
        .await
        .map_err(ApiError::from)
        .map(|outcome| {
            ApiSuccess::new(
                StatusCode::ACCEPTED,
                PasswordResetResponseData {
                    message: outcome.message,
                },
            )
        })
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PasswordResetRequestBody {
    #[serde(default)]
    email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PasswordResetResponseData {
    pub message: String,
}
