use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;

use super::ApiError;
use super::ApiSuccess;
use super::FormResponseData;
use crate::inbound::http::middleware::CurrentSession;
use crate::inbound::http::router::AppState;

pub async fn logout(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Result<ApiSuccess<FormResponseData>, ApiError> {
    let outcome = state
        .auth_service
        .logout(&session)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        FormResponseData::new(&state, &session, outcome).await,
    ))
}
