use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::FormResponseData;
use crate::domain::session::models::SignupForm;
use crate::inbound::http::middleware::CurrentSession;
use crate::inbound::http::router::AppState;

pub async fn signup(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Json(body): Json<SignupRequestBody>,
) -> Result<ApiSuccess<FormResponseData>, ApiError> {
    let outcome = state
        .auth_service
        .signup(&session, body.into())
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::CREATED,
        FormResponseData::new(&state, &session, outcome).await,
    ))
}

/// Second chance at a username when signup created the account but could
/// not reserve the one asked for.
pub async fn choose_username(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Json(body): Json<ChooseUsernameRequestBody>,
) -> Result<ApiSuccess<FormResponseData>, ApiError> {
    let outcome = state
        .auth_service
        .choose_username(&session, &body.username)
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        FormResponseData::new(&state, &session, outcome).await,
    ))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SignupRequestBody {
    #[serde(default)]
    name: String,
    #[serde(default)]
    username: String,
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl From<SignupRequestBody> for SignupForm {
    fn from(body: SignupRequestBody) -> Self {
        SignupForm {
            name: body.name,
            username: body.username,
            email: body.email,
            password: body.password,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ChooseUsernameRequestBody {
    #[serde(default)]
    username: String,
}
