use axum::extract::State;
use axum::http::StatusCode;
use axum::Extension;
use axum::Json;
use serde::Deserialize;

use super::ApiError;
use super::ApiSuccess;
use super::FormResponseData;
use crate::domain::session::models::LoginForm;
use crate::inbound::http::middleware::CurrentSession;
use crate::inbound::http::router::AppState;

pub async fn login(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
    Json(body): Json<LoginRequestBody>,
) -> Result<ApiSuccess<FormResponseData>, ApiError> {
    let outcome = state
        .auth_service
        .login(&session, body.into())
        .await
        .map_err(ApiError::from)?;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        FormResponseData::new(&state, &session, outcome).await,
    ))
}

/// Missing fields deserialize as empty so the form gets its own message.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoginRequestBody {
    #[serde(default)]
    email: String,
    #[serde(default)]
    password: String,
}

impl From<LoginRequestBody> for LoginForm {
    fn from(body: LoginRequestBody) -> Self {
        LoginForm {
            email: body.email,
            password: body.password,
        }
    }
}
