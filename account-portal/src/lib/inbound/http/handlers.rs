use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::domain::account::errors::IdentityError;
use crate::domain::session::models::FormOutcome;
use crate::domain::session::render;
use crate::domain::session::AuthError;
use crate::domain::session::AuthSession;
use crate::domain::session::AuthView;
use crate::inbound::http::router::AppState;

pub mod availability;
pub mod health;
pub mod login;
pub mod logout;
pub mod password_reset;
pub mod sessions;
pub mod signup;
pub mod verification;

#[derive(Debug, Clone)]
pub struct ApiSuccess<T: Serialize + PartialEq>(StatusCode, Json<ApiResponseBody<T>>);

impl<T> PartialEq for ApiSuccess<T>
where
    T: Serialize + PartialEq,
{
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0 && self.1 .0 == other.1 .0
    }
}

impl<T: Serialize + PartialEq> ApiSuccess<T> {
    pub fn new(status: StatusCode, data: T) -> Self {
        ApiSuccess(status, Json(ApiResponseBody::new(status, data)))
    }
}

impl<T: Serialize + PartialEq> IntoResponse for ApiSuccess<T> {
    fn into_response(self) -> Response {
        (self.0, self.1).into_response()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    InternalServerError(String),
    UnprocessableEntity(ApiErrorData),
    Unauthorized(ApiErrorData),
    Conflict(ApiErrorData),
    TooManyRequests(ApiErrorData),
    BadGateway(ApiErrorData),
    ServiceUnavailable(ApiErrorData),
}

impl From<anyhow::Error> for ApiError {
    fn from(e: anyhow::Error) -> Self {
        Self::InternalServerError(e.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, data) = match self {
            ApiError::InternalServerError(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ApiErrorData::new("internal_error", "An error occurred. Please try again."),
                )
            }
            ApiError::UnprocessableEntity(data) => (StatusCode::UNPROCESSABLE_ENTITY, data),
            ApiError::Unauthorized(data) => (StatusCode::UNAUTHORIZED, data),
            ApiError::Conflict(data) => (StatusCode::CONFLICT, data),
            ApiError::TooManyRequests(data) => (StatusCode::TOO_MANY_REQUESTS, data),
            ApiError::BadGateway(data) => (StatusCode::BAD_GATEWAY, data),
            ApiError::ServiceUnavailable(data) => (StatusCode::SERVICE_UNAVAILABLE, data),
        };

        (status, Json(ApiResponseBody::new(status, data))).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        let data = ApiErrorData::new(err.code(), err.user_message());

        match err {
            AuthError::MissingFields
            | AuthError::MissingEmail
            | AuthError::InvalidUsername(_)
            | AuthError::WeakPassword(_) => ApiError::UnprocessableEntity(data),
            AuthError::UsernameTaken(_)
            | AuthError::UsernameLostRace { .. }
            | AuthError::UsernameNotReserved { .. }
            | AuthError::UsernameAlreadyAssigned => ApiError::Conflict(data),
            AuthError::NotSignedIn => ApiError::Unauthorized(data),
            AuthError::Identity(e) => match e {
                IdentityError::EmailInUse => ApiError::Conflict(data),
                IdentityError::InvalidEmail | IdentityError::WeakPassword => {
                    ApiError::UnprocessableEntity(data)
                }
                IdentityError::UserNotFound
                | IdentityError::WrongPassword
                | IdentityError::InvalidCredential => ApiError::Unauthorized(data),
                IdentityError::TooManyRequests => ApiError::TooManyRequests(data),
                IdentityError::NetworkError(_) | IdentityError::Unknown(_) => {
                    ApiError::BadGateway(data)
                }
            },
            AuthError::VerificationEmail(IdentityError::TooManyRequests) => {
                ApiError::TooManyRequests(data)
            }
            AuthError::VerificationEmail(_) | AuthError::SignOut(_) | AuthError::Store(_) => {
                ApiError::BadGateway(data)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiResponseBody<T: Serialize + PartialEq> {
    status_code: u16,
    data: T,
}

impl<T: Serialize + PartialEq> ApiResponseBody<T> {
    pub fn new(status_code: StatusCode, data: T) -> Self {
        Self {
            status_code: status_code.as_u16(),
            data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ApiErrorData {
    pub code: String,
    pub message: String,
}

impl ApiErrorData {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Outcome of a form submission together with the view it leaves behind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormResponseData {
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<String>,
    pub view: AuthView,
}

impl FormResponseData {
    pub async fn new(state: &AppState, session: &AuthSession, outcome: FormOutcome) -> Self {
        Self {
            message: outcome.message,
            follow_up: outcome.follow_up,
            view: current_view(state, session).await,
        }
    }
}

pub async fn current_view(state: &AppState, session: &AuthSession) -> AuthView {
    let account = session.current_user();
    render(&state.auth_service.state(account.as_ref()).await)
}
