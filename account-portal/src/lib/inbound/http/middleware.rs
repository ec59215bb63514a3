use axum::extract::Request;
use axum::extract::State;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::IntoResponse;
use axum::response::Response;
use uuid::Uuid;

use super::handlers::ApiError;
use super::handlers::ApiErrorData;
use crate::domain::session::AuthSession;
use crate::inbound::http::router::AppState;

/// Extension carrying the client session resolved from the request.
#[derive(Debug, Clone)]
pub struct CurrentSession(pub AuthSession);

/// Resolve `Authorization: Bearer <session id>` to an open session.
pub async fn require_session(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, Response> {
    let session_id = extract_session_id(&req)?;

    let session = state.sessions.get(session_id).await.ok_or_else(|| {
        tracing::warn!(session_id = %session_id, "Unknown session");
        unauthorized("unknown_session", "Session expired. Please reload the page.")
    })?;

    req.extensions_mut().insert(CurrentSession(session));

    Ok(next.run(req).await)
}

/// Answer 503 until the startup handshake with the collaborators is done.
pub async fn require_ready(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, Response> {
    if !state.readiness.is_ready() {
        return Err(ApiError::ServiceUnavailable(ApiErrorData::new(
            "not_ready",
            "Still connecting. Please try again in a moment.",
        ))
        .into_response());
    }

    Ok(next.run(req).await)
}

fn extract_session_id(req: &Request) -> Result<Uuid, Response> {
    let header = req
        .headers()
        .get(AUTHORIZATION)
        .ok_or_else(|| unauthorized("missing_session", "Missing Authorization header"))?;

    let value = header
        .to_str()
        .map_err(|_| unauthorized("invalid_session", "Invalid Authorization header"))?;

    let token = value.strip_prefix("Bearer ").ok_or_else(|| {
        unauthorized(
            "invalid_session",
            "Invalid Authorization header format. Expected: Bearer <session id>",
        )
    })?;

    Uuid::parse_str(token.trim())
        .map_err(|_| unauthorized("invalid_session", "Session id is not a valid UUID"))
}

fn unauthorized(code: &str, message: &str) -> Response {
    ApiError::Unauthorized(ApiErrorData::new(code, message)).into_response()
}
