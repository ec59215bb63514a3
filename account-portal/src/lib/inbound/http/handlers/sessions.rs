use std::convert::Infallible;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::sse::Event;
use axum::response::sse::KeepAlive;
use axum::response::sse::Sse;
use axum::Extension;
use futures::stream;
use futures::Stream;
use serde::Serialize;

use super::current_view;
use super::ApiError;
use super::ApiSuccess;
use crate::domain::session::render;
use crate::domain::session::AuthView;
use crate::inbound::http::middleware::CurrentSession;
use crate::inbound::http::router::AppState;

pub async fn open_session(
    State(state): State<AppState>,
) -> Result<ApiSuccess<SessionResponseData>, ApiError> {
    let session = state.sessions.open().await;

    Ok(ApiSuccess::new(
        StatusCode::CREATED,
        SessionResponseData {
            session_id: session.id().to_string(),
            view: current_view(&state, &session).await,
        },
    ))
}

pub async fn get_session(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Result<ApiSuccess<SessionResponseData>, ApiError> {
    // pick up changes made at the provider, e.g. a verified address
    if let Err(e) = state.auth_service.reload(&session).await {
        tracing::warn!(session_id = %session.id(), error = %e, "Failed to refresh account");
    }

    Ok(ApiSuccess::new(
        StatusCode::OK,
        SessionResponseData {
            session_id: session.id().to_string(),
            view: current_view(&state, &session).await,
        },
    ))
}

/// Forget the session. Later requests with its id get `unknown_session`.
pub async fn close_session(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Result<ApiSuccess<ClosedSessionResponseData>, ApiError> {
    state.sessions.close(session.id()).await;

    Ok(ApiSuccess::new(
        StatusCode::OK,
        ClosedSessionResponseData {
            session_id: session.id().to_string(),
        },
    ))
}

/// Server-sent events carrying the view, first for the current state and
/// then after every sign-in, sign-out or profile change.
pub async fn session_events(
    State(state): State<AppState>,
    Extension(CurrentSession(session)): Extension<CurrentSession>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let receiver = session.subscribe();
    tracing::debug!(session_id = %session.id(), "Event stream opened");

    let events = stream::unfold(
        (receiver, true, state),
        |(mut receiver, initial, state)| async move {
            if !initial {
                // ends the stream once the session is gone
                receiver.changed().await.ok()?;
            }
            let account = receiver.borrow_and_update().clone();
            let view = render(&state.auth_service.state(account.as_ref()).await);

            let event = match Event::default().event("auth").json_data(&view) {
                Ok(event) => event,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to encode view");
                    Event::default().event("error").data("view unavailable")
                }
            };
            Some((Ok(event), (receiver, false, state)))
        },
    );

    Sse::new(events).keep_alive(KeepAlive::default())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionResponseData {
    pub session_id: String,
    pub view: AuthView,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClosedSessionResponseData {
    pub session_id: String,
}
