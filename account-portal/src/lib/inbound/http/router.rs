use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::Request;
use axum::http::Response;
use axum::middleware;
use axum::routing::get;
use axum::routing::post;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::Span;

use super::handlers::availability::check_availability;
use super::handlers::health::health;
use super::handlers::login::login;
use super::handlers::logout::logout;
use super::handlers::password_reset::reset_password;
use super::handlers::sessions::close_session;
use super::handlers::sessions::get_session;
use super::handlers::sessions::open_session;
use super::handlers::sessions::session_events;
use super::handlers::signup::choose_username;
use super::handlers::signup::signup;
use super::handlers::verification::resend_verification;
use super::middleware::require_ready;
use super::middleware::require_session;
use super::sessions::SessionRegistry;
use crate::domain::session::AuthServicePort;
use crate::domain::session::ReadinessGate;

#[derive(Clone)]
pub struct AppState {
    pub auth_service: Arc<dyn AuthServicePort>,
    pub sessions: Arc<SessionRegistry>,
    pub readiness: Arc<ReadinessGate>,
}

pub fn create_router(
    auth_service: Arc<dyn AuthServicePort>,
    sessions: Arc<SessionRegistry>,
    readiness: Arc<ReadinessGate>,
) -> Router {
    let state = AppState {
        auth_service,
        sessions,
        readiness,
    };

    let public_routes = Router::new()
        .route("/api/sessions", post(open_session))
        .route(
            "/api/usernames/:candidate/availability",
            get(check_availability),
        )
        .route("/api/password-reset", post(reset_password));

    let session_routes = Router::new()
        .route("/api/session", get(get_session).delete(close_session))
        .route("/api/session/events", get(session_events))
        .route("/api/login", post(login))
        .route("/api/signup", post(signup))
        .route("/api/signup/username", post(choose_username))
        .route("/api/logout", post(logout))
        .route("/api/verification", post(resend_verification))
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            require_session,
        ));

    let api_routes = Router::new()
        .merge(public_routes)
        .merge(session_routes)
        .route_layer(middleware::from_fn_with_state(state.clone(), require_ready));

    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "http_request",
                method = %request.method(),
                uri = %request.uri(),
                version = ?request.version(),
            )
        })
        .on_request(|request: &Request<Body>, _span: &Span| {
            tracing::info!(
                method = %request.method(),
                uri = %request.uri(),
                "Request started"
            );
        })
        .on_response(
            |response: &Response<Body>, latency: Duration, _span: &Span| {
                tracing::info!(
                    status = response.status().as_u16(),
                    latency_ms = latency.as_millis(),
                    "Request completed"
                );
            },
        );

    Router::new()
        .route("/health", get(health))
        .merge(api_routes)
        .layer(trace_layer)
        .layer(CorsLayer::permissive())
        .with_state(state)
}
