pub mod auth_session;
pub mod errors;
pub mod models;
pub mod ports;
pub mod readiness;
pub mod service;
pub mod state;

pub use auth_session::AuthSession;
pub use errors::AuthError;
pub use ports::AuthServicePort;
pub use readiness::InitializationError;
pub use readiness::ReadinessGate;
pub use service::AuthService;
pub use state::render;
pub use state::AuthState;
pub use state::AuthView;
