use std::sync::Arc;

use account_portal::config::Config;
use account_portal::config::IdentityBackend;
use account_portal::config::StoreBackend;
use account_portal::domain::account::IdentityProvider;
use account_portal::domain::session::readiness::initialize;
use account_portal::domain::session::AuthService;
use account_portal::domain::session::AuthServicePort;
use account_portal::domain::session::ReadinessGate;
use account_portal::domain::store::KeyValueStore;
use account_portal::inbound::http::router::create_router;
use account_portal::inbound::http::sessions::SessionRegistry;
use account_portal::outbound::identity::InMemoryIdentityProvider;
use account_portal::outbound::identity::RestIdentityProvider;
use account_portal::outbound::store::InMemoryKeyValueStore;
use account_portal::outbound::store::PostgresKeyValueStore;
use account_portal::outbound::store::RealtimeKeyValueStore;
use auth::PasswordPolicy;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

const MIN_TOKEN_SECRET_BYTES: usize = 32;

#[tokio::main]
async fn main() -> Result<(), anyhow::Error> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "account_portal=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        service = "account-portal",
        version = env!("CARGO_PKG_VERSION"),
        "Service starting"
    );

    let config = Config::load()?;

    tracing::info!(
        http_port = config.server.http_port,
        store_backend = ?config.store.backend,
        identity_backend = ?config.identity.backend,
        owners = config.portal.owner_emails.len(),
        "Configuration loaded"
    );

    let store: Arc<dyn KeyValueStore> = match config.store.backend {
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store; reservations are lost on restart");
            Arc::new(InMemoryKeyValueStore::new())
        }
        StoreBackend::Postgres => {
            let pg_pool = PgPoolOptions::new()
                .max_connections(5)
                .connect(&config.store.database_url)
                .await?;
            tracing::info!(
                max_connections = 5,
                database = "postgresql",
                "Database connection pool created"
            );

            sqlx::migrate!("./migrations").run(&pg_pool).await?;
            tracing::info!(database = "postgresql", "Database migrations completed");

            Arc::new(PostgresKeyValueStore::new(pg_pool))
        }
        StoreBackend::Realtime => {
            tracing::info!(url = %config.store.realtime_url, "Using real-time database store");
            Arc::new(RealtimeKeyValueStore::new(
                &config.store.realtime_url,
                Some(config.store.auth_token.clone()),
            )?)
        }
    };

    let password_policy = PasswordPolicy::new(config.portal.min_password_length);

    let identity: Arc<dyn IdentityProvider> = match config.identity.backend {
        IdentityBackend::Memory => {
            if config.identity.token_secret.len() < MIN_TOKEN_SECRET_BYTES {
                anyhow::bail!(
                    "identity.token_secret must be at least {} bytes",
                    MIN_TOKEN_SECRET_BYTES
                );
            }
            tracing::warn!("Using in-memory identity provider; emails are not delivered");
            Arc::new(
                InMemoryIdentityProvider::new(config.identity.token_secret.as_bytes())
                    .with_password_policy(password_policy),
            )
        }
        IdentityBackend::Rest => {
            tracing::info!(endpoint = %config.identity.endpoint, "Using REST identity provider");
            Arc::new(RestIdentityProvider::new(
                &config.identity.endpoint,
                &config.identity.api_key,
            )?)
        }
    };

    let auth_service: Arc<dyn AuthServicePort> = Arc::new(
        AuthService::new(Arc::clone(&store), Arc::clone(&identity))
            .with_password_policy(password_policy)
            .with_owner_emails(config.portal.owner_emails.clone()),
    );

    let readiness = Arc::new(ReadinessGate::new());
    let handshake = {
        let readiness = Arc::clone(&readiness);
        let interval = config.portal.probe_interval();
        let timeout = config.portal.init_timeout();

        tokio::spawn(async move {
            if let Err(e) =
                initialize(&readiness, identity.as_ref(), store.as_ref(), interval, timeout).await
            {
                tracing::error!(error = %e, "Form endpoints stay unavailable");
            }
        })
    };

    let http_address = format!("0.0.0.0:{}", config.server.http_port);
    let http_listener = tokio::net::TcpListener::bind(&http_address).await?;
    tracing::info!(
        address = %http_address,
        port = config.server.http_port,
        protocol = "http",
        "Http server listening"
    );

    let sessions = Arc::new(SessionRegistry::new());
    let sweeper = sessions.spawn_sweeper(
        config.portal.session_sweep_interval(),
        config.portal.session_idle_timeout(),
    );
    tracing::info!(
        idle_timeout_secs = config.portal.session_idle_timeout_secs,
        "Session sweeper started"
    );

    let http_application = create_router(auth_service, sessions, readiness);
    axum::serve(http_listener, http_application).await?;

    handshake.abort();
    sweeper.abort();
    tracing::info!("Server exited");

    Ok(())
}
