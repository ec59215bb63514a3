use std::env;
use std::time::Duration;

use config::Config as ConfigBuilder;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub server: ServerConfig,
    pub store: StoreConfig,
    pub identity: IdentityConfig,
    pub portal: PortalConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    pub http_port: u16,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    Memory,
    Postgres,
    Realtime,
}

#[derive(Debug, Deserialize, Clone)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    #[serde(default)]
    pub database_url: String,
    /// Base URL of the real-time database REST endpoint
    #[serde(default)]
    pub realtime_url: String,
    /// Appended as `?auth=` on real-time database requests when non-empty
    #[serde(default)]
    pub auth_token: String,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IdentityBackend {
    Memory,
    Rest,
}

#[derive(Debug, Deserialize, Clone)]
pub struct IdentityConfig {
    pub backend: IdentityBackend,
    #[serde(default)]
    pub endpoint: String,
    #[serde(default)]
    pub api_key: String,
    /// Signing secret for ID tokens minted by the in-memory provider
    #[serde(default)]
    pub token_secret: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PortalConfig {
    pub init_timeout_ms: u64,
    pub probe_interval_ms: u64,
    pub min_password_length: usize,
    #[serde(default)]
    pub owner_emails: Vec<String>,
    #[serde(default = "default_session_idle_timeout_secs")]
    pub session_idle_timeout_secs: u64,
    #[serde(default = "default_session_sweep_interval_secs")]
    pub session_sweep_interval_secs: u64,
}

fn default_session_idle_timeout_secs() -> u64 {
    1800
}

fn default_session_sweep_interval_secs() -> u64 {
    60
}

impl PortalConfig {
    pub fn init_timeout(&self) -> Duration {
        Duration::from_millis(self.init_timeout_ms)
    }

    pub fn probe_interval(&self) -> Duration {
        Duration::from_millis(self.probe_interval_ms)
    }

    pub fn session_idle_timeout(&self) -> Duration {
        Duration::from_secs(self.session_idle_timeout_secs)
    }

    pub fn session_sweep_interval(&self) -> Duration {
        Duration::from_secs(self.session_sweep_interval_secs)
    }
}

impl Config {
    /// Load configuration from files with environment variable overrides
    ///
    /// Priority (highest to lowest):
    /// 1. Environment variables (PORTAL_STORE__BACKEND, PORTAL_SERVER__HTTP_PORT, etc.)
    /// 2. Environment-specific config file (config/{environment}.toml)
    /// 3. Default config file (config/default.toml)
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());

        let configuration = ConfigBuilder::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // PORTAL_PORTAL__OWNER_EMAILS=a@x.io,b@x.io overrides portal.owner_emails
            .add_source(
                Environment::with_prefix("PORTAL")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("portal.owner_emails")
                    .try_parsing(true),
            )
            .build()?;

        let config: Self = configuration.try_deserialize()?;
        config.check_run_mode(&run_mode)?;
        Ok(config)
    }

    /// The in-memory identity provider is a development double and never
    /// serves production traffic.
    pub fn check_run_mode(&self, run_mode: &str) -> Result<(), ConfigError> {
        if run_mode == "production" && self.identity.backend == IdentityBackend::Memory {
            return Err(ConfigError::Message(
                "identity.backend = \"memory\" is not allowed when RUN_MODE=production".to_string(),
            ));
        }
        Ok(())
    }
}
