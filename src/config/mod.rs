use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Raised when a data source is hit without the settings it needs.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing configuration: {0}")]
    Missing(&'static str),

    #[error("Invalid configuration value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub sql: SqlConfig,
    pub storage: StorageConfig,
    pub identity: IdentityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub enable_request_logging: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SqlConfig {
    pub endpoint: Option<String>,
    pub database: Option<String>,
    pub user: Option<String>,
    pub employees_table: String,
    pub token_scope: String,
    pub connect_timeout_secs: u64,
    pub command_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub file_url: Option<String>,
    pub token_scope: String,
    pub api_version: String,
    pub request_timeout_secs: u64,
}

/// Settings for the credential chain. Secrets are skipped when the
/// config is serialized.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct IdentityConfig {
    #[serde(skip)]
    pub static_token: Option<String>,
    pub tenant_id: Option<String>,
    pub client_id: Option<String>,
    #[serde(skip)]
    pub client_secret: Option<String>,
    pub authority_host: String,
    pub identity_endpoint: Option<String>,
    #[serde(skip)]
    pub identity_header: Option<String>,
    pub use_imds: bool,
    pub enable_cli: bool,
}

impl std::fmt::Debug for IdentityConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdentityConfig")
            .field("static_token", &self.static_token.as_ref().map(|_| "<redacted>"))
            .field("tenant_id", &self.tenant_id)
            .field("client_id", &self.client_id)
            .field("client_secret", &self.client_secret.as_ref().map(|_| "<redacted>"))
            .field("authority_host", &self.authority_host)
            .field("identity_endpoint", &self.identity_endpoint)
            .field("use_imds", &self.use_imds)
            .field("enable_cli", &self.enable_cli)
            .finish()
    }
}

pub const DEFAULT_AUTHORITY_HOST: &str = "https://login.microsoftonline.com";

impl SqlConfig {
    pub fn endpoint(&self) -> Result<&str, ConfigError> {
        non_empty(&self.endpoint).ok_or(ConfigError::Missing("SQL_ENDPOINT"))
    }

    pub fn database(&self) -> Result<&str, ConfigError> {
        non_empty(&self.database).ok_or(ConfigError::Missing("SQL_DATABASE"))
    }

    pub fn user(&self) -> Result<&str, ConfigError> {
        non_empty(&self.user).ok_or(ConfigError::Missing("SQL_USER"))
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_secs(self.command_timeout_secs)
    }

    pub fn is_configured(&self) -> bool {
        self.endpoint().is_ok() && self.database().is_ok() && self.user().is_ok()
    }
}

impl StorageConfig {
    pub fn file_url(&self) -> Result<&str, ConfigError> {
        non_empty(&self.file_url).ok_or(ConfigError::Missing("ONELAKE_DFS_FILE_URL"))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn env_opt(name: &str) -> Option<String> {
    env::var(name).ok().filter(|v| !v.trim().is_empty())
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        // Server overrides
        if let Ok(v) = env::var("EMPLOYEE_API_HOST") {
            self.server.host = v;
        }
        if let Some(v) = env::var("EMPLOYEE_API_PORT").ok().or_else(|| env::var("PORT").ok()) {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }
        if let Ok(v) = env::var("API_ENABLE_REQUEST_LOGGING") {
            self.server.enable_request_logging = v.parse().unwrap_or(self.server.enable_request_logging);
        }

        // SQL warehouse
        self.sql.endpoint = env_opt("SQL_ENDPOINT");
        self.sql.database = env_opt("SQL_DATABASE");
        self.sql.user = env_opt("SQL_USER");
        if let Some(v) = env_opt("SQL_EMPLOYEES_TABLE") {
            self.sql.employees_table = v;
        }
        if let Some(v) = env_opt("SQL_TOKEN_SCOPE") {
            self.sql.token_scope = v;
        }
        if let Ok(v) = env::var("SQL_CONNECT_TIMEOUT_SECS") {
            self.sql.connect_timeout_secs = v.parse().unwrap_or(self.sql.connect_timeout_secs);
        }
        if let Ok(v) = env::var("SQL_COMMAND_TIMEOUT_SECS") {
            self.sql.command_timeout_secs = v.parse().unwrap_or(self.sql.command_timeout_secs);
        }

        // Object store
        self.storage.file_url = env_opt("ONELAKE_DFS_FILE_URL");
        if let Some(v) = env_opt("STORAGE_TOKEN_SCOPE") {
            self.storage.token_scope = v;
        }
        if let Some(v) = env_opt("STORAGE_API_VERSION") {
            self.storage.api_version = v;
        }
        if let Ok(v) = env::var("STORAGE_REQUEST_TIMEOUT_SECS") {
            self.storage.request_timeout_secs = v.parse().unwrap_or(self.storage.request_timeout_secs);
        }

        // Identity
        self.identity.static_token = env_opt("AZURE_ACCESS_TOKEN");
        self.identity.tenant_id = env_opt("AZURE_TENANT_ID");
        self.identity.client_id = env_opt("AZURE_CLIENT_ID");
        self.identity.client_secret = env_opt("AZURE_CLIENT_SECRET");
        if let Some(v) = env_opt("AZURE_AUTHORITY_HOST") {
            self.identity.authority_host = v.trim_end_matches('/').to_string();
        }
        self.identity.identity_endpoint = env_opt("IDENTITY_ENDPOINT");
        self.identity.identity_header = env_opt("IDENTITY_HEADER");
        if let Ok(v) = env::var("AZURE_USE_IMDS") {
            self.identity.use_imds = v.parse().unwrap_or(self.identity.use_imds);
        }
        if let Ok(v) = env::var("AZURE_ENABLE_CLI_CREDENTIAL") {
            self.identity.enable_cli = v.parse().unwrap_or(self.identity.enable_cli);
        }

        self
    }

    fn base(environment: Environment) -> Self {
        Self {
            environment,
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 3000,
                enable_request_logging: true,
            },
            sql: SqlConfig {
                endpoint: None,
                database: None,
                user: None,
                employees_table: "employees".to_string(),
                token_scope: "https://ossrdbms-aad.database.windows.net/.default".to_string(),
                connect_timeout_secs: 30,
                command_timeout_secs: 30,
            },
            storage: StorageConfig {
                file_url: None,
                token_scope: "https://storage.azure.com/.default".to_string(),
                api_version: "2023-11-03".to_string(),
                request_timeout_secs: 60,
            },
            identity: IdentityConfig {
                authority_host: DEFAULT_AUTHORITY_HOST.to_string(),
                enable_cli: true,
                ..IdentityConfig::default()
            },
        }
    }

    fn development() -> Self {
        Self::base(Environment::Development)
    }

    fn staging() -> Self {
        let mut config = Self::base(Environment::Staging);
        config.identity.enable_cli = false;
        config
    }

    fn production() -> Self {
        let mut config = Self::base(Environment::Production);
        config.server.enable_request_logging = false;
        config.identity.enable_cli = false;
        config
    }

    /// Defaults with no data sources configured. Used by tests and as a
    /// starting point for programmatic setups.
    pub fn unconfigured() -> Self {
        Self::development()
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}
