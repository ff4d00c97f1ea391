use std::sync::Arc;

use crate::auth::{ChainedCredential, SharedCredential};
use crate::config::AppConfig;

/// Immutable state shared by every request.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    pub credential: SharedCredential,
    pub http: reqwest::Client,
}

impl AppState {
    /// Builds the default credential chain from the identity settings.
    pub fn new(config: AppConfig) -> Self {
        let http = reqwest::Client::new();
        let credential = Arc::new(ChainedCredential::from_config(&config.identity, http.clone()));
        Self {
            config: Arc::new(config),
            credential,
            http,
        }
    }

    pub fn with_credential(config: AppConfig, credential: SharedCredential) -> Self {
        Self {
            config: Arc::new(config),
            credential,
            http: reqwest::Client::new(),
        }
    }
}
