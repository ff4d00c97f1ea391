//! Bearer token acquisition for the warehouse and the object store.
//!
//! Providers are tried in order by [`ChainedCredential`] until one hands back
//! a token. A provider that is not set up in the current environment reports
//! [`CredentialError::Unavailable`]; one that is set up but rejected reports
//! [`CredentialError::Failed`]. Either way the chain moves on to the next.

pub mod providers;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use thiserror::Error;

use crate::config::IdentityConfig;

pub use providers::{
    AzureCliCredential, ClientSecretCredential, ManagedIdentityCredential, StaticTokenCredential,
};

#[derive(Clone)]
pub struct AccessToken {
    secret: String,
    pub expires_on: Option<DateTime<Utc>>,
}

impl AccessToken {
    pub fn new(secret: impl Into<String>, expires_on: Option<DateTime<Utc>>) -> Self {
        Self {
            secret: secret.into(),
            expires_on,
        }
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    pub fn bearer_header(&self) -> String {
        format!("Bearer {}", self.secret)
    }
}

impl std::fmt::Debug for AccessToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccessToken")
            .field("secret", &"<redacted>")
            .field("expires_on", &self.expires_on)
            .finish()
    }
}

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("{provider} is unavailable: {reason}")]
    Unavailable { provider: &'static str, reason: String },

    #[error("{provider} failed: {reason}")]
    Failed { provider: &'static str, reason: String },

    #[error("no credential provider produced a token: {}", .attempts.join("; "))]
    Exhausted { attempts: Vec<String> },
}

impl CredentialError {
    pub fn unavailable(provider: &'static str, reason: impl Into<String>) -> Self {
        CredentialError::Unavailable {
            provider,
            reason: reason.into(),
        }
    }

    pub fn failed(provider: &'static str, reason: impl Into<String>) -> Self {
        CredentialError::Failed {
            provider,
            reason: reason.into(),
        }
    }
}

/// Something that can produce a bearer token for an OAuth2 scope.
#[async_trait]
pub trait TokenCredential: Send + Sync {
    fn name(&self) -> &'static str;

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError>;
}

pub type SharedCredential = Arc<dyn TokenCredential>;

/// Ordered list of providers, first success wins.
pub struct ChainedCredential {
    providers: Vec<SharedCredential>,
}

impl ChainedCredential {
    pub fn new(providers: Vec<SharedCredential>) -> Self {
        Self { providers }
    }

    /// The default order: static token, client secret, managed identity,
    /// then the Azure CLI. Providers whose settings are absent are still
    /// listed and simply report themselves unavailable.
    pub fn from_config(identity: &IdentityConfig, http: reqwest::Client) -> Self {
        let mut providers: Vec<SharedCredential> = vec![
            Arc::new(StaticTokenCredential::from_config(identity)),
            Arc::new(ClientSecretCredential::from_config(identity, http.clone())),
            Arc::new(ManagedIdentityCredential::from_config(identity, http)),
        ];
        if identity.enable_cli {
            providers.push(Arc::new(AzureCliCredential::new()));
        }
        Self::new(providers)
    }

    pub fn provider_names(&self) -> Vec<&'static str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[async_trait]
impl TokenCredential for ChainedCredential {
    fn name(&self) -> &'static str {
        "ChainedCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let mut attempts = Vec::with_capacity(self.providers.len());

        for provider in &self.providers {
            match provider.get_token(scope).await {
                Ok(token) => {
                    tracing::debug!(provider = provider.name(), scope, "acquired access token");
                    return Ok(token);
                }
                Err(err) => {
                    tracing::debug!(provider = provider.name(), error = %err, "credential provider skipped");
                    attempts.push(err.to_string());
                }
            }
        }

        Err(CredentialError::Exhausted { attempts })
    }
}

/// Strips the `/.default` suffix to get the v1 `resource` form some
/// endpoints still want.
pub(crate) fn scope_to_resource(scope: &str) -> &str {
    scope.strip_suffix("/.default").unwrap_or(scope)
}
