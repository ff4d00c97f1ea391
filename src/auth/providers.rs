use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde::Deserialize;

use super::{scope_to_resource, AccessToken, CredentialError, TokenCredential};
use crate::config::IdentityConfig;

const IMDS_ENDPOINT: &str = "http://169.254.169.254/metadata/identity/oauth2/token";
const IMDS_PROBE_TIMEOUT: std::time::Duration = std::time::Duration::from_secs(1);

/// A token handed to the process up front (`AZURE_ACCESS_TOKEN`).
pub struct StaticTokenCredential {
    token: Option<String>,
}

impl StaticTokenCredential {
    pub fn new(token: impl Into<String>) -> Self {
        Self { token: Some(token.into()) }
    }

    pub fn from_config(identity: &IdentityConfig) -> Self {
        Self { token: identity.static_token.clone() }
    }
}

#[async_trait]
impl TokenCredential for StaticTokenCredential {
    fn name(&self) -> &'static str {
        "StaticTokenCredential"
    }

    async fn get_token(&self, _scope: &str) -> Result<AccessToken, CredentialError> {
        match &self.token {
            Some(token) => Ok(AccessToken::new(token.clone(), None)),
            None => Err(CredentialError::unavailable(self.name(), "AZURE_ACCESS_TOKEN is not set")),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OAuthTokenResponse {
    access_token: String,
    expires_in: Option<i64>,
}

#[derive(Debug, Deserialize)]
struct OAuthErrorResponse {
    error: Option<String>,
    error_description: Option<String>,
}

/// OAuth2 client-credentials grant against the Entra ID v2 endpoint.
pub struct ClientSecretCredential {
    http: reqwest::Client,
    authority_host: String,
    tenant_id: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl ClientSecretCredential {
    pub fn from_config(identity: &IdentityConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            authority_host: identity.authority_host.clone(),
            tenant_id: identity.tenant_id.clone(),
            client_id: identity.client_id.clone(),
            client_secret: identity.client_secret.clone(),
        }
    }

    fn token_url(&self, tenant_id: &str) -> String {
        format!(
            "{}/{}/oauth2/v2.0/token",
            self.authority_host.trim_end_matches('/'),
            tenant_id
        )
    }
}

#[async_trait]
impl TokenCredential for ClientSecretCredential {
    fn name(&self) -> &'static str {
        "ClientSecretCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let (Some(tenant_id), Some(client_id), Some(client_secret)) =
            (&self.tenant_id, &self.client_id, &self.client_secret)
        else {
            return Err(CredentialError::unavailable(
                self.name(),
                "AZURE_TENANT_ID, AZURE_CLIENT_ID and AZURE_CLIENT_SECRET are required",
            ));
        };

        let form = [
            ("grant_type", "client_credentials"),
            ("client_id", client_id.as_str()),
            ("client_secret", client_secret.as_str()),
            ("scope", scope),
        ];

        let response = self
            .http
            .post(self.token_url(tenant_id))
            .form(&form)
            .send()
            .await
            .map_err(|e| CredentialError::failed(self.name(), e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response
                .json::<OAuthErrorResponse>()
                .await
                .ok()
                .and_then(|body| body.error_description.or(body.error))
                .unwrap_or_else(|| status.to_string());
            return Err(CredentialError::failed(self.name(), detail));
        }

        let body: OAuthTokenResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::failed(self.name(), format!("invalid token response: {e}")))?;

        let expires_on = body.expires_in.map(|secs| Utc::now() + Duration::seconds(secs));
        Ok(AccessToken::new(body.access_token, expires_on))
    }
}

#[derive(Debug, Deserialize)]
struct ManagedIdentityResponse {
    access_token: String,
    // The hosting endpoints send this as a string of epoch seconds.
    expires_on: Option<serde_json::Value>,
}

enum ManagedIdentitySource {
    /// App Service / Functions style endpoint with a shared secret header.
    AppService { endpoint: String, header: String },
    Imds,
    None,
}

/// Identity of the hosting platform.
pub struct ManagedIdentityCredential {
    http: reqwest::Client,
    source: ManagedIdentitySource,
    client_id: Option<String>,
}

impl ManagedIdentityCredential {
    pub fn from_config(identity: &IdentityConfig, http: reqwest::Client) -> Self {
        let source = match (&identity.identity_endpoint, &identity.identity_header) {
            (Some(endpoint), Some(header)) => ManagedIdentitySource::AppService {
                endpoint: endpoint.clone(),
                header: header.clone(),
            },
            _ if identity.use_imds => ManagedIdentitySource::Imds,
            _ => ManagedIdentitySource::None,
        };

        Self {
            http,
            source,
            client_id: identity.client_id.clone(),
        }
    }

    fn request(&self, resource: &str) -> Option<reqwest::RequestBuilder> {
        let mut query: Vec<(&str, &str)> = vec![("resource", resource)];
        if let Some(client_id) = &self.client_id {
            query.push(("client_id", client_id.as_str()));
        }

        match &self.source {
            ManagedIdentitySource::AppService { endpoint, header } => {
                query.push(("api-version", "2019-08-01"));
                Some(
                    self.http
                        .get(endpoint)
                        .query(&query)
                        .header("X-IDENTITY-HEADER", header),
                )
            }
            ManagedIdentitySource::Imds => {
                query.push(("api-version", "2018-02-01"));
                Some(
                    self.http
                        .get(IMDS_ENDPOINT)
                        .query(&query)
                        .header("Metadata", "true")
                        .timeout(IMDS_PROBE_TIMEOUT),
                )
            }
            ManagedIdentitySource::None => None,
        }
    }
}

#[async_trait]
impl TokenCredential for ManagedIdentityCredential {
    fn name(&self) -> &'static str {
        "ManagedIdentityCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let Some(request) = self.request(scope_to_resource(scope)) else {
            return Err(CredentialError::unavailable(
                self.name(),
                "no managed identity endpoint is configured",
            ));
        };

        let response = request.send().await.map_err(|e| {
            if e.is_connect() || e.is_timeout() {
                CredentialError::unavailable(self.name(), format!("identity endpoint unreachable: {e}"))
            } else {
                CredentialError::failed(self.name(), e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CredentialError::failed(
                self.name(),
                format!("identity endpoint returned {status}"),
            ));
        }

        let body: ManagedIdentityResponse = response
            .json()
            .await
            .map_err(|e| CredentialError::failed(self.name(), format!("invalid token response: {e}")))?;

        Ok(AccessToken::new(
            body.access_token,
            body.expires_on.as_ref().and_then(parse_epoch),
        ))
    }
}

fn parse_epoch(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    let secs = match value {
        serde_json::Value::Number(n) => n.as_i64()?,
        serde_json::Value::String(s) => s.parse().ok()?,
        _ => return None,
    };
    Utc.timestamp_opt(secs, 0).single()
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CliTokenResponse {
    access_token: String,
    expires_on: Option<i64>,
}

/// Developer sign-in through `az account get-access-token`.
pub struct AzureCliCredential {
    program: String,
}

impl AzureCliCredential {
    pub fn new() -> Self {
        Self { program: "az".to_string() }
    }
}

impl Default for AzureCliCredential {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenCredential for AzureCliCredential {
    fn name(&self) -> &'static str {
        "AzureCliCredential"
    }

    async fn get_token(&self, scope: &str) -> Result<AccessToken, CredentialError> {
        let output = tokio::process::Command::new(&self.program)
            .args(["account", "get-access-token", "--output", "json", "--scope", scope])
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| CredentialError::unavailable(self.name(), format!("could not run az: {e}")))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let reason = stderr.lines().next().unwrap_or("az exited with an error").to_string();
            return Err(CredentialError::failed(self.name(), reason));
        }

        // `expiresOn` is only present on newer CLI versions
        let body: CliTokenResponse = serde_json::from_slice(&output.stdout)
            .map_err(|e| CredentialError::failed(self.name(), format!("unexpected az output: {e}")))?;

        let expires_on = body.expires_on.and_then(|secs| Utc.timestamp_opt(secs, 0).single());
        Ok(AccessToken::new(body.access_token, expires_on))
    }
}
