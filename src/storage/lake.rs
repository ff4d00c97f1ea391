use axum::body::Bytes;
use futures::{Stream, TryStreamExt};
use reqwest::{header, Method, RequestBuilder, Response, StatusCode};
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

use crate::auth::{CredentialError, SharedCredential};
use crate::config::StorageConfig;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Invalid file URL: {0}")]
    InvalidUrl(String),

    #[error("File not found: {0}")]
    NotFound(String),

    #[error("Access forbidden: {0}")]
    Forbidden(String),

    #[error("Object store returned {status} for {url}")]
    Status { status: StatusCode, url: String },

    #[error("Object store request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error(transparent)]
    Credential(#[from] CredentialError),
}

/// A single file in an ADLS Gen2 / OneLake filesystem, addressed by its DFS
/// URL. One client is built per request.
pub struct LakeFileClient {
    http: reqwest::Client,
    url: Url,
    credential: Option<SharedCredential>,
    token_scope: String,
    api_version: String,
    timeout: std::time::Duration,
}

impl LakeFileClient {
    pub fn new(
        http: reqwest::Client,
        file_url: &str,
        credential: SharedCredential,
        config: &StorageConfig,
    ) -> Result<Self, StorageError> {
        let url = Url::parse(file_url).map_err(|e| StorageError::InvalidUrl(e.to_string()))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(StorageError::InvalidUrl(format!("unsupported scheme {}", url.scheme())));
        }

        // SAS URLs carry their own authorization.
        let credential = if has_sas_signature(&url) { None } else { Some(credential) };

        Ok(Self {
            http,
            url,
            credential,
            token_scope: config.token_scope.clone(),
            api_version: config.api_version.clone(),
            timeout: config.request_timeout(),
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn uses_token(&self) -> bool {
        self.credential.is_some()
    }

    async fn request(&self, method: Method) -> Result<RequestBuilder, StorageError> {
        let mut builder = self
            .http
            .request(method, self.url.clone())
            .header("x-ms-version", &self.api_version)
            .timeout(self.timeout);

        if let Some(credential) = &self.credential {
            let token = credential.get_token(&self.token_scope).await?;
            builder = builder.header(header::AUTHORIZATION, token.bearer_header());
        }

        Ok(builder)
    }

    /// HEAD the file. `Ok(false)` only for a 404.
    pub async fn exists(&self) -> Result<bool, StorageError> {
        let response = self.request(Method::HEAD).await?.send().await?;
        match response.status() {
            status if status.is_success() => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            status => Err(self.status_error(status)),
        }
    }

    /// Downloads the whole file into memory.
    pub async fn download(&self) -> Result<Bytes, StorageError> {
        let response = self.get().await?;
        let body = response.bytes().await?;
        info!(bytes = body.len(), "downloaded file from object store");
        Ok(body)
    }

    /// Opens the file as a byte stream without buffering it.
    pub async fn read_stream(
        &self,
    ) -> Result<impl Stream<Item = Result<Bytes, StorageError>> + Send + 'static, StorageError> {
        let response = self.get().await?;
        Ok(response.bytes_stream().map_err(StorageError::from))
    }

    async fn get(&self) -> Result<Response, StorageError> {
        debug!(path = self.url.path(), "reading file from object store");
        let response = self.request(Method::GET).await?.send().await?;
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(self.status_error(status))
        }
    }

    fn status_error(&self, status: StatusCode) -> StorageError {
        let path = self.url.path().to_string();
        match status {
            StatusCode::NOT_FOUND => StorageError::NotFound(path),
            StatusCode::FORBIDDEN => StorageError::Forbidden(path),
            status => StorageError::Status { status, url: path },
        }
    }
}

fn has_sas_signature(url: &Url) -> bool {
    url.query_pairs().any(|(key, _)| key == "sig")
}
