#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::Router;
use tower::ServiceExt;

use employee_api_rust::auth::{ChainedCredential, SharedCredential, StaticTokenCredential};
use employee_api_rust::config::AppConfig;
use employee_api_rust::{app, AppState};

pub const TEST_TOKEN: &str = "test-token";

/// What the fake lake serves for one file name.
#[derive(Clone)]
pub struct FakeFile {
    pub status: StatusCode,
    pub body: String,
}

impl FakeFile {
    pub fn csv(body: impl Into<String>) -> Self {
        Self { status: StatusCode::OK, body: body.into() }
    }

    pub fn status(status: StatusCode) -> Self {
        Self { status, body: String::new() }
    }
}

/// A local stand-in for a DFS endpoint. Files live under `/fs/<name>` and
/// every request must carry the test bearer token.
pub struct FakeLake {
    pub base_url: String,
}

impl FakeLake {
    pub async fn start(files: Vec<(&str, FakeFile)>) -> Result<Self> {
        let files: HashMap<String, FakeFile> =
            files.into_iter().map(|(name, file)| (name.to_string(), file)).collect();

        let router = Router::new()
            .route("/fs/:name", get(serve_file))
            .with_state(Arc::new(files));

        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind fake lake")?;

        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self { base_url: format!("http://127.0.0.1:{}", port) })
    }

    pub fn file_url(&self, name: &str) -> String {
        format!("{}/fs/{}", self.base_url, name)
    }
}

async fn serve_file(
    State(files): State<Arc<HashMap<String, FakeFile>>>,
    Path(name): Path<String>,
    headers: HeaderMap,
) -> Response {
    let authorized = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(|v| v == format!("Bearer {}", TEST_TOKEN))
        .unwrap_or(false);
    let sas = name.contains("sas");
    if !authorized && !sas {
        return StatusCode::FORBIDDEN.into_response();
    }
    if headers.get("x-ms-version").is_none() {
        return StatusCode::BAD_REQUEST.into_response();
    }

    match files.get(&name) {
        Some(file) => (file.status, file.body.clone()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

pub fn static_credential() -> SharedCredential {
    Arc::new(StaticTokenCredential::new(TEST_TOKEN))
}

/// A chain with nothing in it, so every token request fails.
pub fn failing_credential() -> SharedCredential {
    Arc::new(ChainedCredential::new(Vec::new()))
}

pub fn config_with_file(url: Option<String>) -> AppConfig {
    let mut config = AppConfig::unconfigured();
    config.storage.file_url = url;
    config.server.enable_request_logging = false;
    config
}

pub fn state(config: AppConfig, credential: SharedCredential) -> AppState {
    AppState::with_credential(config, credential)
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl TestResponse {
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_slice(&self.body).context("response body is not JSON")
    }
}

/// Drives the router in-process.
pub async fn get_path(state: AppState, uri: &str) -> Result<TestResponse> {
    let request = Request::builder().uri(uri).body(Body::empty())?;
    let response = app(state).oneshot(request).await?;

    let status = response.status();
    let headers = response.headers().clone();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await?;
    Ok(TestResponse { status, headers, body })
}

pub fn employees_csv(rows: &[(i64, &str, &str, i64)]) -> String {
    let mut csv = String::from("Id,Name,Age,Department,Salary\n");
    for (id, name, department, salary) in rows {
        csv.push_str(&format!("{},{},{},{},{}\n", id, name, 30 + id % 20, department, salary));
    }
    csv
}
