use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use tracing::{info, warn};

use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::LakeFileClient;

pub const CSV_CONTENT_TYPE: &str = "text/csv; charset=utf-8";

/// GET /files/raw - stream the CSV file as-is
pub async fn file_raw_get(State(state): State<AppState>) -> Result<Response, ApiError> {
    info!("Processing request for raw CSV file");

    let storage = &state.config.storage;
    let client = LakeFileClient::new(
        state.http.clone(),
        storage.file_url()?,
        state.credential.clone(),
        storage,
    )?;

    if !client.exists().await? {
        warn!(path = client.url().path(), "File not found in object store");
        return Err(ApiError::not_found("File not found."));
    }

    let stream = client.read_stream().await?;
    info!("Successfully opened CSV file stream");

    Ok(([(header::CONTENT_TYPE, CSV_CONTENT_TYPE)], Body::from_stream(stream)).into_response())
}
