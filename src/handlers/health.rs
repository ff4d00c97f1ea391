use axum::extract::State;
use axum::Json;
use serde_json::{json, Value};

use crate::state::AppState;

/// GET / - service description
pub async fn root() -> Json<Value> {
    let version = env!("CARGO_PKG_VERSION");

    Json(json!({
        "name": "Employee API (Rust)",
        "version": version,
        "endpoints": {
            "employees": "/employees?department= (CSV source, department required)",
            "employees_sql": "/employees/sql?department= (SQL warehouse aggregate)",
            "files_raw": "/files/raw (CSV passthrough)",
            "health": "/health",
        }
    }))
}

/// GET /health - liveness plus which sources are configured. Makes no
/// external calls.
pub async fn health(State(state): State<AppState>) -> Json<Value> {
    let config = &state.config;
    Json(json!({
        "status": "ok",
        "timestamp": chrono::Utc::now(),
        "sources": {
            "sql": config.sql.is_configured(),
            "file": config.storage.file_url().is_ok(),
        }
    }))
}
