use axum::{routing::get, Router};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::handlers;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let request_logging = state.config.server.enable_request_logging;

    let router = Router::new()
        // Public
        .route("/", get(handlers::root))
        .route("/health", get(handlers::health))
        .merge(employee_routes())
        .merge(file_routes())
        .layer(CorsLayer::permissive());

    let router = if request_logging {
        router.layer(TraceLayer::new_for_http())
    } else {
        router
    };

    router.with_state(state)
}

fn employee_routes() -> Router<AppState> {
    Router::new()
        // CSV-backed filter with item list
        .route("/employees", get(handlers::employees_get))
        // Warehouse-backed aggregate only
        .route("/employees/sql", get(handlers::employees_sql_get))
}

fn file_routes() -> Router<AppState> {
    Router::new().route("/files/raw", get(handlers::file_raw_get))
}
