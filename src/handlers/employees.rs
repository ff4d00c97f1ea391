use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::Json;
use serde::Deserialize;
use tracing::{error, info, warn};

use crate::employees::{parse_employees, summarize, DepartmentAggregate, DepartmentFilter, EmployeeSummary};
use crate::error::ApiError;
use crate::state::AppState;
use crate::storage::{LakeFileClient, StorageError};

#[derive(Debug, Deserialize)]
pub struct DepartmentQuery {
    pub department: Option<String>,
}

/// Malformed query strings (a repeated `department`, bad encoding) get the
/// JSON error body instead of axum's plain-text rejection.
fn department_query(
    query: Result<Query<DepartmentQuery>, QueryRejection>,
) -> Result<DepartmentQuery, ApiError> {
    match query {
        Ok(Query(query)) => Ok(query),
        Err(rejection) => {
            warn!("Rejected query string: {}", rejection.body_text());
            Err(ApiError::bad_request("Invalid query parameters"))
        }
    }
}

/// GET /employees?department= - filter and aggregate the CSV file
pub async fn employees_get(
    State(state): State<AppState>,
    query: Result<Query<DepartmentQuery>, QueryRejection>,
) -> Result<Json<EmployeeSummary>, ApiError> {
    info!("Processing GET /employees request");

    let query = department_query(query)?;

    let filter = DepartmentFilter::parse(query.department.as_deref())
        .ok_or_else(|| ApiError::bad_request("Department parameter is required"))?;

    let storage = &state.config.storage;
    let client = LakeFileClient::new(
        state.http.clone(),
        storage.file_url()?,
        state.credential.clone(),
        storage,
    )?;

    let body = client.download().await.map_err(csv_source_error)?;
    let records = parse_employees(&body)?;
    let summary = summarize(records, Some(&filter))?;

    info!(
        department = filter.as_str(),
        total = summary.total,
        returned = summary.items.len(),
        "employees filtered"
    );
    Ok(Json(summary))
}

/// Every way of failing to fetch the CSV looks the same to the caller,
/// except credential trouble which stays a 500.
fn csv_source_error(err: StorageError) -> ApiError {
    match err {
        StorageError::Credential(e) => e.into(),
        other => {
            error!("Failed to fetch CSV data: {}", other);
            ApiError::not_found("CSV file not found or inaccessible")
        }
    }
}

/// GET /employees/sql?department= - aggregate pushed down to the warehouse
pub async fn employees_sql_get(
    State(state): State<AppState>,
    query: Result<Query<DepartmentQuery>, QueryRejection>,
) -> Result<Json<DepartmentAggregate>, ApiError> {
    info!("Processing SQL employees aggregation request");

    let query = department_query(query)?;

    let filter = DepartmentFilter::parse(query.department.as_deref());
    let sql = &state.config.sql;
    let target = crate::database::WarehouseTarget::from_config(sql)?;
    let token = state.credential.get_token(&sql.token_scope).await?;
    let aggregate = target.run_aggregate(&token, filter.as_ref()).await?;

    Ok(Json(aggregate))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    #[test]
    fn csv_fetch_failures_collapse_to_not_found() {
        let forbidden = csv_source_error(StorageError::Forbidden("/f.csv".into()));
        assert_eq!(forbidden.status_code(), StatusCode::NOT_FOUND);

        let missing = csv_source_error(StorageError::NotFound("/f.csv".into()));
        assert_eq!(missing.status_code(), StatusCode::NOT_FOUND);
        assert_eq!(missing.message(), "CSV file not found or inaccessible");
    }

    #[test]
    fn credential_failures_stay_internal_errors() {
        let err = csv_source_error(StorageError::Credential(
            crate::auth::CredentialError::Exhausted { attempts: vec![] },
        ));
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
