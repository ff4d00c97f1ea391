use csv::{ReaderBuilder, StringRecord, Trim};
use thiserror::Error;

use super::model::Employee;

#[derive(Debug, Error)]
pub enum EmployeeParseError {
    #[error("CSV header is missing or empty")]
    MissingHeader,

    #[error("CSV row {row}: {source}")]
    Row {
        row: u64,
        #[source]
        source: csv::Error,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

/// Parses a whole CSV document into employees.
///
/// Header names are trimmed and matched case-insensitively, so `Id`, `id`
/// and ` ID ` are all accepted. Any row that fails to parse fails the whole
/// document.
pub fn parse_employees(data: &[u8]) -> Result<Vec<Employee>, EmployeeParseError> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .trim(Trim::All)
        .from_reader(data);

    let headers = reader.headers()?.clone();
    if headers.iter().all(|h| h.trim().is_empty()) {
        return Err(EmployeeParseError::MissingHeader);
    }
    reader.set_headers(normalize_headers(&headers));

    let mut employees = Vec::new();
    for result in reader.deserialize::<Employee>() {
        let employee = result.map_err(|source| EmployeeParseError::Row {
            row: source.position().map(|p| p.line()).unwrap_or_default(),
            source,
        })?;
        employees.push(employee);
    }

    Ok(employees)
}

fn normalize_headers(headers: &StringRecord) -> StringRecord {
    headers
        .iter()
        .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
        .collect()
}
