use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// One employee row, from either the warehouse or the CSV file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub name: String,
    pub age: i32,
    pub department: String,
    // Parsed from text so no precision is lost on the way in; written
    // out as a plain JSON number.
    #[serde(
        serialize_with = "rust_decimal::serde::float::serialize",
        deserialize_with = "rust_decimal::serde::str::deserialize"
    )]
    pub salary: Decimal,
}

/// Response of `GET /employees`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployeeSummary {
    pub total: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub average_salary: i64,
    pub items: Vec<Employee>,
}

/// Response of `GET /employees/sql`. Same shape without the item list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepartmentAggregate {
    pub total: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub department: Option<String>,
    pub average_salary: i64,
}
