pub mod model;
pub mod parse;
pub mod summary;

pub use model::{DepartmentAggregate, Employee, EmployeeSummary};
pub use parse::{parse_employees, EmployeeParseError};
pub use summary::{
    aggregate_from_totals, round_average, summarize, AggregateError, DepartmentFilter, MAX_ITEMS,
};
