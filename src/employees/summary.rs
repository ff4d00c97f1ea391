use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use thiserror::Error;

use super::model::{DepartmentAggregate, Employee, EmployeeSummary};

/// Most records returned in `items`, whatever the match count.
pub const MAX_ITEMS: usize = 50;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AggregateError {
    #[error("salary sum overflowed after {matched} matching records")]
    SalaryOverflow { matched: usize },

    #[error("average salary {0} does not fit in a 64-bit integer")]
    AverageOutOfRange(Decimal),

    #[error("negative record count {0}")]
    NegativeCount(i64),
}

/// Case-insensitive, whitespace-insensitive department match.
///
/// A blank or absent filter matches every record and is not echoed back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DepartmentFilter {
    display: String,
    folded: String,
}

impl DepartmentFilter {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        let display = raw?.trim();
        if display.is_empty() {
            return None;
        }
        Some(Self {
            display: display.to_string(),
            folded: fold(display),
        })
    }

    pub fn as_str(&self) -> &str {
        &self.display
    }

    pub fn matches(&self, department: &str) -> bool {
        fold(department) == self.folded
    }
}

fn fold(value: &str) -> String {
    value.trim().to_lowercase()
}

/// Rounds a mean salary to a whole number, ties to even.
pub fn round_average(mean: Decimal) -> Result<i64, AggregateError> {
    let rounded = mean.round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven);
    rounded
        .to_i64()
        .ok_or(AggregateError::AverageOutOfRange(rounded))
}

/// Filters, counts and averages in one pass, keeping at most [`MAX_ITEMS`]
/// matches in source order. `total` is never capped.
pub fn summarize<I>(
    records: I,
    filter: Option<&DepartmentFilter>,
) -> Result<EmployeeSummary, AggregateError>
where
    I: IntoIterator<Item = Employee>,
{
    let mut total = 0usize;
    let mut salary_sum = Decimal::ZERO;
    let mut items = Vec::new();

    for employee in records {
        if let Some(filter) = filter {
            if !filter.matches(&employee.department) {
                continue;
            }
        }

        total += 1;
        salary_sum = salary_sum
            .checked_add(employee.salary)
            .ok_or(AggregateError::SalaryOverflow { matched: total })?;
        if items.len() < MAX_ITEMS {
            items.push(employee);
        }
    }

    let average_salary = if total == 0 {
        0
    } else {
        round_average(salary_sum / Decimal::from(total))?
    };

    Ok(EmployeeSummary {
        total,
        department: filter.map(|f| f.as_str().to_string()),
        average_salary,
        items,
    })
}

/// Shapes a warehouse `COUNT(*)` / `AVG(salary)` row. A NULL average means
/// no rows matched.
pub fn aggregate_from_totals(
    total: i64,
    average: Option<Decimal>,
    filter: Option<&DepartmentFilter>,
) -> Result<DepartmentAggregate, AggregateError> {
    if total < 0 {
        return Err(AggregateError::NegativeCount(total));
    }

    let average_salary = match average {
        Some(mean) => round_average(mean)?,
        None => 0,
    };

    Ok(DepartmentAggregate {
        total,
        department: filter.map(|f| f.as_str().to_string()),
        average_salary,
    })
}
