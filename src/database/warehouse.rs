use rust_decimal::Decimal;
use sqlx::postgres::{PgConnectOptions, PgConnection, PgSslMode};
use sqlx::{Connection, Row};
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

use crate::auth::AccessToken;
use crate::config::{ConfigError, SqlConfig};
use crate::employees::{aggregate_from_totals, AggregateError, DepartmentAggregate, DepartmentFilter};

const DEFAULT_PORT: u16 = 5432;

/// Errors from the SQL warehouse
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Invalid table name: {0}")]
    InvalidTableName(String),

    #[error("Timed out during {0}")]
    Timeout(&'static str),

    #[error(transparent)]
    Aggregate(#[from] AggregateError),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

/// Where and how to reach the employees table. Validated before any token
/// is requested so a misconfigured deployment fails fast.
#[derive(Debug, Clone)]
pub struct WarehouseTarget {
    host: String,
    port: u16,
    database: String,
    user: String,
    table: String,
    connect_timeout: Duration,
    command_timeout: Duration,
}

impl WarehouseTarget {
    pub fn from_config(sql: &SqlConfig) -> Result<Self, DatabaseError> {
        let (host, port) = split_endpoint(sql.endpoint()?)?;
        let database = sql.database()?.to_string();
        let user = sql.user()?.to_string();
        let table = quote_table_name(&sql.employees_table)?;

        Ok(Self {
            host,
            port,
            database,
            user,
            table,
            connect_timeout: sql.connect_timeout(),
            command_timeout: sql.command_timeout(),
        })
    }

    fn connect_options(&self, token: &AccessToken) -> PgConnectOptions {
        PgConnectOptions::new()
            .host(&self.host)
            .port(self.port)
            .database(&self.database)
            .username(&self.user)
            .password(token.secret())
            .ssl_mode(PgSslMode::Require)
            .application_name(env!("CARGO_PKG_NAME"))
    }

    /// Opens one connection, authenticating with the bearer token as the
    /// password.
    pub async fn connect(&self, token: &AccessToken) -> Result<PgConnection, DatabaseError> {
        let options = self.connect_options(token);
        let conn = tokio::time::timeout(self.connect_timeout, PgConnection::connect_with(&options))
            .await
            .map_err(|_| DatabaseError::Timeout("connect"))??;
        info!(host = %self.host, database = %self.database, "connected to SQL warehouse");
        Ok(conn)
    }

    /// Count and mean salary, pushed down to the warehouse.
    pub async fn department_aggregate(
        &self,
        conn: &mut PgConnection,
        filter: Option<&DepartmentFilter>,
    ) -> Result<DepartmentAggregate, DatabaseError> {
        let sql = aggregate_sql(&self.table, filter.is_some());
        let mut query = sqlx::query(&sql);
        if let Some(filter) = filter {
            query = query.bind(filter.as_str());
        }

        let row = tokio::time::timeout(self.command_timeout, query.fetch_one(&mut *conn))
            .await
            .map_err(|_| DatabaseError::Timeout("query"))??;

        let total: i64 = row.try_get("total")?;
        let average: Option<Decimal> = row.try_get("average_salary")?;

        Ok(aggregate_from_totals(total, average, filter)?)
    }

    /// Connect, aggregate, close.
    pub async fn run_aggregate(
        &self,
        token: &AccessToken,
        filter: Option<&DepartmentFilter>,
    ) -> Result<DepartmentAggregate, DatabaseError> {
        let mut conn = self.connect(token).await?;
        let result = self.department_aggregate(&mut conn, filter).await;
        if let Err(e) = conn.close().await {
            warn!("Failed to close warehouse connection cleanly: {}", e);
        }
        result
    }
}

fn aggregate_sql(table: &str, filtered: bool) -> String {
    let mut sql = format!(
        "SELECT COUNT(*) AS total, AVG(salary)::numeric AS average_salary FROM {}",
        table
    );
    if filtered {
        sql.push_str(" WHERE LOWER(TRIM(department)) = LOWER(TRIM($1))");
    }
    sql
}

/// Accepts `host`, `host:port`, `host,port`, `[v6]`, `[v6]:port` and a bare
/// IPv6 literal.
fn split_endpoint(endpoint: &str) -> Result<(String, u16), DatabaseError> {
    let endpoint = endpoint.trim();

    let (host, port) = if let Some(rest) = endpoint.strip_prefix('[') {
        let (host, after) = rest.split_once(']').ok_or_else(|| invalid_endpoint("unclosed '['"))?;
        let port = match after.trim() {
            "" => DEFAULT_PORT,
            tail => match tail.strip_prefix([':', ',']) {
                Some(port) => parse_port(port)?,
                None => return Err(invalid_endpoint(format!("unexpected '{}' after ']'", tail))),
            },
        };
        (host.trim(), port)
    } else if endpoint.matches(':').count() > 1 {
        match endpoint.rsplit_once(',') {
            Some((host, port)) => (host.trim(), parse_port(port)?),
            None => (endpoint, DEFAULT_PORT),
        }
    } else {
        match endpoint.rsplit_once([':', ',']) {
            Some((host, port)) => (host.trim(), parse_port(port)?),
            None => (endpoint, DEFAULT_PORT),
        }
    };

    if host.is_empty() {
        return Err(invalid_endpoint("empty host"));
    }
    Ok((host.to_string(), port))
}

fn parse_port(port: &str) -> Result<u16, DatabaseError> {
    port.trim()
        .parse::<u16>()
        .map_err(|_| invalid_endpoint(format!("invalid port '{}'", port)))
}

fn invalid_endpoint(reason: impl Into<String>) -> DatabaseError {
    ConfigError::Invalid {
        name: "SQL_ENDPOINT",
        reason: reason.into(),
    }
    .into()
}

/// Validates `table` or `schema.table` and quotes each part.
fn quote_table_name(name: &str) -> Result<String, DatabaseError> {
    let parts: Vec<&str> = name.trim().split('.').collect();
    if parts.len() > 2 || parts.iter().any(|p| !is_valid_identifier(p)) {
        return Err(DatabaseError::InvalidTableName(name.to_string()));
    }
    Ok(parts.iter().map(|p| quote_identifier(p)).collect::<Vec<_>>().join("."))
}

fn is_valid_identifier(part: &str) -> bool {
    let mut chars = part.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
