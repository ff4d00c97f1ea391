use clap::Parser;
use employee_api_rust::{app, config, AppState};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "employee-api")]
#[command(about = "Employee data API over a SQL warehouse and a data-lake CSV file")]
#[command(version)]
struct Cli {
    #[arg(long, help = "Address to bind (overrides EMPLOYEE_API_HOST)")]
    host: Option<String>,

    #[arg(long, help = "Port to listen on (overrides EMPLOYEE_API_PORT / PORT)")]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up SQL_ENDPOINT, ONELAKE_DFS_FILE_URL, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let mut config = config::config().clone();
    if let Some(host) = cli.host {
        config.server.host = host;
    }
    if let Some(port) = cli.port {
        config.server.port = port;
    }
    tracing::info!("Starting Employee API in {:?} mode", config.environment);

    if !config.sql.is_configured() {
        tracing::warn!("SQL warehouse is not fully configured; /employees/sql will return 500");
    }
    if config.storage.file_url().is_err() {
        tracing::warn!("ONELAKE_DFS_FILE_URL is not set; /employees and /files/raw will return 500");
    }

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::new(config);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|e| anyhow::anyhow!("failed to bind {}: {}", bind_addr, e))?;

    tracing::info!("Employee API listening on http://{}", bind_addr);

    axum::serve(listener, app(state)).await?;
    Ok(())
}
