//! Askdata API server binary.
//!
//! Reads settings from the environment (and `.env`), runs migrations, and
//! serves the auth API until interrupted.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use askdata_api::config::ApiConfig;
use askdata_core::auth::postgres::PgStore;
use askdata_core::auth::session::SessionManager;
use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// CLI arguments for the API server.
#[derive(Parser, Debug)]
#[command(name = "askdata_api_server", about = "Askdata API server", version)]
struct Args {
    /// Port to listen on; overrides the port in `BIND_ADDR`.
    #[arg(long)]
    port: Option<u16>,

    /// Maximum number of database connections in the pool.
    #[arg(long, default_value_t = 5)]
    max_connections: u32,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,askdata_api=debug,askdata_core=debug")),
        )
        .init();

    let args = Args::parse();
    let mut config = ApiConfig::from_env()?;
    if let Some(port) = args.port {
        config.bind_addr = with_port(&config.bind_addr, port)?;
    }

    info!(
        bind_addr = %config.bind_addr,
        max_connections = args.max_connections,
        "starting askdata_api_server"
    );

    let pool = PgPoolOptions::new()
        .max_connections(args.max_connections)
        .acquire_timeout(Duration::from_secs(30))
        .connect(&config.database_url)
        .await?;

    info!("running database migrations");
    askdata_core::migrate::migrate(&pool).await?;

    let store = Arc::new(PgStore::new(pool));
    let session = SessionManager::new(&config.session, store.clone(), store)?;

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    let app = askdata_api::router(askdata_api::AppState {
        session: Arc::new(session),
        config,
    });

    info!(addr = %local_addr, "REST API listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async {
        let _ = tokio::signal::ctrl_c().await;
        info!("interrupt received, shutting down");
    })
    .await?;

    Ok(())
}

/// Swap the port of a `host:port` bind address.
fn with_port(bind_addr: &str, port: u16) -> Result<String, std::net::AddrParseError> {
    let mut addr: SocketAddr = bind_addr.parse()?;
    addr.set_port(port);
    Ok(addr.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn port_flag_replaces_configured_port() {
        assert_eq!(with_port("0.0.0.0:8000", 9000).unwrap(), "0.0.0.0:9000");
        assert!(with_port("not-an-address", 9000).is_err());
    }
}
