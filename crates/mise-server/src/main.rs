//! The mise server binary: load configuration, open the event store, and
//! serve the WebSocket gateway until interrupted.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use mise_events::{ConnectionConfig, EventHub, SqliteEventStore};
use mise_server::{MiseServer, config};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mise-server", about = "Event sync server for mise clients")]
struct Args {
    /// Path to a JSON settings file.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Override the database path from settings.
    #[arg(long)]
    database: Option<String>,

    /// Override the port from settings.
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let args = Args::parse();
    let mut server_config =
        config::load_config(args.config.as_deref()).context("loading configuration")?;
    if let Some(database) = args.database {
        server_config.database_path = Some(database);
    }
    if let Some(port) = args.port {
        server_config.port = port;
    }

    let pool = match &server_config.database_path {
        Some(path) => {
            info!(%path, "opening event database");
            mise_events::new_file(path, &ConnectionConfig::default())
        }
        None => {
            info!("no database path configured, using in-memory store");
            mise_events::new_in_memory(&ConnectionConfig::default())
        }
    }
    .context("opening event database")?;

    {
        let conn = pool.get().context("checking out connection")?;
        let applied = mise_events::sqlite::migrations::run_migrations(&conn)
            .context("running migrations")?;
        if applied > 0 {
            info!(applied, "applied schema migrations");
        }
    }

    let store = Arc::new(SqliteEventStore::new(pool));
    let hub = Arc::new(EventHub::new(store));
    let server = MiseServer::new(server_config.clone(), hub);
    let shutdown = server.shutdown().clone();

    let listener =
        tokio::net::TcpListener::bind((server_config.host.as_str(), server_config.port))
            .await
            .context("binding listener")?;
    info!(address = %listener.local_addr()?, "listening");

    let app = server.router();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let token = shutdown.token();
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    info!("interrupt received, shutting down");
                }
                () = token.cancelled() => {}
            }
        })
        .await
        .context("serving")?;

    Ok(())
}
