// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Command bodies for `sqlrest serve`, `sqlrest tables` and `sqlrest sql`.

use std::future::Future;

use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use sqlrest_config::SqlRestConfig;
use sqlrest_core::{Outcome, Payload, SqlRestError};
use sqlrest_gateway::SqlRestServer;
use sqlrest_storage::Worker;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over `level`. Output goes to stderr so `tables` and `sql`
/// keep stdout for their results.
pub fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("sqlrest={level},tower_http={level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}

/// Runs `sqlrest serve` until Ctrl-C or SIGTERM.
pub async fn run_serve(config: SqlRestConfig) -> Result<(), SqlRestError> {
    serve_until(config, shutdown_signal()).await
}

/// Serve until `signal` resolves, then stop the server and close the database.
pub async fn serve_until(
    config: SqlRestConfig,
    signal: impl Future<Output = ()>,
) -> Result<(), SqlRestError> {
    let port = config.server.port;
    let database = config.storage.database_path.clone();
    let server = SqlRestServer::new(config);

    let addr = server.start(port, &database).await?;
    info!(%addr, %database, "starting sqlrest serve");

    signal.await;
    info!("shutting down");
    server.stop().await
}

async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => info!("received SIGINT (Ctrl+C), initiating shutdown"),
                    _ = sigterm.recv() => info!("received SIGTERM, initiating shutdown"),
                }
            }
            Err(e) => {
                warn!(error = %e, "cannot install SIGTERM handler, waiting for Ctrl+C only");
                let _ = ctrl_c.await;
                info!("received SIGINT (Ctrl+C), initiating shutdown");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = ctrl_c.await;
        info!("received Ctrl+C, initiating shutdown");
    }

    debug!("shutdown signal handler completed");
}

/// Runs `sqlrest tables`: prints one table name per line.
pub async fn run_tables(config: SqlRestConfig) -> Result<(), SqlRestError> {
    let tables = list_tables(&config).await?;
    for table in tables {
        println!("{table}");
    }
    Ok(())
}

/// Runs `sqlrest sql`: prints the outcome as JSON and fails when it failed.
pub async fn run_sql(config: SqlRestConfig, statement: String) -> Result<(), SqlRestError> {
    let outcome = execute_once(&config, statement).await?;
    let rendered = serde_json::to_string_pretty(&outcome)
        .map_err(|e| SqlRestError::Internal(format!("cannot render outcome: {e}")))?;
    println!("{rendered}");

    match outcome.error_message {
        Some(message) => Err(SqlRestError::execution(message)),
        None => Ok(()),
    }
}

async fn list_tables(config: &SqlRestConfig) -> Result<Vec<String>, SqlRestError> {
    let worker = Worker::open(&config.storage).await?;
    let result = worker.list_tables().await;
    worker.close().await?;

    match result? {
        Payload::Tables(tables) => Ok(tables),
        other => Err(SqlRestError::Internal(format!(
            "unexpected payload for list tables: {other:?}"
        ))),
    }
}

/// Open the configured database, run one statement and close it again.
///
/// Only a failure to open or close is an `Err`; a failing statement comes
/// back as an unsuccessful [`Outcome`].
async fn execute_once(config: &SqlRestConfig, statement: String) -> Result<Outcome, SqlRestError> {
    let worker = Worker::open(&config.storage).await?;
    let outcome = Outcome::from(worker.execute(statement, Vec::new()).await);
    worker.close().await?;
    Ok(outcome)
}
