// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP gateway for SQLRest.
//!
//! [`SqlRestServer`] owns one [`Worker`] and an axum server in front of it.
//! Handlers parse requests into [`sqlrest_storage::Request`]s and answer with
//! the worker's [`Outcome`](sqlrest_core::Outcome) as JSON.

pub mod handlers;
pub mod server;

use std::net::SocketAddr;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{Mutex, oneshot};
use tokio::task::JoinHandle;
use tracing::{error, info};

use sqlrest_config::model::SqlRestConfig;
use sqlrest_core::{HealthStatus, LogHandler, Service, SqlRestError};
use sqlrest_storage::Worker;

use crate::server::{ApiLimits, GatewayState};

struct Running {
    addr: SocketAddr,
    worker: Arc<Worker>,
    shutdown: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// An explicitly owned REST server over one database file.
///
/// Construct with [`new`](Self::new), optionally attach a log handler, then
/// [`start`](Self::start) and [`stop`](Self::stop). A stopped server can be
/// started again.
pub struct SqlRestServer {
    config: SqlRestConfig,
    log: Option<LogHandler>,
    running: Mutex<Option<Running>>,
}

impl SqlRestServer {
    pub fn new(config: SqlRestConfig) -> Self {
        Self {
            config,
            log: None,
            running: Mutex::new(None),
        }
    }

    /// Forward lifecycle lines and failed requests to `log`.
    pub fn with_log_handler(mut self, log: LogHandler) -> Self {
        self.log = Some(log);
        self
    }

    fn emit(&self, line: &str) {
        if let Some(log) = &self.log {
            log(line);
        }
    }

    /// Open `database_path` and start listening on `port` (0 picks one).
    ///
    /// Returns the bound address.
    pub async fn start(&self, port: u16, database_path: &str) -> Result<SocketAddr, SqlRestError> {
        let mut running = self.running.lock().await;
        if let Some(r) = running.as_ref() {
            return Err(SqlRestError::Server {
                message: format!("server already running on {}", r.addr),
                source: None,
            });
        }

        let mut storage = self.config.storage.clone();
        storage.database_path = database_path.to_string();
        let worker = match &self.log {
            Some(log) => Worker::open_with_log_handler(&storage, Arc::clone(log)).await?,
            None => Worker::open(&storage).await?,
        };
        let worker = Arc::new(worker);

        let bind = format!("{}:{}", self.config.server.host, port);
        let listener = match tokio::net::TcpListener::bind(&bind).await {
            Ok(listener) => listener,
            Err(e) => {
                if let Err(close_err) = worker.close().await {
                    error!(error = %close_err, "failed to close worker after bind error");
                }
                let message = format!("failed to bind {bind}: {e}");
                self.emit(&message);
                return Err(SqlRestError::Server {
                    message,
                    source: Some(Box::new(e)),
                });
            }
        };
        let addr = listener.local_addr().map_err(|e| SqlRestError::Server {
            message: "cannot read bound address".to_string(),
            source: Some(Box::new(e)),
        })?;

        let state = GatewayState {
            worker: Arc::clone(&worker),
            limits: ApiLimits::from(&self.config.server),
        };
        let app = server::router(&self.config.server.api_prefix, state);

        let (shutdown, signal) = oneshot::channel::<()>();
        let handle = tokio::spawn(async move {
            let serve = axum::serve(listener, app).with_graceful_shutdown(async move {
                let _ = signal.await;
            });
            if let Err(e) = serve.await {
                error!(error = %e, "server error");
            }
        });

        info!(%addr, database = %worker.path(), "SQLRest listening");
        self.emit(&format!("listening on {addr} for {}", worker.path()));

        *running = Some(Running {
            addr,
            worker,
            shutdown,
            handle,
        });
        Ok(addr)
    }

    /// Stop listening, let in-flight requests finish, then close the database.
    ///
    /// Does nothing when the server is not running.
    pub async fn stop(&self) -> Result<(), SqlRestError> {
        let Some(Running {
            addr,
            worker,
            shutdown,
            handle,
        }) = self.running.lock().await.take()
        else {
            return Ok(());
        };

        let _ = shutdown.send(());
        handle.await.map_err(|e| SqlRestError::Server {
            message: "server task failed".to_string(),
            source: Some(Box::new(e)),
        })?;
        worker.close().await?;

        info!(%addr, "SQLRest stopped");
        self.emit(&format!("stopped listening on {addr}"));
        Ok(())
    }

    /// Bound address while running.
    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|r| r.addr)
    }
}

#[async_trait]
impl Service for SqlRestServer {
    fn name(&self) -> &str {
        "sqlrest-server"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, SqlRestError> {
        let worker = self
            .running
            .lock()
            .await
            .as_ref()
            .map(|r| Arc::clone(&r.worker));
        match worker {
            Some(worker) => worker.health_check().await,
            None => Ok(HealthStatus::Unhealthy("server not started".to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), SqlRestError> {
        self.stop().await
    }
}
