// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The public face of the storage layer.

use async_trait::async_trait;
use tokio::runtime::Handle;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use sqlrest_config::model::StorageConfig;
use sqlrest_core::{HealthStatus, LogHandler, Outcome, Row, Service, SqlRestError, Value};

use crate::database::Database;
use crate::request::{Request, RowQuery};
use crate::serializer::{Completion, Serializer};

/// Translates domain requests into statements and runs them, one at a time,
/// against a single database file.
///
/// Every method enqueues its work before returning, so two calls made in
/// program order on the same worker execute in that order. Opening two
/// workers on one file is not supported; share one `Worker` instead.
pub struct Worker {
    serializer: Serializer,
    runtime: Handle,
    path: String,
    log: Option<LogHandler>,
}

impl Worker {
    /// Open the database named by `config`.
    pub async fn open(config: &StorageConfig) -> Result<Self, SqlRestError> {
        Self::open_inner(config, None).await
    }

    /// Like [`open`](Self::open), forwarding open failures and failed
    /// requests to `log`.
    pub async fn open_with_log_handler(
        config: &StorageConfig,
        log: LogHandler,
    ) -> Result<Self, SqlRestError> {
        Self::open_inner(config, Some(log)).await
    }

    async fn open_inner(
        config: &StorageConfig,
        log: Option<LogHandler>,
    ) -> Result<Self, SqlRestError> {
        let db = Database::open(config, log.as_ref()).await?;
        let path = db.path().to_string();
        Ok(Self {
            serializer: Serializer::start(db),
            runtime: Handle::current(),
            path,
            log,
        })
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn is_open(&self) -> bool {
        self.serializer.is_open()
    }

    /// Validate, translate and enqueue `request`.
    ///
    /// Validation failures resolve immediately without touching the database.
    pub fn submit(&self, request: Request) -> Completion {
        let operation = request.operation();
        let statement = match request.translate() {
            Ok(statement) => statement,
            Err(e) => {
                report(self.log.as_ref(), operation, &e);
                return Completion::ready(Err(e));
            }
        };

        debug!(operation, sql = %statement.sql(), params = statement.params().len(), "submitting");

        let (tx, rx) = oneshot::channel();
        let log = self.log.clone();
        self.serializer.submit(
            statement,
            Box::new(move |result| {
                if let Err(e) = &result {
                    report(log.as_ref(), operation, e);
                }
                let _ = tx.send(result);
            }),
        );
        Completion::Pending(rx)
    }

    /// Callback form of [`submit`](Self::submit).
    ///
    /// `callback` runs exactly once on the runtime, never inline.
    pub fn dispatch<F>(&self, request: Request, callback: F)
    where
        F: FnOnce(Outcome) + Send + 'static,
    {
        let completion = self.submit(request);
        self.runtime.spawn(async move {
            callback(Outcome::from(completion.await));
        });
    }

    pub fn list_tables(&self) -> Completion {
        self.submit(Request::ListTables)
    }

    pub fn list_rows(&self, table: impl Into<String>, query: impl Into<RowQuery>) -> Completion {
        self.submit(Request::ListRows {
            table: table.into(),
            query: query.into(),
        })
    }

    pub fn insert(&self, table: impl Into<String>, row: Row) -> Completion {
        self.submit(Request::Insert {
            table: table.into(),
            row,
        })
    }

    pub fn update(&self, table: impl Into<String>, primary_key: Row, values: Row) -> Completion {
        self.submit(Request::Update {
            table: table.into(),
            primary_key,
            values,
        })
    }

    pub fn delete(&self, table: impl Into<String>, primary_key: Row) -> Completion {
        self.submit(Request::Delete {
            table: table.into(),
            primary_key,
        })
    }

    pub fn execute(&self, sql: impl Into<String>, params: Vec<Value>) -> Completion {
        self.submit(Request::Execute {
            sql: sql.into(),
            params,
        })
    }

    pub fn table_schema(&self, table: impl Into<String>) -> Completion {
        self.submit(Request::TableSchema {
            table: table.into(),
        })
    }

    pub fn database_info(&self) -> Completion {
        self.submit(Request::DatabaseInfo)
    }

    /// Finish queued work, then release the database. Later requests fail
    /// with `NotOpenError`.
    pub async fn close(&self) -> Result<(), SqlRestError> {
        self.serializer.close().await?;
        debug!(path = %self.path, "worker closed");
        Ok(())
    }
}

fn report(log: Option<&LogHandler>, operation: &str, error: &SqlRestError) {
    warn!(operation, error_code = %error.code(), error = %error, "request failed");
    if let Some(log) = log {
        log(&format!("{operation} failed: {error}"));
    }
}

#[async_trait]
impl Service for Worker {
    fn name(&self) -> &str {
        "sqlite-worker"
    }

    fn version(&self) -> semver::Version {
        semver::Version::new(0, 1, 0)
    }

    async fn health_check(&self) -> Result<HealthStatus, SqlRestError> {
        match self.execute("SELECT 1", vec![]).await {
            Ok(_) => Ok(HealthStatus::Healthy),
            Err(SqlRestError::NotOpen) => Ok(HealthStatus::Unhealthy("database is closed".into())),
            Err(e) => Ok(HealthStatus::Degraded(e.to_string())),
        }
    }

    async fn shutdown(&self) -> Result<(), SqlRestError> {
        self.close().await
    }
}
