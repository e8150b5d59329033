// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Database connection management with PRAGMA setup, WAL mode, and lifecycle.
//!
//! The connection lives on tokio-rusqlite's background thread. Only the
//! [`Serializer`](crate::serializer::Serializer) calls into it.

use std::path::Path;
use std::time::Duration;

use rusqlite::OpenFlags;
use tracing::{debug, error};

use sqlrest_config::model::StorageConfig;
use sqlrest_core::{LogHandler, SqlRestError};

/// An open, verified SQLite database file.
pub struct Database {
    conn: tokio_rusqlite::Connection,
    path: String,
    wal_mode: bool,
}

impl Database {
    /// Open the file named by `config`, apply connection PRAGMAs and confirm
    /// the file really is a database.
    ///
    /// Any failure is an [`SqlRestError::Open`], reported once through
    /// `tracing` and `log` before it is returned.
    pub async fn open(
        config: &StorageConfig,
        log: Option<&LogHandler>,
    ) -> Result<Self, SqlRestError> {
        match Self::try_open(config).await {
            Ok(db) => {
                debug!(path = %db.path, wal = db.wal_mode, "database opened");
                Ok(db)
            }
            Err(e) => {
                error!(path = %config.database_path, error = %e, "failed to open database");
                if let Some(log) = log {
                    log(&e.to_string());
                }
                Err(e)
            }
        }
    }

    async fn try_open(config: &StorageConfig) -> Result<Self, SqlRestError> {
        let path = config.database_path.clone();
        let open_err = |message: String| SqlRestError::Open {
            path: path.clone(),
            message,
        };

        if !config.create_if_missing && !Path::new(&path).exists() {
            return Err(open_err("file does not exist".to_string()));
        }

        let mut flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        if config.create_if_missing {
            flags |= OpenFlags::SQLITE_OPEN_CREATE;
        }

        let conn = tokio_rusqlite::Connection::open_with_flags(&path, flags)
            .await
            .map_err(|e| open_err(e.to_string()))?;

        let busy_timeout = Duration::from_millis(config.busy_timeout_ms);
        let foreign_keys = config.foreign_keys;
        let wal_mode = config.wal_mode;
        conn.call(move |conn| -> Result<(), rusqlite::Error> {
            conn.busy_timeout(busy_timeout)?;
            conn.pragma_update(None, "foreign_keys", foreign_keys)?;
            // Reading the catalog is what rejects a file that is not a database.
            conn.query_row("SELECT count(*) FROM sqlite_master", [], |row| {
                row.get::<_, i64>(0)
            })?;
            if wal_mode {
                conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| {
                    row.get::<_, String>(0)
                })?;
            }
            Ok(())
        })
        .await
        .map_err(|e| open_err(e.to_string()))?;

        Ok(Self {
            conn,
            path,
            wal_mode,
        })
    }

    /// The underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &tokio_rusqlite::Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    /// Checkpoint the WAL (when enabled) and release the handle.
    pub async fn close(self) -> Result<(), SqlRestError> {
        if self.wal_mode {
            self.conn
                .call(|conn| -> Result<(), rusqlite::Error> {
                    conn.execute_batch("PRAGMA wal_checkpoint(TRUNCATE);")?;
                    Ok(())
                })
                .await
                .map_err(map_tr_err)?;
            debug!("WAL checkpoint complete");
        }
        self.conn
            .close()
            .await
            .map_err(|e| SqlRestError::Internal(format!("closing database: {e}")))?;
        debug!(path = %self.path, "database closed");
        Ok(())
    }
}

/// Map a tokio-rusqlite error whose closure failed with a driver error.
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> SqlRestError {
    match e {
        tokio_rusqlite::Error::ConnectionClosed => SqlRestError::NotOpen,
        tokio_rusqlite::Error::Error(e) => sql_error(e),
        other => SqlRestError::Internal(other.to_string()),
    }
}

/// Map a tokio-rusqlite error whose closure already produced an [`SqlRestError`].
pub(crate) fn unwrap_call_err(e: tokio_rusqlite::Error<SqlRestError>) -> SqlRestError {
    match e {
        tokio_rusqlite::Error::ConnectionClosed => SqlRestError::NotOpen,
        tokio_rusqlite::Error::Error(e) => e,
        other => SqlRestError::Internal(other.to_string()),
    }
}

/// Convert a driver error into `SqlExecution`, keeping SQLite's own message.
pub fn sql_error(e: rusqlite::Error) -> SqlRestError {
    match e {
        rusqlite::Error::SqliteFailure(_, Some(message)) => SqlRestError::execution(message),
        other => SqlRestError::execution(other.to_string()),
    }
}
