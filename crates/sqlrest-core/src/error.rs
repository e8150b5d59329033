// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types shared by every SQLRest crate.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// The error type returned by the worker, the serializer and the gateway.
///
/// Every variant maps onto exactly one stable [`ErrorCode`], which is what
/// callers see in an [`Outcome`](crate::Outcome).
#[derive(Debug, Error)]
pub enum SqlRestError {
    /// The database file could not be opened or is not a database.
    #[error("cannot open database at `{path}`: {message}")]
    Open { path: String, message: String },

    /// A table or column name failed identifier validation.
    #[error("invalid identifier `{name}`: {reason}")]
    InvalidIdentifier { name: String, reason: String },

    /// A filter, primary key or value map references a column the table lacks.
    #[error("table `{table}` has no column `{column}`")]
    UnknownColumn { table: String, column: String },

    /// Insert/update called without any column to write.
    #[error("{operation} requires at least one column")]
    EmptyPayload { operation: String },

    /// Update/delete called with an empty primary-key descriptor.
    #[error("{operation} requires a non-empty primary key")]
    EmptyPrimaryKey { operation: String },

    /// The statement failed inside SQLite. The message is the driver's own.
    #[error("{message}")]
    SqlExecution { message: String },

    /// A request could not be decoded (malformed body, query or path).
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Work was submitted after the connection was closed.
    #[error("database is not open")]
    NotOpen,

    /// Configuration could not be loaded or applied.
    #[error("configuration error: {0}")]
    Config(String),

    /// The HTTP listener failed to bind or serve.
    #[error("server error: {message}")]
    Server {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl SqlRestError {
    /// The stable machine-readable code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            Self::Open { .. } => ErrorCode::OpenError,
            Self::InvalidIdentifier { .. } => ErrorCode::InvalidIdentifierError,
            Self::UnknownColumn { .. } => ErrorCode::UnknownColumnError,
            Self::EmptyPayload { .. } => ErrorCode::EmptyPayloadError,
            Self::EmptyPrimaryKey { .. } => ErrorCode::EmptyPrimaryKeyError,
            Self::SqlExecution { .. } => ErrorCode::SqlExecutionError,
            Self::BadRequest(_) => ErrorCode::BadRequestError,
            Self::NotOpen => ErrorCode::NotOpenError,
            Self::Config(_) | Self::Server { .. } | Self::Internal(_) => ErrorCode::InternalError,
        }
    }

    /// Shorthand for an execution failure carrying a driver message.
    pub fn execution(message: impl Into<String>) -> Self {
        Self::SqlExecution {
            message: message.into(),
        }
    }
}

/// Stable error codes exposed through the callback contract.
///
/// The string forms never change; HTTP clients match on them.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
pub enum ErrorCode {
    OpenError,
    InvalidIdentifierError,
    UnknownColumnError,
    EmptyPayloadError,
    EmptyPrimaryKeyError,
    #[strum(serialize = "SQLExecutionError")]
    #[serde(rename = "SQLExecutionError")]
    SqlExecutionError,
    BadRequestError,
    NotOpenError,
    InternalError,
}

impl ErrorCode {
    /// True for errors detected before any SQL reaches the database.
    pub fn is_validation(self) -> bool {
        matches!(
            self,
            Self::InvalidIdentifierError
                | Self::UnknownColumnError
                | Self::EmptyPayloadError
                | Self::EmptyPrimaryKeyError
                | Self::BadRequestError
        )
    }
}
