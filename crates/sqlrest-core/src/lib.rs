// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for SQLRest.
//!
//! This crate holds the vocabulary every other crate speaks: the dynamic
//! [`Value`]/[`Row`] model, result [`Payload`]s, the [`Outcome`] completion
//! contract, the [`SqlRestError`] taxonomy and the [`Service`] lifecycle trait.
//! It has no database or HTTP dependency.

pub mod error;
pub mod outcome;
pub mod payload;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorCode, SqlRestError};
pub use outcome::Outcome;
pub use payload::{Changes, ColumnInfo, DatabaseInfo, Page, Payload, TableSchema};
pub use traits::Service;
pub use types::{HealthStatus, LogHandler, Row, Value};
