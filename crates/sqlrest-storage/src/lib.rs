// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Serialized SQLite access for SQLRest.
//!
//! Generic, schema-agnostic requests (a table name plus rows of dynamically
//! typed values) are validated and translated into parameterized SQL, then
//! executed one at a time, in submission order, on a single connection owned
//! by the [`Serializer`]. Results come back as [`Payload`](sqlrest_core::Payload)s
//! or [`SqlRestError`](sqlrest_core::SqlRestError)s, ready to become an
//! [`Outcome`](sqlrest_core::Outcome).

pub mod database;
pub mod identifier;
pub mod request;
pub mod serializer;
pub mod statement;
mod value;
pub mod worker;

pub use database::Database;
pub use identifier::Ident;
pub use request::{Request, RowQuery, SortOrder};
pub use serializer::{Completion, Serializer};
pub use statement::{Expect, Guard, Listing, Statement};
pub use worker::Worker;
