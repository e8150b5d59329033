// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Successful result payloads, one shape per operation.

use serde::Serialize;

use crate::types::{Row, Value};

/// The result of a successfully completed work item.
///
/// Serialized untagged: the JSON form is just the inner value, so an insert
/// yields `1`, a listing yields an array of row objects, and so on.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Payload {
    /// Table names, sorted, internal tables excluded.
    Tables(Vec<String>),
    /// Rows in result order, each keyed by column in select order.
    Rows(Vec<Row>),
    /// One page of a listing plus the number of rows matching its filter.
    Page(Page),
    /// Rowid of the freshly inserted row.
    Inserted(i64),
    /// Rows touched by an update or delete. Zero means "no match".
    Affected(usize),
    /// Outcome of a caller-authored statement that produced no result set.
    Changes(Changes),
    /// Column layout of one table.
    Schema(TableSchema),
    /// File and engine metadata.
    Info(DatabaseInfo),
}

impl Payload {
    pub fn rows(&self) -> Option<&[Row]> {
        match self {
            Payload::Rows(rows) => Some(rows),
            Payload::Page(page) => Some(&page.rows),
            _ => None,
        }
    }

    pub fn affected(&self) -> Option<usize> {
        match self {
            Payload::Affected(n) => Some(*n),
            Payload::Changes(changes) => Some(changes.rows_affected),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Changes {
    pub rows_affected: usize,
    pub last_insert_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub rows: Vec<Row>,
    /// Matching rows ignoring limit and offset.
    pub total_rows: u64,
}

/// One entry of `PRAGMA table_xinfo`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ColumnInfo {
    pub cid: i64,
    pub name: String,
    /// Declared type, empty when the column was declared without one.
    pub declared_type: String,
    pub not_null: bool,
    pub default_value: Option<Value>,
    /// 1-based position inside the primary key, 0 when not part of it.
    pub primary_key: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSchema {
    pub name: String,
    /// The `CREATE` statement recorded in the schema catalog.
    pub sql: Option<String>,
    pub columns: Vec<ColumnInfo>,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Primary-key columns in key order.
    pub fn primary_key(&self) -> Vec<&str> {
        let mut pk: Vec<&ColumnInfo> = self.columns.iter().filter(|c| c.primary_key > 0).collect();
        pk.sort_by_key(|c| c.primary_key);
        pk.into_iter().map(|c| c.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DatabaseInfo {
    pub path: String,
    pub file_name: String,
    pub size_bytes: u64,
    pub page_size: i64,
    pub page_count: i64,
    pub freelist_count: i64,
    pub schema_version: i64,
    pub user_version: i64,
    pub encoding: String,
    pub sqlite_version: String,
}
