// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain requests and their translation into parameterized statements.
//!
//! Translation is pure: it validates identifiers and payload shape and builds
//! SQL text plus bound values. It never touches the database. Column
//! existence is left to the statement's [`Guard`], which runs on the
//! connection thread.

use serde::Deserialize;
use strum::{Display, EnumString};

use sqlrest_core::{Row, SqlRestError, Value};

use crate::identifier::Ident;
use crate::statement::{Expect, Guard, Listing, Statement};

const LIST_TABLES_SQL: &str = "SELECT name FROM sqlite_master \
     WHERE type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name";

const TABLE_SQL_SQL: &str =
    "SELECT sql FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1";

const SQLITE_VERSION_SQL: &str = "SELECT sqlite_version()";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Display, EnumString, Deserialize)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn keyword(self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

/// Filtering, ordering and paging for a row listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowQuery {
    /// Equality constraints, AND-joined. A `Null` value matches SQL NULL.
    pub filter: Row,
    pub order_by: Option<String>,
    pub order: SortOrder,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    /// Also count every row the filter matches, ignoring the page.
    pub with_total: bool,
}

impl RowQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filter.insert(column, value);
        self
    }

    pub fn order_by(mut self, column: impl Into<String>, order: SortOrder) -> Self {
        self.order_by = Some(column.into());
        self.order = order;
        self
    }

    pub fn page(mut self, limit: u32, offset: u32) -> Self {
        self.limit = Some(limit);
        self.offset = Some(offset);
        self
    }

    pub fn with_total(mut self) -> Self {
        self.with_total = true;
        self
    }
}

impl From<Row> for RowQuery {
    fn from(filter: Row) -> Self {
        Self {
            filter,
            ..Self::default()
        }
    }
}

/// One domain operation against the database.
#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    ListTables,
    ListRows {
        table: String,
        query: RowQuery,
    },
    Insert {
        table: String,
        row: Row,
    },
    Update {
        table: String,
        primary_key: Row,
        values: Row,
    },
    Delete {
        table: String,
        primary_key: Row,
    },
    /// Caller-authored SQL, run as-is with optional bound parameters.
    Execute {
        sql: String,
        params: Vec<Value>,
    },
    TableSchema {
        table: String,
    },
    DatabaseInfo,
}

impl Request {
    /// Short operation name used in logs and error messages.
    pub fn operation(&self) -> &'static str {
        match self {
            Request::ListTables => "list_tables",
            Request::ListRows { .. } => "list_rows",
            Request::Insert { .. } => "insert",
            Request::Update { .. } => "update",
            Request::Delete { .. } => "delete",
            Request::Execute { .. } => "execute",
            Request::TableSchema { .. } => "table_schema",
            Request::DatabaseInfo => "database_info",
        }
    }

    /// Validate and build the statement for this request.
    pub fn translate(self) -> Result<Statement, SqlRestError> {
        let operation = self.operation();
        match self {
            Request::ListTables => Ok(Statement::new(LIST_TABLES_SQL, vec![], Expect::Tables)),
            Request::ListRows { table, query } => list_rows(&table, query),
            Request::Insert { table, row } => insert(&table, row),
            Request::Update {
                table,
                primary_key,
                values,
            } => update(&table, primary_key, values),
            Request::Delete { table, primary_key } => delete(&table, primary_key),
            Request::Execute { sql, params } => {
                if sql.trim().is_empty() {
                    return Err(SqlRestError::EmptyPayload {
                        operation: operation.to_string(),
                    });
                }
                Ok(Statement::new(sql, params, Expect::Inferred))
            }
            Request::TableSchema { table } => {
                let table = Ident::parse(&table)?;
                Ok(Statement::new(
                    TABLE_SQL_SQL,
                    vec![Value::Text(table.to_string())],
                    Expect::Schema,
                ))
            }
            Request::DatabaseInfo => Ok(Statement::new(SQLITE_VERSION_SQL, vec![], Expect::Info)),
        }
    }
}

/// Parse every key of `row`, returning identifiers and values in order.
fn split_row(row: Row) -> Result<(Vec<Ident>, Vec<Value>), SqlRestError> {
    let mut columns = Vec::with_capacity(row.len());
    let mut values = Vec::with_capacity(row.len());
    for (column, value) in row {
        columns.push(Ident::parse(&column)?);
        values.push(value);
    }
    Ok((columns, values))
}

/// `"a" = ?n AND "b" IS ?m ...`, numbering placeholders from `first`.
fn where_clause(columns: &[Ident], values: &[Value], first: usize) -> String {
    columns
        .iter()
        .zip(values)
        .enumerate()
        .map(|(i, (column, value))| {
            let op = if value.is_null() { "IS" } else { "=" };
            format!("{} {op} ?{}", column.quoted(), first + i)
        })
        .collect::<Vec<_>>()
        .join(" AND ")
}

fn list_rows(table: &str, query: RowQuery) -> Result<Statement, SqlRestError> {
    let table = Ident::parse(table)?;
    let (columns, mut params) = split_row(query.filter)?;
    let order_by = query.order_by.as_deref().map(Ident::parse).transpose()?;

    let filter = if columns.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", where_clause(&columns, &params, 1))
    };
    let filter_params = params.len();

    let mut tail = String::new();
    if let Some(column) = &order_by {
        tail.push_str(&format!(" ORDER BY {} {}", column.quoted(), query.order.keyword()));
    }
    if query.limit.is_some() || query.offset.is_some() {
        // SQLite needs a LIMIT before OFFSET; -1 means unbounded.
        let limit = query.limit.map_or(-1, i64::from);
        params.push(Value::Integer(limit));
        tail.push_str(&format!(" LIMIT ?{}", params.len()));
        if let Some(offset) = query.offset {
            params.push(Value::Integer(i64::from(offset)));
            tail.push_str(&format!(" OFFSET ?{}", params.len()));
        }
    }

    let mut checked = columns;
    checked.extend(order_by);
    let guard = Guard::new(table.clone(), checked);
    let listing = Listing {
        table,
        filter,
        tail,
        filter_params,
        with_total: query.with_total,
    };
    Ok(Statement::listing(listing, params).guarded(guard))
}

fn insert(table: &str, row: Row) -> Result<Statement, SqlRestError> {
    let table = Ident::parse(table)?;
    if row.is_empty() {
        return Err(SqlRestError::EmptyPayload {
            operation: "insert".to_string(),
        });
    }
    let (columns, params) = split_row(row)?;

    let names = columns
        .iter()
        .map(Ident::quoted)
        .collect::<Vec<_>>()
        .join(", ");
    let placeholders = (1..=params.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "INSERT INTO {} ({names}) VALUES ({placeholders})",
        table.quoted()
    );
    Ok(Statement::new(sql, params, Expect::Inserted))
}

fn update(table: &str, primary_key: Row, values: Row) -> Result<Statement, SqlRestError> {
    let table = Ident::parse(table)?;
    if primary_key.is_empty() {
        return Err(SqlRestError::EmptyPrimaryKey {
            operation: "update".to_string(),
        });
    }
    if values.is_empty() {
        return Err(SqlRestError::EmptyPayload {
            operation: "update".to_string(),
        });
    }
    let (set_columns, mut params) = split_row(values)?;
    let (key_columns, key_values) = split_row(primary_key)?;

    let assignments = set_columns
        .iter()
        .enumerate()
        .map(|(i, column)| format!("{} = ?{}", column.quoted(), i + 1))
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!(
        "UPDATE {} SET {assignments} WHERE {}",
        table.quoted(),
        where_clause(&key_columns, &key_values, params.len() + 1)
    );
    params.extend(key_values);

    let mut checked = set_columns;
    checked.extend(key_columns);
    Ok(Statement::new(sql, params, Expect::Affected).guarded(Guard::new(table, checked)))
}

fn delete(table: &str, primary_key: Row) -> Result<Statement, SqlRestError> {
    let table = Ident::parse(table)?;
    if primary_key.is_empty() {
        return Err(SqlRestError::EmptyPrimaryKey {
            operation: "delete".to_string(),
        });
    }
    let (columns, params) = split_row(primary_key)?;

    let sql = format!(
        "DELETE FROM {} WHERE {}",
        table.quoted(),
        where_clause(&columns, &params, 1)
    );
    Ok(Statement::new(sql, params, Expect::Affected).guarded(Guard::new(table, columns)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlrest_core::ErrorCode;
    use std::str::FromStr;

    fn code(request: Request) -> ErrorCode {
        request.translate().unwrap_err().code()
    }

    #[test]
    fn list_rows_without_filter_selects_everything() {
        let stmt = Request::ListRows {
            table: "users".into(),
            query: RowQuery::new(),
        }
        .translate()
        .unwrap();
        assert_eq!(stmt.sql(), r#"SELECT * FROM "users""#);
        assert!(stmt.params().is_empty());
        assert_eq!(stmt.expect(), Expect::Listing);
    }

    #[test]
    fn list_rows_binds_filter_and_paging() {
        let query = RowQuery::new()
            .filter("name", "o'brien")
            .filter("deleted_at", Value::Null)
            .order_by("id", SortOrder::Desc)
            .page(10, 20);
        let stmt = Request::ListRows {
            table: "users".into(),
            query,
        }
        .translate()
        .unwrap();

        assert_eq!(
            stmt.sql(),
            r#"SELECT * FROM "users" WHERE "name" = ?1 AND "deleted_at" IS ?2 ORDER BY "id" DESC LIMIT ?3 OFFSET ?4"#
        );
        assert_eq!(
            stmt.params(),
            &[
                Value::Text("o'brien".into()),
                Value::Null,
                Value::Integer(10),
                Value::Integer(20)
            ]
        );
    }

    #[test]
    fn offset_alone_gets_unbounded_limit() {
        let query = RowQuery {
            offset: Some(5),
            ..RowQuery::default()
        };
        let stmt = Request::ListRows {
            table: "t".into(),
            query,
        }
        .translate()
        .unwrap();
        assert_eq!(stmt.sql(), r#"SELECT * FROM "t" LIMIT ?1 OFFSET ?2"#);
        assert_eq!(stmt.params(), &[Value::Integer(-1), Value::Integer(5)]);
    }

    #[test]
    fn insert_orders_values_like_columns() {
        let row = Row::new().with("name", "a").with("age", 3);
        let stmt = Request::Insert {
            table: "people".into(),
            row,
        }
        .translate()
        .unwrap();
        assert_eq!(
            stmt.sql(),
            r#"INSERT INTO "people" ("name", "age") VALUES (?1, ?2)"#
        );
        assert_eq!(stmt.params(), &[Value::from("a"), Value::Integer(3)]);
        assert_eq!(stmt.expect(), Expect::Inserted);
    }

    #[test]
    fn update_numbers_key_after_values() {
        let stmt = Request::Update {
            table: "t".into(),
            primary_key: Row::new().with("id", 1),
            values: Row::new().with("name", "b").with("score", 2.0),
        }
        .translate()
        .unwrap();
        assert_eq!(
            stmt.sql(),
            r#"UPDATE "t" SET "name" = ?1, "score" = ?2 WHERE "id" = ?3"#
        );
        assert_eq!(
            stmt.params(),
            &[Value::from("b"), Value::Real(2.0), Value::Integer(1)]
        );
    }

    #[test]
    fn delete_supports_composite_keys() {
        let stmt = Request::Delete {
            table: "memberships".into(),
            primary_key: Row::new().with("user_id", 1).with("group_id", 2),
        }
        .translate()
        .unwrap();
        assert_eq!(
            stmt.sql(),
            r#"DELETE FROM "memberships" WHERE "user_id" = ?1 AND "group_id" = ?2"#
        );
    }

    #[test]
    fn empty_payloads_are_rejected_before_sql() {
        assert_eq!(
            code(Request::Insert {
                table: "t".into(),
                row: Row::new()
            }),
            ErrorCode::EmptyPayloadError
        );
        assert_eq!(
            code(Request::Update {
                table: "t".into(),
                primary_key: Row::new().with("id", 1),
                values: Row::new()
            }),
            ErrorCode::EmptyPayloadError
        );
        assert_eq!(
            code(Request::Update {
                table: "t".into(),
                primary_key: Row::new(),
                values: Row::new().with("a", 1)
            }),
            ErrorCode::EmptyPrimaryKeyError
        );
        assert_eq!(
            code(Request::Delete {
                table: "t".into(),
                primary_key: Row::new()
            }),
            ErrorCode::EmptyPrimaryKeyError
        );
        assert_eq!(
            code(Request::Execute {
                sql: "  ".into(),
                params: vec![]
            }),
            ErrorCode::EmptyPayloadError
        );
    }

    #[test]
    fn hostile_identifiers_are_rejected() {
        assert_eq!(
            code(Request::ListRows {
                table: "t; DROP TABLE t".into(),
                query: RowQuery::new()
            }),
            ErrorCode::InvalidIdentifierError
        );
        assert_eq!(
            code(Request::ListRows {
                table: "t".into(),
                query: RowQuery::new().filter("a\" OR 1=1 --", 1)
            }),
            ErrorCode::InvalidIdentifierError
        );
        assert_eq!(
            code(Request::ListRows {
                table: "t".into(),
                query: RowQuery::new().order_by("id desc", SortOrder::Asc)
            }),
            ErrorCode::InvalidIdentifierError
        );
        assert_eq!(
            code(Request::Insert {
                table: "t".into(),
                row: Row::new().with("bad name", 1)
            }),
            ErrorCode::InvalidIdentifierError
        );
        assert_eq!(
            code(Request::TableSchema {
                table: "sqlite_master'".into()
            }),
            ErrorCode::InvalidIdentifierError
        );
    }

    #[test]
    fn raw_sql_passes_through_verbatim() {
        let stmt = Request::Execute {
            sql: "select 1; -- hi".into(),
            params: vec![Value::Integer(1)],
        }
        .translate()
        .unwrap();
        assert_eq!(stmt.sql(), "select 1; -- hi");
        assert_eq!(stmt.expect(), Expect::Inferred);
    }

    #[test]
    fn sort_order_parses_case_insensitively() {
        assert_eq!(SortOrder::from_str("DESC").unwrap(), SortOrder::Desc);
        assert_eq!(SortOrder::from_str("asc").unwrap(), SortOrder::Asc);
        assert!(SortOrder::from_str("sideways").is_err());
        assert_eq!(SortOrder::Desc.to_string(), "desc");
    }
}
