// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The body of a work item and its execution on the connection thread.

use rusqlite::Connection;
use rusqlite::fallible_iterator::FallibleIterator;

use sqlrest_core::{
    Changes, ColumnInfo, DatabaseInfo, Page, Payload, Row, SqlRestError, TableSchema, Value,
};

use crate::database::sql_error;
use crate::identifier::Ident;
use crate::value::{from_sql, params};

/// Column names SQLite accepts on any rowid table without declaring them.
const ROWID_ALIASES: &[&str] = &["rowid", "oid", "_rowid_"];

/// Listing projection for tables whose `*` does not include the rowid.
const ROWID_PROJECTION: &str = "rowid AS \"rowid\", *";

/// Shape of the payload a statement produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Expect {
    /// First column of every row, as table names.
    Tables,
    Rows,
    /// `last_insert_rowid()` after execution.
    Inserted,
    /// `changes()` after execution.
    Affected,
    /// Rows when the statement has result columns, [`Changes`] otherwise.
    Inferred,
    /// A table listing; see [`Listing`].
    Listing,
    Schema,
    Info,
}

/// Columns that must exist on `table` before the statement may run.
#[derive(Debug, Clone)]
pub struct Guard {
    table: Ident,
    columns: Vec<Ident>,
}

impl Guard {
    pub fn new(table: Ident, columns: Vec<Ident>) -> Self {
        Self { table, columns }
    }

    fn check(&self, conn: &Connection) -> Result<(), SqlRestError> {
        let declared = table_columns(conn, self.table.as_str())?;
        if declared.is_empty() {
            return Err(SqlRestError::execution(format!(
                "no such table: {}",
                self.table
            )));
        }

        for column in &self.columns {
            let name = column.as_str();
            let known = declared.iter().any(|d| d.eq_ignore_ascii_case(name))
                || ROWID_ALIASES.iter().any(|a| a.eq_ignore_ascii_case(name));
            if !known {
                return Err(SqlRestError::UnknownColumn {
                    table: self.table.to_string(),
                    column: name.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// A row listing whose projection is settled on the connection thread.
///
/// `SELECT *` leaves out the rowid unless a column aliases it, so listings of
/// other rowid tables add it as the first column. With `with_total` the
/// listing also counts every row its filter matches.
#[derive(Debug, Clone)]
pub struct Listing {
    pub(crate) table: Ident,
    /// `" WHERE ..."` or empty. Uses the first `filter_params` parameters.
    pub(crate) filter: String,
    /// `" ORDER BY ... LIMIT ..."` or empty.
    pub(crate) tail: String,
    pub(crate) filter_params: usize,
    pub(crate) with_total: bool,
}

impl Listing {
    fn sql(&self, projection: &str) -> String {
        format!(
            "SELECT {projection} FROM {}{}{}",
            self.table.quoted(),
            self.filter,
            self.tail
        )
    }

    fn count_sql(&self) -> String {
        format!("SELECT count(*) FROM {}{}", self.table.quoted(), self.filter)
    }
}

/// One SQL statement with its bound parameters.
#[derive(Debug, Clone)]
pub struct Statement {
    sql: String,
    params: Vec<Value>,
    expect: Expect,
    guard: Option<Guard>,
    listing: Option<Listing>,
}

impl Statement {
    pub fn new(sql: impl Into<String>, params: Vec<Value>, expect: Expect) -> Self {
        Self {
            sql: sql.into(),
            params,
            expect,
            guard: None,
            listing: None,
        }
    }

    /// A listing statement. [`sql`](Self::sql) shows the plain `SELECT *` form.
    pub fn listing(listing: Listing, params: Vec<Value>) -> Self {
        Self {
            sql: listing.sql("*"),
            params,
            expect: Expect::Listing,
            guard: None,
            listing: Some(listing),
        }
    }

    pub fn guarded(mut self, guard: Guard) -> Self {
        self.guard = Some(guard);
        self
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }

    pub fn expect(&self) -> Expect {
        self.expect
    }

    /// Execute on the connection thread. `path` is the database file, used by
    /// [`Expect::Info`].
    pub(crate) fn run(self, conn: &mut Connection, path: &str) -> Result<Payload, SqlRestError> {
        if let Some(guard) = &self.guard {
            guard.check(conn)?;
        }

        match self.expect {
            Expect::Tables => {
                let mut stmt = conn.prepare(&self.sql).map_err(sql_error)?;
                let names = stmt
                    .query_map(params(&self.params), |row| row.get::<_, String>(0))
                    .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
                    .map_err(sql_error)?;
                Ok(Payload::Tables(names))
            }
            Expect::Rows => query_rows(conn, &self.sql, &self.params).map(Payload::Rows),
            Expect::Inserted => {
                conn.execute(&self.sql, params(&self.params))
                    .map_err(sql_error)?;
                Ok(Payload::Inserted(conn.last_insert_rowid()))
            }
            Expect::Affected => conn
                .execute(&self.sql, params(&self.params))
                .map(Payload::Affected)
                .map_err(sql_error),
            Expect::Inferred => run_inferred(conn, &self.sql, &self.params),
            Expect::Listing => match &self.listing {
                Some(listing) => run_listing(conn, listing, &self.params),
                None => Err(SqlRestError::Internal(
                    "listing statement without a listing".to_string(),
                )),
            },
            Expect::Schema => read_schema(conn, &self.sql, &self.params),
            Expect::Info => read_info(conn, &self.sql, path),
        }
    }
}

fn query_rows(conn: &Connection, sql: &str, values: &[Value]) -> Result<Vec<Row>, SqlRestError> {
    let mut stmt = conn.prepare(sql).map_err(sql_error)?;
    collect_rows(&mut stmt, values)
}

fn collect_rows(
    stmt: &mut rusqlite::Statement<'_>,
    values: &[Value],
) -> Result<Vec<Row>, SqlRestError> {
    let names = distinct_names(stmt);
    let mut rows = stmt.query(params(values)).map_err(sql_error)?;

    let mut out = Vec::new();
    while let Some(row) = rows.next().map_err(sql_error)? {
        let mut record = Row::new();
        for (i, name) in names.iter().enumerate() {
            let value = row.get_ref(i).map_err(sql_error)?;
            record.insert(name.clone(), from_sql(value));
        }
        out.push(record);
    }
    Ok(out)
}

/// Result column names with repeats suffixed `:1`, `:2`, ... so a join that
/// selects two `id` columns keeps both.
fn distinct_names(stmt: &rusqlite::Statement<'_>) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for name in stmt.column_names() {
        let mut candidate = name.to_string();
        let mut n = 0;
        while names.contains(&candidate) {
            n += 1;
            candidate = format!("{name}:{n}");
        }
        names.push(candidate);
    }
    names
}

fn run_listing(
    conn: &Connection,
    listing: &Listing,
    values: &[Value],
) -> Result<Payload, SqlRestError> {
    let projection = if hides_rowid(conn, &listing.table)? {
        ROWID_PROJECTION
    } else {
        "*"
    };
    let rows = query_rows(conn, &listing.sql(projection), values)?;
    if !listing.with_total {
        return Ok(Payload::Rows(rows));
    }

    let filter_values = values.get(..listing.filter_params).unwrap_or(values);
    let total: i64 = conn
        .query_row(&listing.count_sql(), params(filter_values), |row| row.get(0))
        .map_err(sql_error)?;
    Ok(Payload::Page(Page {
        rows,
        total_rows: u64::try_from(total).unwrap_or(0),
    }))
}

/// True for a rowid table whose `SELECT *` does not already carry the rowid,
/// either through an INTEGER PRIMARY KEY alias or a column named `rowid`.
fn hides_rowid(conn: &Connection, table: &Ident) -> Result<bool, SqlRestError> {
    let mut stmt = conn
        .prepare_cached("SELECT name, type, pk FROM pragma_table_xinfo(?1)")
        .map_err(sql_error)?;
    let columns = stmt
        .query_map([table.as_str()], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
            ))
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(sql_error)?;

    if columns
        .iter()
        .any(|(name, _, _)| name.eq_ignore_ascii_case("rowid"))
    {
        return Ok(false);
    }
    let pk: Vec<&str> = columns
        .iter()
        .filter(|(_, _, pk)| *pk > 0)
        .map(|(_, declared, _)| declared.as_str())
        .collect();
    if matches!(pk.as_slice(), [declared] if declared.eq_ignore_ascii_case("INTEGER")) {
        return Ok(false);
    }

    // WITHOUT ROWID tables reject the column outright.
    let check = format!("SELECT rowid FROM {} LIMIT 0", table.quoted());
    Ok(conn.prepare(&check).is_ok())
}

fn run_inferred(conn: &Connection, sql: &str, values: &[Value]) -> Result<Payload, SqlRestError> {
    let mut batch = rusqlite::Batch::new(conn, sql);
    let Some(mut stmt) = batch.next().map_err(sql_error)? else {
        return Err(SqlRestError::execution("no statement to execute"));
    };
    if batch.next().map_err(sql_error)?.is_some() {
        return Err(SqlRestError::execution("multiple statements provided"));
    }

    if stmt.column_count() > 0 {
        return collect_rows(&mut stmt, values).map(Payload::Rows);
    }

    let rows_affected = stmt.execute(params(values)).map_err(sql_error)?;
    Ok(Payload::Changes(Changes {
        rows_affected,
        last_insert_id: conn.last_insert_rowid(),
    }))
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<String>, SqlRestError> {
    let mut stmt = conn
        .prepare_cached("SELECT name FROM pragma_table_xinfo(?1)")
        .map_err(sql_error)?;
    stmt.query_map([table], |row| row.get::<_, String>(0))
        .and_then(|rows| rows.collect())
        .map_err(sql_error)
}

/// `sql` selects the `CREATE` text for the table named by the single parameter.
fn read_schema(conn: &Connection, sql: &str, values: &[Value]) -> Result<Payload, SqlRestError> {
    let name = values.first().and_then(Value::as_str).ok_or_else(|| {
        SqlRestError::Internal("schema statement requires a table name".to_string())
    })?;

    let mut stmt = conn
        .prepare_cached(
            "SELECT cid, name, type, \"notnull\", dflt_value, pk FROM pragma_table_xinfo(?1) \
             WHERE hidden <> 1 ORDER BY cid",
        )
        .map_err(sql_error)?;
    let columns = stmt
        .query_map([name], |row| {
            Ok(ColumnInfo {
                cid: row.get(0)?,
                name: row.get(1)?,
                declared_type: row.get(2)?,
                not_null: row.get::<_, i64>(3)? != 0,
                default_value: match from_sql(row.get_ref(4)?) {
                    Value::Null => None,
                    v => Some(v),
                },
                primary_key: row.get(5)?,
            })
        })
        .and_then(|rows| rows.collect::<Result<Vec<_>, _>>())
        .map_err(sql_error)?;

    if columns.is_empty() {
        return Err(SqlRestError::execution(format!("no such table: {name}")));
    }

    let create_sql = conn
        .query_row(sql, params(values), |row| row.get::<_, Option<String>>(0))
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            e => Err(e),
        })
        .map_err(sql_error)?;

    Ok(Payload::Schema(TableSchema {
        name: name.to_string(),
        sql: create_sql,
        columns,
    }))
}

/// `sql` yields the SQLite library version.
fn read_info(conn: &Connection, sql: &str, path: &str) -> Result<Payload, SqlRestError> {
    let pragma = |name: &str| -> Result<i64, SqlRestError> {
        conn.pragma_query_value(None, name, |row| row.get(0))
            .map_err(sql_error)
    };

    let sqlite_version: String = conn
        .query_row(sql, [], |row| row.get(0))
        .map_err(sql_error)?;
    let encoding: String = conn
        .pragma_query_value(None, "encoding", |row| row.get(0))
        .map_err(sql_error)?;

    let file = std::path::Path::new(path);
    Ok(Payload::Info(DatabaseInfo {
        path: path.to_string(),
        file_name: file
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        size_bytes: std::fs::metadata(file).map(|m| m.len()).unwrap_or(0),
        page_size: pragma("page_size")?,
        page_count: pragma("page_count")?,
        freelist_count: pragma("freelist_count")?,
        schema_version: pragma("schema_version")?,
        user_version: pragma("user_version")?,
        encoding,
        sqlite_version,
    }))
}
