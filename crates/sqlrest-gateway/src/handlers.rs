// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the REST API.
//!
//! Each handler turns path, query and body into one [`Request`], awaits the
//! worker and writes the [`Outcome`] as the JSON body.

use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, PathRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};

use sqlrest_core::{
    ErrorCode, HealthStatus, Outcome, Page, Payload, Row, Service, SqlRestError, Value,
};
use sqlrest_storage::{Request, RowQuery, SortOrder};

use crate::server::{ApiLimits, GatewayState};

/// Rendered in place of blobs longer than the inline limit.
pub const BLOB_PLACEHOLDER: &str = "<BLOB>";

/// Response header carrying the number of rows a listing's filter matches.
pub const TOTAL_COUNT_HEADER: &str = "x-total-count";

/// Body for `PUT {p}/tables/{table}/rows`.
#[derive(Debug, Deserialize)]
pub struct UpdateBody {
    pub primary_key: Row,
    pub values: Row,
}

/// Body for `DELETE {p}/tables/{table}/rows`.
#[derive(Debug, Deserialize)]
pub struct DeleteBody {
    pub primary_key: Row,
}

/// Body for `POST {p}/db/sql`.
#[derive(Debug, Deserialize)]
pub struct SqlBody {
    pub sql: String,
    #[serde(default)]
    pub params: Vec<Value>,
}

/// Response body for `GET /health`.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// HTTP status for an outcome's error code.
pub fn status_for(code: Option<ErrorCode>) -> StatusCode {
    match code {
        None => StatusCode::OK,
        Some(code) if code.is_validation() => StatusCode::BAD_REQUEST,
        Some(ErrorCode::SqlExecutionError) => StatusCode::UNPROCESSABLE_ENTITY,
        Some(ErrorCode::OpenError | ErrorCode::NotOpenError) => StatusCode::SERVICE_UNAVAILABLE,
        Some(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

/// Replace oversized blobs in row results with [`BLOB_PLACEHOLDER`].
pub fn inline_blobs(outcome: Outcome, limit: usize) -> Outcome {
    let Outcome {
        success,
        result,
        error_message,
        error_code,
    } = outcome;

    let result = result.map(|payload| match payload {
        Payload::Rows(rows) => Payload::Rows(
            rows.into_iter()
                .map(|row| {
                    row.into_iter()
                        .map(|(column, value)| match value {
                            Value::Blob(bytes) if bytes.len() > limit => {
                                (column, Value::Text(BLOB_PLACEHOLDER.to_string()))
                            }
                            other => (column, other),
                        })
                        .collect()
                })
                .collect(),
        ),
        other => other,
    });

    Outcome {
        success,
        result,
        error_message,
        error_code,
    }
}

fn respond(limits: ApiLimits, result: Result<Payload, SqlRestError>) -> Response {
    let outcome = inline_blobs(Outcome::from(result), limits.blob_inline_limit);
    (status_for(outcome.error_code), Json(outcome)).into_response()
}

async fn run(state: &GatewayState, request: Request) -> Response {
    respond(state.limits, state.worker.submit(request).await)
}

fn bad_request(message: impl Into<String>) -> Response {
    let error = SqlRestError::BadRequest(message.into());
    (StatusCode::BAD_REQUEST, Json(Outcome::failure(&error))).into_response()
}

/// Build a [`RowQuery`] from listing query parameters.
///
/// `_page` (1-based), `_per_page`, `_sort` and `_order` are reserved; every
/// other pair is an equality filter on that column. The query always asks
/// for the total row count.
pub fn row_query(params: Vec<(String, String)>, limits: ApiLimits) -> Result<RowQuery, String> {
    let mut query = RowQuery::new().with_total();
    let mut page: u32 = 1;
    let mut per_page = limits.default_page_size;

    for (key, value) in params {
        match key.as_str() {
            "_page" => {
                page = value
                    .parse()
                    .ok()
                    .filter(|p| *p >= 1)
                    .ok_or_else(|| format!("_page must be a positive integer, got `{value}`"))?;
            }
            "_per_page" => {
                per_page = value
                    .parse()
                    .ok()
                    .filter(|p| *p >= 1)
                    .ok_or_else(|| format!("_per_page must be a positive integer, got `{value}`"))?;
            }
            "_sort" => query.order_by = Some(value),
            "_order" => {
                query.order = value
                    .parse::<SortOrder>()
                    .map_err(|_| format!("_order must be `asc` or `desc`, got `{value}`"))?;
            }
            _ => {
                query.filter.insert(key, value);
            }
        }
    }

    let per_page = per_page.min(limits.max_page_size);
    query.limit = Some(per_page);
    query.offset = Some((page - 1).saturating_mul(per_page));
    Ok(query)
}

/// GET /health
pub async fn health(State(state): State<GatewayState>) -> Response {
    let (status, detail) = match state.worker.health_check().await {
        Ok(HealthStatus::Healthy) => ("ok", None),
        Ok(HealthStatus::Degraded(reason)) => ("degraded", Some(reason)),
        Ok(HealthStatus::Unhealthy(reason)) => ("unhealthy", Some(reason)),
        Err(e) => ("unhealthy", Some(e.to_string())),
    };
    let code = if status == "unhealthy" {
        StatusCode::SERVICE_UNAVAILABLE
    } else {
        StatusCode::OK
    };
    let body = HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        detail,
    };
    (code, Json(body)).into_response()
}

/// GET {p}/tables
pub async fn list_tables(State(state): State<GatewayState>) -> Response {
    run(&state, Request::ListTables).await
}

/// GET {p}/tables/{table}/schema
pub async fn table_schema(
    State(state): State<GatewayState>,
    Path(table): Path<String>,
) -> Response {
    run(&state, Request::TableSchema { table }).await
}

/// GET {p}/tables/{table}/rows
pub async fn list_rows(
    State(state): State<GatewayState>,
    Path(table): Path<String>,
    params: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> Response {
    let params = match params {
        Ok(Query(params)) => params,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    let query = match row_query(params, state.limits) {
        Ok(query) => query,
        Err(message) => return bad_request(message),
    };
    match state.worker.submit(Request::ListRows { table, query }).await {
        Ok(Payload::Page(Page { rows, total_rows })) => {
            let mut response = respond(state.limits, Ok(Payload::Rows(rows)));
            response
                .headers_mut()
                .insert(TOTAL_COUNT_HEADER, HeaderValue::from(total_rows));
            response
        }
        other => respond(state.limits, other),
    }
}

/// POST {p}/tables/{table}/rows
pub async fn insert_row(
    State(state): State<GatewayState>,
    Path(table): Path<String>,
    body: Result<Json<Row>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(row)) => run(&state, Request::Insert { table, row }).await,
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

/// PUT {p}/tables/{table}/rows
pub async fn update_rows(
    State(state): State<GatewayState>,
    Path(table): Path<String>,
    body: Result<Json<UpdateBody>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(UpdateBody {
            primary_key,
            values,
        })) => {
            run(
                &state,
                Request::Update {
                    table,
                    primary_key,
                    values,
                },
            )
            .await
        }
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

/// DELETE {p}/tables/{table}/rows
pub async fn delete_rows(
    State(state): State<GatewayState>,
    Path(table): Path<String>,
    body: Result<Json<DeleteBody>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(DeleteBody { primary_key })) => {
            run(&state, Request::Delete { table, primary_key }).await
        }
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

/// PUT {p}/tables/{table}/rows/{rowid}
pub async fn update_by_rowid(
    State(state): State<GatewayState>,
    path: Result<Path<(String, i64)>, PathRejection>,
    body: Result<Json<Row>, JsonRejection>,
) -> Response {
    let (table, rowid) = match path {
        Ok(Path(path)) => path,
        Err(rejection) => return bad_request(rejection.body_text()),
    };
    match body {
        Ok(Json(values)) => {
            let request = Request::Update {
                table,
                primary_key: Row::new().with("rowid", rowid),
                values,
            };
            run(&state, request).await
        }
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

/// DELETE {p}/tables/{table}/rows/{rowid}
pub async fn delete_by_rowid(
    State(state): State<GatewayState>,
    path: Result<Path<(String, i64)>, PathRejection>,
) -> Response {
    match path {
        Ok(Path((table, rowid))) => {
            let request = Request::Delete {
                table,
                primary_key: Row::new().with("rowid", rowid),
            };
            run(&state, request).await
        }
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

/// POST {p}/db/sql
pub async fn execute_sql(
    State(state): State<GatewayState>,
    body: Result<Json<SqlBody>, JsonRejection>,
) -> Response {
    match body {
        Ok(Json(SqlBody { sql, params })) => run(&state, Request::Execute { sql, params }).await,
        Err(rejection) => bad_request(rejection.body_text()),
    }
}

/// GET {p}/db/info
pub async fn database_info(State(state): State<GatewayState>) -> Response {
    run(&state, Request::DatabaseInfo).await
}

pub async fn not_found() -> Response {
    let error = SqlRestError::BadRequest("no such route".to_string());
    (StatusCode::NOT_FOUND, Json(Outcome::failure(&error))).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    const LIMITS: ApiLimits = ApiLimits {
        default_page_size: 50,
        max_page_size: 100,
        blob_inline_limit: 4,
    };

    fn pairs(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn status_mapping() {
        assert_eq!(status_for(None), StatusCode::OK);
        assert_eq!(
            status_for(Some(ErrorCode::InvalidIdentifierError)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(Some(ErrorCode::UnknownColumnError)),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_for(Some(ErrorCode::SqlExecutionError)),
            StatusCode::UNPROCESSABLE_ENTITY
        );
        assert_eq!(
            status_for(Some(ErrorCode::NotOpenError)),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            status_for(Some(ErrorCode::InternalError)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn row_query_defaults_to_first_page() {
        let query = row_query(vec![], LIMITS).unwrap();
        assert_eq!(query.limit, Some(50));
        assert_eq!(query.offset, Some(0));
        assert!(query.filter.is_empty());
        assert!(query.with_total);
    }

    #[test]
    fn row_query_splits_reserved_keys_from_filters() {
        let query = row_query(
            pairs(&[
                ("name", "bob"),
                ("_sort", "age"),
                ("_order", "DESC"),
                ("_page", "3"),
                ("_per_page", "10"),
                ("city", "Oslo"),
            ]),
            LIMITS,
        )
        .unwrap();
        assert_eq!(
            query.filter,
            Row::new().with("name", "bob").with("city", "Oslo")
        );
        assert_eq!(query.order_by.as_deref(), Some("age"));
        assert_eq!(query.order, SortOrder::Desc);
        assert_eq!(query.limit, Some(10));
        assert_eq!(query.offset, Some(20));
    }

    #[test]
    fn row_query_caps_page_size() {
        let query = row_query(pairs(&[("_per_page", "5000")]), LIMITS).unwrap();
        assert_eq!(query.limit, Some(100));
    }

    #[test]
    fn row_query_rejects_bad_paging() {
        assert!(row_query(pairs(&[("_page", "0")]), LIMITS).is_err());
        assert!(row_query(pairs(&[("_per_page", "many")]), LIMITS).is_err());
        assert!(row_query(pairs(&[("_order", "up")]), LIMITS).is_err());
    }

    #[test]
    fn large_blobs_become_placeholders() {
        let outcome = Outcome::success(Payload::Rows(vec![
            Row::new()
                .with("small", vec![1u8, 2])
                .with("big", vec![0u8; 5]),
        ]));
        let rendered = inline_blobs(outcome, LIMITS.blob_inline_limit);
        let rows = rendered.result.unwrap();
        let row = &rows.rows().unwrap()[0];
        assert_eq!(row.get("small"), Some(&Value::Blob(vec![1, 2])));
        assert_eq!(row.get("big"), Some(&Value::from(BLOB_PLACEHOLDER)));
    }

    #[test]
    fn bodies_deserialize() {
        let update: UpdateBody =
            serde_json::from_str(r#"{"primary_key": {"id": 1}, "values": {"name": "b"}}"#)
                .unwrap();
        assert_eq!(update.primary_key, Row::new().with("id", 1));
        assert_eq!(update.values, Row::new().with("name", "b"));

        let sql: SqlBody = serde_json::from_str(r#"{"sql": "SELECT 1"}"#).unwrap();
        assert!(sql.params.is_empty());

        let delete: DeleteBody = serde_json::from_str(r#"{"primary_key": {}}"#).unwrap();
        assert!(delete.primary_key.is_empty());
    }

    #[test]
    fn health_response_omits_empty_detail() {
        let json = serde_json::to_string(&HealthResponse {
            status: "ok".into(),
            version: "0.1.0".into(),
            detail: None,
        })
        .unwrap();
        assert_eq!(json, r#"{"status":"ok","version":"0.1.0"}"#);
    }
}
