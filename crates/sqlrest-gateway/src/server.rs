// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Router construction and shared handler state.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post, put},
};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use sqlrest_config::model::ServerConfig;
use sqlrest_storage::Worker;

use crate::handlers;

/// Listing and rendering limits taken from `[server]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApiLimits {
    pub default_page_size: u32,
    pub max_page_size: u32,
    pub blob_inline_limit: usize,
}

impl From<&ServerConfig> for ApiLimits {
    fn from(config: &ServerConfig) -> Self {
        Self {
            default_page_size: config.default_page_size,
            max_page_size: config.max_page_size,
            blob_inline_limit: config.blob_inline_limit,
        }
    }
}

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    /// The one worker this server owns.
    pub worker: Arc<Worker>,
    pub limits: ApiLimits,
}

/// Build the application router.
///
/// `/health` is always at the root; everything else lives under `api_prefix`:
/// - GET  {p}/tables
/// - GET  {p}/tables/{table}/schema
/// - GET, POST, PUT, DELETE {p}/tables/{table}/rows
/// - PUT, DELETE {p}/tables/{table}/rows/{rowid}
/// - POST {p}/db/sql
/// - GET  {p}/db/info
pub fn router(api_prefix: &str, state: GatewayState) -> Router {
    let api = Router::new()
        .route("/tables", get(handlers::list_tables))
        .route("/tables/{table}/schema", get(handlers::table_schema))
        .route(
            "/tables/{table}/rows",
            get(handlers::list_rows)
                .post(handlers::insert_row)
                .put(handlers::update_rows)
                .delete(handlers::delete_rows),
        )
        .route(
            "/tables/{table}/rows/{rowid}",
            put(handlers::update_by_rowid).delete(handlers::delete_by_rowid),
        )
        .route("/db/sql", post(handlers::execute_sql))
        .route("/db/info", get(handlers::database_info));

    // axum refuses to nest at the root.
    let api = if api_prefix == "/" {
        api
    } else {
        Router::new().nest(api_prefix, api)
    };

    Router::new()
        .route("/health", get(handlers::health))
        .merge(api)
        .fallback(handlers::not_found)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}
