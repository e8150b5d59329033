// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Layered config loading with Figment.
//!
//! Later layers win: compiled defaults, then the TOML files from
//! [`search_path`], then `SQLREST_*` environment variables.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::SqlRestConfig;

/// Sections an env var may address, as `SQLREST_<SECTION>_<KEY>`.
const SECTIONS: &[&str] = &["server", "storage", "log"];

/// Config files consulted by [`load_config`], lowest precedence first.
pub(crate) fn search_path() -> Vec<PathBuf> {
    let mut paths = vec![PathBuf::from("/etc/sqlrest/sqlrest.toml")];
    if let Some(dir) = dirs::config_dir() {
        paths.push(dir.join("sqlrest/sqlrest.toml"));
    }
    paths.push(PathBuf::from("sqlrest.toml"));
    paths
}

fn defaults() -> Figment {
    Figment::from(Serialized::defaults(SqlRestConfig::default()))
}

/// Load from every file on the search path, then apply env overrides.
/// Missing files are skipped.
pub fn load_config() -> Result<SqlRestConfig, figment::Error> {
    search_path()
        .into_iter()
        .fold(defaults(), |figment, path| figment.merge(Toml::file(path)))
        .merge(env_provider())
        .extract()
}

/// Load from one file, then apply env overrides.
pub fn load_config_from_path(path: &Path) -> Result<SqlRestConfig, figment::Error> {
    defaults()
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Load from a TOML string alone. No files, no env.
pub fn load_config_from_str(toml_content: &str) -> Result<SqlRestConfig, figment::Error> {
    defaults().merge(Toml::string(toml_content)).extract()
}

fn env_provider() -> Env {
    Env::prefixed("SQLREST_").map(|key| env_key_to_path(key.as_str()).into())
}

/// `STORAGE_DATABASE_PATH` -> `storage.database_path`.
///
/// Only the section prefix is split off; key names keep their underscores.
/// Figment hands keys over in their original case.
pub(crate) fn env_key_to_path(key: &str) -> String {
    let key = key.to_ascii_lowercase();
    SECTIONS
        .iter()
        .find_map(|section| {
            key.strip_prefix(section)
                .and_then(|rest| rest.strip_prefix('_'))
                .map(|field| format!("{section}.{field}"))
        })
        .unwrap_or(key)
}
