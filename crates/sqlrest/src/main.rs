// SPDX-FileCopyrightText: 2026 SQLRest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLRest - a SQLite database served as a REST resource API.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod serve;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use sqlrest_config::SqlRestConfig;

/// SQLRest - a SQLite database served as a REST resource API.
#[derive(Parser, Debug)]
#[command(name = "sqlrest", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the default search path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Serve the database over HTTP until Ctrl-C.
    Serve {
        /// Port to listen on (0 picks a free one).
        #[arg(long)]
        port: Option<u16>,
        /// Database file to serve.
        #[arg(long)]
        database: Option<String>,
    },
    /// List the user tables of a database.
    Tables {
        #[arg(long)]
        database: Option<String>,
    },
    /// Run one SQL statement and print the outcome as JSON.
    Sql {
        statement: String,
        #[arg(long)]
        database: Option<String>,
    },
    /// Print the effective configuration as TOML.
    Config,
}

/// Command-line flags win over file and environment settings.
fn apply_overrides(config: &mut SqlRestConfig, port: Option<u16>, database: Option<String>) {
    if let Some(port) = port {
        config.server.port = port;
    }
    if let Some(database) = database {
        config.storage.database_path = database;
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => sqlrest_config::load_and_validate_path(path),
        None => sqlrest_config::load_and_validate(),
    };
    let mut config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            sqlrest_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    if matches!(
        cli.command,
        Some(Commands::Serve { .. } | Commands::Tables { .. } | Commands::Sql { .. })
    ) {
        serve::init_tracing(&config.log.level);
    }

    let result = match cli.command {
        Some(Commands::Serve { port, database }) => {
            apply_overrides(&mut config, port, database);
            serve::run_serve(config).await
        }
        Some(Commands::Tables { database }) => {
            apply_overrides(&mut config, None, database);
            serve::run_tables(config).await
        }
        Some(Commands::Sql {
            statement,
            database,
        }) => {
            apply_overrides(&mut config, None, database);
            serve::run_sql(config, statement).await
        }
        Some(Commands::Config) => match toml::to_string_pretty(&config) {
            Ok(rendered) => {
                print!("{rendered}");
                Ok(())
            }
            Err(e) => Err(sqlrest_core::SqlRestError::Config(e.to_string())),
        },
        None => {
            println!("sqlrest: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
