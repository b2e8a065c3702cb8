//! Tabula CLI
//!
//! Command-line front end for Tabula databases stored under a local data
//! directory.
//!
//! # Commands
//!
//! - `register` / `login` - Manage accounts and sessions
//! - `select-db` - Select a database, creating it if missing
//! - `create-table` / `drop-table` - Manage tables
//! - `insert-record` / `select` / `update-record` / `delete-record` - Work with records

mod commands;
mod context;
mod error;
mod session;

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

/// Tabula record store command-line tools.
#[derive(Debug, Parser)]
#[command(name = "tabula")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Directory holding databases, accounts and the session
    #[arg(global = true, short = 'd', long, env = "TABULA_DATA_DIR", default_value = "./tabula-data")]
    data_dir: PathBuf,

    /// Database to use instead of the selected one
    #[arg(global = true, long, env = "TABULA_DB")]
    db: Option<String>,

    /// Session token to use instead of the stored one
    #[arg(global = true, long, env = "TABULA_TOKEN")]
    token: Option<String>,

    /// Enable verbose output
    #[arg(global = true, short, long)]
    verbose: bool,

    /// Output format
    #[arg(global = true, short, long, value_enum, default_value_t = Format::Text)]
    format: Format,

    #[command(subcommand)]
    command: Commands,
}

/// How responses are printed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub(crate) enum Format {
    /// `Success: ...` / `Error: ...` lines
    Text,
    /// The full response as JSON
    Json,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Commands {
    /// Register a new user
    Register {
        /// User name
        username: String,
        /// Password
        password: String,
    },

    /// Log in and store a session token
    Login {
        /// User name
        username: String,
        /// Password
        password: String,
    },

    /// Select a database. If the database doesn't exist, it will be created.
    SelectDb {
        /// Database name
        db_name: String,
    },

    /// Create a new table in the selected database
    CreateTable {
        /// Table name
        table_name: String,
        /// Comma-separated column names; the first is the primary key
        columns: String,
        /// Comma-separated datatypes (int, float, str)
        datatypes: String,
        /// Constraints such as 'id=UNIQUE|NOT NULL,name=NOT NULL'
        #[arg(long, default_value = "")]
        constraints: String,
    },

    /// Insert a record into a table
    InsertRecord {
        /// Table name
        table_name: String,
        /// Comma-separated values in column order
        content: String,
    },

    /// Select all records from a table
    Select {
        /// Table name
        table_name: String,
    },

    /// Update the record with the given primary key
    UpdateRecord {
        /// Table name
        table_name: String,
        /// Primary key of the record
        primary_key: String,
        /// Comma-separated replacement values
        new_record: String,
    },

    /// Delete the record with the given primary key
    DeleteRecord {
        /// Table name
        table_name: String,
        /// Primary key of the record
        primary_key: String,
    },

    /// Drop a table and its records
    DropTable {
        /// Table name
        table_name: String,
    },

    /// Show version information
    Version,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr so JSON output stays parseable.
    let level = if cli.verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    if matches!(cli.command, Commands::Version) {
        println!("Tabula CLI v{}", env!("CARGO_PKG_VERSION"));
        println!("Tabula Core v{}", tabula_core::VERSION);
        return ExitCode::SUCCESS;
    }

    match commands::run(&cli) {
        Ok(response) => {
            commands::print(&response, cli.format);
            if response.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            }
        }
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}
