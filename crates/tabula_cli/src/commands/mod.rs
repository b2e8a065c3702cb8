//! Command implementations.

mod account;
mod database;
mod record;

use crate::context::Context;
use crate::error::CliResult;
use crate::{Cli, Commands, Format};
use std::collections::BTreeMap;
use tabula_core::{ErrorKind, Response, Value};

/// Runs the parsed command against the data directory.
pub(crate) fn run(cli: &Cli) -> CliResult<Response> {
    let mut ctx = Context::open(cli)?;

    match &cli.command {
        Commands::Register { username, password } => account::register(&ctx, username, password),
        Commands::Login { username, password } => account::login(&mut ctx, username, password),
        Commands::SelectDb { db_name } => database::select_db(&mut ctx, db_name),
        Commands::CreateTable {
            table_name,
            columns,
            datatypes,
            constraints,
        } => Ok(database::create_table(
            &ctx,
            table_name,
            columns,
            datatypes,
            constraints,
        )),
        Commands::DropTable { table_name } => Ok(database::drop_table(&ctx, table_name)),
        Commands::InsertRecord {
            table_name,
            content,
        } => Ok(record::insert(&ctx, table_name, content)),
        Commands::Select { table_name } => Ok(record::select(&ctx, table_name)),
        Commands::UpdateRecord {
            table_name,
            primary_key,
            new_record,
        } => Ok(record::update(&ctx, table_name, primary_key, new_record)),
        Commands::DeleteRecord {
            table_name,
            primary_key,
        } => Ok(record::delete(&ctx, table_name, primary_key)),
        Commands::Version => Ok(Response::ok(format!(
            "Tabula Core v{}",
            tabula_core::VERSION
        ))),
    }
}

/// Prints a response in the requested format.
pub(crate) fn print(response: &Response, format: Format) {
    match format {
        Format::Json => match serde_json::to_string_pretty(response) {
            Ok(json) => println!("{json}"),
            Err(e) => eprintln!("Error: {e}"),
        },
        Format::Text if !response.success => println!("Error: {}", response.message),
        Format::Text => match &response.rows {
            Some(rows) => match serde_json::to_string(rows) {
                Ok(json) => println!("Records: {json}"),
                Err(e) => eprintln!("Error: {e}"),
            },
            None => println!("Success: {}", response.message),
        },
    }
}

/// Builds a failed response for problems found before reaching the engine.
fn failed(message: impl Into<String>, kind: Option<ErrorKind>) -> Response {
    Response {
        success: false,
        message: message.into(),
        kind,
        ..Response::default()
    }
}

/// Returns the session token and selected database, or the response
/// explaining which one is missing.
fn session(ctx: &Context) -> Result<(&str, &str), Response> {
    let token = ctx.token().ok_or_else(|| {
        failed(
            "Not logged in. Use the login command first.",
            Some(ErrorKind::AccessDenied),
        )
    })?;
    let db = ctx.database().ok_or_else(|| {
        failed(
            "No database selected. Use the select-db command first.",
            Some(ErrorKind::InvalidOperation),
        )
    })?;
    Ok((token, db))
}

/// Splits a comma-separated argument.
fn split_list(arg: &str) -> Vec<String> {
    arg.split(',').map(str::to_string).collect()
}

/// Splits a comma-separated record into text values for the engine to
/// coerce.
fn split_values(arg: &str) -> Vec<Value> {
    arg.split(',').map(Value::from).collect()
}

/// Parses `col=FLAG|FLAG,col=FLAG` into flags per column.
fn parse_constraints(arg: &str) -> Result<BTreeMap<String, Vec<String>>, String> {
    let mut constraints = BTreeMap::new();
    if arg.is_empty() {
        return Ok(constraints);
    }
    for item in arg.split(',') {
        let (column, flags) = item
            .split_once('=')
            .ok_or_else(|| format!("malformed constraint {item:?}, expected column=FLAG"))?;
        constraints.insert(
            column.to_string(),
            flags.split('|').map(str::to_string).collect(),
        );
    }
    Ok(constraints)
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;
    use tempfile::tempdir;

    #[test]
    fn split_helpers() {
        assert_eq!(split_list("id,name"), vec!["id", "name"]);
        assert_eq!(
            split_values("1,Alice"),
            vec![Value::from("1"), Value::from("Alice")]
        );
    }

    #[test]
    fn constraint_syntax() {
        let parsed = parse_constraints("id=UNIQUE|NOT NULL,name=NOT NULL").unwrap();
        assert_eq!(parsed["id"], vec!["UNIQUE", "NOT NULL"]);
        assert_eq!(parsed["name"], vec!["NOT NULL"]);
        assert!(parse_constraints("").unwrap().is_empty());
        assert!(parse_constraints("id").is_err());
    }

    fn invoke(dir: &std::path::Path, args: &[&str]) -> Response {
        let data_dir = dir.to_string_lossy().into_owned();
        let mut argv = vec!["tabula", "--data-dir", data_dir.as_str()];
        argv.extend_from_slice(args);
        let cli = Cli::try_parse_from(argv).unwrap();
        run(&cli).unwrap()
    }

    #[test]
    fn session_walkthrough() {
        let dir = tempdir().unwrap();
        let path = dir.path();

        let response = invoke(path, &["select-db", "shop"]);
        assert!(!response.success);
        assert!(response.message.contains("login"));

        assert!(invoke(path, &["register", "alice", "pw"]).success);
        let login = invoke(path, &["login", "alice", "pw"]);
        assert!(login.success, "{}", login.message);

        let response = invoke(path, &["select", "users"]);
        assert!(response.message.contains("select-db"));

        let selected = invoke(path, &["select-db", "shop"]);
        assert_eq!(selected.message, "Database shop is created");

        let created = invoke(
            path,
            &[
                "create-table",
                "users",
                "id,name",
                "int,str",
                "--constraints",
                "id=UNIQUE|NOT NULL",
            ],
        );
        assert!(created.success, "{}", created.message);

        assert!(invoke(path, &["insert-record", "users", "1,Alice"]).success);
        let duplicate = invoke(path, &["insert-record", "users", "1,Bob"]);
        assert_eq!(duplicate.kind, Some(ErrorKind::Conflict));

        let updated = invoke(path, &["update-record", "users", "1", "1,Alicia"]);
        assert_eq!(updated.original_record, Some(vec![Value::Integer(1), "Alice".into()]));

        let rows = invoke(path, &["select", "users"]);
        assert_eq!(rows.rows, Some(vec![vec![Value::Integer(1), "Alicia".into()]]));

        assert!(invoke(path, &["delete-record", "users", "1"]).success);
        assert!(invoke(path, &["drop-table", "users"]).success);
        let gone = invoke(path, &["select", "users"]);
        assert_eq!(gone.kind, Some(ErrorKind::NotFound));
    }

    #[test]
    fn explicit_flags_override_session() {
        let dir = tempdir().unwrap();
        let path = dir.path();
        assert!(invoke(path, &["register", "bob", "pw"]).success);
        let login = invoke(path, &["login", "bob", "pw"]);
        assert!(login.success);

        let response = invoke(path, &["--db", "other", "select", "t"]);
        assert_eq!(response.kind, Some(ErrorKind::NotFound));

        let response = invoke(path, &["--token", "bogus", "--db", "other", "select", "t"]);
        assert_eq!(response.kind, Some(ErrorKind::AccessDenied));
    }

    #[test]
    fn bad_login() {
        let dir = tempdir().unwrap();
        let response = invoke(dir.path(), &["login", "nobody", "pw"]);
        assert!(!response.success);
        assert_eq!(response.kind, Some(ErrorKind::AccessDenied));
    }
}
