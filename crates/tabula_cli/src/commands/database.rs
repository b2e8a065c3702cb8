//! Database and table commands.

use super::{failed, parse_constraints, session, split_list};
use crate::context::Context;
use crate::error::CliResult;
use tabula_core::{ErrorKind, Response};

/// Selects a database and remembers it in the session.
pub(crate) fn select_db(ctx: &mut Context, db_name: &str) -> CliResult<Response> {
    let Some(token) = ctx.token() else {
        return Ok(failed(
            "Not logged in. Use the login command first.",
            Some(ErrorKind::AccessDenied),
        ));
    };

    let response = ctx.service().select_database(token, db_name);
    if response.success {
        ctx.session.database = Some(db_name.to_string());
        ctx.save_session()?;
    }
    Ok(response)
}

/// Creates a table in the selected database.
pub(crate) fn create_table(
    ctx: &Context,
    table: &str,
    columns: &str,
    datatypes: &str,
    constraints: &str,
) -> Response {
    let (token, db) = match session(ctx) {
        Ok(session) => session,
        Err(response) => return response,
    };
    let constraints = match parse_constraints(constraints) {
        Ok(constraints) => constraints,
        Err(message) => return failed(message, Some(ErrorKind::Schema)),
    };

    ctx.service().create_table(
        token,
        db,
        table,
        &split_list(columns),
        &split_list(datatypes),
        &constraints,
    )
}

/// Drops a table from the selected database.
pub(crate) fn drop_table(ctx: &Context, table: &str) -> Response {
    match session(ctx) {
        Ok((token, db)) => ctx.service().drop_table(token, db, table),
        Err(response) => response,
    }
}
