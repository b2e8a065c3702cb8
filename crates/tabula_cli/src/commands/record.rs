//! Record commands.

use super::{session, split_values};
use crate::context::Context;
use tabula_core::{Response, Value};

/// Inserts a comma-separated record.
pub(crate) fn insert(ctx: &Context, table: &str, content: &str) -> Response {
    match session(ctx) {
        Ok((token, db)) => ctx
            .service()
            .insert_record(token, db, table, &split_values(content)),
        Err(response) => response,
    }
}

/// Lists every record of a table.
pub(crate) fn select(ctx: &Context, table: &str) -> Response {
    match session(ctx) {
        Ok((token, db)) => ctx.service().select_table(token, db, table),
        Err(response) => response,
    }
}

/// Replaces the record addressed by `primary_key`.
pub(crate) fn update(ctx: &Context, table: &str, primary_key: &str, new_record: &str) -> Response {
    match session(ctx) {
        Ok((token, db)) => ctx.service().update_record(
            token,
            db,
            table,
            &Value::from(primary_key),
            &split_values(new_record),
        ),
        Err(response) => response,
    }
}

/// Deletes the record addressed by `primary_key`.
pub(crate) fn delete(ctx: &Context, table: &str, primary_key: &str) -> Response {
    match session(ctx) {
        Ok((token, db)) => ctx
            .service()
            .delete_record(token, db, table, &Value::from(primary_key)),
        Err(response) => response,
    }
}
