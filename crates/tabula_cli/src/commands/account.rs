//! Account commands: register and login.

use super::failed;
use crate::context::Context;
use crate::error::CliResult;
use tabula_auth::AuthError;
use tabula_core::{ErrorKind, Response};

/// Registers a user.
pub(crate) fn register(ctx: &Context, username: &str, password: &str) -> CliResult<Response> {
    match ctx.auth.register_user(username, password) {
        Ok(()) => Ok(Response::ok(format!("User {username} registered"))),
        Err(e) => rejected(e),
    }
}

/// Logs in and stores the token in the session.
pub(crate) fn login(ctx: &mut Context, username: &str, password: &str) -> CliResult<Response> {
    let token = match ctx.auth.authenticate(username, password) {
        Ok(token) => token,
        Err(e) => return rejected(e),
    };
    ctx.session.token = Some(token.clone());
    ctx.save_session()?;
    Ok(Response::ok(format!("Logged in as {username}. Token: {token}")))
}

/// Client mistakes become failed responses; anything else aborts.
fn rejected(error: AuthError) -> CliResult<Response> {
    let kind = match &error {
        AuthError::UserExists(_) => ErrorKind::AlreadyExists,
        AuthError::InvalidInput(_) => ErrorKind::Validation,
        AuthError::InvalidCredentials | AuthError::TokenExpired | AuthError::InvalidToken => {
            ErrorKind::AccessDenied
        }
        _ => return Err(error.into()),
    };
    Ok(failed(error.to_string(), Some(kind)))
}
