//! Everything a command needs: registry, accounts and session.

use crate::error::CliResult;
use crate::session::Session;
use crate::Cli;
use std::sync::Arc;
use tabula_auth::{AuthConfig, Authenticator};
use tabula_core::{Config, Registry, Service};
use tabula_storage::{FileBackend, StorageBackend};

/// Directory under the data directory holding accounts and the session.
///
/// The leading dot keeps it out of the database namespace.
pub(crate) const ACCOUNTS_DIR: &str = ".accounts";

pub(crate) struct Context {
    pub(crate) registry: Registry,
    pub(crate) auth: Authenticator,
    pub(crate) session: Session,
    accounts: Arc<dyn StorageBackend>,
    db_override: Option<String>,
    token_override: Option<String>,
}

impl Context {
    pub(crate) fn open(cli: &Cli) -> CliResult<Self> {
        let registry = Registry::open(&cli.data_dir, Config::new().pretty_documents(true))?;
        let accounts: Arc<dyn StorageBackend> =
            Arc::new(FileBackend::open(&cli.data_dir.join(ACCOUNTS_DIR), true)?);
        let auth = Authenticator::open(Arc::clone(&accounts), AuthConfig::default())?;
        let session = Session::load(accounts.as_ref())?;

        Ok(Self {
            registry,
            auth,
            session,
            accounts,
            db_override: cli.db.clone(),
            token_override: cli.token.clone(),
        })
    }

    pub(crate) fn service(&self) -> Service<'_, &Authenticator> {
        Service::new(&self.registry, &self.auth)
    }

    /// Token from `--token`, falling back to the stored session.
    pub(crate) fn token(&self) -> Option<&str> {
        self.token_override
            .as_deref()
            .or(self.session.token.as_deref())
    }

    /// Database from `--db`, falling back to the stored session.
    pub(crate) fn database(&self) -> Option<&str> {
        self.db_override
            .as_deref()
            .or(self.session.database.as_deref())
    }

    pub(crate) fn save_session(&self) -> CliResult<()> {
        self.session.save(self.accounts.as_ref())
    }
}
