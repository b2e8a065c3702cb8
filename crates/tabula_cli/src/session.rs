//! Persisted CLI session: the logged-in token and the selected database.

use crate::error::CliResult;
use serde::{Deserialize, Serialize};
use tabula_storage::StorageBackend;

/// Document name of the session within the accounts directory.
pub(crate) const SESSION_DOCUMENT: &str = "session.json";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub(crate) struct Session {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub(crate) database: Option<String>,
}

impl Session {
    pub(crate) fn load(backend: &dyn StorageBackend) -> CliResult<Self> {
        match backend.read(SESSION_DOCUMENT)? {
            Some(data) => Ok(serde_json::from_slice(&data)?),
            None => Ok(Self::default()),
        }
    }

    pub(crate) fn save(&self, backend: &dyn StorageBackend) -> CliResult<()> {
        backend.write(SESSION_DOCUMENT, &serde_json::to_vec_pretty(self)?)?;
        Ok(())
    }
}
