//! Transaction state.

use crate::error::{CoreError, CoreResult};

/// Lifecycle of a transaction log.
///
/// `Idle -> Open -> Committed | RolledBack -> Idle`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TransactionState {
    /// No transaction in progress.
    #[default]
    Idle,
    /// Transaction is open and accepting entries.
    Open,
    /// Transaction has been committed.
    Committed,
    /// Transaction has been rolled back.
    RolledBack,
}

impl TransactionState {
    /// Checks that entries may be recorded.
    pub(crate) fn ensure_open(self) -> CoreResult<()> {
        match self {
            Self::Open => Ok(()),
            Self::Idle => Err(CoreError::invalid_operation("no transaction is open")),
            Self::Committed => Err(CoreError::invalid_operation(
                "transaction is already committed",
            )),
            Self::RolledBack => Err(CoreError::invalid_operation(
                "transaction is already rolled back",
            )),
        }
    }
}
