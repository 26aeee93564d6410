//! The closed `RuntimeError` set (§7): the only error surface the runtime's orchestration
//! layer produces from a fallible public entry point. Each layer that has a genuinely
//! distinct failure domain (storage I/O, order validation, strategy faults, config loading)
//! keeps its own narrow type and folds it in here via `#[from]`.

use thiserror::Error;
use vantage_data::StorageError;
use vantage_execution::Reason;

/// Closed set of runtime error kinds.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    /// A Storage read/write failed. The Context rolls back the open transaction and clears
    /// its outbound batches when this surfaces mid-tick.
    #[error("storage I/O error: {0}")]
    StorageIo(#[from] StorageError),

    /// An exchange adapter reported a malformed or unrecognized event (for example, a fill
    /// for an id last seen at a different timestamp — see the data model's duplicate-fill
    /// note).
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An order was rejected or discarded with a reason from the closed [`Reason`] set.
    #[error("order rejected: {reason:?}")]
    OrderRejected { reason: Reason },

    /// A strategy callback terminated abnormally (panicked or returned an error). The
    /// Context rolls back its transaction, logs with the strategy id attached, and keeps
    /// running — this never terminates the worker thread.
    #[error("strategy fault in '{strategy_id}': {message}")]
    StrategyFault { strategy_id: String, message: String },

    /// Configuration is missing a required field or holds an out-of-range value.
    #[error("invalid configuration: {0}")]
    ConfigInvalid(String),

    /// The worker thread's channel receiver was dropped before a send completed.
    #[error("receiver dropped")]
    RxDropped,

    /// A spawned task panicked or was cancelled before it could be joined.
    #[error("join error: {0}")]
    JoinError(String),
}

impl<T> From<tokio::sync::mpsc::error::SendError<T>> for RuntimeError {
    fn from(_: tokio::sync::mpsc::error::SendError<T>) -> Self {
        Self::RxDropped
    }
}

impl From<tokio::task::JoinError> for RuntimeError {
    fn from(value: tokio::task::JoinError) -> Self {
        Self::JoinError(format!("{value:?}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_error_converts_via_from() {
        let storage_err = StorageError::new("disk full");
        let runtime_err: RuntimeError = storage_err.clone().into();
        assert_eq!(runtime_err, RuntimeError::StorageIo(storage_err));
    }

    #[test]
    fn order_rejected_carries_reason() {
        let err = RuntimeError::OrderRejected { reason: Reason::TooSmall };
        assert!(matches!(err, RuntimeError::OrderRejected { reason: Reason::TooSmall }));
    }
}
