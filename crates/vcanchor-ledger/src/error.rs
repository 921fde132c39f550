use std::time::Duration;

use vcanchor_core::Retryable;

/// Ledger-layer errors.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("transaction submission failed: {0}")]
    Submission(String),

    #[error("transaction {tx} not confirmed within {timeout:?}")]
    ConfirmationTimeout { tx: String, timeout: Duration },

    #[error("transaction {0} dropped from the mempool")]
    Dropped(String),

    #[error("transaction reverted: {0}")]
    Reverted(String),

    #[error("contract read failed: {0}")]
    Read(String),

    #[error("ledger transport error: {0}")]
    Transport(String),

    #[error("invalid property key: {0}")]
    InvalidPropertyKey(String),

    #[error("unexpected contract response: {0}")]
    UnexpectedResponse(String),

    #[error("ledger configuration error: {0}")]
    Configuration(String),
}

impl Retryable for LedgerError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            LedgerError::Submission(_)
                | LedgerError::ConfirmationTimeout { .. }
                | LedgerError::Dropped(_)
                | LedgerError::Read(_)
                | LedgerError::Transport(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_errors_are_retryable() {
        assert!(LedgerError::Transport("connection refused".into()).is_retryable());
        assert!(LedgerError::ConfirmationTimeout {
            tx: "0xab".into(),
            timeout: Duration::from_secs(1)
        }
        .is_retryable());
    }

    #[test]
    fn test_permanent_errors_are_not_retryable() {
        assert!(!LedgerError::Reverted("property not registered".into()).is_retryable());
        assert!(!LedgerError::InvalidPropertyKey("x".into()).is_retryable());
        assert!(!LedgerError::Configuration("bad url".into()).is_retryable());
    }
}
