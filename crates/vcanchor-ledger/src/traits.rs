use async_trait::async_trait;
use std::time::Duration;

use crate::error::LedgerError;
use crate::types::{Confirmation, ContractCall, ContractRead, ReadValue, TxHash};

/// Ledger transport interface.
///
/// Each implementation bridges the anchoring engine to a concrete ledger
/// (an EVM chain over JSON-RPC, or an in-process fake).
#[async_trait]
pub trait LedgerClient: Send + Sync {
    /// Submit a state-changing call and return its transaction hash.
    async fn submit_transaction(&self, call: ContractCall) -> Result<TxHash, LedgerError>;

    /// Block until the transaction reaches the configured number of
    /// confirmations, or fail with [`LedgerError::ConfirmationTimeout`].
    async fn wait_for_confirmation(
        &self,
        tx: &TxHash,
        timeout: Duration,
    ) -> Result<Confirmation, LedgerError>;

    /// Execute a read-only call against the latest state.
    async fn read_contract_value(&self, read: ContractRead) -> Result<ReadValue, LedgerError>;

    /// Return the unique identifier of this client (e.g. "ledger-evm").
    fn client_id(&self) -> &str;
}
