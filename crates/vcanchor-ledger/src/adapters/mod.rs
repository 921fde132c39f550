//! Ledger client implementations.

pub mod evm;
pub mod internal;

pub use evm::{EvmLedgerClient, EvmLedgerConfig};
pub use internal::InMemoryLedger;
