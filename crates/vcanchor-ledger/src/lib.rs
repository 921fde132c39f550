//! vcanchor ledger layer
//!
//! Abstracts the registry contract behind [`LedgerClient`], with an EVM
//! adapter over JSON-RPC and an in-memory adapter, and provides the
//! [`LedgerAnchor`] that registers property keys and anchors proof values.

pub mod adapters;
pub mod anchor;
pub mod error;
pub mod traits;
pub mod types;

pub use adapters::{EvmLedgerClient, EvmLedgerConfig, InMemoryLedger};
pub use anchor::{LedgerAnchor, Registration};
pub use error::LedgerError;
pub use traits::LedgerClient;
pub use types::{
    Confirmation, ContractCall, ContractRead, PropertyKey, ReadValue, TxHash, SIGNATURE_PROPERTY,
};
