//! vcanchor credentials: authentication, fact oracle, sequence allocation,
//! signing authority, verifier, and the issuance pipeline tying them together.

pub mod authenticator;
pub mod authority;
pub mod error;
pub mod oracle;
pub mod pipeline;
pub mod sequence;
pub mod verifier;

pub use authenticator::RequestAuthenticator;
pub use authority::{ClaimInputs, CredentialAuthority};
pub use error::{IssuanceError, OracleError, SequenceError};
pub use oracle::{evaluate, EvmBalanceOracle, FactOracle, InMemoryOracle, Quantity, NATIVE_DECIMALS};
pub use pipeline::{IssuancePolicy, IssuanceRequest, IssuanceService};
pub use sequence::{CounterStore, MemoryCounterStore, SequenceAllocator};
pub use verifier::{CredentialVerifier, LedgerCheck, Verdict, VerificationCheck};
