//! vcanchor core: credential types, canonical serialization, issuer DIDs,
//! and the retry policy shared by every network-facing collaborator.

pub mod canonical;
pub mod did;
pub mod error;
pub mod retry;
pub mod types;

pub use canonical::CanonicalBytes;
pub use did::{strip_hex_prefix, subject_did, IssuerDid};
pub use error::{CanonicalizationError, CoreError};
pub use retry::{RetryPolicy, Retryable};
pub use types::{
    format_timestamp, Assertion, Comparison, Credential, CredentialPayload, CredentialSubject,
    Proof,
};
