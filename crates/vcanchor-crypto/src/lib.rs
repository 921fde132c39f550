//! vcanchor cryptography.
//!
//! - [`KeyStore`]: the issuer's Ed25519 keypair, derived from provisioned seed material
//! - Ed25519 sign/verify over canonical credential bytes
//! - EIP-191 `personal_sign` attestation checks for external addresses

pub mod attestation;
pub mod error;
pub mod keys;
pub mod signing;

pub use attestation::{verify_personal_sign, Attestation};
pub use error::CryptoError;
pub use keys::{KeyStore, PublicKey};
pub use signing::{sign, verify, Signature};
