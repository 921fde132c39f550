//! Proof of control over an external (EVM) address.
//!
//! The requester signs a message with the external account's key using
//! EIP-191 `personal_sign`; the signature must recover to the claimed address.

use ethers::types::{Address, Signature as EthSignature};
use std::str::FromStr;

use crate::error::CryptoError;

/// A detached signature over `message` by an external account.
///
/// Consumed once during authentication and never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attestation {
    pub message: String,
    /// Hex-encoded 65-byte `r || s || v` signature.
    pub signature: String,
}

impl Attestation {
    pub fn new(message: impl Into<String>, signature: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            signature: signature.into(),
        }
    }

    /// Check that the attestation was produced by `address`.
    pub fn verify(&self, address: &str) -> Result<(), CryptoError> {
        verify_personal_sign(&self.message, &self.signature, address)
    }
}

/// Parse an EVM address (`0x` + 40 hex chars).
pub fn parse_address(address: &str) -> Result<Address, CryptoError> {
    Address::from_str(address.trim())
        .map_err(|e| CryptoError::InvalidInput(format!("invalid address '{}': {}", address, e)))
}

/// Verify an EIP-191 `personal_sign` signature over `message` against `address`.
pub fn verify_personal_sign(
    message: &str,
    signature_hex: &str,
    address: &str,
) -> Result<(), CryptoError> {
    let address = parse_address(address)?;
    let signature = EthSignature::from_str(signature_hex.trim())
        .map_err(|e| CryptoError::InvalidInput(format!("invalid signature: {}", e)))?;

    signature
        .verify(message, address)
        .map_err(|e| CryptoError::AttestationRejected(e.to_string()))
}
