use ed25519_dalek::Verifier;

use crate::error::CryptoError;
use crate::keys::{KeyStore, PublicKey};

/// Ed25519 signature (64 bytes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    inner: ed25519_dalek::Signature,
}

impl Signature {
    pub(crate) fn from_dalek(inner: ed25519_dalek::Signature) -> Self {
        Self { inner }
    }

    pub fn to_bytes(&self) -> [u8; 64] {
        self.inner.to_bytes()
    }

    /// Create from raw bytes (64 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes_arr: [u8; 64] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidInput(format!("signature must be 64 bytes, got {}", bytes.len()))
        })?;
        Ok(Self {
            inner: ed25519_dalek::Signature::from_bytes(&bytes_arr),
        })
    }

    /// `0x`-prefixed lowercase hex, the form carried in `proofValue`.
    pub fn to_hex(&self) -> String {
        format!("0x{}", hex::encode(self.to_bytes()))
    }

    /// Decode from hex, with or without a `0x` prefix.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(stripped)
            .map_err(|e| CryptoError::InvalidInput(format!("invalid signature hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }
}

/// Sign a message with the issuer key store.
pub fn sign(message: &[u8], keys: &KeyStore) -> Signature {
    keys.sign(message)
}

/// Verify an Ed25519 signature.
pub fn verify(message: &[u8], signature: &Signature, pubkey: &PublicKey) -> Result<(), CryptoError> {
    pubkey
        .verifying_key()
        .verify(message, &signature.inner)
        .map_err(|_| CryptoError::SignatureVerificationFailed)
}
