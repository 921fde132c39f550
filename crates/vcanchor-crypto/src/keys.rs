use ed25519_dalek::{Signer, SigningKey, VerifyingKey};
use rand::rngs::OsRng;
use std::fmt;
use zeroize::{Zeroize, Zeroizing};

use crate::error::CryptoError;
use crate::signing::Signature;

/// BLAKE3 key-derivation context for passphrase seeds. Changing it changes
/// every issuer DID derived from a passphrase.
const PASSPHRASE_CONTEXT: &str = "vcanchor 2024 issuer key from passphrase v1";

/// Minimum number of words accepted in a passphrase seed.
const MIN_PASSPHRASE_WORDS: usize = 12;

/// Holds the issuer's Ed25519 keypair.
///
/// Constructed once at startup from injected seed material and shared
/// read-only afterwards. The secret never leaves this type; `Debug` prints the
/// public key only.
pub struct KeyStore {
    signing_key: SigningKey,
}

impl KeyStore {
    /// Derive the keypair from provisioned seed material.
    ///
    /// Accepts either 32 hex-encoded bytes (optionally `0x`-prefixed), used
    /// directly as the Ed25519 secret, or a passphrase of at least twelve
    /// words, normalized and run through BLAKE3 key derivation.
    pub fn derive(seed: &str) -> Result<Self, CryptoError> {
        let trimmed = seed.trim();
        if trimmed.is_empty() {
            return Err(CryptoError::KeyDerivationError("seed is empty".into()));
        }

        if trimmed.split_whitespace().count() > 1 {
            let keys = Self::from_passphrase(trimmed)?;
            tracing::debug!(source = "passphrase", public_key = %keys.public_key().to_hex(), "issuer key derived");
            return Ok(keys);
        }

        let hex_part = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);
        let bytes = Zeroizing::new(hex::decode(hex_part).map_err(|_| {
            CryptoError::KeyDerivationError(
                "seed must be 32 hex-encoded bytes or a passphrase".into(),
            )
        })?);
        if bytes.len() != 32 {
            return Err(CryptoError::KeyDerivationError(format!(
                "hex seed must be 32 bytes, got {}",
                bytes.len()
            )));
        }
        let mut seed_arr = Zeroizing::new([0u8; 32]);
        seed_arr.copy_from_slice(&bytes);
        let keys = Self::from_seed(&seed_arr);
        tracing::debug!(source = "hex", public_key = %keys.public_key().to_hex(), "issuer key derived");
        Ok(keys)
    }

    fn from_passphrase(phrase: &str) -> Result<Self, CryptoError> {
        let words: Vec<String> = phrase
            .split_whitespace()
            .map(|w| w.to_lowercase())
            .collect();
        if words.len() < MIN_PASSPHRASE_WORDS {
            return Err(CryptoError::KeyDerivationError(format!(
                "passphrase must have at least {} words, got {}",
                MIN_PASSPHRASE_WORDS,
                words.len()
            )));
        }
        let mut normalized = words.join(" ");
        let seed = Zeroizing::new(blake3::derive_key(PASSPHRASE_CONTEXT, normalized.as_bytes()));
        normalized.zeroize();
        Ok(Self::from_seed(&seed))
    }

    /// Create a keypair from a 32-byte seed used directly as the secret.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: SigningKey::from_bytes(seed),
        }
    }

    /// Generate a fresh random keypair.
    pub fn generate() -> Self {
        Self {
            signing_key: SigningKey::generate(&mut OsRng),
        }
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey {
            verifying_key: self.signing_key.verifying_key(),
        }
    }

    /// Sign raw bytes.
    pub fn sign(&self, message: &[u8]) -> Signature {
        Signature::from_dalek(self.signing_key.sign(message))
    }
}

impl fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyStore")
            .field("public_key", &self.public_key().to_hex())
            .finish_non_exhaustive()
    }
}

/// Ed25519 public key for verification operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    verifying_key: VerifyingKey,
}

impl PublicKey {
    /// Create from raw bytes (32 bytes).
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CryptoError> {
        let bytes_arr: [u8; 32] = bytes.try_into().map_err(|_| CryptoError::InvalidKeyLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        let verifying_key = VerifyingKey::from_bytes(&bytes_arr)
            .map_err(|e| CryptoError::InvalidInput(format!("invalid public key: {}", e)))?;
        Ok(Self { verifying_key })
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        self.verifying_key.as_bytes()
    }

    /// Lowercase hex without prefix.
    pub fn to_hex(&self) -> String {
        hex::encode(self.as_bytes())
    }

    /// Decode from hex, with or without a `0x` prefix.
    pub fn from_hex(hex_str: &str) -> Result<Self, CryptoError> {
        let stripped = hex_str.strip_prefix("0x").unwrap_or(hex_str);
        let bytes = hex::decode(stripped)
            .map_err(|e| CryptoError::InvalidInput(format!("invalid hex: {}", e)))?;
        Self::from_bytes(&bytes)
    }

    pub(crate) fn verifying_key(&self) -> &VerifyingKey {
        &self.verifying_key
    }
}
