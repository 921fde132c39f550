/// Cryptographic operation errors.
#[derive(Debug, thiserror::Error)]
pub enum CryptoError {
    #[error("key derivation failed: {0}")]
    KeyDerivationError(String),

    #[error("invalid key length: expected {expected}, got {actual}")]
    InvalidKeyLength { expected: usize, actual: usize },

    #[error("signature verification failed")]
    SignatureVerificationFailed,

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("attestation rejected: {0}")]
    AttestationRejected(String),
}
