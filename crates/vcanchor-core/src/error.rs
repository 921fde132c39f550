/// Core protocol errors.
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("validation error: {0}")]
    ValidationError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("malformed issuer DID: {0}")]
    MalformedIssuer(String),

    #[error("unsupported comparison operator: {0}")]
    UnsupportedOperator(String),

    #[error("canonicalization error: {0}")]
    Canonicalization(#[from] CanonicalizationError),
}

/// Errors raised while producing canonical bytes.
#[derive(Debug, thiserror::Error)]
pub enum CanonicalizationError {
    /// Floats have no single canonical textual form; amounts travel as
    /// decimal strings or integers.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    #[error("top-level value must be a JSON object")]
    NotAnObject,

    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}
