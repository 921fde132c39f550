//! Issuer DIDs of the shape `did:<namespace>:<hex public key>`.

use std::fmt;
use std::str::FromStr;

use crate::error::CoreError;

/// DID scheme prefix.
pub const DID_SCHEME: &str = "did";

/// A parsed issuer DID.
///
/// The namespace is chosen by the issuer; the third segment carries the
/// issuer's public key and is the only material a verifier needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuerDid {
    namespace: String,
    public_key_hex: String,
}

impl IssuerDid {
    /// Build a DID from a namespace and raw public key bytes.
    ///
    /// The key is rendered `0x`-prefixed lowercase hex.
    pub fn from_public_key(namespace: &str, public_key: &[u8]) -> Result<Self, CoreError> {
        validate_namespace(namespace)?;
        Ok(Self {
            namespace: namespace.to_string(),
            public_key_hex: format!("0x{}", hex::encode(public_key)),
        })
    }

    /// Parse a DID string. Anything other than exactly three colon-separated
    /// segments is rejected.
    pub fn parse(did: &str) -> Result<Self, CoreError> {
        let parts: Vec<&str> = did.split(':').collect();
        if parts.len() != 3 {
            return Err(CoreError::MalformedIssuer(format!(
                "expected 3 colon-separated segments, got {}",
                parts.len()
            )));
        }
        if parts[0] != DID_SCHEME {
            return Err(CoreError::MalformedIssuer(format!(
                "unexpected scheme '{}'",
                parts[0]
            )));
        }
        if parts[1].is_empty() {
            return Err(CoreError::MalformedIssuer("empty namespace".into()));
        }
        if parts[2].is_empty() {
            return Err(CoreError::MalformedIssuer("empty public key".into()));
        }
        Ok(Self {
            namespace: parts[1].to_string(),
            public_key_hex: parts[2].to_string(),
        })
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    /// The public key segment exactly as it appears in the DID.
    pub fn public_key_hex(&self) -> &str {
        &self.public_key_hex
    }

    /// Decode the public key segment (an optional `0x` prefix is accepted).
    pub fn public_key_bytes(&self) -> Result<Vec<u8>, CoreError> {
        let stripped = strip_hex_prefix(&self.public_key_hex);
        hex::decode(stripped)
            .map_err(|e| CoreError::MalformedIssuer(format!("public key is not hex: {}", e)))
    }
}

impl fmt::Display for IssuerDid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", DID_SCHEME, self.namespace, self.public_key_hex)
    }
}

impl FromStr for IssuerDid {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Render a subject identifier as a DID.
///
/// Identifiers that already are DIDs pass through untouched.
pub fn subject_did(namespace: &str, identifier: &str) -> String {
    if identifier.starts_with("did:") {
        identifier.to_string()
    } else {
        format!("{}:{}:{}", DID_SCHEME, namespace, identifier)
    }
}

/// Strip a leading `0x`/`0X`.
pub fn strip_hex_prefix(s: &str) -> &str {
    s.strip_prefix("0x")
        .or_else(|| s.strip_prefix("0X"))
        .unwrap_or(s)
}

fn validate_namespace(namespace: &str) -> Result<(), CoreError> {
    if namespace.is_empty() || namespace.contains(':') {
        return Err(CoreError::ValidationError(format!(
            "DID namespace must be non-empty and contain no ':' (got '{}')",
            namespace
        )));
    }
    Ok(())
}
