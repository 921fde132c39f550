use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::LedgerError;

/// Property key under which the proof value is anchored.
pub const SIGNATURE_PROPERTY: &str = "signature";

/// Fixed-width 32-byte property identifier.
///
/// Derived from a short human readable name: UTF-8 bytes, right
/// zero-padded, at most 31 bytes so the last byte is always a terminator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PropertyKey([u8; 32]);

impl PropertyKey {
    pub fn from_name(name: &str) -> Result<Self, LedgerError> {
        let bytes = name.as_bytes();
        if bytes.is_empty() {
            return Err(LedgerError::InvalidPropertyKey("name is empty".into()));
        }
        if bytes.len() > 31 {
            return Err(LedgerError::InvalidPropertyKey(format!(
                "'{}' is {} bytes, at most 31 allowed",
                name,
                bytes.len()
            )));
        }
        let mut raw = [0u8; 32];
        raw[..bytes.len()].copy_from_slice(bytes);
        Ok(Self(raw))
    }

    /// The proof-value key.
    pub fn signature() -> Self {
        let mut raw = [0u8; 32];
        raw[..SIGNATURE_PROPERTY.len()].copy_from_slice(SIGNATURE_PROPERTY.as_bytes());
        Self(raw)
    }

    pub fn from_bytes(raw: [u8; 32]) -> Self {
        Self(raw)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Decode the human readable name, if the key is a padded UTF-8 string.
    pub fn name(&self) -> Option<String> {
        let end = self.0.iter().position(|b| *b == 0).unwrap_or(32);
        if self.0[end..].iter().any(|b| *b != 0) {
            return None;
        }
        std::str::from_utf8(&self.0[..end]).ok().map(str::to_owned)
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "0x{}", hex::encode(self.0)),
        }
    }
}

impl FromStr for PropertyKey {
    type Err = LedgerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_name(s)
    }
}

/// Hash of a submitted ledger transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxHash(pub [u8; 32]);

impl fmt::Display for TxHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Finality signal for a submitted transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Confirmation {
    pub tx_hash: TxHash,
    pub block_number: Option<u64>,
    pub confirmations: usize,
}

/// State-changing contract calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractCall {
    /// `setProperties(bytes32[])`: replaces the registered property list.
    SetProperties { keys: Vec<PropertyKey> },
    /// `setVCProperty(uint256, bytes32, bytes)`.
    SetVcProperty {
        id: u64,
        property: PropertyKey,
        content: Vec<u8>,
    },
}

impl ContractCall {
    pub fn method_name(&self) -> &'static str {
        match self {
            ContractCall::SetProperties { .. } => "setProperties",
            ContractCall::SetVcProperty { .. } => "setVCProperty",
        }
    }
}

/// Read-only contract calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractRead {
    /// `_properties(uint256) -> bytes32`.
    PropertyAt { index: u64 },
    /// `getVC(uint256) -> string`.
    Record { id: u64 },
    /// `VC(uint256, bytes32) -> bytes`.
    RecordProperty { id: u64, property: PropertyKey },
}

/// Decoded result of a [`ContractRead`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReadValue {
    /// `None` once the index runs past the end of the property list.
    Property(Option<PropertyKey>),
    Text(String),
    Bytes(Vec<u8>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_name_pads_right() {
        let key = PropertyKey::from_name("signature").unwrap();
        assert_eq!(&key.as_bytes()[..9], b"signature");
        assert!(key.as_bytes()[9..].iter().all(|b| *b == 0));
        assert_eq!(key, PropertyKey::signature());
    }

    #[test]
    fn test_name_roundtrip() {
        let key: PropertyKey = "issuer".parse().unwrap();
        assert_eq!(key.name().as_deref(), Some("issuer"));
        assert_eq!(key.to_string(), "issuer");
    }

    #[test]
    fn test_rejects_empty_and_oversized() {
        assert!(PropertyKey::from_name("").is_err());
        assert!(PropertyKey::from_name(&"a".repeat(31)).is_ok());
        assert!(matches!(
            PropertyKey::from_name(&"a".repeat(32)),
            Err(LedgerError::InvalidPropertyKey(_))
        ));
    }

    #[test]
    fn test_non_string_key_displays_hex() {
        let mut raw = [0u8; 32];
        raw[0] = b'a';
        raw[5] = 0xff;
        let key = PropertyKey::from_bytes(raw);
        assert!(key.name().is_none());
        assert!(key.to_string().starts_with("0x61"));
    }

    #[test]
    fn test_tx_hash_display() {
        let hash = TxHash([0xab; 32]);
        assert_eq!(hash.to_string(), format!("0x{}", "ab".repeat(32)));
    }

    #[test]
    fn test_method_names() {
        let call = ContractCall::SetVcProperty {
            id: 1,
            property: PropertyKey::signature(),
            content: vec![],
        };
        assert_eq!(call.method_name(), "setVCProperty");
        assert_eq!(
            ContractCall::SetProperties { keys: vec![] }.method_name(),
            "setProperties"
        );
    }
}
