//! Credential data model.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::canonical::CanonicalBytes;
use crate::error::{CanonicalizationError, CoreError};

/// JSON-LD context of every credential.
pub const CREDENTIALS_CONTEXT: &str = "https://www.w3.org/2018/credentials/v1";
/// Base type carried by every credential.
pub const VERIFIABLE_CREDENTIAL: &str = "VerifiableCredential";
/// Type of the balance-threshold credential.
pub const TOKEN_HOLDER_CREDENTIAL: &str = "TokenHolderCredential";
/// Proof type for Ed25519 signatures over the canonical payload.
pub const ED25519_PROOF_TYPE: &str = "Ed25519Signature2018";
/// Proof purpose recorded in every proof block.
pub const ASSERTION_METHOD: &str = "assertionMethod";
/// Claim name for native-token balance assertions.
pub const NATIVE_BALANCE_CLAIM: &str = "nativeBalance";

/// Comparison applied between an observed value and a threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Comparison {
    #[default]
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = ">=")]
    GreaterOrEqual,
}

impl Comparison {
    pub fn symbol(&self) -> &'static str {
        match self {
            Comparison::GreaterThan => ">",
            Comparison::GreaterOrEqual => ">=",
        }
    }

    /// Apply the comparison: `state <op> threshold`.
    pub fn holds<T: Ord + ?Sized>(&self, state: &T, threshold: &T) -> bool {
        match self {
            Comparison::GreaterThan => state > threshold,
            Comparison::GreaterOrEqual => state >= threshold,
        }
    }
}

impl fmt::Display for Comparison {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

impl FromStr for Comparison {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" | "gt" => Ok(Comparison::GreaterThan),
            ">=" | "gte" => Ok(Comparison::GreaterOrEqual),
            other => Err(CoreError::UnsupportedOperator(other.to_string())),
        }
    }
}

/// Claim-specific assertion block.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assertion {
    /// Name of the observed quantity, e.g. `nativeBalance`.
    pub claim: String,
    pub operator: Comparison,
    /// Decimal string, never a float.
    pub threshold: String,
    /// Outcome of `observed <operator> threshold`.
    pub result: bool,
    /// Observation time in Unix milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialSubject {
    pub id: String,
}

/// Every credential field except `proof`.
///
/// Field declaration order matches the JSON the issuer emits; the signed bytes
/// are the canonical (sorted) form and do not depend on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialPayload {
    #[serde(rename = "@context")]
    pub context: String,
    #[serde(rename = "type")]
    pub types: Vec<String>,
    #[serde(
        rename = "sequenceId",
        default,
        skip_serializing_if = "Option::is_none"
    )]
    pub sequence_id: Option<u64>,
    pub issuer: String,
    /// RFC 3339 with millisecond precision, kept verbatim as a string so a
    /// re-serialized credential reproduces the signed bytes exactly.
    #[serde(rename = "issuanceDate")]
    pub issuance_date: String,
    #[serde(rename = "credentialSubject")]
    pub credential_subject: CredentialSubject,
    pub assertion: Assertion,
}

impl CredentialPayload {
    /// Canonical bytes covered by the proof.
    pub fn canonical_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(self)
    }
}

/// Signature envelope over the canonical payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Proof {
    #[serde(rename = "type")]
    pub proof_type: String,
    /// `0x`-prefixed hex signature.
    pub proof_value: String,
    pub proof_purpose: String,
    /// Unix milliseconds; independent of `issuanceDate`.
    pub created_timestamp: i64,
}

/// A signed credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    #[serde(flatten)]
    pub payload: CredentialPayload,
    pub proof: Proof,
}

impl Credential {
    pub fn sequence_id(&self) -> Option<u64> {
        self.payload.sequence_id
    }

    pub fn issuer(&self) -> &str {
        &self.payload.issuer
    }

    pub fn subject(&self) -> &str {
        &self.payload.credential_subject.id
    }

    /// Render as a JSON value (the wire form).
    pub fn to_value(&self) -> Result<serde_json::Value, serde_json::Error> {
        serde_json::to_value(self)
    }
}

/// Format a timestamp the way `issuanceDate` carries it.
pub fn format_timestamp(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Millis, true)
}
