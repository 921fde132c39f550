//! Two-phase credential verification.
//!
//! The cryptographic phase recomputes the canonical payload from the
//! presented JSON and checks the signature against the key embedded in the
//! issuer DID. The ledger phase independently reads the signature property
//! anchored for the credential's sequence ID and requires it to equal the
//! proof value byte for byte. Neither phase
//! returns an error: every failure becomes verdict data.

use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

use vcanchor_core::canonical::PROOF_FIELD;
use vcanchor_core::types::ED25519_PROOF_TYPE;
use vcanchor_core::{CanonicalBytes, IssuerDid};
use vcanchor_crypto::{verify, PublicKey, Signature};
use vcanchor_ledger::{LedgerAnchor, PropertyKey};

/// Outcome of the ledger cross-check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "lowercase")]
pub enum LedgerCheck {
    Valid,
    Invalid(String),
    Unavailable(String),
}

impl LedgerCheck {
    pub fn is_valid(&self) -> bool {
        matches!(self, LedgerCheck::Valid)
    }
}

/// An individual cryptographic check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VerificationCheck {
    pub name: String,
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// Both verification signals, reported separately.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// Mandatory gate.
    pub crypto_valid: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub crypto_failure: Option<String>,
    /// Advisory.
    pub ledger: LedgerCheck,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sequence_id: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<String>,
    pub checks: Vec<VerificationCheck>,
}

impl Verdict {
    /// Signature valid and corroborated by the ledger.
    pub fn is_corroborated(&self) -> bool {
        self.crypto_valid && self.ledger.is_valid()
    }
}

/// Result of the cryptographic phase.
#[derive(Debug, Clone)]
struct CryptoOutcome {
    valid: bool,
    failure: Option<String>,
    checks: Vec<VerificationCheck>,
}

impl CryptoOutcome {
    fn new() -> Self {
        Self {
            valid: false,
            failure: None,
            checks: Vec::new(),
        }
    }

    fn pass(&mut self, name: &str) {
        self.checks.push(VerificationCheck {
            name: name.into(),
            passed: true,
            detail: None,
        });
    }

    fn fail(mut self, name: &str, reason: impl Into<String>) -> Self {
        let reason = reason.into();
        self.checks.push(VerificationCheck {
            name: name.into(),
            passed: false,
            detail: Some(reason.clone()),
        });
        self.valid = false;
        self.failure = Some(reason);
        self
    }
}

/// Verifies presented credentials.
#[derive(Default)]
pub struct CredentialVerifier {
    ledger: Option<Arc<LedgerAnchor>>,
}

impl CredentialVerifier {
    /// A verifier without ledger access; the ledger phase reports
    /// `unavailable`.
    pub fn new() -> Self {
        Self { ledger: None }
    }

    pub fn with_ledger(ledger: Arc<LedgerAnchor>) -> Self {
        Self {
            ledger: Some(ledger),
        }
    }

    /// Verify a credential given as JSON text.
    pub async fn verify_json(&self, input: &str) -> Verdict {
        match serde_json::from_str::<Value>(input) {
            Ok(value) => self.verify(&value).await,
            Err(e) => {
                let crypto = CryptoOutcome::new().fail("structure", format!("not valid JSON: {}", e));
                Verdict {
                    crypto_valid: false,
                    crypto_failure: crypto.failure,
                    ledger: LedgerCheck::Unavailable("credential is not valid JSON".into()),
                    sequence_id: None,
                    issuer: None,
                    checks: crypto.checks,
                }
            }
        }
    }

    /// Run both phases over a parsed credential.
    pub async fn verify(&self, credential: &Value) -> Verdict {
        let crypto = verify_signature(credential);
        let ledger = self.check_ledger(credential).await;

        let verdict = Verdict {
            crypto_valid: crypto.valid,
            crypto_failure: crypto.failure,
            ledger,
            sequence_id: credential.get("sequenceId").and_then(Value::as_u64),
            issuer: credential
                .get("issuer")
                .and_then(Value::as_str)
                .map(str::to_owned),
            checks: crypto.checks,
        };
        tracing::info!(
            crypto_valid = verdict.crypto_valid,
            ledger = ?verdict.ledger,
            sequence_id = ?verdict.sequence_id,
            "credential verified"
        );
        verdict
    }

    /// Ledger phase alone.
    pub async fn check_ledger(&self, credential: &Value) -> LedgerCheck {
        let Some(sequence_id) = credential.get("sequenceId").and_then(Value::as_u64) else {
            return LedgerCheck::Unavailable("credential has no sequenceId".into());
        };
        let Some(proof_value) = credential
            .get(PROOF_FIELD)
            .and_then(|p| p.get("proofValue"))
            .and_then(Value::as_str)
        else {
            return LedgerCheck::Invalid("credential has no proof value".into());
        };
        if let Err(e) = Signature::from_hex(proof_value) {
            return LedgerCheck::Invalid(format!("proof value is not a signature: {}", e));
        }
        let Some(ledger) = &self.ledger else {
            return LedgerCheck::Unavailable("no ledger configured".into());
        };

        match ledger
            .read_property(sequence_id, PropertyKey::signature())
            .await
        {
            Err(e) => {
                tracing::warn!(sequence_id, error = %e, "ledger read failed");
                LedgerCheck::Unavailable(e.to_string())
            }
            Ok(anchored) if anchored.is_empty() => {
                LedgerCheck::Invalid(format!("no ledger record for sequence id {}", sequence_id))
            }
            Ok(anchored) if anchored == proof_value.as_bytes() => LedgerCheck::Valid,
            Ok(_) => LedgerCheck::Invalid(format!(
                "anchored proof value for sequence id {} does not match",
                sequence_id
            )),
        }
    }
}

/// Cryptographic phase. Works on the raw JSON so unknown members stay covered.
fn verify_signature(credential: &Value) -> CryptoOutcome {
    let mut outcome = CryptoOutcome::new();

    if !credential.is_object() {
        return outcome.fail("structure", "credential is not a JSON object");
    }
    let Some(proof) = credential.get(PROOF_FIELD).and_then(Value::as_object) else {
        return outcome.fail("structure", "credential has no proof object");
    };
    let Some(proof_value) = proof.get("proofValue").and_then(Value::as_str) else {
        return outcome.fail("structure", "proof has no proofValue");
    };
    outcome.pass("structure");

    let Some(issuer) = credential.get("issuer").and_then(Value::as_str) else {
        return outcome.fail("issuer_did", "credential has no issuer");
    };
    let public_key = match IssuerDid::parse(issuer)
        .and_then(|did| did.public_key_bytes())
        .map_err(|e| e.to_string())
        .and_then(|bytes| PublicKey::from_bytes(&bytes).map_err(|e| e.to_string()))
    {
        Ok(pk) => pk,
        Err(reason) => return outcome.fail("issuer_did", reason),
    };
    outcome.pass("issuer_did");

    match proof.get("type").and_then(Value::as_str) {
        Some(ED25519_PROOF_TYPE) => outcome.pass("proof_type"),
        Some(other) => {
            return outcome.fail("proof_type", format!("unsupported proof type '{}'", other))
        }
        None => return outcome.fail("proof_type", "proof has no type"),
    }

    let canonical = match CanonicalBytes::without_proof(credential) {
        Ok(bytes) => bytes,
        Err(e) => return outcome.fail("canonical_payload", e.to_string()),
    };
    outcome.pass("canonical_payload");

    let signature = match Signature::from_hex(proof_value) {
        Ok(sig) => sig,
        Err(e) => return outcome.fail("signature", e.to_string()),
    };
    if let Err(e) = verify(canonical.as_bytes(), &signature, &public_key) {
        return outcome.fail("signature", e.to_string());
    }
    outcome.pass("signature");

    outcome.valid = true;
    outcome
}
