use chrono::{DateTime, Utc};
use std::sync::Arc;

use vcanchor_core::types::{
    ASSERTION_METHOD, CREDENTIALS_CONTEXT, ED25519_PROOF_TYPE, TOKEN_HOLDER_CREDENTIAL,
    VERIFIABLE_CREDENTIAL,
};
use vcanchor_core::{
    format_timestamp, subject_did, Assertion, CoreError, Credential, CredentialPayload,
    CredentialSubject, IssuerDid, Proof,
};
use vcanchor_crypto::{KeyStore, Signature};

use crate::error::IssuanceError;

/// Inputs for one credential, gathered by the pipeline before signing.
#[derive(Debug, Clone)]
pub struct ClaimInputs {
    pub subject_identifier: String,
    pub sequence_id: u64,
    pub assertion: Assertion,
}

/// Builds, signs, and assembles credentials with the issuer's key.
pub struct CredentialAuthority {
    keys: Arc<KeyStore>,
    issuer: IssuerDid,
    subject_namespace: String,
}

impl CredentialAuthority {
    pub fn new(
        keys: Arc<KeyStore>,
        issuer_namespace: &str,
        subject_namespace: &str,
    ) -> Result<Self, CoreError> {
        let issuer = IssuerDid::from_public_key(issuer_namespace, keys.public_key().as_bytes())?;
        Ok(Self {
            keys,
            issuer,
            subject_namespace: subject_namespace.to_string(),
        })
    }

    pub fn issuer_did(&self) -> &IssuerDid {
        &self.issuer
    }

    /// Payload stamped with the current time.
    pub fn build_payload(&self, inputs: &ClaimInputs) -> CredentialPayload {
        self.build_payload_at(inputs, Utc::now())
    }

    pub fn build_payload_at(&self, inputs: &ClaimInputs, issued_at: DateTime<Utc>) -> CredentialPayload {
        CredentialPayload {
            context: CREDENTIALS_CONTEXT.to_string(),
            types: vec![
                VERIFIABLE_CREDENTIAL.to_string(),
                TOKEN_HOLDER_CREDENTIAL.to_string(),
            ],
            sequence_id: Some(inputs.sequence_id),
            issuer: self.issuer.to_string(),
            issuance_date: format_timestamp(issued_at),
            credential_subject: CredentialSubject {
                id: subject_did(&self.subject_namespace, &inputs.subject_identifier),
            },
            assertion: inputs.assertion.clone(),
        }
    }

    /// Sign the canonical serialization of `payload`.
    pub fn sign(&self, payload: &CredentialPayload) -> Result<Signature, IssuanceError> {
        let canonical = payload
            .canonical_bytes()
            .map_err(|e| IssuanceError::Signing(e.to_string()))?;
        Ok(self.keys.sign(canonical.as_bytes()))
    }

    /// Attach the proof block.
    pub fn assemble(&self, payload: CredentialPayload, signature: &Signature) -> Credential {
        Credential {
            payload,
            proof: Proof {
                proof_type: ED25519_PROOF_TYPE.to_string(),
                proof_value: signature.to_hex(),
                proof_purpose: ASSERTION_METHOD.to_string(),
                created_timestamp: Utc::now().timestamp_millis(),
            },
        }
    }

    /// Build, sign, and assemble in one step.
    pub fn issue(&self, inputs: &ClaimInputs) -> Result<Credential, IssuanceError> {
        let payload = self.build_payload(inputs);
        let signature = self.sign(&payload)?;
        let credential = self.assemble(payload, &signature);
        tracing::info!(
            issuer = %self.issuer,
            subject = credential.subject(),
            sequence_id = inputs.sequence_id,
            "credential signed"
        );
        Ok(credential)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use vcanchor_core::types::NATIVE_BALANCE_CLAIM;
    use vcanchor_core::{CanonicalBytes, Comparison};
    use vcanchor_crypto::verify;

    fn authority() -> CredentialAuthority {
        CredentialAuthority::new(Arc::new(KeyStore::from_seed(&[5u8; 32])), "vcanchor", "pubkey")
            .unwrap()
    }

    fn inputs() -> ClaimInputs {
        ClaimInputs {
            subject_identifier: "0xabc".into(),
            sequence_id: 9,
            assertion: Assertion {
                claim: NATIVE_BALANCE_CLAIM.into(),
                operator: Comparison::GreaterThan,
                threshold: "0.1".into(),
                result: true,
                timestamp: 1_700_000_000_000,
            },
        }
    }

    #[test]
    fn test_issuer_did_embeds_public_key() {
        let auth = authority();
        let pk_hex = KeyStore::from_seed(&[5u8; 32]).public_key().to_hex();
        assert_eq!(auth.issuer_did().to_string(), format!("did:vcanchor:0x{}", pk_hex));
    }

    #[test]
    fn test_build_payload_fields() {
        let auth = authority();
        let at = Utc.with_ymd_and_hms(2024, 5, 6, 7, 8, 9).unwrap();
        let payload = auth.build_payload_at(&inputs(), at);
        assert_eq!(payload.context, CREDENTIALS_CONTEXT);
        assert_eq!(payload.types, vec![VERIFIABLE_CREDENTIAL, TOKEN_HOLDER_CREDENTIAL]);
        assert_eq!(payload.sequence_id, Some(9));
        assert_eq!(payload.issuance_date, "2024-05-06T07:08:09.000Z");
        assert_eq!(payload.credential_subject.id, "did:pubkey:0xabc");
    }

    #[test]
    fn test_subject_did_passes_through() {
        let mut claim = inputs();
        claim.subject_identifier = "did:eth:0xabc".into();
        assert_eq!(
            authority().build_payload(&claim).credential_subject.id,
            "did:eth:0xabc"
        );
    }

    #[test]
    fn test_signature_covers_credential_without_proof() {
        let auth = authority();
        let credential = auth.issue(&inputs()).unwrap();
        assert_eq!(credential.proof.proof_type, ED25519_PROOF_TYPE);
        assert_eq!(credential.proof.proof_purpose, ASSERTION_METHOD);

        let value = credential.to_value().unwrap();
        let canonical = CanonicalBytes::without_proof(&value).unwrap();
        let signature = Signature::from_hex(&credential.proof.proof_value).unwrap();
        let pk = KeyStore::from_seed(&[5u8; 32]).public_key();
        assert!(verify(canonical.as_bytes(), &signature, &pk).is_ok());
    }

    #[test]
    fn test_sign_is_deterministic_for_same_payload() {
        let auth = authority();
        let payload = auth.build_payload(&inputs());
        assert_eq!(auth.sign(&payload).unwrap(), auth.sign(&payload).unwrap());
    }
}
