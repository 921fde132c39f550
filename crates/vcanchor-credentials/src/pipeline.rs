use chrono::Utc;
use serde::{Deserialize, Deserializer};
use std::sync::Arc;

use vcanchor_core::{Assertion, Comparison, Credential, RetryPolicy};
use vcanchor_crypto::Attestation;
use vcanchor_ledger::{LedgerAnchor, PropertyKey};

use crate::authenticator::RequestAuthenticator;
use crate::authority::{ClaimInputs, CredentialAuthority};
use crate::error::{IssuanceError, SequenceError};
use crate::oracle::{evaluate, FactOracle, Quantity};
use crate::sequence::SequenceAllocator;

/// An issuance request as received from a client.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IssuanceRequest {
    #[serde(default, alias = "credentialSubjectId")]
    pub subject_identifier: String,
    #[serde(default, alias = "ethAddress")]
    pub external_address: String,
    /// Decimal threshold; the configured default applies when absent.
    /// A bare JSON number is taken in its textual form.
    #[serde(default, deserialize_with = "string_or_number")]
    pub threshold: Option<String>,
    /// `>` or `>=`; the configured default applies when absent.
    #[serde(default)]
    pub operator: Option<String>,
    #[serde(default)]
    pub attestation_signature: String,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Number(serde_json::Number),
    }

    Ok(Option::<Raw>::deserialize(deserializer)?.map(|raw| match raw {
        Raw::Text(text) => text,
        Raw::Number(number) => number.to_string(),
    }))
}

/// Issuance defaults.
#[derive(Debug, Clone)]
pub struct IssuancePolicy {
    pub default_threshold: String,
    pub default_operator: Comparison,
    pub retry: RetryPolicy,
}

impl Default for IssuancePolicy {
    fn default() -> Self {
        Self {
            default_threshold: "0.1".into(),
            default_operator: Comparison::GreaterThan,
            retry: RetryPolicy::default(),
        }
    }
}

/// Orchestrates one issuance end to end.
///
/// Validation and authentication run before any side effect. A sequence ID
/// is allocated only after the oracle has answered, and the credential is
/// returned only after its proof value is confirmed on the ledger.
pub struct IssuanceService {
    authenticator: RequestAuthenticator,
    oracle: Arc<dyn FactOracle>,
    sequence: Arc<SequenceAllocator>,
    authority: Arc<CredentialAuthority>,
    anchor: Arc<LedgerAnchor>,
    policy: IssuancePolicy,
}

impl IssuanceService {
    pub fn new(
        oracle: Arc<dyn FactOracle>,
        sequence: Arc<SequenceAllocator>,
        authority: Arc<CredentialAuthority>,
        anchor: Arc<LedgerAnchor>,
        policy: IssuancePolicy,
    ) -> Self {
        Self {
            authenticator: RequestAuthenticator::new(),
            oracle,
            sequence,
            authority,
            anchor,
            policy,
        }
    }

    pub fn authority(&self) -> &CredentialAuthority {
        &self.authority
    }

    pub fn sequence(&self) -> &SequenceAllocator {
        &self.sequence
    }

    pub fn anchor(&self) -> &LedgerAnchor {
        &self.anchor
    }

    pub fn policy(&self) -> &IssuancePolicy {
        &self.policy
    }

    /// Property keys every credential is anchored under.
    pub fn anchored_properties() -> Vec<PropertyKey> {
        vec![PropertyKey::signature()]
    }

    pub async fn issue(&self, request: IssuanceRequest) -> Result<Credential, IssuanceError> {
        let subject = request.subject_identifier.trim();
        let address = request.external_address.trim();
        if subject.is_empty() || address.is_empty() {
            return Err(IssuanceError::Validation(
                "missing subjectIdentifier or externalAddress".into(),
            ));
        }
        if request.attestation_signature.trim().is_empty() {
            return Err(IssuanceError::Validation("missing attestationSignature".into()));
        }

        let threshold_str = request
            .threshold
            .as_deref()
            .map(str::trim)
            .unwrap_or(&self.policy.default_threshold)
            .to_string();
        let threshold = Quantity::parse_decimal(&threshold_str, self.oracle.decimals())
            .map_err(|e| IssuanceError::Validation(format!("threshold: {}", e)))?;
        let operator = match request.operator.as_deref() {
            Some(op) => op
                .parse::<Comparison>()
                .map_err(|e| IssuanceError::Validation(e.to_string()))?,
            None => self.policy.default_operator,
        };

        let attestation = Attestation::new(subject, request.attestation_signature.trim());
        self.authenticator.authenticate(subject, address, &attestation)?;

        let observed = self
            .policy
            .retry
            .run("observe", || self.oracle.observe(address))
            .await?;
        let result = evaluate(observed, threshold, operator);
        tracing::info!(
            subject,
            address,
            %observed,
            %operator,
            threshold = %threshold_str,
            result,
            "predicate evaluated"
        );

        let sequence_id = self.allocate_id().await?;
        let credential = self.authority.issue(&ClaimInputs {
            subject_identifier: subject.to_string(),
            sequence_id,
            assertion: Assertion {
                claim: self.oracle.claim().to_string(),
                operator,
                threshold: threshold_str,
                result,
                timestamp: Utc::now().timestamp_millis(),
            },
        })?;

        self.anchor
            .register_properties(&Self::anchored_properties())
            .await?;
        self.anchor
            .anchor(
                sequence_id,
                PropertyKey::signature(),
                credential.proof.proof_value.as_bytes(),
            )
            .await?;

        tracing::info!(
            sequence_id,
            subject = credential.subject(),
            "credential issued and anchored"
        );
        Ok(credential)
    }

    /// The counter write is a synced disk write, so it runs on the blocking pool.
    async fn allocate_id(&self) -> Result<u64, IssuanceError> {
        let sequence = Arc::clone(&self.sequence);
        let id = tokio::task::spawn_blocking(move || sequence.next_id())
            .await
            .map_err(|e| SequenceError::Interrupted(e.to_string()))??;
        Ok(id)
    }
}
