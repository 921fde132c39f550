use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use vcanchor_core::RetryPolicy;

use crate::error::LedgerError;
use crate::traits::LedgerClient;
use crate::types::{Confirmation, ContractCall, ContractRead, PropertyKey, ReadValue, TxHash};

/// Upper bound on how many registered properties are read back. A longer
/// list is an error rather than a silent truncation.
const MAX_PROPERTIES: u64 = 256;

/// Outcome of a property registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Registration {
    /// Every requested key was already registered; nothing was submitted.
    AlreadyRegistered,
    /// The missing keys were submitted and confirmed.
    Registered { tx_hash: TxHash, added: Vec<PropertyKey> },
}

/// Writes proof values to the registry contract and reads them back.
///
/// Property registration is idempotent: the on-chain list is read first and
/// only missing keys are submitted. Registrations are remembered in-process so
/// later calls skip the round trip.
pub struct LedgerAnchor {
    client: Arc<dyn LedgerClient>,
    retry: RetryPolicy,
    confirmation_timeout: Duration,
    registered: Mutex<HashSet<PropertyKey>>,
}

impl LedgerAnchor {
    pub fn new(client: Arc<dyn LedgerClient>, retry: RetryPolicy, confirmation_timeout: Duration) -> Self {
        Self {
            client,
            retry,
            confirmation_timeout,
            registered: Mutex::new(HashSet::new()),
        }
    }

    pub fn client_id(&self) -> &str {
        self.client.client_id()
    }

    /// Ensure every key in `keys` is registered on the ledger.
    ///
    /// `setProperties` replaces the whole list, so the submitted list is the
    /// existing one with the missing keys appended.
    pub async fn register_properties(&self, keys: &[PropertyKey]) -> Result<Registration, LedgerError> {
        // Held across the round trip so concurrent callers do not race to
        // submit the same list.
        let mut known = self.registered.lock().await;
        if keys.iter().all(|k| known.contains(k)) {
            return Ok(Registration::AlreadyRegistered);
        }

        let existing = self.registered_properties().await?;
        known.extend(existing.iter().copied());

        let mut added = Vec::new();
        for key in keys {
            if !known.contains(key) && !added.contains(key) {
                added.push(*key);
            }
        }
        if added.is_empty() {
            tracing::debug!(count = keys.len(), "properties already registered on ledger");
            return Ok(Registration::AlreadyRegistered);
        }

        let mut list = existing;
        list.extend(added.iter().copied());
        let confirmation = self
            .submit_and_confirm(ContractCall::SetProperties { keys: list })
            .await?;

        known.extend(added.iter().copied());
        tracing::info!(
            tx = %confirmation.tx_hash,
            added = ?added.iter().map(|k| k.to_string()).collect::<Vec<_>>(),
            "registered ledger properties"
        );
        Ok(Registration::Registered {
            tx_hash: confirmation.tx_hash,
            added,
        })
    }

    /// Read the registered property list from the ledger.
    pub async fn registered_properties(&self) -> Result<Vec<PropertyKey>, LedgerError> {
        let mut keys = Vec::new();
        for index in 0..MAX_PROPERTIES {
            let value = self
                .read_with_retry("_properties", ContractRead::PropertyAt { index })
                .await?;
            match value {
                ReadValue::Property(Some(key)) => keys.push(key),
                ReadValue::Property(None) => return Ok(keys),
                other => {
                    return Err(LedgerError::UnexpectedResponse(format!(
                        "_properties returned {:?}",
                        other
                    )))
                }
            }
        }
        // Resubmitting a truncated list would drop the keys past the cap.
        Err(LedgerError::UnexpectedResponse(format!(
            "registry lists more than {} properties",
            MAX_PROPERTIES
        )))
    }

    /// Write `content` under `(id, property)` and wait for confirmation.
    ///
    /// Submission and confirmation are retried together; re-writing the same
    /// content is harmless.
    pub async fn anchor(
        &self,
        id: u64,
        property: PropertyKey,
        content: &[u8],
    ) -> Result<Confirmation, LedgerError> {
        let call = ContractCall::SetVcProperty {
            id,
            property,
            content: content.to_vec(),
        };
        let confirmation = self.submit_and_confirm(call).await?;
        tracing::info!(
            sequence_id = id,
            property = %property,
            tx = %confirmation.tx_hash,
            block = ?confirmation.block_number,
            "proof anchored"
        );
        Ok(confirmation)
    }

    /// `getVC(id)`: the rendered record for a sequence ID.
    pub async fn read_record(&self, id: u64) -> Result<String, LedgerError> {
        match self.read_with_retry("getVC", ContractRead::Record { id }).await? {
            ReadValue::Text(text) => Ok(text),
            other => Err(LedgerError::UnexpectedResponse(format!("getVC returned {:?}", other))),
        }
    }

    /// `VC(id, property)`: the raw content stored for one property.
    pub async fn read_property(&self, id: u64, property: PropertyKey) -> Result<Vec<u8>, LedgerError> {
        match self
            .read_with_retry("VC", ContractRead::RecordProperty { id, property })
            .await?
        {
            ReadValue::Bytes(bytes) => Ok(bytes),
            other => Err(LedgerError::UnexpectedResponse(format!("VC returned {:?}", other))),
        }
    }

    async fn submit_and_confirm(&self, call: ContractCall) -> Result<Confirmation, LedgerError> {
        let method = call.method_name();
        self.retry
            .run(method, || {
                let call = call.clone();
                async move {
                    let tx = self.client.submit_transaction(call).await?;
                    self.client
                        .wait_for_confirmation(&tx, self.confirmation_timeout)
                        .await
                }
            })
            .await
    }

    async fn read_with_retry(&self, method: &str, read: ContractRead) -> Result<ReadValue, LedgerError> {
        self.retry
            .run(method, || self.client.read_contract_value(read.clone()))
            .await
    }
}
