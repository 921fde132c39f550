use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::RwLock;

use crate::error::LedgerError;
use crate::traits::LedgerClient;
use crate::types::{Confirmation, ContractCall, ContractRead, PropertyKey, ReadValue, TxHash};

/// In-process ledger with the anchoring contract's semantics.
///
/// Submitted calls sit in a pending pool and take effect when their
/// confirmation is awaited, one block per transaction. Useful for tests and
/// for running the issuer without a chain. Fault injection hooks let tests
/// exercise retry and unavailability paths.
pub struct InMemoryLedger {
    /// Registered property list, in registration order.
    properties: RwLock<Vec<PropertyKey>>,
    /// `(id, property) -> content`.
    records: DashMap<(u64, PropertyKey), Vec<u8>>,
    pending: DashMap<TxHash, ContractCall>,
    confirmed: DashMap<TxHash, Confirmation>,
    /// Submissions per contract method, including failed ones.
    submissions: DashMap<&'static str, usize>,
    nonce: AtomicU64,
    block: AtomicU64,
    failing_submissions: AtomicU32,
    stalled: AtomicBool,
    reads_unavailable: AtomicBool,
}

impl InMemoryLedger {
    pub fn new() -> Self {
        Self {
            properties: RwLock::new(Vec::new()),
            records: DashMap::new(),
            pending: DashMap::new(),
            confirmed: DashMap::new(),
            submissions: DashMap::new(),
            nonce: AtomicU64::new(0),
            block: AtomicU64::new(0),
            failing_submissions: AtomicU32::new(0),
            stalled: AtomicBool::new(false),
            reads_unavailable: AtomicBool::new(false),
        }
    }

    /// Make the next `n` submissions fail with a transport error.
    pub fn fail_next_submissions(&self, n: u32) {
        self.failing_submissions.store(n, Ordering::SeqCst);
    }

    /// While stalled, confirmations never arrive.
    pub fn set_stalled(&self, stalled: bool) {
        self.stalled.store(stalled, Ordering::SeqCst);
    }

    /// While unavailable, every read fails with a transport error.
    pub fn set_reads_unavailable(&self, unavailable: bool) {
        self.reads_unavailable.store(unavailable, Ordering::SeqCst);
    }

    /// Number of submissions of `method` seen so far.
    pub fn submission_count(&self, method: &str) -> usize {
        self.submissions.get(method).map(|v| *v).unwrap_or(0)
    }

    pub async fn registered_properties(&self) -> Vec<PropertyKey> {
        self.properties.read().await.clone()
    }

    /// Overwrite a stored record directly, bypassing the contract rules.
    pub fn tamper_record(&self, id: u64, property: PropertyKey, content: &[u8]) {
        self.records.insert((id, property), content.to_vec());
    }

    pub fn block_number(&self) -> u64 {
        self.block.load(Ordering::SeqCst)
    }

    fn next_tx_hash(&self, call: &ContractCall) -> TxHash {
        let nonce = self.nonce.fetch_add(1, Ordering::SeqCst);
        let mut hasher = blake3::Hasher::new();
        hasher.update(&nonce.to_le_bytes());
        hasher.update(call.method_name().as_bytes());
        TxHash(*hasher.finalize().as_bytes())
    }

    async fn apply(&self, call: ContractCall) -> Result<(), LedgerError> {
        match call {
            ContractCall::SetProperties { keys } => {
                *self.properties.write().await = keys;
            }
            ContractCall::SetVcProperty {
                id,
                property,
                content,
            } => {
                if !self.properties.read().await.contains(&property) {
                    return Err(LedgerError::Reverted(format!(
                        "property '{}' is not registered",
                        property
                    )));
                }
                self.records.insert((id, property), content);
            }
        }
        Ok(())
    }

    /// `getVC(id)`: every registered property with content for `id`, as a
    /// JSON object string in registration order.
    async fn render_record(&self, id: u64) -> String {
        let properties = self.properties.read().await;
        let fields: Vec<String> = properties
            .iter()
            .filter_map(|key| {
                self.records.get(&(id, *key)).map(|content| {
                    format!(
                        "\"{}\":\"{}\"",
                        key,
                        String::from_utf8_lossy(content.value())
                    )
                })
            })
            .collect();
        if fields.is_empty() {
            String::new()
        } else {
            format!("{{{}}}", fields.join(","))
        }
    }
}

impl Default for InMemoryLedger {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LedgerClient for InMemoryLedger {
    async fn submit_transaction(&self, call: ContractCall) -> Result<TxHash, LedgerError> {
        *self.submissions.entry(call.method_name()).or_insert(0) += 1;

        let failing = self.failing_submissions.load(Ordering::SeqCst);
        if failing > 0 {
            self.failing_submissions.store(failing - 1, Ordering::SeqCst);
            return Err(LedgerError::Transport("injected submission failure".into()));
        }

        let tx = self.next_tx_hash(&call);
        tracing::debug!(%tx, method = call.method_name(), "in-memory transaction submitted");
        self.pending.insert(tx, call);
        Ok(tx)
    }

    async fn wait_for_confirmation(
        &self,
        tx: &TxHash,
        timeout: Duration,
    ) -> Result<Confirmation, LedgerError> {
        if let Some(existing) = self.confirmed.get(tx) {
            return Ok(existing.clone());
        }

        if self.stalled.load(Ordering::SeqCst) {
            tokio::time::sleep(timeout).await;
            return Err(LedgerError::ConfirmationTimeout {
                tx: tx.to_string(),
                timeout,
            });
        }

        let (_, call) = self
            .pending
            .remove(tx)
            .ok_or_else(|| LedgerError::UnexpectedResponse(format!("unknown transaction {}", tx)))?;
        self.apply(call).await?;

        let block = self.block.fetch_add(1, Ordering::SeqCst) + 1;
        let confirmation = Confirmation {
            tx_hash: *tx,
            block_number: Some(block),
            confirmations: 1,
        };
        self.confirmed.insert(*tx, confirmation.clone());
        Ok(confirmation)
    }

    async fn read_contract_value(&self, read: ContractRead) -> Result<ReadValue, LedgerError> {
        if self.reads_unavailable.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("ledger unreachable".into()));
        }

        match read {
            ContractRead::PropertyAt { index } => {
                let properties = self.properties.read().await;
                Ok(ReadValue::Property(
                    usize::try_from(index)
                        .ok()
                        .and_then(|i| properties.get(i).copied()),
                ))
            }
            ContractRead::Record { id } => Ok(ReadValue::Text(self.render_record(id).await)),
            ContractRead::RecordProperty { id, property } => Ok(ReadValue::Bytes(
                self.records
                    .get(&(id, property))
                    .map(|v| v.value().clone())
                    .unwrap_or_default(),
            )),
        }
    }

    fn client_id(&self) -> &str {
        "ledger-internal"
    }
}
