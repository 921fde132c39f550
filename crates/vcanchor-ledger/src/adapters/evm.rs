use async_trait::async_trait;
use ethers::abi::{parse_abi, Abi};
use ethers::contract::{Contract, ContractError};
use ethers::middleware::SignerMiddleware;
use ethers::providers::{Http, Middleware, PendingTransaction, Provider};
use ethers::signers::{LocalWallet, Signer};
use ethers::types::{Address, Bytes, H256, U256, U64};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use crate::error::LedgerError;
use crate::traits::LedgerClient;
use crate::types::{Confirmation, ContractCall, ContractRead, PropertyKey, ReadValue, TxHash};

type SignerClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// Human-readable ABI of the anchoring registry contract.
const REGISTRY_ABI: &[&str] = &[
    "function setProperties(bytes32[] propertyList)",
    "function setVCProperty(uint256 id, bytes32 property, bytes content)",
    "function getVC(uint256 id) view returns (string)",
    "function _properties(uint256 index) view returns (bytes32)",
    "function VC(uint256 id, bytes32 property) view returns (bytes)",
];

/// Parse the registry ABI.
pub fn registry_abi() -> Result<Abi, LedgerError> {
    parse_abi(REGISTRY_ABI)
        .map_err(|e| LedgerError::Configuration(format!("invalid registry ABI: {}", e)))
}

/// Connection settings for an EVM JSON-RPC endpoint. The signer key is
/// passed separately to [`EvmLedgerClient::connect`].
#[derive(Debug, Clone)]
pub struct EvmLedgerConfig {
    pub rpc_url: String,
    pub contract_address: String,
    /// Fetched from the node when unset.
    pub chain_id: Option<u64>,
    pub confirmations: usize,
    pub poll_interval: Duration,
    /// Bound on every submission and read round trip.
    pub request_timeout: Duration,
    pub gas_limit: Option<u64>,
}

impl Default for EvmLedgerConfig {
    fn default() -> Self {
        Self {
            rpc_url: "http://127.0.0.1:8545".into(),
            contract_address: String::new(),
            chain_id: None,
            confirmations: 1,
            poll_interval: Duration::from_millis(500),
            request_timeout: Duration::from_secs(10),
            gas_limit: None,
        }
    }
}

/// Ledger client for the registry contract on an EVM chain.
pub struct EvmLedgerClient {
    client: Arc<SignerClient>,
    contract: Contract<SignerClient>,
    confirmations: usize,
    request_timeout: Duration,
    gas_limit: Option<u64>,
}

impl EvmLedgerClient {
    pub async fn connect(config: &EvmLedgerConfig, signer_key: &str) -> Result<Self, LedgerError> {
        let provider = Provider::<Http>::try_from(config.rpc_url.as_str())
            .map_err(|e| {
                LedgerError::Configuration(format!("invalid RPC url '{}': {}", config.rpc_url, e))
            })?
            .interval(config.poll_interval);

        let address: Address = config.contract_address.trim().parse().map_err(|e| {
            LedgerError::Configuration(format!(
                "invalid contract address '{}': {}",
                config.contract_address, e
            ))
        })?;

        let wallet: LocalWallet = signer_key
            .trim()
            .parse()
            .map_err(|_| LedgerError::Configuration("invalid ledger signer key".into()))?;

        let chain_id = match config.chain_id {
            Some(id) => id,
            None => provider
                .get_chainid()
                .await
                .map_err(|e| LedgerError::Transport(format!("failed to fetch chain id: {}", e)))?
                .as_u64(),
        };

        let wallet = wallet.with_chain_id(chain_id);
        tracing::info!(
            rpc_url = %config.rpc_url,
            contract = ?address,
            signer = ?wallet.address(),
            chain_id,
            "connected EVM ledger client"
        );

        let client = Arc::new(SignerMiddleware::new(provider, wallet));
        let contract = Contract::new(address, registry_abi()?, client.clone());

        Ok(Self {
            client,
            contract,
            confirmations: config.confirmations.max(1),
            request_timeout: config.request_timeout,
            gas_limit: config.gas_limit,
        })
    }

    /// Address the client signs transactions with.
    pub fn signer_address(&self) -> Address {
        self.client.signer().address()
    }

    async fn bounded<T, F>(&self, what: &str, fut: F) -> Result<T, LedgerError>
    where
        F: Future<Output = Result<T, LedgerError>>,
    {
        tokio::time::timeout(self.request_timeout, fut)
            .await
            .map_err(|_| {
                LedgerError::Transport(format!("{} timed out after {:?}", what, self.request_timeout))
            })?
    }

    async fn read_property_at(&self, index: u64) -> Result<ReadValue, LedgerError> {
        let call = self
            .contract
            .method::<_, H256>("_properties", (U256::from(index),))
            .map_err(|e| LedgerError::Read(e.to_string()))?;
        match call.call().await {
            Ok(raw) => Ok(ReadValue::Property(Some(PropertyKey::from_bytes(raw.0)))),
            // Out-of-bounds array reads revert.
            Err(e) if e.is_revert() => Ok(ReadValue::Property(None)),
            Err(e) => Err(LedgerError::Read(e.to_string())),
        }
    }

    async fn read_record(&self, id: u64) -> Result<ReadValue, LedgerError> {
        let text = self
            .contract
            .method::<_, String>("getVC", (U256::from(id),))
            .map_err(|e| LedgerError::Read(e.to_string()))?
            .call()
            .await
            .map_err(read_error)?;
        Ok(ReadValue::Text(text))
    }

    async fn read_record_property(
        &self,
        id: u64,
        property: PropertyKey,
    ) -> Result<ReadValue, LedgerError> {
        let content = self
            .contract
            .method::<_, Bytes>("VC", (U256::from(id), H256::from(*property.as_bytes())))
            .map_err(|e| LedgerError::Read(e.to_string()))?
            .call()
            .await
            .map_err(read_error)?;
        Ok(ReadValue::Bytes(content.to_vec()))
    }
}

fn read_error(e: ContractError<SignerClient>) -> LedgerError {
    if e.is_revert() {
        LedgerError::Reverted(e.to_string())
    } else {
        LedgerError::Read(e.to_string())
    }
}

fn submission_error(e: ContractError<SignerClient>) -> LedgerError {
    if e.is_revert() {
        LedgerError::Reverted(e.to_string())
    } else {
        LedgerError::Submission(e.to_string())
    }
}

#[async_trait]
impl LedgerClient for EvmLedgerClient {
    async fn submit_transaction(&self, call: ContractCall) -> Result<TxHash, LedgerError> {
        let method = call.method_name();
        let encoded = match call {
            ContractCall::SetProperties { keys } => {
                let keys: Vec<H256> = keys.iter().map(|k| H256::from(*k.as_bytes())).collect();
                self.contract.method::<_, ()>(method, (keys,))
            }
            ContractCall::SetVcProperty {
                id,
                property,
                content,
            } => self.contract.method::<_, ()>(
                method,
                (
                    U256::from(id),
                    H256::from(*property.as_bytes()),
                    Bytes::from(content),
                ),
            ),
        };
        let mut tx = encoded.map_err(|e| {
            LedgerError::Submission(format!("failed to encode {}: {}", method, e))
        })?;
        if let Some(gas) = self.gas_limit {
            tx = tx.gas(gas);
        }

        let hash = self
            .bounded(method, async {
                let pending = tx.send().await.map_err(submission_error)?;
                Ok(pending.tx_hash())
            })
            .await?;

        let tx_hash = TxHash(hash.0);
        tracing::info!(%tx_hash, method, "transaction submitted");
        Ok(tx_hash)
    }

    async fn wait_for_confirmation(
        &self,
        tx: &TxHash,
        timeout: Duration,
    ) -> Result<Confirmation, LedgerError> {
        let pending = PendingTransaction::new(H256::from(tx.0), self.client.provider())
            .confirmations(self.confirmations);

        let receipt = match tokio::time::timeout(timeout, pending).await {
            Err(_) => {
                return Err(LedgerError::ConfirmationTimeout {
                    tx: tx.to_string(),
                    timeout,
                })
            }
            Ok(Err(e)) => return Err(LedgerError::Transport(e.to_string())),
            Ok(Ok(None)) => return Err(LedgerError::Dropped(tx.to_string())),
            Ok(Ok(Some(receipt))) => receipt,
        };

        if receipt.status == Some(U64::zero()) {
            return Err(LedgerError::Reverted(format!(
                "{} failed in block {:?}",
                tx, receipt.block_number
            )));
        }

        let confirmation = Confirmation {
            tx_hash: *tx,
            block_number: receipt.block_number.map(|b| b.as_u64()),
            confirmations: self.confirmations,
        };
        tracing::debug!(%tx, block = ?confirmation.block_number, "transaction confirmed");
        Ok(confirmation)
    }

    async fn read_contract_value(&self, read: ContractRead) -> Result<ReadValue, LedgerError> {
        match read {
            ContractRead::PropertyAt { index } => {
                self.bounded("_properties", self.read_property_at(index)).await
            }
            ContractRead::Record { id } => self.bounded("getVC", self.read_record(id)).await,
            ContractRead::RecordProperty { id, property } => {
                self.bounded("VC", self.read_record_property(id, property))
                    .await
            }
        }
    }

    fn client_id(&self) -> &str {
        "ledger-evm"
    }
}
