//! The issuer node orchestrator.
//!
//! Builds every component from configuration, registers the anchored
//! property keys on the ledger, then serves the HTTP API until shutdown.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;

use vcanchor_credentials::{
    CredentialAuthority, EvmBalanceOracle, FactOracle, IssuanceService, SequenceAllocator,
};
use vcanchor_crypto::KeyStore;
use vcanchor_ledger::{EvmLedgerClient, InMemoryLedger, LedgerAnchor, LedgerClient, Registration};

use crate::api::{start_api_server, AppState};
use crate::config::{LedgerMode, VcanchorConfig};
use crate::storage::Storage;

/// The issuer node.
pub struct IssuerNode {
    config: VcanchorConfig,
    service: Arc<IssuanceService>,
}

impl IssuerNode {
    /// Open storage, derive the issuer key and connect to the ledger and oracle.
    pub async fn new(config: VcanchorConfig) -> Result<Self> {
        config.validate()?;

        let storage = Arc::new(Storage::open(&config.storage.data_dir)?);
        tracing::info!(path = %config.storage.data_dir.display(), "storage initialized");

        let seed = config
            .issuer
            .seed
            .as_deref()
            .context("issuer seed is not configured")?;
        let keys = Arc::new(KeyStore::derive(seed)?);
        let authority = Arc::new(CredentialAuthority::new(
            keys,
            &config.issuer.namespace,
            &config.issuer.subject_namespace,
        )?);

        let did = authority.issuer_did().to_string();
        match storage.get_issuer_did()? {
            Some(previous) if previous != did => {
                tracing::warn!(%previous, current = %did, "issuer key changed since last run");
                storage.put_issuer_did(&did)?;
            }
            Some(_) => {}
            None => storage.put_issuer_did(&did)?,
        }

        let ledger: Arc<dyn LedgerClient> = match config.ledger.mode {
            LedgerMode::Evm => {
                let signer_key = config
                    .ledger
                    .signer_key
                    .as_deref()
                    .context("ledger signer key is not configured")?;
                let client =
                    EvmLedgerClient::connect(&config.ledger.to_evm_config(), signer_key).await?;
                tracing::info!(
                    rpc_url = %config.ledger.rpc_url,
                    contract = %config.ledger.contract_address,
                    signer = ?client.signer_address(),
                    "connected to EVM registry"
                );
                Arc::new(client)
            }
            LedgerMode::Memory => {
                tracing::warn!("using in-memory ledger; anchors will not survive a restart");
                Arc::new(InMemoryLedger::new())
            }
        };
        let anchor = Arc::new(LedgerAnchor::new(
            ledger,
            config.retry,
            config.ledger.confirmation_timeout(),
        ));

        let oracle: Arc<dyn FactOracle> = Arc::new(EvmBalanceOracle::new(
            config.oracle_rpc_url(),
            config.oracle_timeout(),
        )?);

        let sequence = Arc::new(SequenceAllocator::new(storage));
        if let Some(last) = sequence.current()? {
            tracing::info!(last_sequence_id = last, "resuming sequence");
        }

        let service = Arc::new(IssuanceService::new(
            oracle,
            sequence,
            authority,
            anchor,
            config.issuance_policy()?,
        ));

        tracing::info!(%did, "issuer node created");
        Ok(Self { config, service })
    }

    /// Make sure the anchored property keys exist in the registry.
    pub async fn register_properties(&self) -> Result<()> {
        let keys = IssuanceService::anchored_properties();
        match self.service.anchor().register_properties(&keys).await? {
            Registration::AlreadyRegistered => {
                tracing::info!("anchored properties already registered");
            }
            Registration::Registered { tx_hash, added } => {
                tracing::info!(%tx_hash, added = added.len(), "registered anchored properties");
            }
        }
        Ok(())
    }

    /// Register properties, then serve HTTP until `shutdown` resolves.
    pub async fn run(
        &self,
        shutdown: impl std::future::Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        self.register_properties().await?;

        let api_addr: SocketAddr =
            format!("{}:{}", self.config.api.listen_addr, self.config.api.port).parse()?;
        let state = Arc::new(AppState::new(self.service.clone()));
        start_api_server(api_addr, state, shutdown).await
    }
}
