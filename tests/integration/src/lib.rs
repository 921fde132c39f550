//! Shared harness for the cross-crate tests: an issuance service wired to
//! the in-memory ledger, oracle and counter store.

use ethers::signers::{LocalWallet, Signer};
use std::sync::Arc;
use std::time::Duration;

use vcanchor_core::RetryPolicy;
use vcanchor_credentials::{
    CounterStore, CredentialAuthority, CredentialVerifier, InMemoryOracle, IssuancePolicy,
    IssuanceRequest, IssuanceService, MemoryCounterStore, Quantity, SequenceAllocator,
    NATIVE_DECIMALS,
};
use vcanchor_crypto::KeyStore;
use vcanchor_ledger::{InMemoryLedger, LedgerAnchor};

pub const ISSUER_SEED: &str = "0x9d61b19deffd5a60ba844af492ec2cc44449c5697b326919703bac031cae7f60";
pub const SUBJECT: &str = "0xd43593c715fdd31c61141abd04a99fd6822c8558854ccde39a5684e7a56da27d";

pub fn fast_retry() -> RetryPolicy {
    RetryPolicy {
        max_retries: 2,
        base_delay_ms: 1,
        max_delay_ms: 4,
    }
}

/// One issuer process: its own sequence and anchor cache over a shared ledger.
pub struct Issuer {
    pub service: Arc<IssuanceService>,
    pub anchor: Arc<LedgerAnchor>,
}

pub struct Harness {
    pub ledger: Arc<InMemoryLedger>,
    pub oracle: Arc<InMemoryOracle>,
    pub wallet: LocalWallet,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        Self {
            ledger: Arc::new(InMemoryLedger::new()),
            oracle: Arc::new(InMemoryOracle::new()),
            wallet: LocalWallet::from_bytes(&[0x11; 32]).expect("valid secp256k1 key"),
        }
    }

    pub fn address(&self) -> String {
        format!("{:?}", self.wallet.address())
    }

    pub fn set_balance(&self, decimal: &str) {
        self.oracle
            .set_balance(
                &self.address(),
                Quantity::parse_decimal(decimal, NATIVE_DECIMALS).expect("valid decimal"),
            )
            .expect("valid address");
    }

    /// A fresh issuer process with the given seed and counter store.
    pub fn issuer_with(&self, seed: &str, counter: Arc<dyn CounterStore>) -> Issuer {
        let anchor = Arc::new(LedgerAnchor::new(
            self.ledger.clone(),
            fast_retry(),
            Duration::from_millis(100),
        ));
        let authority = Arc::new(
            CredentialAuthority::new(
                Arc::new(KeyStore::derive(seed).expect("valid seed")),
                "vcanchor",
                "pubkey",
            )
            .expect("valid namespaces"),
        );
        let service = Arc::new(IssuanceService::new(
            self.oracle.clone(),
            Arc::new(SequenceAllocator::new(counter)),
            authority,
            anchor.clone(),
            IssuancePolicy {
                retry: fast_retry(),
                ..IssuancePolicy::default()
            },
        ));
        Issuer { service, anchor }
    }

    pub fn issuer(&self) -> Issuer {
        self.issuer_with(ISSUER_SEED, Arc::new(MemoryCounterStore::new()))
    }

    pub fn verifier(&self) -> CredentialVerifier {
        let anchor = LedgerAnchor::new(self.ledger.clone(), fast_retry(), Duration::from_millis(100));
        CredentialVerifier::with_ledger(Arc::new(anchor))
    }

    /// A request for `subject` attested by the harness wallet.
    pub async fn request_for(&self, subject: &str) -> IssuanceRequest {
        let signature = self
            .wallet
            .sign_message(subject)
            .await
            .expect("local signing cannot fail");
        IssuanceRequest {
            subject_identifier: subject.to_string(),
            external_address: self.address(),
            threshold: None,
            operator: None,
            attestation_signature: format!("0x{}", hex::encode(signature.to_vec())),
        }
    }

    pub async fn request(&self) -> IssuanceRequest {
        self.request_for(SUBJECT).await
    }
}
