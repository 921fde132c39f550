//! Issuer node configuration: TOML file, then environment overrides for
//! secrets and endpoints, then CLI overrides in `main`.

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use vcanchor_core::{Comparison, RetryPolicy};
use vcanchor_credentials::{IssuancePolicy, Quantity, NATIVE_DECIMALS};
use vcanchor_ledger::EvmLedgerConfig;

pub const ENV_ISSUER_SEED: &str = "VCANCHOR_ISSUER_SEED";
pub const ENV_LEDGER_KEY: &str = "VCANCHOR_LEDGER_KEY";
pub const ENV_RPC_URL: &str = "VCANCHOR_RPC_URL";
pub const ENV_CONTRACT_ADDRESS: &str = "VCANCHOR_CONTRACT_ADDRESS";

/// Full configuration for the issuer node.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct VcanchorConfig {
    #[serde(default)]
    pub api: ApiConfig,

    #[serde(default)]
    pub issuer: IssuerConfig,

    #[serde(default)]
    pub ledger: LedgerConfig,

    #[serde(default)]
    pub oracle: OracleConfig,

    /// Backoff for oracle and ledger round trips.
    #[serde(default)]
    pub retry: RetryPolicy,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_api_addr")]
    pub listen_addr: String,
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct IssuerConfig {
    /// Second segment of the issuer DID.
    #[serde(default = "default_issuer_namespace")]
    pub namespace: String,
    /// Namespace for subject identifiers that are not already DIDs.
    #[serde(default = "default_subject_namespace")]
    pub subject_namespace: String,
    #[serde(default = "default_threshold")]
    pub default_threshold: String,
    #[serde(default = "default_operator")]
    pub default_operator: String,
    /// Never written back to disk.
    #[serde(default, skip_serializing)]
    pub seed: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerMode {
    #[default]
    Evm,
    /// In-process ledger; anchors do not survive restarts.
    Memory,
}

#[derive(Clone, Serialize, Deserialize)]
pub struct LedgerConfig {
    #[serde(default)]
    pub mode: LedgerMode,
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    #[serde(default)]
    pub contract_address: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<u64>,
    #[serde(default = "default_confirmations")]
    pub confirmations: usize,
    #[serde(default = "default_confirmation_timeout_secs")]
    pub confirmation_timeout_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    /// Never written back to disk.
    #[serde(default, skip_serializing)]
    pub signer_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    /// Defaults to the ledger RPC endpoint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpc_url: Option<String>,
    #[serde(default = "default_oracle_timeout_secs")]
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_api_addr() -> String {
    "127.0.0.1".into()
}
fn default_api_port() -> u16 {
    8080
}
fn default_issuer_namespace() -> String {
    "vcanchor".into()
}
fn default_subject_namespace() -> String {
    "pubkey".into()
}
fn default_threshold() -> String {
    "0.1".into()
}
fn default_operator() -> String {
    ">".into()
}
fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".into()
}
fn default_confirmations() -> usize {
    1
}
fn default_confirmation_timeout_secs() -> u64 {
    120
}
fn default_request_timeout_secs() -> u64 {
    15
}
fn default_poll_interval_ms() -> u64 {
    1_000
}
fn default_oracle_timeout_secs() -> u64 {
    10
}
fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_api_addr(),
            port: default_api_port(),
        }
    }
}

impl Default for IssuerConfig {
    fn default() -> Self {
        Self {
            namespace: default_issuer_namespace(),
            subject_namespace: default_subject_namespace(),
            default_threshold: default_threshold(),
            default_operator: default_operator(),
            seed: None,
        }
    }
}

impl std::fmt::Debug for IssuerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IssuerConfig")
            .field("namespace", &self.namespace)
            .field("subject_namespace", &self.subject_namespace)
            .field("default_threshold", &self.default_threshold)
            .field("default_operator", &self.default_operator)
            .field("seed", &self.seed.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            mode: LedgerMode::default(),
            rpc_url: default_rpc_url(),
            contract_address: String::new(),
            chain_id: None,
            confirmations: default_confirmations(),
            confirmation_timeout_secs: default_confirmation_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
            gas_limit: None,
            signer_key: None,
        }
    }
}

impl std::fmt::Debug for LedgerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerConfig")
            .field("mode", &self.mode)
            .field("rpc_url", &self.rpc_url)
            .field("contract_address", &self.contract_address)
            .field("chain_id", &self.chain_id)
            .field("confirmations", &self.confirmations)
            .field("signer_key", &self.signer_key.as_ref().map(|_| "<redacted>"))
            .finish_non_exhaustive()
    }
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            rpc_url: None,
            timeout_secs: default_oracle_timeout_secs(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl LedgerConfig {
    pub fn confirmation_timeout(&self) -> Duration {
        Duration::from_secs(self.confirmation_timeout_secs)
    }

    pub fn to_evm_config(&self) -> EvmLedgerConfig {
        EvmLedgerConfig {
            rpc_url: self.rpc_url.clone(),
            contract_address: self.contract_address.clone(),
            chain_id: self.chain_id,
            confirmations: self.confirmations,
            poll_interval: Duration::from_millis(self.poll_interval_ms),
            request_timeout: Duration::from_secs(self.request_timeout_secs),
            gas_limit: self.gas_limit,
        }
    }
}

impl VcanchorConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)
                .with_context(|| format!("reading {}", path.display()))?;
            let config: VcanchorConfig = toml::from_str(&contents)
                .with_context(|| format!("parsing {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the config to a TOML file. Secrets are not written.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        if let Some(seed) = non_empty(ENV_ISSUER_SEED) {
            self.issuer.seed = Some(seed);
        }
        if let Some(key) = non_empty(ENV_LEDGER_KEY) {
            self.ledger.signer_key = Some(key);
        }
        if let Some(url) = non_empty(ENV_RPC_URL) {
            self.ledger.rpc_url = url;
        }
        if let Some(address) = non_empty(ENV_CONTRACT_ADDRESS) {
            self.ledger.contract_address = address;
        }
    }

    /// Check that everything needed to start is present.
    pub fn validate(&self) -> anyhow::Result<()> {
        if self.issuer.seed.is_none() {
            bail!("issuer seed is not configured (set {})", ENV_ISSUER_SEED);
        }
        self.issuance_policy()?;
        if self.ledger.mode == LedgerMode::Evm {
            if self.ledger.signer_key.is_none() {
                bail!("ledger signer key is not configured (set {})", ENV_LEDGER_KEY);
            }
            if self.ledger.contract_address.trim().is_empty() {
                bail!(
                    "ledger contract address is not configured (set {})",
                    ENV_CONTRACT_ADDRESS
                );
            }
        }
        Ok(())
    }

    pub fn issuance_policy(&self) -> anyhow::Result<IssuancePolicy> {
        let default_operator: Comparison = self
            .issuer
            .default_operator
            .parse()
            .context("issuer.default_operator")?;
        // The balance oracle reports native units, so the default threshold
        // must parse at the same precision.
        Quantity::parse_decimal(&self.issuer.default_threshold, NATIVE_DECIMALS)
            .context("issuer.default_threshold")?;
        Ok(IssuancePolicy {
            default_threshold: self.issuer.default_threshold.clone(),
            default_operator,
            retry: self.retry,
        })
    }

    pub fn oracle_rpc_url(&self) -> &str {
        self.oracle.rpc_url.as_deref().unwrap_or(&self.ledger.rpc_url)
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_secs(self.oracle.timeout_secs)
    }
}
