//! External fact oracle: observes an account's native-token balance and
//! evaluates threshold predicates against it.
//!
//! Amounts are fixed-point integers in the smallest unit. Decimal strings
//! are parsed exactly; floating point is never involved.

use async_trait::async_trait;
use dashmap::DashMap;
use ethers::providers::{Http, Middleware, Provider};
use ethers::types::{Address, U256};
use ethers::utils::{format_units, parse_units};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use vcanchor_core::types::NATIVE_BALANCE_CLAIM;
use vcanchor_core::Comparison;

use crate::error::OracleError;

/// Decimals of the native token.
pub const NATIVE_DECIMALS: u32 = 18;

/// A non-negative amount in the smallest unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Quantity(U256);

impl Quantity {
    pub fn from_base_units(value: impl Into<U256>) -> Self {
        Self(value.into())
    }

    /// Parse a decimal string such as `"0.1"` with `decimals` fractional digits.
    pub fn parse_decimal(input: &str, decimals: u32) -> Result<Self, OracleError> {
        let s = input.trim();
        let (whole, fraction) = match s.split_once('.') {
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        let well_formed = !(whole.is_empty() && fraction.is_empty())
            && whole.chars().all(|c| c.is_ascii_digit())
            && fraction.chars().all(|c| c.is_ascii_digit())
            && !(s.contains('.') && fraction.is_empty());
        if !well_formed {
            return Err(OracleError::InvalidQuantity(format!(
                "'{}' is not a non-negative decimal number",
                input
            )));
        }
        if fraction.len() > decimals as usize {
            return Err(OracleError::InvalidQuantity(format!(
                "'{}' has more than {} fractional digits",
                input, decimals
            )));
        }

        let normalized = if whole.is_empty() {
            format!("0.{}", fraction)
        } else {
            s.to_string()
        };
        let parsed = parse_units(normalized, decimals)
            .map_err(|e| OracleError::InvalidQuantity(format!("'{}': {}", input, e)))?;
        Ok(Self(parsed.into()))
    }

    pub fn as_base_units(&self) -> U256 {
        self.0
    }

    /// Render with `decimals` fractional digits.
    pub fn to_decimal_string(&self, decimals: u32) -> String {
        format_units(self.0, decimals).unwrap_or_else(|_| self.0.to_string())
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Pure predicate: `state <operator> threshold`.
pub fn evaluate(state: Quantity, threshold: Quantity, operator: Comparison) -> bool {
    operator.holds(&state, &threshold)
}

/// Source of truth for an account's resource state.
#[async_trait]
pub trait FactOracle: Send + Sync {
    /// Observe the current state for `address`. Never defaults on failure.
    async fn observe(&self, address: &str) -> Result<Quantity, OracleError>;

    /// Name of the observed quantity, recorded in the assertion.
    fn claim(&self) -> &str;

    /// Fractional digits used to parse thresholds for this quantity.
    fn decimals(&self) -> u32;
}

fn parse_address(address: &str) -> Result<Address, OracleError> {
    address
        .trim()
        .parse()
        .map_err(|e| OracleError::InvalidAddress(format!("'{}': {}", address, e)))
}

/// Native balance at the latest block via `eth_getBalance`.
pub struct EvmBalanceOracle {
    provider: Provider<Http>,
    timeout: Duration,
}

impl EvmBalanceOracle {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, OracleError> {
        let provider = Provider::<Http>::try_from(rpc_url).map_err(|e| {
            OracleError::Configuration(format!("invalid RPC url '{}': {}", rpc_url, e))
        })?;
        Ok(Self { provider, timeout })
    }
}

#[async_trait]
impl FactOracle for EvmBalanceOracle {
    async fn observe(&self, address: &str) -> Result<Quantity, OracleError> {
        let account = parse_address(address)?;
        let balance = tokio::time::timeout(self.timeout, self.provider.get_balance(account, None))
            .await
            .map_err(|_| OracleError::Timeout(self.timeout))?
            .map_err(|e| OracleError::Transport(e.to_string()))?;

        tracing::debug!(address, %balance, "observed native balance");
        Ok(Quantity(balance))
    }

    fn claim(&self) -> &str {
        NATIVE_BALANCE_CLAIM
    }

    fn decimals(&self) -> u32 {
        NATIVE_DECIMALS
    }
}

/// In-memory balances keyed by address. Unknown addresses hold zero.
pub struct InMemoryOracle {
    balances: DashMap<Address, Quantity>,
    unavailable: AtomicBool,
    queries: AtomicUsize,
}

impl InMemoryOracle {
    pub fn new() -> Self {
        Self {
            balances: DashMap::new(),
            unavailable: AtomicBool::new(false),
            queries: AtomicUsize::new(0),
        }
    }

    pub fn set_balance(&self, address: &str, balance: Quantity) -> Result<(), OracleError> {
        self.balances.insert(parse_address(address)?, balance);
        Ok(())
    }

    /// While unavailable, every observation fails with a transport error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn query_count(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }
}

impl Default for InMemoryOracle {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl FactOracle for InMemoryOracle {
    async fn observe(&self, address: &str) -> Result<Quantity, OracleError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(OracleError::Transport("oracle unreachable".into()));
        }
        let account = parse_address(address)?;
        Ok(self.balances.get(&account).map(|b| *b).unwrap_or_default())
    }

    fn claim(&self) -> &str {
        NATIVE_BALANCE_CLAIM
    }

    fn decimals(&self) -> u32 {
        NATIVE_DECIMALS
    }
}
