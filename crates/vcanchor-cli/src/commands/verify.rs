//! `vcanchor verify`: Verify a credential locally.
//!
//! The signature check needs nothing but the credential. With `--contract`
//! the anchored record is also read from the registry.

use clap::Args;
use std::sync::Arc;
use std::time::Duration;

use vcanchor_core::RetryPolicy;
use vcanchor_credentials::{CredentialVerifier, LedgerCheck, Verdict};
use vcanchor_ledger::{EvmLedgerClient, EvmLedgerConfig, LedgerAnchor};

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Credential JSON (as string or path to file).
    #[arg(short, long)]
    pub credential: String,

    /// JSON-RPC endpoint used for the ledger cross-check.
    #[arg(long, env = "VCANCHOR_RPC_URL", default_value = "http://127.0.0.1:8545")]
    pub rpc_url: String,

    /// Registry contract address; the ledger check is skipped when omitted.
    #[arg(long, env = "VCANCHOR_CONTRACT_ADDRESS")]
    pub contract: Option<String>,

    /// Timeout for each ledger read, in seconds.
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Print the verdict as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Reads never sign, so any well-formed key will do.
fn read_only_key() -> String {
    hex::encode(rand::random::<[u8; 32]>())
}

async fn build_verifier(args: &VerifyArgs) -> CredentialVerifier {
    let Some(contract) = args.contract.as_deref().filter(|c| !c.trim().is_empty()) else {
        return CredentialVerifier::new();
    };
    let config = EvmLedgerConfig {
        rpc_url: args.rpc_url.clone(),
        contract_address: contract.to_string(),
        request_timeout: Duration::from_secs(args.timeout_secs),
        ..EvmLedgerConfig::default()
    };
    match EvmLedgerClient::connect(&config, &read_only_key()).await {
        Ok(client) => {
            let timeout = Duration::from_secs(args.timeout_secs);
            CredentialVerifier::with_ledger(Arc::new(LedgerAnchor::new(
                Arc::new(client),
                RetryPolicy::default(),
                timeout,
            )))
        }
        Err(e) => {
            // The ledger phase reports unavailable instead of failing the command.
            tracing::warn!(error = %e, "could not connect to ledger");
            CredentialVerifier::new()
        }
    }
}

fn render(verdict: &Verdict) -> String {
    let mut out = String::new();
    if verdict.crypto_valid {
        out.push_str("Signature:  VALID\n");
    } else {
        out.push_str("Signature:  INVALID\n");
    }
    match &verdict.ledger {
        LedgerCheck::Valid => out.push_str("Ledger:     ANCHORED\n"),
        LedgerCheck::Invalid(reason) => out.push_str(&format!("Ledger:     MISMATCH ({})\n", reason)),
        LedgerCheck::Unavailable(reason) => {
            out.push_str(&format!("Ledger:     UNAVAILABLE ({})\n", reason))
        }
    }
    if let Some(id) = verdict.sequence_id {
        out.push_str(&format!("Sequence:   {}\n", id));
    }
    if let Some(issuer) = &verdict.issuer {
        out.push_str(&format!("Issuer:     {}\n", issuer));
    }
    out.push('\n');
    for check in &verdict.checks {
        let icon = if check.passed { "PASS" } else { "FAIL" };
        out.push_str(&format!("  [{}] {}", icon, check.name));
        if let Some(ref detail) = check.detail {
            out.push_str(&format!(": {}", detail));
        }
        out.push('\n');
    }
    out
}

pub async fn run(args: &VerifyArgs) -> anyhow::Result<()> {
    let credential = super::read_json_arg(&args.credential)
        .map_err(|e| anyhow::anyhow!("invalid credential: {}", e))?;

    let verifier = build_verifier(args).await;
    let verdict = verifier.verify(&credential).await;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&verdict)?);
    } else {
        print!("{}", render(&verdict));
    }

    if !verdict.crypto_valid {
        anyhow::bail!(
            "credential signature is invalid: {}",
            verdict.crypto_failure.as_deref().unwrap_or("unknown reason")
        );
    }
    Ok(())
}
