//! `vcanchor issue`: Request a credential from an issuer node.

use clap::Args;
use ethers::signers::{LocalWallet, Signer};
use serde::{Deserialize, Serialize};

#[derive(Args, Debug)]
pub struct IssueArgs {
    /// Subject identifier the credential is issued to.
    #[arg(short, long)]
    pub subject: String,

    /// External account whose state is checked. Derived from --eth-key when omitted.
    #[arg(short, long)]
    pub address: Option<String>,

    /// Decimal threshold; the node default applies when omitted.
    #[arg(short, long)]
    pub threshold: Option<String>,

    /// Comparison operator (`>` or `>=`).
    #[arg(long)]
    pub operator: Option<String>,

    /// Hex EIP-191 signature over the subject identifier.
    #[arg(long, conflicts_with = "eth_key")]
    pub signature: Option<String>,

    /// Private key of the external account; signs the subject identifier locally.
    #[arg(long, env = "VCANCHOR_ETH_KEY", hide_env_values = true)]
    pub eth_key: Option<String>,

    /// Write the credential to this file instead of stdout.
    #[arg(short, long)]
    pub output: Option<std::path::PathBuf>,

    /// API endpoint of the issuer node.
    #[arg(short, long, default_value = "http://127.0.0.1:8080")]
    pub endpoint: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IssueRequest {
    subject_identifier: String,
    external_address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    threshold: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    operator: Option<String>,
    attestation_signature: String,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: String,
}

async fn build_request(args: &IssueArgs) -> anyhow::Result<IssueRequest> {
    let (address, signature) = match (&args.signature, &args.eth_key) {
        (Some(signature), _) => {
            let address = args
                .address
                .clone()
                .ok_or_else(|| anyhow::anyhow!("--address is required with --signature"))?;
            (address, signature.clone())
        }
        (None, Some(key)) => {
            let wallet: LocalWallet = key
                .trim()
                .parse()
                .map_err(|_| anyhow::anyhow!("invalid --eth-key"))?;
            let signature = wallet.sign_message(args.subject.as_str()).await?;
            let address = args
                .address
                .clone()
                .unwrap_or_else(|| format!("{:?}", wallet.address()));
            (address, format!("0x{}", hex::encode(signature.to_vec())))
        }
        (None, None) => anyhow::bail!("either --signature or --eth-key is required"),
    };

    Ok(IssueRequest {
        subject_identifier: args.subject.clone(),
        external_address: address,
        threshold: args.threshold.clone(),
        operator: args.operator.clone(),
        attestation_signature: signature,
    })
}

pub async fn run(args: &IssueArgs) -> anyhow::Result<()> {
    let body = build_request(args).await?;
    let url = format!("{}/api/issueVC", args.endpoint.trim_end_matches('/'));
    tracing::debug!(%url, address = %body.external_address, "requesting credential");

    let client = reqwest::Client::new();
    let resp = client
        .post(&url)
        .json(&body)
        .send()
        .await
        .map_err(|e| anyhow::anyhow!("could not reach node at {}: {}", args.endpoint, e))?;

    let status = resp.status();
    if !status.is_success() {
        if let Ok(err) = resp.json::<ErrorResponse>().await {
            anyhow::bail!("issuance failed (HTTP {}): {}", status, err.error);
        }
        anyhow::bail!("issuance failed (HTTP {})", status);
    }

    let credential: serde_json::Value = resp.json().await?;
    let pretty = serde_json::to_string_pretty(&credential)?;
    match &args.output {
        Some(path) => {
            std::fs::write(path, &pretty)?;
            println!("Credential issued!");
            println!("  Sequence ID: {}", credential["sequenceId"]);
            println!("  Issuer:      {}", credential["issuer"].as_str().unwrap_or("-"));
            println!("  Result:      {}", credential["assertion"]["result"]);
            println!("  Written to:  {}", path.display());
        }
        None => println!("{}", pretty),
    }
    Ok(())
}
