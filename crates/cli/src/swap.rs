use std::time::Duration;

use alloy::{primitives::Address, providers::Provider, signers::local::PrivateKeySigner};
use anyhow::Context;
use colored::Colorize;
use meson_sdk::{
    registry::AddressRegistry,
    relayer::RelayerClient,
    signature::sign_swap_hash,
    swap::{ApprovalPolicy, SwapConfig, SwapOrchestrator},
    tx::{AlloyRpc, RetryPolicy, TransactionSubmitter},
    types::{AssetRef, SwapRequest},
};
use tokio_util::sync::CancellationToken;

use crate::{interruptible, status};

pub(crate) struct SwapArgs<'a> {
    pub source: AssetRef,
    pub destination: AssetRef,
    pub amount: String,
    pub key: &'a str,
    pub recipient: Option<Address>,
    pub token_address: Option<Address>,
    pub pool_address: Option<Address>,
    pub skip_approve: bool,
    pub approval_timeout: Option<Duration>,
}

pub(crate) async fn execute<P: Provider>(
    relayer: RelayerClient,
    provider: P,
    args: SwapArgs<'_>,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    let signer: PrivateKeySigner = args.key.trim().parse().context("parsing private key")?;
    let sender = signer.address();

    let mut policy = RetryPolicy::default();
    if let Some(timeout) = args.approval_timeout {
        policy = policy.with_timeout(timeout);
    }
    let submitter = TransactionSubmitter::connect(AlloyRpc::new(provider), signer.clone())
        .await
        .context("fetching chain ID")?
        .with_retry_policy(policy);

    let approval = if args.skip_approve { ApprovalPolicy::Skip } else { ApprovalPolicy::Always };
    let orchestrator = SwapOrchestrator::new(relayer.clone(), AddressRegistry::merlin_defaults(), submitter)
        .with_config(SwapConfig { approval, ..Default::default() });

    let mut request = SwapRequest::new(
        args.amount,
        sender.to_string(),
        args.recipient.unwrap_or(sender).to_string(),
        args.source,
        args.destination,
    );
    if let Some(token) = args.token_address {
        request = request.with_token_address(token.to_string());
    }
    if let Some(pool) = args.pool_address {
        request = request.with_pool_address(pool.to_string());
    }

    println!("{}\n", format!("{:#^80}", " Meson Swap ").bold().purple());
    println!(
        "{} {} {} from {} to {}",
        "Swapping".bold(),
        request.amount,
        request.source.token.display_name(),
        request.source,
        request.destination
    );
    println!("  sender:    {}", request.from_address);
    println!("  recipient: {}", request.to_address);

    let prepared = orchestrator.prepare(&request, &cancellation_token).await?;
    match &prepared.approval {
        Some(receipt) => println!(
            "\n{} {} (block {}, gas {})",
            "Approved".green().bold(),
            receipt.tx_hash,
            receipt.block_number,
            receipt.gas_used
        ),
        None => println!("\n{}", "Approval skipped".yellow()),
    }
    let price = prepared.price_info();
    println!(
        "{} fee {}, estimated time {}s, expires at {}",
        "Encoded".green().bold(),
        price.fee,
        price.estimated_time,
        prepared.expire_ts
    );

    let signature = sign_swap_hash(&signer, prepared.signing_hash())?;
    let submitted =
        interruptible(&cancellation_token, orchestrator.submit(&prepared, &signature)).await??;

    println!("{} {}", "Submitted swap".green().bold(), submitted.swap_id);
    status::print_status(&submitted.status);
    println!("\nFollow the swap with:\n  curl {}", relayer.status_url(&submitted.swap_id));

    Ok(())
}
