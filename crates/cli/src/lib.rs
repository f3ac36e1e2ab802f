pub mod args;
mod price;
mod status;
mod swap;

use std::time::Duration;

use alloy::{
    providers::{Provider, ProviderBuilder},
    rpc::client::RpcClient,
    transports::layers::ThrottleLayer,
};
use anyhow::Context;
use args::{Cli, Commands, LogFormat, Route};
use meson_sdk::{
    relayer::{RelayerClient, RelayerConfig},
    types::{AssetRef, ChainId, TokenId},
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    init_tracing(&cli);
    tracing::debug!(rpc = %cli.rpc, relayer = %cli.relayer, "starting");

    let relayer = RelayerClient::new(RelayerConfig { base_url: cli.relayer.clone(), ..Default::default() })
        .context("creating relayer client")?;

    let cancellation_signal = CancellationToken::new();
    let cancellation_token = cancellation_signal.child_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            cancellation_signal.cancel();
        }
    });

    match &cli.command {
        Commands::Price { route } => {
            let (source, destination) = assets(route)?;
            price::render(&relayer, &source, &destination, &route.amount, &cancellation_token).await?
        },
        Commands::Status { swap_id, watch } => {
            status::render(&relayer, swap_id, *watch, cancellation_token).await?
        },
        Commands::Swap {
            route,
            key,
            recipient,
            token_address,
            pool_address,
            skip_approve,
            approval_timeout,
        } => {
            let (source, destination) = assets(route)?;
            let provider = connect(&cli).await?;
            swap::execute(
                relayer,
                provider,
                swap::SwapArgs {
                    source,
                    destination,
                    amount: route.amount.clone(),
                    key,
                    recipient: *recipient,
                    token_address: *token_address,
                    pool_address: *pool_address,
                    skip_approve: *skip_approve,
                    approval_timeout: (*approval_timeout).map(Duration::from_secs),
                },
                cancellation_token,
            )
            .await?
        },
    }

    Ok(())
}

/// No retry layer: each broadcast and receipt lookup is sent once.
async fn connect(cli: &Cli) -> anyhow::Result<impl Provider + Clone> {
    let client = if cli.rpc == args::DEFAULT_RPC_PROVIDER || cli.rpc_throttle.is_some() {
        // Apply throttling with default RPC
        RpcClient::builder()
            .layer(ThrottleLayer::new(cli.rpc_throttle.unwrap_or(args::DEFAULT_RPC_THROTTLING)))
            .connect(&cli.rpc)
            .await
            .context("connecting to RPC")?
    } else {
        RpcClient::builder().connect(&cli.rpc).await.context("connecting to RPC")?
    };
    Ok(ProviderBuilder::new().connect_client(client))
}

/// Runs `fut` unless Ctrl+C fires first.
pub(crate) async fn interruptible<T>(
    cancellation_token: &CancellationToken,
    fut: impl Future<Output = T>,
) -> anyhow::Result<T> {
    tokio::select! {
        res = fut => Ok(res),
        _ = cancellation_token.cancelled() => Err(anyhow::anyhow!("interrupted")),
    }
}

fn assets(route: &Route) -> anyhow::Result<(AssetRef, AssetRef)> {
    let token = TokenId::resolve(&route.token)?;
    Ok((
        AssetRef::new(ChainId::new(route.from_chain.clone()), token.clone()),
        AssetRef::new(ChainId::new(route.to_chain.clone()), token),
    ))
}

fn init_tracing(cli: &Cli) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&cli.log_level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter).with_writer(std::io::stderr);
    match cli.log_format {
        LogFormat::Compact => subscriber.compact().init(),
        LogFormat::Json => subscriber.json().init(),
    }
}

#[cfg(test)]
mod tests {
    use clap::Parser;

    use super::*;

    #[test]
    fn test_swap_args() {
        let cli = Cli::try_parse_from([
            "meson-cli",
            "swap",
            "--amount",
            "0.01",
            "--token",
            "merl",
            "--key",
            "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318",
            "--skip-approve",
        ])
        .unwrap();

        assert_eq!(cli.rpc, args::DEFAULT_RPC_PROVIDER);
        let Commands::Swap { route, skip_approve, recipient, .. } = &cli.command else {
            panic!("expected swap command");
        };
        assert!(*skip_approve);
        assert!(recipient.is_none());

        let (source, destination) = assets(route).unwrap();
        assert_eq!(source.to_string(), "merlin:69");
        assert_eq!(destination.to_string(), "zksync:69");
    }

    #[tokio::test]
    async fn test_interrupted_request_returns_error() {
        let cancellation_token = CancellationToken::new();
        cancellation_token.cancel();

        let res = interruptible(&cancellation_token, std::future::pending::<()>()).await;
        assert!(res.unwrap_err().to_string().contains("interrupted"));

        let live = CancellationToken::new();
        assert_eq!(interruptible(&live, async { 7 }).await.unwrap(), 7);
    }

    #[test]
    fn test_unknown_token_rejected() {
        let cli = Cli::try_parse_from(["meson-cli", "price", "--amount", "1", "--token", "doge"]).unwrap();
        let Commands::Price { route } = &cli.command else {
            panic!("expected price command");
        };
        assert!(assets(route).is_err());
    }
}
