use std::time::Duration;

use anyhow::Context;
use colored::Colorize;
use meson_sdk::{
    relayer::{Relayer, RelayerClient},
    types::{SwapState, SwapStatus},
};
use tokio_util::sync::CancellationToken;

use crate::interruptible;

const WATCH_INTERVAL: Duration = Duration::from_secs(1);

pub(crate) async fn render(
    relayer: &RelayerClient,
    swap_id: &str,
    watch: bool,
    cancellation_token: CancellationToken,
) -> anyhow::Result<()> {
    println!("{}", format!("{:#^80}", " Meson Swap Status ").bold().purple());

    let mut last_state = None;
    loop {
        let status =
            interruptible(&cancellation_token, relayer.status(swap_id)).await?.context("fetching swap status")?;
        if last_state != Some(status.state()) {
            print_status(&status);
            last_state = Some(status.state());
        }

        if !watch || status.is_terminal() {
            break;
        }
        tokio::select! {
            _ = cancellation_token.cancelled() => break,
            _ = tokio::time::sleep(WATCH_INTERVAL) => {},
        }
    }

    Ok(())
}

pub(crate) fn print_status(status: &SwapStatus) {
    let label = status.state().to_string();
    let state = match status.state() {
        SwapState::Released => label.as_str().green(),
        SwapState::Cancelled | SwapState::Expired => label.as_str().red(),
        SwapState::Pending | SwapState::Sent => label.as_str().yellow(),
    };
    println!("\n{} {}", "State:".bold(), state.bold());
    for (field, value) in status.fields() {
        println!("  {:<20} {}", field, value);
    }
}
