use anyhow::Context;
use colored::Colorize;
use meson_sdk::{
    relayer::{Relayer, RelayerClient},
    types::{AssetRef, PriceRequest},
};
use tabled::{Table, Tabled, settings::Style};
use tokio_util::sync::CancellationToken;

use crate::interruptible;

pub(crate) async fn render(
    relayer: &RelayerClient,
    source: &AssetRef,
    destination: &AssetRef,
    amount: &str,
    cancellation_token: &CancellationToken,
) -> anyhow::Result<()> {
    let request = PriceRequest::new(source, destination, amount, None)?;
    let price = interruptible(cancellation_token, relayer.quote(&request)).await?.context("fetching price")?;

    println!("{}\n", format!("{:#^80}", " Meson Price ").bold().purple());
    let mut table = Table::new([PriceDetails {
        route: format!("{} -> {}", source, destination),
        token: source.token.display_name(),
        amount: request.amount,
        fee: price.fee,
        estimated_time: format!("{}s", price.estimated_time),
        min_amount: price.min_amount,
        max_amount: price.max_amount,
    }]);
    table.with(Style::sharp());
    println!("{}", table);

    Ok(())
}

#[derive(Tabled)]
struct PriceDetails {
    #[tabled(rename = "Route")]
    route: String,
    #[tabled(rename = "Token")]
    token: String,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Fee")]
    fee: String,
    #[tabled(rename = "Est. Time")]
    estimated_time: String,
    #[tabled(rename = "Min")]
    min_amount: String,
    #[tabled(rename = "Max")]
    max_amount: String,
}
