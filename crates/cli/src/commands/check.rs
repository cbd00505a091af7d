use rust_decimal::Decimal;

use super::{alpaca_client, coordinator, SourceOptions};

/// Validates credentials and configuration against the live account.
pub async fn run_check(options: &SourceOptions) -> anyhow::Result<()> {
    let config = options.load_config()?;
    let client = alpaca_client(&config)?;

    println!("Endpoint: {}", client.base_url());
    println!("API key: {}", client.masked_key());
    println!(
        "Allocation: {} of buying power per symbol, cap {}, minimum ${:.2}",
        config.allocation.buy_fraction,
        config.allocation.spend_cap_fraction,
        config.allocation.min_notional
    );
    println!(
        "Exits: take profit +{}%, stop loss -{}%",
        (config.exits.take_profit_pct * Decimal::ONE_HUNDRED).normalize(),
        (config.exits.stop_loss_pct * Decimal::ONE_HUNDRED).normalize()
    );

    let coordinator = coordinator(config, client);
    let buying_power = coordinator.authenticate().await?;
    println!("Credentials OK; buying power ${buying_power:.2}");
    Ok(())
}
