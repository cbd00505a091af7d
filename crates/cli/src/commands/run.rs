use super::{alpaca_client, coordinator, SourceOptions};

/// Runs a full deployment and prints one line per symbol.
pub async fn run_deploy(options: &SourceOptions) -> anyhow::Result<()> {
    let config = options.load_config()?;
    let source = options.symbol_source(&config)?;
    let client = alpaca_client(&config)?;
    tracing::info!(base_url = client.base_url(), key = %client.masked_key(), "Starting run");

    let coordinator = coordinator(config, client);
    let result = coordinator.deploy(source.as_ref()).await?;

    if result.records.is_empty() {
        println!("No symbols to process");
        return Ok(());
    }

    for record in &result.records {
        println!("{}: {}", record.symbol, record.status_line());
    }
    println!();
    println!("Summary: {}", result.summary());

    let succeeded = result.succeeded();
    if succeeded.is_empty() {
        println!("No positions opened; symbol list left in place");
    } else {
        let names: Vec<&str> = succeeded.iter().map(|s| s.as_str()).collect();
        println!("Opened: {}", names.join(", "));
    }

    Ok(())
}
