use notional_deploy_engine::{projected_allocations, Allocation};

use super::{alpaca_client, coordinator, SourceOptions};

/// Shows what a run would allocate, without submitting orders or touching the list.
pub async fn run_plan(options: &SourceOptions) -> anyhow::Result<()> {
    let config = options.load_config()?;
    let source = options.symbol_source(&config)?;
    let min_notional = config.allocation.min_notional;
    let client = alpaca_client(&config)?;
    let coordinator = coordinator(config, client);

    let preview = coordinator.preview(source.as_ref()).await?;
    println!("Buying power: ${:.2}", preview.buying_power);

    let Some(plan) = preview.plan else {
        println!("No symbols listed");
        return Ok(());
    };

    println!("Symbols: {}", plan.symbol_count);
    println!("Per-symbol allocation: ${:.2}", plan.per_symbol_allocation);
    println!(
        "Spend cap: ${:.2}{}",
        plan.spend_cap,
        if plan.scaled_to_cap { " (allocation scaled to cap)" } else { "" }
    );
    println!();

    for (symbol, allocation) in preview
        .symbols
        .iter()
        .zip(projected_allocations(&plan, min_notional))
    {
        match allocation {
            Allocation::Commit(amount) => println!("{symbol}: buy ${amount:.2}"),
            Allocation::Skip(remaining) => println!("{symbol}: skip (budget ${remaining:.2})"),
        }
    }

    Ok(())
}
