//! Budget planning and per-symbol cap consumption.

use notional_deploy_core::money::floor_cents;
use notional_deploy_core::AllocationConfig;
use rust_decimal::Decimal;

use crate::error::RunAbort;
use crate::types::BudgetPlan;

/// Computes the shared per-symbol allocation for a run.
///
/// The baseline is `buy_fraction` of buying power, floored to the cent. When
/// the baseline across all symbols would exceed the spend cap it is scaled
/// down to `floor_cents(cap / symbol_count)`.
///
/// # Errors
/// Returns [`RunAbort::DegeneratePlan`] when the allocation cannot reach the
/// minimum notional.
pub fn plan_budget(
    buying_power: Decimal,
    symbol_count: usize,
    policy: &AllocationConfig,
) -> Result<BudgetPlan, RunAbort> {
    let buying_power = floor_cents(buying_power.max(Decimal::ZERO));
    let spend_cap = floor_cents(buying_power * policy.spend_cap_fraction);
    let count = Decimal::from(symbol_count);

    let degenerate = |per_symbol: Decimal| RunAbort::DegeneratePlan {
        per_symbol,
        symbol_count,
        min_notional: policy.min_notional,
    };

    if symbol_count == 0 {
        return Err(degenerate(Decimal::ZERO));
    }

    let mut computed = floor_cents(buying_power * policy.buy_fraction);
    let mut scaled_to_cap = false;
    if computed * count > spend_cap {
        computed = floor_cents(spend_cap / count);
        scaled_to_cap = true;
    }

    let per_symbol_allocation = computed.max(policy.min_notional);
    if computed < policy.min_notional || per_symbol_allocation * count < policy.min_notional {
        return Err(degenerate(computed));
    }

    Ok(BudgetPlan {
        total_buying_power: buying_power,
        symbol_count,
        per_symbol_allocation,
        spend_cap,
        scaled_to_cap,
    })
}

/// What the remaining cap allows for the next symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Allocation {
    /// Buy this many dollars.
    Commit(Decimal),
    /// The affordable amount is below the minimum notional.
    Skip(Decimal),
}

/// Resolves one symbol's allocation against the remaining cap.
#[must_use]
pub fn allocate(per_symbol: Decimal, remaining_cap: Decimal, min_notional: Decimal) -> Allocation {
    let amount = floor_cents(per_symbol.min(remaining_cap).max(Decimal::ZERO));
    if amount < min_notional {
        Allocation::Skip(amount)
    } else {
        Allocation::Commit(amount)
    }
}

/// Allocations a run would make if every buy were submitted.
#[must_use]
pub fn projected_allocations(plan: &BudgetPlan, min_notional: Decimal) -> Vec<Allocation> {
    let mut remaining = plan.spend_cap;
    (0..plan.symbol_count)
        .map(|_| {
            let allocation = allocate(plan.per_symbol_allocation, remaining, min_notional);
            if let Allocation::Commit(amount) = allocation {
                remaining -= amount;
            }
            allocation
        })
        .collect()
}
