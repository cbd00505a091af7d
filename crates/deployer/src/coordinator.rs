//! Run coordinator: allocate, buy, confirm, exit, per symbol, in order.
//!
//! Each symbol's failure is recorded and the run moves on. The list is
//! cleared only when at least one symbol was placed.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use notional_deploy_core::money::floor_cents;
use notional_deploy_core::{
    normalize_symbols, BrokerService, DeployerConfig, PriceService, Symbol, SymbolSource,
};
use rust_decimal::Decimal;
use tracing::{error, info, warn};

use crate::allocation::{allocate, plan_budget, Allocation};
use crate::error::{RunAbort, SymbolError};
use crate::exits::ExitOrderBuilder;
use crate::fill::{client_order_id, FillConfirmer};
use crate::price::PriceResolver;
use crate::types::{BudgetPlan, OrderLifecycleRecord, Outcome, RunResult};

/// What a run would do, without submitting anything.
#[derive(Debug, Clone, PartialEq)]
pub struct RunPreview {
    pub buying_power: Decimal,
    pub symbols: Vec<Symbol>,
    /// `None` when the list is empty.
    pub plan: Option<BudgetPlan>,
}

/// Drives one run over a symbol list.
pub struct RunCoordinator {
    config: DeployerConfig,
    broker: Arc<dyn BrokerService>,
    prices: Arc<dyn PriceService>,
}

impl RunCoordinator {
    #[must_use]
    pub fn new(
        config: DeployerConfig,
        broker: Arc<dyn BrokerService>,
        prices: Arc<dyn PriceService>,
    ) -> Self {
        Self {
            config,
            broker,
            prices,
        }
    }

    #[must_use]
    pub fn config(&self) -> &DeployerConfig {
        &self.config
    }

    /// Full run: authenticate, read the list, process every symbol, record
    /// outcomes, and clear the list if anything was placed.
    ///
    /// # Errors
    /// Returns [`RunAbort`] for fatal preconditions, before any order is
    /// submitted and before the list is touched.
    pub async fn deploy(&self, source: &dyn SymbolSource) -> Result<RunResult, RunAbort> {
        let run_started_at = Utc::now();
        let buying_power = self.authenticate().await?;
        let symbols = self.read_symbols(source).await?;

        if symbols.is_empty() {
            info!("No symbols listed; nothing to do");
            return Ok(RunResult::default());
        }

        let result = self.run_once(&symbols, buying_power, run_started_at).await?;

        if let Err(e) = source.record_outcomes(&result.outcome_rows()).await {
            warn!(error = %e, "Failed to record outcomes");
        }

        if result.any_succeeded {
            match source.clear_symbols().await {
                Ok(()) => info!("Cleared symbol list"),
                Err(e) => error!(error = %e, "Failed to clear symbol list"),
            }
        } else {
            warn!("No symbol placed; leaving symbol list untouched");
        }

        Ok(result)
    }

    /// Reads the account and list and plans the budget without side effects.
    ///
    /// # Errors
    /// Same fatal preconditions as [`RunCoordinator::deploy`].
    pub async fn preview(&self, source: &dyn SymbolSource) -> Result<RunPreview, RunAbort> {
        let buying_power = self.authenticate().await?;
        let symbols = self.read_symbols(source).await?;
        let plan = if symbols.is_empty() {
            None
        } else {
            Some(plan_budget(buying_power, symbols.len(), &self.config.allocation)?)
        };
        Ok(RunPreview {
            buying_power,
            symbols,
            plan,
        })
    }

    /// Account lookup doubling as the credential check. Returns buying power
    /// floored to the cent.
    ///
    /// # Errors
    /// Returns [`RunAbort::Authentication`] or [`RunAbort::Account`].
    pub async fn authenticate(&self) -> Result<Decimal, RunAbort> {
        let account = self
            .broker
            .account()
            .await
            .map_err(|e| RunAbort::from_account_error(&e))?;
        let buying_power = floor_cents(account.buying_power);
        info!(
            buying_power = %buying_power,
            status = account.status.as_deref().unwrap_or("unknown"),
            "Current buying power"
        );
        Ok(buying_power)
    }

    async fn read_symbols(&self, source: &dyn SymbolSource) -> Result<Vec<Symbol>, RunAbort> {
        let raw = source
            .read_symbols()
            .await
            .map_err(|e| RunAbort::ListUnavailable(e.to_string()))?;
        let symbols = normalize_symbols(&raw, &self.config.symbols.header_tokens);
        info!(
            count = symbols.len(),
            symbols = ?symbols.iter().map(Symbol::as_str).collect::<Vec<_>>(),
            "Found symbols"
        );
        Ok(symbols)
    }

    /// Plans the budget and processes every symbol in order.
    ///
    /// # Errors
    /// Returns [`RunAbort::DegeneratePlan`] before anything is submitted.
    pub async fn run_once(
        &self,
        symbols: &[Symbol],
        buying_power: Decimal,
        run_started_at: DateTime<Utc>,
    ) -> Result<RunResult, RunAbort> {
        let mut result = RunResult::default();
        if symbols.is_empty() {
            return Ok(result);
        }

        let plan = plan_budget(buying_power, symbols.len(), &self.config.allocation)?;
        info!(
            per_symbol = %plan.per_symbol_allocation,
            spend_cap = %plan.spend_cap,
            symbols = plan.symbol_count,
            scaled_to_cap = plan.scaled_to_cap,
            "Budget planned"
        );

        let mut remaining_cap = plan.spend_cap;
        let mut seen: HashMap<&Symbol, u32> = HashMap::new();
        let pause = self.config.polling.symbol_pause();

        for symbol in symbols {
            let occurrence = seen.entry(symbol).or_insert(0);
            *occurrence += 1;
            // Repeated symbols are separate buys and need their own id.
            let id = match *occurrence {
                1 => client_order_id(symbol, run_started_at),
                n => format!("{}-{n}", client_order_id(symbol, run_started_at)),
            };

            let record = self.process_symbol(symbol, &plan, remaining_cap, &id).await;

            if record.buy_submitted {
                remaining_cap -= record.allocated;
            }
            info!(
                symbol = %record.symbol,
                outcome = %record.status_line(),
                remaining_cap = %remaining_cap,
                "Symbol processed"
            );
            result.push(record);

            if !pause.is_zero() {
                tokio::time::sleep(pause).await;
            }
        }

        let succeeded: Vec<&str> = result.succeeded().into_iter().map(Symbol::as_str).collect();
        info!(summary = %result.summary(), succeeded = ?succeeded, "Run complete");
        Ok(result)
    }

    async fn process_symbol(
        &self,
        symbol: &Symbol,
        plan: &BudgetPlan,
        remaining_cap: Decimal,
        client_order_id: &str,
    ) -> OrderLifecycleRecord {
        let mut record = OrderLifecycleRecord::new(symbol.clone());
        let min_notional = self.config.allocation.min_notional;

        match allocate(plan.per_symbol_allocation, remaining_cap, min_notional) {
            Allocation::Skip(amount) => {
                record.allocated = amount;
                info!(symbol = %symbol, available = %amount, "Skipping, remaining cap below minimum notional");
                record.finish(Outcome::SkippedBudget);
            }
            Allocation::Commit(amount) => {
                record.allocated = amount;
                let outcome = match self.execute(&mut record, client_order_id).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        warn!(symbol = %symbol, error = %e, "Symbol failed");
                        Outcome::Error(e.to_string())
                    }
                };
                record.finish(outcome);
            }
        }
        record
    }

    /// Buy, confirm, and place the exit for one symbol.
    async fn execute(
        &self,
        record: &mut OrderLifecycleRecord,
        client_order_id: &str,
    ) -> Result<Outcome, SymbolError> {
        let confirmer = FillConfirmer::new(self.broker.as_ref(), &self.config.polling);
        let delta = confirmer.buy_and_confirm(record, client_order_id).await?;
        if delta <= Decimal::ZERO {
            return Ok(Outcome::SkippedNoFill);
        }

        let reference = PriceResolver::new(self.prices.as_ref())
            .resolve(&record.symbol)
            .await
            .inspect_err(|e| {
                error!(symbol = %record.symbol, delta = %delta, error = %e, "Filled position has no exit");
            })?;
        record.reference_price = Some(reference);

        let builder = ExitOrderBuilder::new(self.broker.as_ref(), &self.config.exits);
        let exit = builder.build(&record.symbol, delta, reference)?;
        record.take_profit_price = Some(exit.take_profit_price);
        record.stop_loss_price = Some(exit.stop_loss_price);

        let order = builder.submit(&exit).await.inspect_err(|e| {
            error!(symbol = %record.symbol, delta = %delta, error = %e, "Filled position has no exit");
        })?;
        record.exit_order_id = Some(order.id);
        Ok(Outcome::Placed)
    }
}
