//! Per-run records: budget plan, per-symbol lifecycle, run result.

use std::fmt;

use notional_deploy_core::money::floor_qty;
use notional_deploy_core::{OutcomeRow, Symbol};
use rust_decimal::Decimal;
use serde::Serialize;

// =============================================================================
// BudgetPlan
// =============================================================================

/// Shared allocation for one run.
///
/// `per_symbol_allocation * symbol_count` may exceed `spend_cap`; the
/// coordinator enforces the cap incrementally.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BudgetPlan {
    pub total_buying_power: Decimal,
    pub symbol_count: usize,
    pub per_symbol_allocation: Decimal,
    pub spend_cap: Decimal,
    /// Whether the baseline allocation was scaled down to fit the cap.
    pub scaled_to_cap: bool,
}

// =============================================================================
// Outcome
// =============================================================================

/// Final state of one symbol's processing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    /// Buy filled and the OCO exit was accepted for submission.
    Placed,
    /// Remaining cap could not cover the minimum notional.
    SkippedBudget,
    /// The position never reflected the buy.
    SkippedNoFill,
    Error(String),
}

impl Outcome {
    #[must_use]
    pub fn is_placed(&self) -> bool {
        matches!(self, Self::Placed)
    }
}

// =============================================================================
// OrderLifecycleRecord
// =============================================================================

/// Everything observed while processing one symbol in one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OrderLifecycleRecord {
    pub symbol: Symbol,
    pub allocated: Decimal,
    pub client_order_id: Option<String>,
    pub buy_order_id: Option<String>,
    /// Set once a buy submission has been attempted; the cap is consumed from then on.
    pub buy_submitted: bool,
    pub pre_buy_qty: Decimal,
    pub post_buy_qty: Decimal,
    pub confirmed_delta_qty: Decimal,
    pub reference_price: Option<Decimal>,
    pub take_profit_price: Option<Decimal>,
    pub stop_loss_price: Option<Decimal>,
    pub exit_order_id: Option<String>,
    outcome: Option<Outcome>,
}

impl OrderLifecycleRecord {
    #[must_use]
    pub fn new(symbol: Symbol) -> Self {
        Self {
            symbol,
            allocated: Decimal::ZERO,
            client_order_id: None,
            buy_order_id: None,
            buy_submitted: false,
            pre_buy_qty: Decimal::ZERO,
            post_buy_qty: Decimal::ZERO,
            confirmed_delta_qty: Decimal::ZERO,
            reference_price: None,
            take_profit_price: None,
            stop_loss_price: None,
            exit_order_id: None,
            outcome: None,
        }
    }

    /// Sets the outcome. The first outcome wins; later calls are ignored.
    pub fn finish(&mut self, outcome: Outcome) {
        if self.outcome.is_none() {
            self.outcome = Some(outcome);
        }
    }

    /// The recorded outcome, or `None` while the symbol is still in flight.
    #[must_use]
    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    #[must_use]
    pub fn is_placed(&self) -> bool {
        self.outcome.as_ref().is_some_and(Outcome::is_placed)
    }

    /// Exit quantity derived from the confirmed delta.
    #[must_use]
    pub fn exit_qty(&self) -> Decimal {
        floor_qty(self.confirmed_delta_qty)
    }

    /// Short status used for the outcome line and the recorded row.
    #[must_use]
    pub fn status_line(&self) -> String {
        match &self.outcome {
            Some(Outcome::Placed) => {
                let mut line = format!("PLACED ${:.2} qty {}", self.allocated, self.exit_qty());
                if let (Some(tp), Some(sl)) = (self.take_profit_price, self.stop_loss_price) {
                    line.push_str(&format!(" TP {tp:.2} SL {sl:.2}"));
                }
                line
            }
            Some(Outcome::SkippedBudget) => format!("SKIPPED (budget ${:.2})", self.allocated),
            Some(Outcome::SkippedNoFill) => "SKIPPED (no fill)".to_string(),
            Some(Outcome::Error(reason)) => format!("ERROR: {reason}"),
            None => "PENDING".to_string(),
        }
    }

    #[must_use]
    pub fn outcome_row(&self) -> OutcomeRow {
        OutcomeRow {
            symbol: self.symbol.to_string(),
            status: self.status_line(),
        }
    }
}

// =============================================================================
// RunResult
// =============================================================================

/// Ordered records for one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RunResult {
    pub records: Vec<OrderLifecycleRecord>,
    pub any_succeeded: bool,
}

impl RunResult {
    pub fn push(&mut self, record: OrderLifecycleRecord) {
        self.any_succeeded |= record.is_placed();
        self.records.push(record);
    }

    /// Symbols whose buy filled and whose exit was submitted, in input order.
    #[must_use]
    pub fn succeeded(&self) -> Vec<&Symbol> {
        self.records
            .iter()
            .filter(|r| r.is_placed())
            .map(|r| &r.symbol)
            .collect()
    }

    #[must_use]
    pub fn outcome_rows(&self) -> Vec<OutcomeRow> {
        self.records.iter().map(OrderLifecycleRecord::outcome_row).collect()
    }

    #[must_use]
    pub fn summary(&self) -> RunSummary {
        let mut summary = RunSummary::default();
        for record in &self.records {
            match record.outcome() {
                Some(Outcome::Placed) => summary.placed += 1,
                Some(Outcome::SkippedBudget) => summary.skipped_budget += 1,
                Some(Outcome::SkippedNoFill) => summary.skipped_no_fill += 1,
                Some(Outcome::Error(_)) | None => summary.errors += 1,
            }
        }
        summary
    }
}

/// Outcome counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub placed: usize,
    pub skipped_budget: usize,
    pub skipped_no_fill: usize,
    pub errors: usize,
}

impl RunSummary {
    #[must_use]
    pub fn total(&self) -> usize {
        self.placed + self.skipped_budget + self.skipped_no_fill + self.errors
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} placed, {} skipped (budget), {} skipped (no fill), {} error(s)",
            self.placed, self.skipped_budget, self.skipped_no_fill, self.errors
        )
    }
}
