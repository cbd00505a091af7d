//! OCO exit pricing and submission.

use notional_deploy_core::money::{floor_qty, round_price};
use notional_deploy_core::{BrokerService, ExitConfig, OcoExit, OrderRequest, SubmittedOrder, Symbol};
use rust_decimal::Decimal;
use tracing::info;

use crate::error::SymbolError;

/// Take-profit and stop-loss trigger prices, rounded to the cent.
#[must_use]
pub fn exit_prices(reference: Decimal, exits: &ExitConfig) -> (Decimal, Decimal) {
    let take_profit = round_price(reference * (Decimal::ONE + exits.take_profit_pct));
    let stop_loss = round_price(reference * (Decimal::ONE - exits.stop_loss_pct));
    (take_profit, stop_loss)
}

/// Builds and submits the protective exit for a confirmed fill.
pub struct ExitOrderBuilder<'a> {
    broker: &'a dyn BrokerService,
    exits: &'a ExitConfig,
}

impl<'a> ExitOrderBuilder<'a> {
    #[must_use]
    pub fn new(broker: &'a dyn BrokerService, exits: &'a ExitConfig) -> Self {
        Self { broker, exits }
    }

    /// Sizes the exit to the confirmed delta, floored to share precision.
    ///
    /// # Errors
    /// Returns [`SymbolError::ExitQuantityTooSmall`] when the delta floors to zero.
    pub fn build(
        &self,
        symbol: &Symbol,
        confirmed_delta: Decimal,
        reference: Decimal,
    ) -> Result<OcoExit, SymbolError> {
        let qty = floor_qty(confirmed_delta);
        if qty <= Decimal::ZERO {
            return Err(SymbolError::ExitQuantityTooSmall {
                delta: confirmed_delta,
            });
        }

        let (take_profit_price, stop_loss_price) = exit_prices(reference, self.exits);
        Ok(OcoExit {
            symbol: symbol.clone(),
            qty,
            take_profit_price,
            stop_loss_price,
        })
    }

    /// # Errors
    /// Returns [`SymbolError::ExitSubmit`] when the broker refuses the order.
    pub async fn submit(&self, exit: &OcoExit) -> Result<SubmittedOrder, SymbolError> {
        let order = self
            .broker
            .submit_order(&OrderRequest::OcoExit(exit.clone()))
            .await
            .map_err(SymbolError::ExitSubmit)?;

        info!(
            symbol = %exit.symbol,
            order_id = %order.id,
            qty = %exit.qty,
            take_profit = %exit.take_profit_price,
            stop_loss = %exit.stop_loss_price,
            "Submitted OCO exit"
        );
        Ok(order)
    }
}
