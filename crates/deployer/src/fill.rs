//! Buy submission, acceptance polling and position-delta fill confirmation.
//!
//! Notional buys do not report a filled quantity synchronously, so the
//! filled amount is inferred by diffing the position before and after the
//! buy. Concurrent activity on the same symbol inflates the delta; that is
//! a known limitation of this approach.

use std::convert::Infallible;

use chrono::{DateTime, Utc};
use notional_deploy_core::{
    BrokerService, MarketBuy, OrderRequest, PollingConfig, ServiceError,
    SubmittedOrder, Symbol,
};
use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::error::SymbolError;
use crate::retry::{poll_until, Polled};
use crate::types::OrderLifecycleRecord;

/// Client order id for a symbol within one run.
///
/// Stable for a given `(symbol, run_started_at)` so a resubmitted buy can be
/// deduplicated by the broker.
#[must_use]
pub fn client_order_id(symbol: &Symbol, run_started_at: DateTime<Utc>) -> String {
    format!("{}-{}", symbol, run_started_at.timestamp_millis())
}

/// Drives one buy from submission to a confirmed position delta.
pub struct FillConfirmer<'a> {
    broker: &'a dyn BrokerService,
    polling: &'a PollingConfig,
}

impl<'a> FillConfirmer<'a> {
    #[must_use]
    pub fn new(broker: &'a dyn BrokerService, polling: &'a PollingConfig) -> Self {
        Self { broker, polling }
    }

    /// Buys `record.allocated` dollars of `record.symbol` and returns the
    /// confirmed quantity delta, zero when the fill was never observed.
    ///
    /// Fills in the order id and position quantities on `record` as it goes.
    ///
    /// # Errors
    /// Fails when the position cannot be read before the buy, when the buy
    /// submission fails, or when the order is rejected or never accepted.
    pub async fn buy_and_confirm(
        &self,
        record: &mut OrderLifecycleRecord,
        client_order_id: &str,
    ) -> Result<Decimal, SymbolError> {
        let symbol = record.symbol.clone();
        record.pre_buy_qty = self.broker.position_qty(&symbol).await?;
        record.client_order_id = Some(client_order_id.to_string());

        let buy = MarketBuy {
            symbol: symbol.clone(),
            notional: record.allocated,
            client_order_id: client_order_id.to_string(),
        };
        record.buy_submitted = true;
        let order = self.submit_buy(&buy).await?;
        record.buy_order_id = Some(order.id.clone());
        info!(
            symbol = %symbol,
            order_id = %order.id,
            allocation = %record.allocated,
            "Submitted buy"
        );

        self.await_acceptance(&order).await?;

        let (post_qty, delta) = self.await_fill(&symbol, record.pre_buy_qty).await;
        record.post_buy_qty = post_qty;
        record.confirmed_delta_qty = delta;
        Ok(delta)
    }

    /// Submits the buy, retrying transient failures with the same client order id.
    ///
    /// A duplicate-id answer means an earlier attempt landed; that order is
    /// looked up and used.
    async fn submit_buy(&self, buy: &MarketBuy) -> Result<SubmittedOrder, SymbolError> {
        let request = OrderRequest::MarketBuy(buy.clone());
        let attempts = self.polling.submit_attempts.max(1);

        for attempt in 1..=attempts {
            match self.broker.submit_order(&request).await {
                Ok(order) => return Ok(order),
                Err(ServiceError::DuplicateClientOrderId(_)) => {
                    info!(
                        symbol = %buy.symbol,
                        client_order_id = %buy.client_order_id,
                        "Buy already submitted, recovering order"
                    );
                    return Ok(self.broker.order_by_client_id(&buy.client_order_id).await?);
                }
                Err(e) if e.is_transient() && attempt < attempts => {
                    warn!(
                        symbol = %buy.symbol,
                        attempt,
                        error = %e,
                        "Buy submission failed, retrying"
                    );
                    let backoff = match &e {
                        ServiceError::RateLimit { retry_after_secs } => self
                            .polling
                            .submit_backoff()
                            .max(std::time::Duration::from_secs(*retry_after_secs)),
                        _ => self.polling.submit_backoff(),
                    };
                    if !backoff.is_zero() {
                        tokio::time::sleep(backoff).await;
                    }
                }
                Err(e) => return Err(e.into()),
            }
        }

        // Unreachable while `attempts >= 1`: the last attempt always returns.
        Err(SymbolError::Broker(ServiceError::Network(format!(
            "buy for {} not submitted after {attempts} attempts",
            buy.symbol
        ))))
    }

    /// Polls the order until it reaches the active class.
    async fn await_acceptance(&self, order: &SubmittedOrder) -> Result<(), SymbolError> {
        if order.status.is_active() {
            return Ok(());
        }
        if order.status.is_dead() {
            return Err(SymbolError::OrderRejected {
                order_id: order.id.clone(),
                status: order.status.clone(),
            });
        }

        let broker = self.broker;
        let order_id = order.id.as_str();
        let polled = poll_until(
            self.polling.acceptance_attempts,
            self.polling.acceptance_interval(),
            |attempt| async move {
                match broker.order_status(order_id).await {
                    Ok(status) if status.is_active() => Ok(Some(status)),
                    Ok(status) if status.is_dead() => Err(SymbolError::OrderRejected {
                        order_id: order_id.to_string(),
                        status,
                    }),
                    Ok(status) => {
                        debug!(order_id, attempt, status = %status, "Order not yet accepted");
                        Ok(None)
                    }
                    Err(e) if e.is_transient() || matches!(e, ServiceError::NotFound(_)) => {
                        debug!(order_id, attempt, error = %e, "Order status unavailable");
                        Ok(None)
                    }
                    Err(e) => Err(e.into()),
                }
            },
        )
        .await?;

        match polled {
            Polled::Ready { value, attempt } => {
                debug!(order_id, attempt, status = %value, "Order accepted");
                Ok(())
            }
            Polled::Exhausted { attempts } => Err(SymbolError::OrderNotAccepted {
                order_id: order_id.to_string(),
                attempts,
            }),
        }
    }

    /// Polls the position until it grows past `pre_qty`.
    ///
    /// Returns the observed quantity and the delta; both fall back to
    /// `pre_qty` and zero when the budget runs out. Failed position reads
    /// count as unfilled attempts.
    async fn await_fill(&self, symbol: &Symbol, pre_qty: Decimal) -> (Decimal, Decimal) {
        let broker = self.broker;
        let polled = poll_until(
            self.polling.fill_attempts,
            self.polling.fill_interval(),
            |attempt| async move {
                match broker.position_qty(symbol).await {
                    Ok(qty) if qty > pre_qty => Ok::<_, Infallible>(Some(qty)),
                    Ok(qty) => {
                        debug!(symbol = %symbol, attempt, qty = %qty, "Fill not yet visible");
                        Ok(None)
                    }
                    Err(e) => {
                        debug!(symbol = %symbol, attempt, error = %e, "Position read failed");
                        Ok(None)
                    }
                }
            },
        )
        .await;

        match polled {
            Ok(Polled::Ready { value, attempt }) => {
                let delta = value - pre_qty;
                info!(symbol = %symbol, attempt, delta = %delta, "Fill confirmed");
                (value, delta)
            }
            Ok(Polled::Exhausted { attempts }) => {
                warn!(symbol = %symbol, attempts, "Fill not observed within poll budget");
                (pre_qty, Decimal::ZERO)
            }
            Err(never) => match never {},
        }
    }
}
