use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::Result;
use crate::symbol::Symbol;
use crate::types::{AccountSnapshot, OrderRequest, OrderStatus, OutcomeRow, PriceSnapshot, SubmittedOrder};

/// Broker account, order and position service.
#[async_trait]
pub trait BrokerService: Send + Sync {
    /// Current account state. Also serves as the authentication check.
    async fn account(&self) -> Result<AccountSnapshot>;

    async fn submit_order(&self, order: &OrderRequest) -> Result<SubmittedOrder>;

    async fn order_status(&self, order_id: &str) -> Result<OrderStatus>;

    /// Looks up an order by the client order id it was submitted with.
    async fn order_by_client_id(&self, client_order_id: &str) -> Result<SubmittedOrder>;

    /// Held quantity, zero when there is no position.
    async fn position_qty(&self, symbol: &Symbol) -> Result<Decimal>;
}

/// Market data quotation service.
#[async_trait]
pub trait PriceService: Send + Sync {
    async fn snapshot(&self, symbol: &Symbol) -> Result<PriceSnapshot>;
}

/// External ordered list of symbols to deploy into.
#[async_trait]
pub trait SymbolSource: Send + Sync {
    async fn read_symbols(&self) -> Result<Vec<String>>;

    async fn clear_symbols(&self) -> Result<()>;

    /// Writes per-symbol outcomes back next to the list. No-op by default.
    async fn record_outcomes(&self, _rows: &[OutcomeRow]) -> Result<()> {
        Ok(())
    }
}
