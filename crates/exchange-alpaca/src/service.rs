//! `BrokerService` and `PriceService` over the Alpaca REST API.

use crate::client::AlpacaClient;
use crate::error::AlpacaError;
use crate::types::{NotionalBuyBody, OcoBody, RawAccount, RawOrder, RawPosition, RawSnapshot};
use async_trait::async_trait;
use notional_deploy_core::{
    AccountSnapshot, BrokerService, OrderRequest, OrderStatus, PriceService, PriceSnapshot,
    Result, SubmittedOrder, Symbol,
};
use rust_decimal::Decimal;
use tracing::debug;

#[async_trait]
impl BrokerService for AlpacaClient {
    async fn account(&self) -> Result<AccountSnapshot> {
        let raw: RawAccount = self.get("/v2/account").await?;
        Ok(AccountSnapshot {
            buying_power: raw.buying_power,
            status: raw.status,
        })
    }

    async fn submit_order(&self, order: &OrderRequest) -> Result<SubmittedOrder> {
        Self::validate_symbol(order.symbol().as_str())?;
        let raw: RawOrder = match order {
            OrderRequest::MarketBuy(buy) => {
                debug!(symbol = %buy.symbol, notional = %buy.notional, "Submitting notional buy");
                self.post("/v2/orders", &NotionalBuyBody::from(buy)).await?
            }
            OrderRequest::OcoExit(exit) => {
                debug!(symbol = %exit.symbol, qty = %exit.qty, "Submitting OCO exit");
                self.post("/v2/orders", &OcoBody::from(exit)).await?
            }
        };
        Ok(raw.into())
    }

    async fn order_status(&self, order_id: &str) -> Result<OrderStatus> {
        let raw = self.get_order(order_id).await?;
        Ok(SubmittedOrder::from(raw).status)
    }

    async fn order_by_client_id(&self, client_order_id: &str) -> Result<SubmittedOrder> {
        if client_order_id.is_empty() || client_order_id.len() > 128 {
            return Err(AlpacaError::InvalidIdentifier(format!(
                "client order id: {client_order_id:?}"
            ))
            .into());
        }
        let raw: RawOrder = self
            .get_with_query(
                "/v2/orders:by_client_order_id",
                &[("client_order_id", client_order_id)],
            )
            .await?;
        Ok(raw.into())
    }

    async fn position_qty(&self, symbol: &Symbol) -> Result<Decimal> {
        let symbol = Self::validate_symbol(symbol.as_str())?;
        // Position endpoints address pairs without the separator.
        let path = format!("/v2/positions/{}", symbol.replace('/', ""));
        match self.get::<RawPosition>(&path).await {
            Ok(position) => Ok(position.qty),
            Err(AlpacaError::NotFound(_)) => Ok(Decimal::ZERO),
            Err(e) => Err(e.into()),
        }
    }
}

#[async_trait]
impl PriceService for AlpacaClient {
    async fn snapshot(&self, symbol: &Symbol) -> Result<PriceSnapshot> {
        let symbol = Self::validate_symbol(symbol.as_str())?;
        let raw: RawSnapshot = self
            .get_data(&format!("/v2/stocks/{symbol}/snapshot"))
            .await?;
        Ok(raw.into())
    }
}
