//! Wire formats for the Alpaca trading and market data APIs.
//!
//! Trading endpoints encode decimals as strings; market data endpoints use
//! JSON numbers. Both deserialize into `Decimal`.

use notional_deploy_core::{MarketBuy, OcoExit, OrderStatus, PriceSnapshot, Quote, SubmittedOrder};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Responses
// =============================================================================

/// `GET /v2/account`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawAccount {
    pub(crate) buying_power: Decimal,
    pub(crate) status: Option<String>,
}

/// Any order object returned by the orders endpoints.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawOrder {
    pub(crate) id: String,
    pub(crate) client_order_id: Option<String>,
    pub(crate) status: Option<String>,
}

impl From<RawOrder> for SubmittedOrder {
    fn from(raw: RawOrder) -> Self {
        Self {
            id: raw.id,
            client_order_id: raw.client_order_id,
            status: raw
                .status
                .as_deref()
                .map_or(OrderStatus::PendingNew, OrderStatus::parse),
        }
    }
}

/// `GET /v2/positions/{symbol}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawPosition {
    pub(crate) qty: Decimal,
}

/// Error body, e.g. `{"code": 40010001, "message": "client_order_id must be unique"}`.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawApiError {
    pub(crate) message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawTrade {
    #[serde(rename = "p")]
    pub(crate) price: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawQuote {
    #[serde(rename = "bp")]
    pub(crate) bid: Option<Decimal>,
    #[serde(rename = "ap")]
    pub(crate) ask: Option<Decimal>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawBar {
    #[serde(rename = "c")]
    pub(crate) close: Option<Decimal>,
}

/// `GET /v2/stocks/{symbol}/snapshot` on the data API.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RawSnapshot {
    pub(crate) latest_trade: Option<RawTrade>,
    pub(crate) latest_quote: Option<RawQuote>,
    pub(crate) minute_bar: Option<RawBar>,
}

fn positive(value: Option<Decimal>) -> Option<Decimal> {
    value.filter(|v| *v > Decimal::ZERO)
}

impl From<RawSnapshot> for PriceSnapshot {
    fn from(raw: RawSnapshot) -> Self {
        let quote = raw.latest_quote.and_then(|q| match (q.bid, q.ask) {
            (Some(bid), Some(ask)) => Some(Quote { bid, ask }),
            _ => None,
        });
        Self {
            trade: positive(raw.latest_trade.and_then(|t| t.price)),
            quote,
            minute_bar_close: positive(raw.minute_bar.and_then(|b| b.close)),
        }
    }
}

// =============================================================================
// Requests
// =============================================================================

/// `POST /v2/orders` body for a notional market buy.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct NotionalBuyBody<'a> {
    symbol: &'a str,
    notional: Decimal,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    client_order_id: &'a str,
}

impl<'a> From<&'a MarketBuy> for NotionalBuyBody<'a> {
    fn from(buy: &'a MarketBuy) -> Self {
        Self {
            symbol: buy.symbol.as_str(),
            notional: buy.notional,
            side: "buy",
            order_type: "market",
            time_in_force: "day",
            client_order_id: &buy.client_order_id,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct TakeProfitLeg {
    limit_price: Decimal,
}

#[derive(Debug, Clone, Serialize)]
pub(crate) struct StopLossLeg {
    stop_price: Decimal,
}

/// `POST /v2/orders` body for a one-cancels-other exit.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct OcoBody<'a> {
    symbol: &'a str,
    qty: Decimal,
    side: &'static str,
    #[serde(rename = "type")]
    order_type: &'static str,
    time_in_force: &'static str,
    order_class: &'static str,
    take_profit: TakeProfitLeg,
    stop_loss: StopLossLeg,
}

impl<'a> From<&'a OcoExit> for OcoBody<'a> {
    fn from(exit: &'a OcoExit) -> Self {
        Self {
            symbol: exit.symbol.as_str(),
            qty: exit.qty,
            side: "sell",
            order_type: "limit",
            time_in_force: "gtc",
            order_class: "oco",
            take_profit: TakeProfitLeg {
                limit_price: exit.take_profit_price,
            },
            stop_loss: StopLossLeg {
                stop_price: exit.stop_loss_price,
            },
        }
    }
}
