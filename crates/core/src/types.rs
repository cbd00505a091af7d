//! Narrow data contracts exchanged with the broker, price service and list source.
//!
//! All financial values use `rust_decimal::Decimal`.

use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::symbol::Symbol;

// =============================================================================
// Account
// =============================================================================

/// The part of the broker account a run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountSnapshot {
    pub buying_power: Decimal,
    /// Broker-reported account status (e.g. "ACTIVE"), when available.
    pub status: Option<String>,
}

// =============================================================================
// Orders
// =============================================================================

/// A market buy sized in dollars.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketBuy {
    pub symbol: Symbol,
    pub notional: Decimal,
    /// Deterministic per (symbol, run); lets the broker deduplicate retries.
    pub client_order_id: String,
}

/// A one-cancels-other sell carrying both exit triggers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OcoExit {
    pub symbol: Symbol,
    pub qty: Decimal,
    pub take_profit_price: Decimal,
    pub stop_loss_price: Decimal,
}

/// Everything the engine ever submits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum OrderRequest {
    MarketBuy(MarketBuy),
    OcoExit(OcoExit),
}

impl OrderRequest {
    #[must_use]
    pub fn symbol(&self) -> &Symbol {
        match self {
            Self::MarketBuy(buy) => &buy.symbol,
            Self::OcoExit(exit) => &exit.symbol,
        }
    }
}

/// Broker acknowledgement of a submitted order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubmittedOrder {
    pub id: String,
    pub client_order_id: Option<String>,
    pub status: OrderStatus,
}

/// Order status as reported by the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderStatus {
    New,
    Accepted,
    PartiallyFilled,
    Filled,
    DoneForDay,
    PendingNew,
    Rejected,
    Canceled,
    Expired,
    Other(String),
}

impl OrderStatus {
    /// Parses a broker status string such as `"partially_filled"`.
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "new" => Self::New,
            "accepted" => Self::Accepted,
            "partially_filled" => Self::PartiallyFilled,
            "filled" => Self::Filled,
            "done_for_day" => Self::DoneForDay,
            "pending_new" => Self::PendingNew,
            "rejected" => Self::Rejected,
            "canceled" | "cancelled" => Self::Canceled,
            "expired" => Self::Expired,
            other => Self::Other(other.to_string()),
        }
    }

    /// Statuses that count as "accepted" for acceptance polling.
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::New | Self::Accepted | Self::PartiallyFilled | Self::Filled | Self::DoneForDay
        )
    }

    /// Statuses from which the order can never become active.
    #[must_use]
    pub fn is_dead(&self) -> bool {
        matches!(self, Self::Rejected | Self::Canceled | Self::Expired)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::New => "new",
            Self::Accepted => "accepted",
            Self::PartiallyFilled => "partially_filled",
            Self::Filled => "filled",
            Self::DoneForDay => "done_for_day",
            Self::PendingNew => "pending_new",
            Self::Rejected => "rejected",
            Self::Canceled => "canceled",
            Self::Expired => "expired",
            Self::Other(other) => other.as_str(),
        };
        f.write_str(s)
    }
}

// =============================================================================
// Market data
// =============================================================================

/// Latest top-of-book quote.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Quote {
    pub bid: Decimal,
    pub ask: Decimal,
}

impl Quote {
    /// Midpoint, when both sides are present and positive.
    #[must_use]
    pub fn mid(&self) -> Option<Decimal> {
        if self.bid > Decimal::ZERO && self.ask > Decimal::ZERO {
            Some((self.bid + self.ask) / Decimal::TWO)
        } else {
            None
        }
    }
}

/// One price-service response; any field may be missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSnapshot {
    pub trade: Option<Decimal>,
    pub quote: Option<Quote>,
    pub minute_bar_close: Option<Decimal>,
}

// =============================================================================
// List source
// =============================================================================

/// One line of the per-run outcome log written back to the list source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutcomeRow {
    pub symbol: String,
    pub status: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn active_class_matches_broker_statuses() {
        for raw in ["new", "accepted", "partially_filled", "filled", "done_for_day"] {
            assert!(OrderStatus::parse(raw).is_active(), "{raw} should be active");
        }
        for raw in ["pending_new", "rejected", "canceled", "held", "calculated"] {
            assert!(!OrderStatus::parse(raw).is_active(), "{raw} should not be active");
        }
    }

    #[test]
    fn dead_statuses() {
        assert!(OrderStatus::parse("REJECTED").is_dead());
        assert!(OrderStatus::parse("cancelled").is_dead());
        assert!(OrderStatus::parse("expired").is_dead());
        assert!(!OrderStatus::parse("pending_new").is_dead());
    }

    #[test]
    fn unknown_status_round_trips_through_display() {
        let status = OrderStatus::parse("pending_replace");
        assert_eq!(status, OrderStatus::Other("pending_replace".to_string()));
        assert_eq!(status.to_string(), "pending_replace");
    }

    #[test]
    fn quote_mid_requires_both_sides() {
        let quote = Quote {
            bid: dec!(100.00),
            ask: dec!(100.10),
        };
        assert_eq!(quote.mid(), Some(dec!(100.05)));

        let one_sided = Quote {
            bid: dec!(0),
            ask: dec!(100.10),
        };
        assert_eq!(one_sided.mid(), None);
    }

    #[test]
    fn order_request_symbol() {
        let symbol = Symbol::parse("aapl").unwrap();
        let order = OrderRequest::OcoExit(OcoExit {
            symbol: symbol.clone(),
            qty: dec!(0.5),
            take_profit_price: dec!(105),
            stop_loss_price: dec!(97),
        });
        assert_eq!(order.symbol(), &symbol);
    }
}
