//! Engine error types.
//!
//! [`SymbolError`] is caught per symbol and recorded as an outcome;
//! [`RunAbort`] stops the run before anything is submitted or cleared.

use notional_deploy_core::{OrderStatus, ServiceError, Symbol};
use rust_decimal::Decimal;
use thiserror::Error;

/// Recoverable failure confined to one symbol.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum SymbolError {
    #[error("no price available for {0}")]
    NoPriceAvailable(Symbol),

    #[error("order {order_id} not accepted after {attempts} checks")]
    OrderNotAccepted { order_id: String, attempts: u32 },

    #[error("order {order_id} {status}")]
    OrderRejected { order_id: String, status: OrderStatus },

    #[error("filled quantity {delta} rounds to zero shares")]
    ExitQuantityTooSmall { delta: Decimal },

    #[error("exit order failed: {0}")]
    ExitSubmit(ServiceError),

    #[error(transparent)]
    Broker(#[from] ServiceError),
}

/// Fatal precondition failure. Nothing has been submitted or cleared.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum RunAbort {
    #[error("authentication failed: {0}")]
    Authentication(String),

    #[error("account lookup failed: {0}")]
    Account(String),

    #[error("symbol list unavailable: {0}")]
    ListUnavailable(String),

    #[error(
        "degenerate budget plan: {per_symbol} per symbol across {symbol_count} symbol(s) \
         is below the minimum notional {min_notional}"
    )]
    DegeneratePlan {
        per_symbol: Decimal,
        symbol_count: usize,
        min_notional: Decimal,
    },
}

impl RunAbort {
    /// Classifies a failed account lookup.
    #[must_use]
    pub fn from_account_error(err: &ServiceError) -> Self {
        if err.is_auth() {
            Self::Authentication(err.to_string())
        } else {
            Self::Account(err.to_string())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn account_errors_split_auth_from_other_failures() {
        let auth = RunAbort::from_account_error(&ServiceError::Unauthorized("bad key".into()));
        assert!(matches!(auth, RunAbort::Authentication(_)));

        let other = RunAbort::from_account_error(&ServiceError::Timeout("30s".into()));
        assert!(matches!(other, RunAbort::Account(_)));
    }

    #[test]
    fn messages_read_as_outcome_reasons() {
        let err = SymbolError::OrderRejected {
            order_id: "ord-1".into(),
            status: OrderStatus::Rejected,
        };
        assert_eq!(err.to_string(), "order ord-1 rejected");

        let err = SymbolError::ExitQuantityTooSmall {
            delta: dec!(0.0000004),
        };
        assert_eq!(err.to_string(), "filled quantity 0.0000004 rounds to zero shares");

        let err = SymbolError::Broker(ServiceError::rejected(403, "insufficient buying power"));
        assert_eq!(err.to_string(), "rejected (403): insufficient buying power");
    }
}
