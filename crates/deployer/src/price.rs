//! Reference price resolution: latest trade, then quote midpoint, then
//! minute-bar close.

use notional_deploy_core::{PriceService, PriceSnapshot, ServiceError, Symbol};
use rust_decimal::Decimal;
use tracing::debug;

use crate::error::SymbolError;

/// Where a resolved price came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceSource {
    Trade,
    QuoteMid,
    MinuteBar,
}

/// Picks the freshest usable price from a snapshot.
#[must_use]
pub fn reference_price(snapshot: &PriceSnapshot) -> Option<(Decimal, PriceSource)> {
    let positive = |p: &Decimal| *p > Decimal::ZERO;

    if let Some(trade) = snapshot.trade.filter(positive) {
        return Some((trade, PriceSource::Trade));
    }
    if let Some(mid) = snapshot.quote.and_then(|q| q.mid()).filter(positive) {
        return Some((mid, PriceSource::QuoteMid));
    }
    snapshot
        .minute_bar_close
        .filter(positive)
        .map(|close| (close, PriceSource::MinuteBar))
}

/// Resolves one reference price per call. Nothing is cached.
pub struct PriceResolver<'a> {
    prices: &'a dyn PriceService,
}

impl<'a> PriceResolver<'a> {
    #[must_use]
    pub fn new(prices: &'a dyn PriceService) -> Self {
        Self { prices }
    }

    /// # Errors
    /// Returns [`SymbolError::NoPriceAvailable`] when no source yields a price,
    /// or [`SymbolError::Broker`] when the price service fails.
    pub async fn resolve(&self, symbol: &Symbol) -> Result<Decimal, SymbolError> {
        let snapshot = match self.prices.snapshot(symbol).await {
            Ok(snapshot) => snapshot,
            Err(ServiceError::NotFound(_)) => return Err(SymbolError::NoPriceAvailable(symbol.clone())),
            Err(e) => return Err(e.into()),
        };

        let (price, source) = reference_price(&snapshot)
            .ok_or_else(|| SymbolError::NoPriceAvailable(symbol.clone()))?;
        debug!(symbol = %symbol, price = %price, source = ?source, "Resolved reference price");
        Ok(price)
    }
}
