//! Quantization rules for dollar amounts, share quantities and trigger prices.

use rust_decimal::{Decimal, RoundingStrategy};

/// Decimal places the broker accepts for fractional share quantities.
pub const QTY_DECIMALS: u32 = 6;

/// Decimal places for dollar amounts and trigger prices.
pub const CENT_DECIMALS: u32 = 2;

/// Floors a dollar amount to the cent.
#[must_use]
pub fn floor_cents(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(CENT_DECIMALS, RoundingStrategy::ToNegativeInfinity)
}

/// Floors a share quantity to [`QTY_DECIMALS`] places.
#[must_use]
pub fn floor_qty(qty: Decimal) -> Decimal {
    qty.round_dp_with_strategy(QTY_DECIMALS, RoundingStrategy::ToNegativeInfinity)
}

/// Rounds a trigger price to the cent (ties to even).
#[must_use]
pub fn round_price(price: Decimal) -> Decimal {
    price.round_dp_with_strategy(CENT_DECIMALS, RoundingStrategy::MidpointNearestEven)
}
