//! Margin ↔ sell price reconciliation.
//!
//! Margin is expressed on the sell price: `(price − cost) / price × 100`.

use rust_decimal::Decimal;

use docflow_core::{DomainError, DomainResult};

/// Derived price multiplier applied when the requested margin is 100% or more.
pub const MARGIN_CAP_MULTIPLIER: Decimal = Decimal::TEN;

/// Margin percentage implied by selling at `price` something that costs `cost`.
///
/// A zero (or negative) price yields a margin of 0 rather than a division by zero.
/// A loss too deep to represent (cost vastly above a tiny price) saturates at
/// [`Decimal::MIN`].
pub fn margin_from_price(cost: Decimal, price: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    price
        .checked_sub(cost)
        .and_then(|gain| gain.checked_div(price))
        .and_then(|ratio| ratio.checked_mul(Decimal::ONE_HUNDRED))
        .unwrap_or(Decimal::MIN)
}

/// Sell price that yields `margin` percent over `cost`.
///
/// A margin of 100% or more has no finite, positive solution; the price is
/// capped at `cost × 10` instead. A margin so close to 100% that the price
/// cannot be represented is rejected.
pub fn sell_from_margin(cost: Decimal, margin: Decimal) -> DomainResult<Decimal> {
    let price = if margin >= Decimal::ONE_HUNDRED {
        cost.checked_mul(MARGIN_CAP_MULTIPLIER)
    } else {
        cost.checked_div(Decimal::ONE - margin / Decimal::ONE_HUNDRED)
    };
    price.ok_or_else(|| {
        DomainError::validation(format!(
            "a {margin}% margin on a cost of {cost} gives an unrepresentable price"
        ))
    })
}
