use rust_decimal::{Decimal, RoundingStrategy};

/// Round a monetary amount to two decimal places (half away from zero).
///
/// Only applied at the point of display / total computation.
pub fn round_money(amount: Decimal) -> Decimal {
    amount.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
}

/// `amount × rate / 100`.
pub fn percent_of(amount: Decimal, rate: Decimal) -> Decimal {
    amount * rate / Decimal::ONE_HUNDRED
}
