//! Pricing engine: cost / sell price / margin reconciliation for line items,
//! plus document totals.
//!
//! Everything here is pure arithmetic on [`rust_decimal::Decimal`]. Values are
//! kept at full precision through intermediate steps and only rounded to two
//! decimal places when a total is presented (see [`money::round_money`]).

pub mod line;
pub mod margin;
pub mod money;
pub mod totals;

pub use line::{LineItem, MAX_QUANTITY, MAX_UNIT_AMOUNT, PriceInput};
pub use margin::{MARGIN_CAP_MULTIPLIER, margin_from_price, sell_from_margin};
pub use money::round_money;
pub use totals::{
    CostSummary, MAX_LINES, Totals, validate_line_count, validate_lines, validate_tax_rate,
};
pub use rust_decimal::Decimal;
