use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use docflow_core::{DomainError, DomainResult};

use crate::line::LineItem;
use crate::margin::margin_from_price;
use crate::money::{percent_of, round_money};

/// Most lines a single document may carry.
pub const MAX_LINES: usize = 1_000;

/// Counterparty-facing document totals.
///
/// `compute` keeps full precision; call [`Totals::rounded`] for presentation.
/// Lines that passed [`validate_lines`] cannot overflow any figure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Totals {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
}

impl Totals {
    pub fn compute(lines: &[LineItem], tax_rate: Decimal) -> Self {
        let subtotal: Decimal = lines.iter().map(LineItem::line_total).sum();
        let tax = percent_of(subtotal, tax_rate);
        Self {
            subtotal,
            tax,
            total: subtotal + tax,
        }
    }

    /// Each figure rounded to two decimals. The total is derived from the
    /// unrounded figures, then rounded, so it never accumulates rounding error.
    pub fn rounded(&self) -> Self {
        Self {
            subtotal: round_money(self.subtotal),
            tax: round_money(self.tax),
            total: round_money(self.total),
        }
    }
}

/// Internal cost figures for a set of lines. Never exposed to the counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CostSummary {
    pub cost_subtotal: Decimal,
    /// Pre-tax subtotal minus cost subtotal.
    pub profit: Decimal,
    pub margin_percent: Decimal,
}

impl CostSummary {
    pub fn compute(lines: &[LineItem]) -> Self {
        let subtotal: Decimal = lines.iter().map(LineItem::line_total).sum();
        let cost_subtotal: Decimal = lines.iter().map(LineItem::cost_total).sum();
        Self {
            cost_subtotal,
            profit: subtotal - cost_subtotal,
            margin_percent: margin_from_price(cost_subtotal, subtotal),
        }
    }
}

/// Validate a tax rate percentage.
pub fn validate_tax_rate(tax_rate: Decimal) -> DomainResult<()> {
    if tax_rate < Decimal::ZERO {
        return Err(DomainError::validation("tax_rate must be >= 0"));
    }
    if tax_rate > Decimal::ONE_HUNDRED {
        return Err(DomainError::validation("tax_rate must be <= 100"));
    }
    Ok(())
}

/// Validate every line of a document.
pub fn validate_lines(lines: &[LineItem]) -> DomainResult<()> {
    validate_line_count(lines.len())?;
    lines.iter().try_for_each(LineItem::validate)
}

pub fn validate_line_count(count: usize) -> DomainResult<()> {
    if count > MAX_LINES {
        return Err(DomainError::validation(format!(
            "a document may carry at most {MAX_LINES} lines, got {count}"
        )));
    }
    Ok(())
}
