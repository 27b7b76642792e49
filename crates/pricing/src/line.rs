use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use docflow_core::{DomainError, DomainResult};

use crate::margin::{margin_from_price, sell_from_margin};

/// Largest quantity a line may carry.
pub const MAX_QUANTITY: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);
/// Largest unit sell or cost price a line may carry.
pub const MAX_UNIT_AMOUNT: Decimal = Decimal::from_parts(1_000_000_000, 0, 0, false, 0);

/// One billable row: description, quantity, sell price and internal cost.
///
/// `cost_price` is internal-only. It feeds margin and profitability figures
/// and must never reach a counterparty-facing view. Records stored without a
/// cost deserialize with a cost of zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineItem {
    pub description: String,
    pub quantity: Decimal,
    /// Sell price per unit.
    pub unit_price: Decimal,
    #[serde(default)]
    pub cost_price: Decimal,
}

/// The two mutually exclusive ways a user prices a line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", content = "value", rename_all = "snake_case")]
pub enum PriceInput {
    /// Fix the sell price; the margin is derived.
    SellPrice(Decimal),
    /// Fix the margin percentage; the sell price is derived.
    Margin(Decimal),
}

impl LineItem {
    /// Build a validated line item.
    pub fn new(
        description: impl Into<String>,
        quantity: Decimal,
        unit_price: Decimal,
        cost_price: Decimal,
    ) -> DomainResult<Self> {
        let item = Self {
            description: description.into(),
            quantity,
            unit_price,
            cost_price,
        };
        item.validate()?;
        Ok(item)
    }

    /// Build a line priced by margin over cost.
    pub fn with_margin(
        description: impl Into<String>,
        quantity: Decimal,
        cost_price: Decimal,
        margin: Decimal,
    ) -> DomainResult<Self> {
        Self::new(
            description,
            quantity,
            sell_from_margin(cost_price, margin)?,
            cost_price,
        )
    }

    pub fn validate(&self) -> DomainResult<()> {
        if self.description.trim().is_empty() {
            return Err(DomainError::validation("line item description is required"));
        }
        if self.quantity < Decimal::ZERO {
            return Err(DomainError::validation("line item quantity must be >= 0"));
        }
        if self.quantity > MAX_QUANTITY {
            return Err(DomainError::validation(format!(
                "line item quantity must be <= {MAX_QUANTITY}"
            )));
        }
        check_unit_amount("unit_price", self.unit_price)?;
        check_unit_amount("cost_price", self.cost_price)
    }

    /// `quantity × unit_price`, unrounded.
    pub fn line_total(&self) -> Decimal {
        self.quantity * self.unit_price
    }

    /// `quantity × cost_price`, unrounded. Internal-only.
    pub fn cost_total(&self) -> Decimal {
        self.quantity * self.cost_price
    }

    pub fn margin_percent(&self) -> Decimal {
        margin_from_price(self.cost_price, self.unit_price)
    }

    /// Apply a pricing input, keeping sell price and margin consistent.
    ///
    /// Returns the resulting margin percentage.
    pub fn reprice(&mut self, input: PriceInput) -> DomainResult<Decimal> {
        match input {
            PriceInput::SellPrice(price) => {
                check_unit_amount("sell price", price)?;
                self.unit_price = price;
            }
            PriceInput::Margin(margin) => {
                let price = sell_from_margin(self.cost_price, margin)?;
                check_unit_amount("sell price", price)?;
                self.unit_price = price;
            }
        }
        Ok(self.margin_percent())
    }

    /// Change the internal cost while keeping the sell price fixed.
    pub fn set_cost_price(&mut self, cost: Decimal) -> DomainResult<Decimal> {
        check_unit_amount("cost price", cost)?;
        self.cost_price = cost;
        Ok(self.margin_percent())
    }
}

fn check_unit_amount(field: &str, amount: Decimal) -> DomainResult<()> {
    if amount < Decimal::ZERO {
        return Err(DomainError::validation(format!("line item {field} must be >= 0")));
    }
    if amount > MAX_UNIT_AMOUNT {
        return Err(DomainError::validation(format!(
            "line item {field} must be <= {MAX_UNIT_AMOUNT}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn derived_figures() {
        let item = LineItem::new("Widget", d("2"), d("100"), d("60")).unwrap();
        assert_eq!(item.line_total(), d("200"));
        assert_eq!(item.cost_total(), d("120"));
        assert_eq!(item.margin_percent(), d("40"));
    }

    #[test]
    fn rejects_negative_values_and_blank_description() {
        assert!(LineItem::new("x", d("-1"), d("1"), d("0")).is_err());
        assert!(LineItem::new("x", d("1"), d("-1"), d("0")).is_err());
        assert!(LineItem::new("x", d("1"), d("1"), d("-0.01")).is_err());
        match LineItem::new("  ", d("1"), d("1"), d("0")) {
            Err(DomainError::Validation(msg)) => assert!(msg.contains("description")),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn zero_quantity_is_allowed() {
        let item = LineItem::new("Placeholder", Decimal::ZERO, d("10"), d("5")).unwrap();
        assert_eq!(item.line_total(), Decimal::ZERO);
    }

    #[test]
    fn reprice_by_margin_then_by_price() {
        let mut item = LineItem::new("Service", d("1"), d("0"), d("60")).unwrap();

        let margin = item.reprice(PriceInput::Margin(d("40"))).unwrap();
        assert_eq!(item.unit_price, d("100"));
        assert_eq!(margin, d("40"));

        let margin = item.reprice(PriceInput::SellPrice(d("120"))).unwrap();
        assert_eq!(item.unit_price, d("120"));
        assert_eq!(margin, d("50"));
    }

    #[test]
    fn reprice_with_excessive_margin_caps_price() {
        let mut item = LineItem::new("Service", d("1"), d("0"), d("7")).unwrap();
        item.reprice(PriceInput::Margin(d("150"))).unwrap();
        assert_eq!(item.unit_price, d("70"));
    }

    #[test]
    fn oversized_amounts_are_rejected() {
        let huge = d("1000000000000000");
        assert!(LineItem::new("x", huge, d("1"), d("0")).is_err());
        assert!(LineItem::new("x", d("1"), huge, d("0")).is_err());
        assert!(LineItem::new("x", d("1"), d("1"), huge).is_err());
        assert!(LineItem::new("x", MAX_QUANTITY, MAX_UNIT_AMOUNT, MAX_UNIT_AMOUNT).is_ok());
    }

    #[test]
    fn unrepresentable_margin_leaves_the_line_untouched() {
        let mut item = LineItem::new("Service", d("1"), d("150"), d("100")).unwrap();

        let err = item
            .reprice(PriceInput::Margin(d("99.99999999999999999999999999")))
            .unwrap_err();
        assert!(matches!(err, DomainError::Validation(_)));
        // 99.999% of a 100 cost lands above the unit ceiling.
        assert!(item.reprice(PriceInput::Margin(d("99.99999999"))).is_err());
        assert_eq!(item.unit_price, d("150"));
    }

    #[test]
    fn missing_cost_deserializes_as_zero() {
        let json = r#"{"description":"Labour","quantity":"1.5","unit_price":"80"}"#;
        let item: LineItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.cost_price, Decimal::ZERO);
        assert_eq!(item.margin_percent(), d("100"));
    }
}
