use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Shopper's verdict on a single ordered item.
///
/// A found quantity exists only on the `Found` variant, so "found quantity is
/// defined only for found items" holds by construction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum FoundMark {
    /// Shopper has not looked for this item yet
    NotEvaluated,

    /// Located, possibly in a smaller quantity than ordered
    Found { quantity: Decimal },

    /// Looked for and not available
    NotFound,
}

/// A single line of a sub-order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique line identifier
    pub id: String,

    /// Product reference
    pub product_id: String,

    /// Price per unit
    pub unit_price: Decimal,

    /// Ordered quantity; fractional for weight-based units
    pub ordered_quantity: Decimal,

    /// Shopper's verdict
    pub mark: FoundMark,

    /// Owning sub-order, set at creation and never re-derived
    pub sub_order_id: String,
}

impl Item {
    pub fn new(
        id: impl Into<String>,
        product_id: impl Into<String>,
        unit_price: Decimal,
        ordered_quantity: Decimal,
        sub_order_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            product_id: product_id.into(),
            unit_price,
            ordered_quantity,
            mark: FoundMark::NotEvaluated,
            sub_order_id: sub_order_id.into(),
        }
    }

    /// Effective found quantity: zero unless the item was marked found.
    pub fn found_quantity(&self) -> Decimal {
        match &self.mark {
            FoundMark::Found { quantity } => *quantity,
            _ => Decimal::ZERO,
        }
    }

    /// Quantity the shopper could not supply, never negative.
    pub fn missing_quantity(&self) -> Decimal {
        let missing = self.ordered_quantity - self.found_quantity();
        missing.max(Decimal::ZERO)
    }

    pub fn is_evaluated(&self) -> bool {
        !matches!(self.mark, FoundMark::NotEvaluated)
    }

    pub fn is_found(&self) -> bool {
        matches!(self.mark, FoundMark::Found { .. })
    }
}
