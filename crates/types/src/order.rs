use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::Item;

/// Kind of sub-order, with kind-specific required fields.
///
/// Reel (single-product quick-buy) and restaurant orders never had loose
/// optional fields here: the variant carries exactly what its kind needs, so
/// no caller has to probe for "has a restaurant id or a user id".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum OrderKind {
    /// Multi-item grocery order with a find-items shopping step
    Regular,

    /// Single-product quick buy sourced from a shop; still shopped in-store
    ReelFromShop { unit_price: Decimal, quantity: Decimal },

    /// Single-product quick buy sourced from a restaurant or another user;
    /// nothing to find, goes straight to payment
    ReelFromRestaurantOrUser { unit_price: Decimal, quantity: Decimal },

    /// Restaurant meal order; prepared by the kitchen, nothing to find
    Restaurant,
}

impl OrderKind {
    /// Whether this kind has a find-items shopping step.
    pub fn has_shopping_phase(&self) -> bool {
        matches!(self, OrderKind::Regular | OrderKind::ReelFromShop { .. })
    }

    /// Whether departure requires at least one found item.
    ///
    /// Reel and restaurant sub-orders carry a single implicit item and may
    /// depart unconditionally.
    pub fn requires_found_item(&self) -> bool {
        matches!(self, OrderKind::Regular)
    }

    /// Reel price fields, if this is a reel kind.
    pub fn reel_pricing(&self) -> Option<(Decimal, Decimal)> {
        match self {
            OrderKind::ReelFromShop { unit_price, quantity }
            | OrderKind::ReelFromRestaurantOrUser { unit_price, quantity } => {
                Some((*unit_price, *quantity))
            }
            _ => None,
        }
    }
}

/// Per-sub-order fulfillment status, in required order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubOrderStatus {
    Accepted,
    Shopping,
    /// Internal: payment settled, departure not yet committed
    Paid,
    OnTheWay,
    AtCustomer,
    Delivered,
}

impl SubOrderStatus {
    /// Statuses before the delivery leg begins.
    pub fn is_pre_delivery(&self) -> bool {
        matches!(
            self,
            SubOrderStatus::Accepted | SubOrderStatus::Shopping | SubOrderStatus::Paid
        )
    }

    /// Statuses at or past departure, where proof may be recorded.
    pub fn is_past_shopping(&self) -> bool {
        matches!(
            self,
            SubOrderStatus::OnTheWay | SubOrderStatus::AtCustomer | SubOrderStatus::Delivered
        )
    }
}

impl std::fmt::Display for SubOrderStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SubOrderStatus::Accepted => "accepted",
            SubOrderStatus::Shopping => "shopping",
            SubOrderStatus::Paid => "paid",
            SubOrderStatus::OnTheWay => "on_the_way",
            SubOrderStatus::AtCustomer => "at_customer",
            SubOrderStatus::Delivered => "delivered",
        };
        f.write_str(s)
    }
}

/// One shop's share of a batch: the primary order or a combined order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SubOrder {
    pub id: String,
    pub shop_id: String,
    pub kind: OrderKind,
    pub items: Vec<Item>,

    /// Fees attributable to this shop alone
    pub service_fee: Decimal,
    pub delivery_fee: Decimal,

    pub status: SubOrderStatus,
}

impl SubOrder {
    pub fn new(id: impl Into<String>, shop_id: impl Into<String>, kind: OrderKind) -> Self {
        Self {
            id: id.into(),
            shop_id: shop_id.into(),
            kind,
            items: Vec::new(),
            service_fee: Decimal::ZERO,
            delivery_fee: Decimal::ZERO,
            status: SubOrderStatus::Accepted,
        }
    }

    pub fn with_items(mut self, items: Vec<Item>) -> Self {
        self.items = items;
        self
    }

    pub fn with_fees(mut self, service_fee: Decimal, delivery_fee: Decimal) -> Self {
        self.service_fee = service_fee;
        self.delivery_fee = delivery_fee;
        self
    }

    pub fn item(&self, item_id: &str) -> Option<&Item> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn item_mut(&mut self, item_id: &str) -> Option<&mut Item> {
        self.items.iter_mut().find(|i| i.id == item_id)
    }

    /// Whether any item has been marked found.
    pub fn has_found_item(&self) -> bool {
        self.items.iter().any(|i| i.is_found())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_kind_shopping_phase() {
        assert!(OrderKind::Regular.has_shopping_phase());
        assert!(OrderKind::ReelFromShop { unit_price: dec!(500), quantity: dec!(1) }
            .has_shopping_phase());
        assert!(!OrderKind::Restaurant.has_shopping_phase());
        assert!(
            !OrderKind::ReelFromRestaurantOrUser { unit_price: dec!(500), quantity: dec!(1) }
                .has_shopping_phase()
        );
    }

    #[test]
    fn test_only_regular_requires_found_item() {
        assert!(OrderKind::Regular.requires_found_item());
        assert!(!OrderKind::ReelFromShop { unit_price: dec!(500), quantity: dec!(2) }
            .requires_found_item());
        assert!(!OrderKind::Restaurant.requires_found_item());
    }

    #[test]
    fn test_status_classification() {
        assert!(SubOrderStatus::Paid.is_pre_delivery());
        assert!(!SubOrderStatus::OnTheWay.is_pre_delivery());
        assert!(SubOrderStatus::OnTheWay.is_past_shopping());
        assert!(!SubOrderStatus::Shopping.is_past_shopping());
    }
}
