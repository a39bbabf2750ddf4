use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::{SubOrder, SubOrderStatus};

/// Trip-level phase derived from the statuses of every sub-order.
///
/// Always recomputed from live statuses, never stored, so it cannot drift
/// from the sub-orders underneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BatchPhase {
    Accepted,
    Shopping,
    Delivering,
    Done,
}

/// One shopper trip: a primary sub-order plus zero or more combined
/// sub-orders from other shops, sharing a customer and delivery address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: String,
    pub customer_id: String,
    pub delivery_address_id: String,
    pub primary: SubOrder,
    pub combined: Vec<SubOrder>,
}

impl Batch {
    pub fn new(
        id: impl Into<String>,
        customer_id: impl Into<String>,
        delivery_address_id: impl Into<String>,
        primary: SubOrder,
    ) -> Self {
        Self {
            id: id.into(),
            customer_id: customer_id.into(),
            delivery_address_id: delivery_address_id.into(),
            primary,
            combined: Vec::new(),
        }
    }

    pub fn with_combined(mut self, combined: Vec<SubOrder>) -> Self {
        self.combined = combined;
        self
    }

    /// Primary first, then combined sub-orders in their stored order.
    pub fn sub_orders(&self) -> impl Iterator<Item = &SubOrder> {
        std::iter::once(&self.primary).chain(self.combined.iter())
    }

    pub fn sub_orders_mut(&mut self) -> impl Iterator<Item = &mut SubOrder> {
        std::iter::once(&mut self.primary).chain(self.combined.iter_mut())
    }

    pub fn sub_order(&self, sub_order_id: &str) -> Option<&SubOrder> {
        self.sub_orders().find(|s| s.id == sub_order_id)
    }

    pub fn sub_order_mut(&mut self, sub_order_id: &str) -> Option<&mut SubOrder> {
        self.sub_orders_mut().find(|s| s.id == sub_order_id)
    }

    /// More than one distinct shop across primary + combined orders.
    pub fn is_multi_shop(&self) -> bool {
        let shops: HashSet<&str> = self.sub_orders().map(|s| s.shop_id.as_str()).collect();
        shops.len() > 1
    }

    /// Derive the trip-level phase: the minimum progress across sub-orders.
    pub fn phase(&self) -> BatchPhase {
        let all_delivered = self
            .sub_orders()
            .all(|s| s.status == SubOrderStatus::Delivered);
        if all_delivered {
            return BatchPhase::Done;
        }

        let all_delivering = self.sub_orders().all(|s| s.status.is_past_shopping());
        if all_delivering {
            return BatchPhase::Delivering;
        }

        let any_shopping = self.sub_orders().any(|s| {
            matches!(s.status, SubOrderStatus::Shopping | SubOrderStatus::Paid)
        });
        if any_shopping {
            return BatchPhase::Shopping;
        }

        BatchPhase::Accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::OrderKind;

    fn sub(id: &str, shop: &str, status: SubOrderStatus) -> SubOrder {
        let mut s = SubOrder::new(id, shop, OrderKind::Regular);
        s.status = status;
        s
    }

    fn batch(primary: SubOrder, combined: Vec<SubOrder>) -> Batch {
        Batch::new("batch-1", "customer-1", "addr-1", primary).with_combined(combined)
    }

    #[test]
    fn test_single_shop_batch() {
        let b = batch(sub("sub-1", "shop-a", SubOrderStatus::Accepted), vec![]);
        assert!(!b.is_multi_shop());
        assert_eq!(b.phase(), BatchPhase::Accepted);
    }

    #[test]
    fn test_multi_shop_detection() {
        let b = batch(
            sub("sub-1", "shop-a", SubOrderStatus::Accepted),
            vec![sub("sub-2", "shop-b", SubOrderStatus::Accepted)],
        );
        assert!(b.is_multi_shop());
    }

    #[test]
    fn test_phase_shopping_dominates_delivered() {
        // Shop X delivered, shop Y still shopping: the trip is still Shopping.
        let b = batch(
            sub("sub-x", "shop-x", SubOrderStatus::Delivered),
            vec![sub("sub-y", "shop-y", SubOrderStatus::Shopping)],
        );
        assert_eq!(b.phase(), BatchPhase::Shopping);
    }

    #[test]
    fn test_phase_delivering_requires_all_past_shopping() {
        let b = batch(
            sub("sub-1", "shop-a", SubOrderStatus::OnTheWay),
            vec![sub("sub-2", "shop-b", SubOrderStatus::Delivered)],
        );
        assert_eq!(b.phase(), BatchPhase::Delivering);
    }

    #[test]
    fn test_phase_done_when_all_delivered() {
        let b = batch(
            sub("sub-1", "shop-a", SubOrderStatus::Delivered),
            vec![sub("sub-2", "shop-b", SubOrderStatus::Delivered)],
        );
        assert_eq!(b.phase(), BatchPhase::Done);
    }

    #[test]
    fn test_phase_paid_counts_as_shopping() {
        let b = batch(
            sub("sub-1", "shop-a", SubOrderStatus::Paid),
            vec![sub("sub-2", "shop-b", SubOrderStatus::OnTheWay)],
        );
        assert_eq!(b.phase(), BatchPhase::Shopping);
    }

    #[test]
    fn test_sub_order_lookup() {
        let mut b = batch(
            sub("sub-1", "shop-a", SubOrderStatus::Accepted),
            vec![sub("sub-2", "shop-b", SubOrderStatus::Accepted)],
        );
        assert_eq!(b.sub_order("sub-2").unwrap().shop_id, "shop-b");
        assert!(b.sub_order("sub-3").is_none());
        b.sub_order_mut("sub-1").unwrap().status = SubOrderStatus::Shopping;
        assert_eq!(b.primary.status, SubOrderStatus::Shopping);
    }
}
