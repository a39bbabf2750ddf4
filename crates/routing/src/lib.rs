//! Resolution of the "currently active" sub-order in a combined batch, plus
//! the double-count-safe summary the checkout view renders.
//!
//! A combined batch carries one primary sub-order and zero or more combined
//! ones, possibly from different shops. Callers name a shop to act on, or let
//! the router pick a sensible default; every item and fee figure the router
//! hands back is de-duplicated against upstream data repetition.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sokoni_pricing::{scoped_items, PricingError, Scope};
use sokoni_types::{round2, Batch, Item, SubOrder};
use std::collections::HashSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RoutingError {
    #[error("no sub-order for shop {shop_id} in batch {batch_id}")]
    UnknownShop { batch_id: String, shop_id: String },

    #[error(transparent)]
    Pricing(#[from] PricingError),
}

/// Resolve the sub-order a caller is acting on.
///
/// An explicit shop id must match a sub-order. Without one: the primary if it
/// is the only sub-order, otherwise the first combined sub-order still in a
/// pre-delivery status, falling back to the primary when every combined
/// sub-order has moved past that point.
pub fn active_sub_order<'a>(
    batch: &'a Batch,
    shop_id: Option<&str>,
) -> Result<&'a SubOrder, RoutingError> {
    if let Some(shop_id) = shop_id {
        return batch
            .sub_orders()
            .find(|s| s.shop_id == shop_id)
            .ok_or_else(|| RoutingError::UnknownShop {
                batch_id: batch.id.clone(),
                shop_id: shop_id.to_string(),
            });
    }
    if batch.combined.is_empty() {
        return Ok(&batch.primary);
    }
    Ok(batch
        .combined
        .iter()
        .find(|s| s.status.is_pre_delivery())
        .unwrap_or(&batch.primary))
}

/// Sub-order id to target for a payment or proof operation.
pub fn operation_target<'a>(
    batch: &'a Batch,
    shop_id: Option<&str>,
) -> Result<&'a str, RoutingError> {
    Ok(active_sub_order(batch, shop_id)?.id.as_str())
}

/// Items of the active sub-order, first occurrence per item id.
pub fn items_for<'a>(
    batch: &'a Batch,
    shop_id: Option<&str>,
) -> Result<Vec<&'a Item>, RoutingError> {
    let active = active_sub_order(batch, shop_id)?;
    Ok(scoped_items(batch, &Scope::sub_order(&active.id))?)
}

/// Batch-wide totals for the summary view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BatchSummary {
    pub goods_subtotal: Decimal,
    pub service_fee: Decimal,
    pub delivery_fee: Decimal,
}

impl BatchSummary {
    pub fn total(&self) -> Decimal {
        round2(self.goods_subtotal + self.service_fee + self.delivery_fee)
    }
}

/// Aggregate the whole batch exactly once per sub-order and per item.
///
/// Works across shops, unlike the per-payment pricing scope. Fees are summed
/// per distinct sub-order id; goods are summed per distinct item id, with
/// reel sub-orders priced from their own unit price and quantity.
pub fn summarize(batch: &Batch) -> BatchSummary {
    let mut counted_subs: HashSet<&str> = HashSet::new();
    let mut counted_items: HashSet<&str> = HashSet::new();
    let mut goods = Decimal::ZERO;
    let mut service = Decimal::ZERO;
    let mut delivery = Decimal::ZERO;

    for sub in batch.sub_orders() {
        if !counted_subs.insert(sub.id.as_str()) {
            continue;
        }
        service += sub.service_fee;
        delivery += sub.delivery_fee;
        match sub.kind.reel_pricing() {
            Some((unit_price, quantity)) => goods += unit_price * quantity,
            None => {
                for item in &sub.items {
                    if counted_items.insert(item.id.as_str()) {
                        goods += item.unit_price * item.ordered_quantity;
                    }
                }
            }
        }
    }

    BatchSummary {
        goods_subtotal: round2(goods),
        service_fee: round2(service),
        delivery_fee: round2(delivery),
    }
}
